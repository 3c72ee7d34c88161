//! Per-entry media normalization
//!
//! Every timeline entry becomes a visual clip of exactly the entry duration at the
//! target resolution and frame rate, plus an uncompressed audio slice covering the
//! entry and its crossfade window.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::rules::{within_one_frame, AudioSlice, AudioWindow, CrossfadePlan, DurationFit, LetterboxGeometry};
use crate::engine::{base_args, EncodingSettings};
use crate::ports::{FfmpegPort, MediaProbe, NormalizedEntry, ProbePort};
use crate::utils::time::{ffmpeg_seconds, millis};

/// Inputs for one visual conform
#[derive(Debug, Clone)]
pub struct VisualJob<'a> {
    pub source: &'a Path,
    pub content_type: ContentType,
    /// Offset into a video source
    pub start_time: f64,
    pub duration: f64,
    /// Length of the source when known
    pub source_duration: Option<f64>,
    /// Source frame size when known
    pub source_dimensions: Option<(u32, u32)>,
    pub resolution: Resolution,
    pub output: &'a Path,
}

/// Scale and pad filter chain for a visual conform
pub fn visual_filter(job: &VisualJob<'_>, settings: &EncodingSettings) -> String {
    let target = job.resolution;
    let fit = match job.source_dimensions {
        Some((width, height)) => {
            let geometry = LetterboxGeometry::fit(width, height, target);
            format!(
                "scale={}:{}:flags=lanczos,pad={}:{}:{}:{}:color=black",
                geometry.scaled_width,
                geometry.scaled_height,
                target.width,
                target.height,
                geometry.pad_x,
                geometry.pad_y
            )
        }
        None => format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease:force_divisible_by=2,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black",
            w = target.width,
            h = target.height
        ),
    };

    format!(
        "{},setsar=1,fps={},format={},tpad=stop_mode=clone:stop_duration={}",
        fit,
        settings.fps,
        settings.pixel_format,
        ffmpeg_seconds(job.duration)
    )
}

/// Full ffmpeg argument list for a visual conform
pub fn visual_args(job: &VisualJob<'_>, settings: &EncodingSettings) -> Vec<String> {
    let duration = ffmpeg_seconds(job.duration);
    let mut args = base_args();

    match job.content_type {
        ContentType::Image => {
            args.extend([
                "-loop".to_string(),
                "1".to_string(),
                "-framerate".to_string(),
                settings.fps.to_string(),
                "-t".to_string(),
                duration.clone(),
            ]);
        }
        ContentType::Video => {
            let available = job
                .source_duration
                .map(|length| (length - job.start_time).max(0.0))
                .unwrap_or(0.0);
            if let DurationFit::Loop { extra_loops } = DurationFit::for_video(available, job.duration) {
                args.extend(["-stream_loop".to_string(), extra_loops.to_string()]);
            }
            if job.start_time > 0.0 {
                args.extend(["-ss".to_string(), ffmpeg_seconds(job.start_time)]);
            }
        }
    }

    args.extend(["-i".to_string(), job.source.to_string_lossy().into_owned()]);
    args.extend(["-vf".to_string(), visual_filter(job, settings), "-an".to_string()]);
    args.extend(settings.video_args());
    if job.content_type == ContentType::Image {
        args.extend(["-tune".to_string(), "stillimage".to_string()]);
    }
    args.extend([
        "-t".to_string(),
        duration,
        job.output.to_string_lossy().into_owned(),
    ]);
    args
}

/// Black frames of exactly `duration` for a source that carries no video stream
pub fn black_hold_args(
    duration: f64,
    resolution: Resolution,
    settings: &EncodingSettings,
    output: &Path,
) -> Vec<String> {
    let mut args = base_args();
    args.extend([
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!(
            "color=c=black:s={}x{}:r={}",
            resolution.width, resolution.height, settings.fps
        ),
        "-vf".to_string(),
        format!("setsar=1,format={}", settings.pixel_format),
        "-an".to_string(),
    ]);
    args.extend(settings.video_args());
    args.extend([
        "-t".to_string(),
        ffmpeg_seconds(duration),
        output.to_string_lossy().into_owned(),
    ]);
    args
}

/// Inputs for one audio slice
#[derive(Debug, Clone)]
pub struct AudioJob<'a> {
    /// `None` produces silence of the full slice length
    pub source: Option<&'a Path>,
    pub slice: AudioSlice,
    pub sample_rate: u32,
    pub output: &'a Path,
}

/// Full ffmpeg argument list for an audio slice
pub fn audio_args(job: &AudioJob<'_>) -> Vec<String> {
    let total = ffmpeg_seconds(job.slice.total);
    let mut args = base_args();

    match job.source {
        Some(source) if job.slice.read > 0.0 => {
            args.extend([
                "-ss".to_string(),
                ffmpeg_seconds(job.slice.seek),
                "-t".to_string(),
                ffmpeg_seconds(job.slice.read),
                "-i".to_string(),
                source.to_string_lossy().into_owned(),
            ]);

            let mut filters = vec![
                format!("aresample={}", job.sample_rate),
                "aformat=channel_layouts=stereo".to_string(),
            ];
            let delay = millis(job.slice.pad_before);
            if delay > 0 {
                filters.push(format!("adelay=delays={}:all=1", delay));
            }
            filters.push(format!("apad=whole_dur={}", total));
            args.extend(["-af".to_string(), filters.join(","), "-vn".to_string()]);
        }
        _ => {
            args.extend([
                "-f".to_string(),
                "lavfi".to_string(),
                "-i".to_string(),
                format!("anullsrc=r={}:cl=stereo", job.sample_rate),
            ]);
        }
    }

    args.extend([
        "-ac".to_string(),
        "2".to_string(),
        "-ar".to_string(),
        job.sample_rate.to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        "-t".to_string(),
        total,
        job.output.to_string_lossy().into_owned(),
    ]);
    args
}

/// Conforms timeline entries into uniform clips
#[derive(Clone)]
pub struct MediaNormalizer {
    ffmpeg: Arc<dyn FfmpegPort>,
    probe: Arc<dyn ProbePort>,
    settings: EncodingSettings,
    max_parallel: usize,
}

/// Everything one entry needs, owned so it can move into a task
struct EntryWork {
    index: usize,
    entry: TimelineEntry,
    audio: ARollSegment,
    window: AudioWindow,
    resolution: Resolution,
    work_dir: PathBuf,
}

impl MediaNormalizer {
    pub fn new(ffmpeg: Arc<dyn FfmpegPort>, probe: Arc<dyn ProbePort>, settings: EncodingSettings) -> Self {
        Self {
            ffmpeg,
            probe,
            settings,
            max_parallel: num_cpus::get().max(1),
        }
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    pub fn settings(&self) -> &EncodingSettings {
        &self.settings
    }

    /// Normalize every entry of `sequence` into `work_dir`.
    ///
    /// Entries run concurrently up to the parallelism limit. `on_entry` is called after
    /// each finished entry with the number done so far and the total; returning `false`
    /// cancels the remaining work. Results come back in timeline order.
    pub async fn normalize_sequence<F>(
        &self,
        sequence: &AssemblySequence,
        crossfade: &CrossfadePlan,
        work_dir: &Path,
        mut on_entry: F,
    ) -> Result<Vec<NormalizedEntry>, DomainError>
    where
        F: FnMut(usize, usize, &NormalizedEntry) -> bool,
    {
        let total = sequence.len();
        info!(
            entries = total,
            max_parallel = self.max_parallel,
            crossfade = crossfade.duration,
            "Normalizing timeline entries"
        );

        let mut work = Vec::with_capacity(total);
        for (index, entry) in sequence.entries.iter().enumerate() {
            let audio = sequence
                .audio_segment(&entry.audio_source)
                .cloned()
                .ok_or_else(|| DomainError::InvalidSegment {
                    segment_id: entry.audio_source.clone(),
                    message: format!("entry {} refers to an unknown audio segment", index),
                })?;
            work.push(EntryWork {
                index,
                entry: entry.clone(),
                audio,
                window: crossfade.window(index),
                resolution: sequence.target_resolution,
                work_dir: work_dir.to_path_buf(),
            });
        }

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();
        for item in work {
            let this = self.clone();
            let permits = semaphore.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|_| DomainError::Cancelled {
                    stage: PipelineStage::Normalization,
                })?;
                this.normalize_entry(item).await
            });
        }

        let mut finished: Vec<NormalizedEntry> = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            let normalized = match joined {
                Ok(Ok(normalized)) => normalized,
                Ok(Err(err)) => {
                    tasks.abort_all();
                    return Err(err);
                }
                Err(join_err) => {
                    tasks.abort_all();
                    return Err(DomainError::Normalization {
                        segment_id: "unknown".to_string(),
                        path: work_dir.to_path_buf(),
                        message: format!("normalization task failed: {}", join_err),
                    });
                }
            };

            finished.push(normalized);
            let last = &finished[finished.len() - 1];
            if !on_entry(finished.len(), total, last) {
                tasks.abort_all();
                return Err(DomainError::Cancelled {
                    stage: PipelineStage::Normalization,
                });
            }
        }

        finished.sort_by_key(|entry| entry.order_index);
        Ok(finished)
    }

    async fn normalize_entry(&self, work: EntryWork) -> Result<NormalizedEntry, DomainError> {
        let EntryWork {
            index,
            entry,
            audio,
            window,
            resolution,
            work_dir,
        } = work;
        let visual = &entry.visual_source;
        let visual_path = work_dir.join(format!("entry_{:03}_visual.mp4", index));
        let audio_path = work_dir.join(format!("entry_{:03}_audio.wav", index));

        debug!(
            entry = index,
            kind = %entry.kind,
            visual = %visual.segment_id,
            audio = %entry.audio_source,
            duration = entry.duration,
            "Normalizing entry"
        );

        let visual_probe = self.probe_source(&visual.segment_id, &visual.path).await?;
        let job = VisualJob {
            source: &visual.path,
            content_type: visual.content_type,
            start_time: visual.start_time,
            duration: entry.duration,
            source_duration: visual.source_duration.or(visual_probe.duration),
            source_dimensions: visual_probe.dimensions(),
            resolution,
            output: &visual_path,
        };
        let args = if visual.content_type == ContentType::Video && !visual_probe.has_video {
            warn!(segment = %visual.segment_id, "No video stream; holding black frames");
            black_hold_args(entry.duration, resolution, &self.settings, &visual_path)
        } else {
            visual_args(&job, &self.settings)
        };
        self.ffmpeg
            .run(&args)
            .await
            .map_err(|err| DomainError::Normalization {
                segment_id: visual.segment_id.clone(),
                path: visual.path.clone(),
                message: err.to_string(),
            })?;
        self.verify_length(&visual.segment_id, &visual_path, entry.duration).await?;

        let audio_probe = if audio.path() == visual.path.as_path() {
            visual_probe
        } else {
            self.probe_source(audio.id(), audio.path()).await?
        };
        let slice = AudioSlice::clamp(audio.start_time(), entry.duration, window, audio_probe.duration);
        let source = if audio_probe.has_audio {
            Some(audio.path())
        } else {
            warn!(segment = audio.id(), "No audio stream; using silence");
            None
        };
        let audio_job = AudioJob {
            source,
            slice,
            sample_rate: self.settings.sample_rate,
            output: &audio_path,
        };
        self.ffmpeg
            .run(&audio_args(&audio_job))
            .await
            .map_err(|err| DomainError::Normalization {
                segment_id: audio.id().to_string(),
                path: audio.path().to_path_buf(),
                message: err.to_string(),
            })?;
        self.verify_length(audio.id(), &audio_path, slice.total).await?;

        Ok(NormalizedEntry {
            order_index: entry.order_index,
            audio_segment_id: audio.id().to_string(),
            visual_segment_id: visual.segment_id.clone(),
            visual_path,
            audio_path,
            duration: entry.duration,
            audio_duration: slice.total,
        })
    }

    async fn probe_source(&self, segment_id: &str, path: &Path) -> Result<MediaProbe, DomainError> {
        if !path.exists() {
            return Err(DomainError::Normalization {
                segment_id: segment_id.to_string(),
                path: path.to_path_buf(),
                message: "source file not found".to_string(),
            });
        }
        self.probe
            .probe(path)
            .await
            .map_err(|err| DomainError::Normalization {
                segment_id: segment_id.to_string(),
                path: path.to_path_buf(),
                message: err.to_string(),
            })
    }

    /// Produced clip must match the expected length within one frame
    async fn verify_length(&self, segment_id: &str, output: &Path, expected: f64) -> Result<(), DomainError> {
        let produced = self.probe.probe(output).await.map_err(|err| DomainError::Normalization {
            segment_id: segment_id.to_string(),
            path: output.to_path_buf(),
            message: format!("cannot read normalized clip: {}", err),
        })?;

        match produced.duration {
            Some(actual) if within_one_frame(expected, actual, self.settings.fps) => Ok(()),
            Some(actual) => Err(DomainError::Normalization {
                segment_id: segment_id.to_string(),
                path: output.to_path_buf(),
                message: format!(
                    "normalized clip is {:.3}s, expected {:.3}s",
                    actual, expected
                ),
            }),
            None => Err(DomainError::Normalization {
                segment_id: segment_id.to_string(),
                path: output.to_path_buf(),
                message: "normalized clip has no duration".to_string(),
            }),
        }
    }
}
