//! Render backends joining normalized entries into one file
//!
//! The filter-graph backend does the whole join in a single ffmpeg run. The
//! concat-demuxer backend stream-copies the video and crossfades audio pairwise; it
//! is slower on audio but avoids the large filter graph and serves as the fallback.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::errors::DomainError;
use crate::engine::{base_args, EncodingSettings};
use crate::error::ReelsmithError;
use crate::ports::{FfmpegPort, NormalizedEntry, RenderJob, RenderPort};
use crate::utils::time::ffmpeg_seconds;

/// Filter graph joining `count` entries whose inputs are ordered visual, audio, visual, ...
pub fn build_filter_graph(count: usize, crossfade: f64) -> String {
    let video_inputs: String = (0..count).map(|i| format!("[{}:v]", 2 * i)).collect();
    let video = format!("{}concat=n={}:v=1:a=0[vout]", video_inputs, count);

    let audio = if crossfade > 0.0 && count > 1 {
        let mut links = Vec::with_capacity(count - 1);
        let mut previous = "[1:a]".to_string();
        for i in 1..count {
            let label = if i == count - 1 {
                "[aout]".to_string()
            } else {
                format!("[ax{}]", i)
            };
            links.push(format!(
                "{}[{}:a]acrossfade=d={}:c1=tri:c2=tri{}",
                previous,
                2 * i + 1,
                ffmpeg_seconds(crossfade),
                label
            ));
            previous = label;
        }
        links.join(";")
    } else {
        let audio_inputs: String = (0..count).map(|i| format!("[{}:a]", 2 * i + 1)).collect();
        format!("{}concat=n={}:v=0:a=1[aout]", audio_inputs, count)
    };

    format!("{};{}", video, audio)
}

/// Concat demuxer list file body
pub fn concat_list<'a, I>(paths: I) -> String
where
    I: IntoIterator<Item = &'a Path>,
{
    paths
        .into_iter()
        .map(|path| {
            let escaped = path.to_string_lossy().replace('\'', "'\\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

/// Map a tool failure to the entry whose file appears in its error output
fn attribute_failure(backend: &str, err: ReelsmithError, entries: &[NormalizedEntry]) -> DomainError {
    let culprit = err.stderr().iter().find_map(|line| {
        entries.iter().find_map(|entry| {
            if line.contains(entry.visual_path.to_string_lossy().as_ref()) {
                Some((entry.visual_segment_id.clone(), entry.visual_path.clone()))
            } else if line.contains(entry.audio_path.to_string_lossy().as_ref()) {
                Some((entry.audio_segment_id.clone(), entry.audio_path.clone()))
            } else {
                None
            }
        })
    });

    DomainError::Render {
        backend: backend.to_string(),
        segment_id: culprit.as_ref().map(|(id, _)| id.clone()),
        path: culprit.map(|(_, path)| path),
        message: err.to_string(),
    }
}

/// Every normalized file must exist before a backend starts
fn check_inputs(backend: &str, job: &RenderJob) -> Result<(), DomainError> {
    if job.entries.is_empty() {
        return Err(DomainError::Render {
            backend: backend.to_string(),
            segment_id: None,
            path: None,
            message: "nothing to render".to_string(),
        });
    }
    for entry in &job.entries {
        for (segment_id, path) in [
            (&entry.visual_segment_id, &entry.visual_path),
            (&entry.audio_segment_id, &entry.audio_path),
        ] {
            if !path.exists() {
                return Err(DomainError::Render {
                    backend: backend.to_string(),
                    segment_id: Some(segment_id.clone()),
                    path: Some(path.clone()),
                    message: "normalized clip is missing".to_string(),
                });
            }
        }
    }
    Ok(())
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Single-pass backend using one filter graph
pub struct FilterGraphRenderer {
    ffmpeg: Arc<dyn FfmpegPort>,
    settings: EncodingSettings,
}

impl FilterGraphRenderer {
    pub const NAME: &'static str = "filter-graph";

    pub fn new(ffmpeg: Arc<dyn FfmpegPort>, settings: EncodingSettings) -> Self {
        Self { ffmpeg, settings }
    }

    pub fn build_args(&self, job: &RenderJob, output: &Path) -> Vec<String> {
        let mut args = base_args();
        for entry in &job.entries {
            args.extend(["-i".to_string(), path_arg(&entry.visual_path)]);
            args.extend(["-i".to_string(), path_arg(&entry.audio_path)]);
        }
        args.extend([
            "-filter_complex".to_string(),
            build_filter_graph(job.entries.len(), job.crossfade),
            "-map".to_string(),
            "[vout]".to_string(),
            "-map".to_string(),
            "[aout]".to_string(),
        ]);
        args.extend(self.settings.video_args());
        args.extend(self.settings.audio_args());
        args.extend([
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-t".to_string(),
            ffmpeg_seconds(job.total_duration()),
            path_arg(output),
        ]);
        args
    }
}

#[async_trait]
impl RenderPort for FilterGraphRenderer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn render(&self, job: &RenderJob, output: &Path) -> Result<(), DomainError> {
        check_inputs(Self::NAME, job)?;
        info!(
            backend = Self::NAME,
            entries = job.entries.len(),
            crossfade = job.crossfade,
            output = %output.display(),
            "Rendering timeline"
        );

        self.ffmpeg
            .run(&self.build_args(job, output))
            .await
            .map_err(|err| attribute_failure(Self::NAME, err, &job.entries))
    }
}

/// Fallback backend: concat demuxer for video, pairwise audio crossfades, then a mux
pub struct ConcatDemuxRenderer {
    ffmpeg: Arc<dyn FfmpegPort>,
    settings: EncodingSettings,
}

impl ConcatDemuxRenderer {
    pub const NAME: &'static str = "concat-demuxer";

    pub fn new(ffmpeg: Arc<dyn FfmpegPort>, settings: EncodingSettings) -> Self {
        Self { ffmpeg, settings }
    }

    async fn write_list(&self, path: &Path, body: String) -> Result<(), DomainError> {
        tokio::fs::write(path, body).await.map_err(|err| DomainError::Render {
            backend: Self::NAME.to_string(),
            segment_id: None,
            path: Some(path.to_path_buf()),
            message: format!("cannot write concat list: {}", err),
        })
    }

    async fn run(&self, args: Vec<String>, entries: &[NormalizedEntry]) -> Result<(), DomainError> {
        self.ffmpeg
            .run(&args)
            .await
            .map_err(|err| attribute_failure(Self::NAME, err, entries))
    }

    /// Join the video clips without re-encoding
    async fn join_video(&self, job: &RenderJob, dir: &Path) -> Result<PathBuf, DomainError> {
        let list = dir.join("video_list.txt");
        self.write_list(&list, concat_list(job.entries.iter().map(|e| e.visual_path.as_path())))
            .await?;

        let output = dir.join("video_joined.mp4");
        let mut args = base_args();
        args.extend([
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            path_arg(&list),
            "-c".to_string(),
            "copy".to_string(),
            "-an".to_string(),
            path_arg(&output),
        ]);
        self.run(args, &job.entries).await?;
        Ok(output)
    }

    /// Join the audio slices, crossfading each boundary in turn
    async fn join_audio(&self, job: &RenderJob, dir: &Path) -> Result<PathBuf, DomainError> {
        let output = dir.join("audio_joined.wav");

        if job.crossfade <= 0.0 || job.entries.len() < 2 {
            let list = dir.join("audio_list.txt");
            self.write_list(&list, concat_list(job.entries.iter().map(|e| e.audio_path.as_path())))
                .await?;
            let mut args = base_args();
            args.extend([
                "-f".to_string(),
                "concat".to_string(),
                "-safe".to_string(),
                "0".to_string(),
                "-i".to_string(),
                path_arg(&list),
                "-c:a".to_string(),
                "pcm_s16le".to_string(),
                path_arg(&output),
            ]);
            self.run(args, &job.entries).await?;
            return Ok(output);
        }

        let mut accumulated = job.entries[0].audio_path.clone();
        let last = job.entries.len() - 1;
        for (i, entry) in job.entries.iter().enumerate().skip(1) {
            let step_output = if i == last {
                output.clone()
            } else {
                dir.join(format!("audio_xfade_{:03}.wav", i))
            };
            debug!(step = i, "Crossfading audio boundary");

            let mut args = base_args();
            args.extend([
                "-i".to_string(),
                path_arg(&accumulated),
                "-i".to_string(),
                path_arg(&entry.audio_path),
                "-filter_complex".to_string(),
                format!(
                    "[0:a][1:a]acrossfade=d={}:c1=tri:c2=tri[a]",
                    ffmpeg_seconds(job.crossfade)
                ),
                "-map".to_string(),
                "[a]".to_string(),
                "-c:a".to_string(),
                "pcm_s16le".to_string(),
                path_arg(&step_output),
            ]);
            self.run(args, &job.entries).await?;
            accumulated = step_output;
        }

        Ok(accumulated)
    }
}

#[async_trait]
impl RenderPort for ConcatDemuxRenderer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn render(&self, job: &RenderJob, output: &Path) -> Result<(), DomainError> {
        check_inputs(Self::NAME, job)?;
        info!(
            backend = Self::NAME,
            entries = job.entries.len(),
            crossfade = job.crossfade,
            output = %output.display(),
            "Rendering timeline"
        );

        let dir = job.work_dir.join(Self::NAME);
        tokio::fs::create_dir_all(&dir).await.map_err(|err| DomainError::Render {
            backend: Self::NAME.to_string(),
            segment_id: None,
            path: Some(dir.clone()),
            message: format!("cannot create scratch directory: {}", err),
        })?;

        let video = self.join_video(job, &dir).await?;
        let audio = self.join_audio(job, &dir).await?;

        let mut args = base_args();
        args.extend([
            "-i".to_string(),
            path_arg(&video),
            "-i".to_string(),
            path_arg(&audio),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
        ]);
        args.extend(self.settings.audio_args());
        args.extend([
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-t".to_string(),
            ffmpeg_seconds(job.total_duration()),
            path_arg(output),
        ]);
        self.run(args, &job.entries).await
    }
}
