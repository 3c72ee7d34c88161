// Domain rules - Pure timing, geometry and audio-uniqueness rules

use std::collections::HashMap;

use crate::domain::model::*;

/// Detects repeated use of narration audio in a sequence
pub struct OverlapValidator;

impl OverlapValidator {
    /// Report every entry whose `audio_source` was already used by an earlier entry.
    ///
    /// Does not modify the entries; the first occurrence of an id is never reported.
    pub fn find_overlaps(entries: &[TimelineEntry]) -> Vec<AudioOverlap> {
        let mut first_use: HashMap<&str, usize> = HashMap::new();
        let mut overlaps = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            match first_use.get(entry.audio_source.as_str()) {
                Some(&first_used_index) => overlaps.push(AudioOverlap {
                    entry_index: index,
                    audio_segment_id: entry.audio_source.clone(),
                    first_used_index,
                }),
                None => {
                    first_use.insert(entry.audio_source.as_str(), index);
                }
            }
        }

        overlaps
    }

    /// Convenience wrapper over a whole sequence
    pub fn validate(sequence: &AssemblySequence) -> Vec<AudioOverlap> {
        Self::find_overlaps(&sequence.entries)
    }
}

/// Scale-to-fit plus centered black padding for one source frame size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LetterboxGeometry {
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub pad_x: u32,
    pub pad_y: u32,
}

impl LetterboxGeometry {
    /// Fit `source_width x source_height` inside `target` without cropping.
    ///
    /// Scaled dimensions are rounded down to even values so the padded frame stays
    /// codec friendly, and are never larger than the target.
    pub fn fit(source_width: u32, source_height: u32, target: Resolution) -> Self {
        if source_width == 0 || source_height == 0 {
            return Self {
                scaled_width: target.width,
                scaled_height: target.height,
                pad_x: 0,
                pad_y: 0,
            };
        }

        let scale = f64::min(
            target.width as f64 / source_width as f64,
            target.height as f64 / source_height as f64,
        );
        let scaled_width = even_floor((source_width as f64 * scale).round() as u32)
            .clamp(2, target.width);
        let scaled_height = even_floor((source_height as f64 * scale).round() as u32)
            .clamp(2, target.height);

        Self {
            scaled_width,
            scaled_height,
            pad_x: (target.width - scaled_width) / 2,
            pad_y: (target.height - scaled_height) / 2,
        }
    }

    /// Whether the source already matches the target frame
    pub fn is_identity(&self, target: Resolution) -> bool {
        self.scaled_width == target.width && self.scaled_height == target.height
    }
}

/// Round down to the nearest even number
pub fn even_floor(value: u32) -> u32 {
    value - (value % 2)
}

/// Length of one frame at `fps`, the accepted duration error for a normalized clip
pub fn frame_interval(fps: u32) -> f64 {
    1.0 / fps.max(1) as f64
}

/// Whether `actual` is within one frame of `expected`
pub fn within_one_frame(expected: f64, actual: f64, fps: u32) -> bool {
    // Container timestamps are rounded to milliseconds
    (expected - actual).abs() <= frame_interval(fps) + 1e-3
}

/// How a video source is fitted to an entry duration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationFit {
    /// Source is at least as long as needed; cut at the target duration
    Trim,
    /// Source repeats `extra_loops` more times before the cut
    Loop { extra_loops: u32 },
}

impl DurationFit {
    /// Decide between trimming and looping a source of `source_duration` seconds
    pub fn for_video(source_duration: f64, target_duration: f64) -> Self {
        if source_duration <= 0.0 || source_duration >= target_duration {
            return DurationFit::Trim;
        }
        let copies = (target_duration / source_duration).ceil() as u32;
        DurationFit::Loop {
            extra_loops: copies.saturating_sub(1).max(1),
        }
    }
}

/// Audio window for one entry, widened around its boundaries for crossfading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioWindow {
    /// Seconds of extra audio before the entry start
    pub lead: f64,
    /// Seconds of extra audio after the entry end
    pub tail: f64,
}

impl AudioWindow {
    pub fn total(&self, duration: f64) -> f64 {
        self.lead + duration + self.tail
    }
}

/// Crossfade layout for a whole sequence
#[derive(Debug, Clone, PartialEq)]
pub struct CrossfadePlan {
    /// Effective crossfade length; zero disables crossfading
    pub duration: f64,
    pub windows: Vec<AudioWindow>,
}

impl CrossfadePlan {
    /// Half of the crossfade is borrowed from each side of every interior boundary.
    ///
    /// The requested length is capped at half of the shortest entry, so a window never
    /// swallows more than its entry.
    pub fn new(requested: f64, durations: &[f64]) -> Self {
        let shortest = durations.iter().cloned().fold(f64::INFINITY, f64::min);
        let duration = if durations.len() < 2 || !requested.is_finite() || requested <= 0.0 {
            0.0
        } else {
            requested.min(shortest / 2.0)
        };

        let half = duration / 2.0;
        let last = durations.len().saturating_sub(1);
        let windows = (0..durations.len())
            .map(|index| AudioWindow {
                lead: if index > 0 { half } else { 0.0 },
                tail: if index < last { half } else { 0.0 },
            })
            .collect();

        Self { duration, windows }
    }

    pub fn is_enabled(&self) -> bool {
        self.duration > 0.0
    }

    pub fn window(&self, index: usize) -> AudioWindow {
        self.windows.get(index).copied().unwrap_or(AudioWindow {
            lead: 0.0,
            tail: 0.0,
        })
    }
}

/// Source slice to read and the silence to add around it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSlice {
    /// Seek position in the source file
    pub seek: f64,
    /// Seconds read from the source
    pub read: f64,
    /// Silence inserted before the read audio
    pub pad_before: f64,
    /// Total length of the produced slice
    pub total: f64,
}

impl AudioSlice {
    /// Clamp the widened window `[start - lead, start + duration + tail]` to the source.
    ///
    /// `source_length` is the usable length of the source file when known. Anything
    /// outside the source becomes silence so the slice is always `total` long.
    pub fn clamp(
        start: f64,
        duration: f64,
        window: AudioWindow,
        source_length: Option<f64>,
    ) -> Self {
        let wanted_start = start - window.lead;
        let wanted_end = start + duration + window.tail;
        let total = wanted_end - wanted_start;

        let seek = wanted_start.max(0.0);
        let pad_before = seek - wanted_start;
        let end = match source_length {
            Some(length) if length > 0.0 => wanted_end.min(length),
            _ => wanted_end,
        };
        let read = (end - seek).max(0.0);

        Self {
            seek,
            read,
            pad_before,
            total,
        }
    }
}
