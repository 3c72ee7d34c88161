//! Sequence planning: turns A-Roll and B-Roll segments into an ordered timeline

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, info};

use crate::domain::errors::{DomainError, UnresolvedReference};
use crate::domain::model::*;

pub mod strategy;

/// Default share of middle segments that get B-Roll under the standard policy
pub const DEFAULT_BROLL_DENSITY: f64 = 0.25;

/// Sequencing policy
#[derive(Debug, Clone, PartialEq)]
pub enum SequencePolicy {
    /// Bookend with A-Roll, cycle B-Roll over every middle segment
    NoOverlap,
    /// Bookend with A-Roll, overlay a share of the middle segments
    Standard { broll_density: f64 },
    /// Bookend with A-Roll, each B-Roll used at most once
    Bookends,
    /// Bookend with A-Roll, alternate B-Roll and A-Roll in the middle
    Sandwich,
    /// Open on A-Roll, B-Roll everywhere after
    BRollHeavy,
    /// B-Roll over every segment
    BRollFull,
    /// Caller-supplied entries, validated and passed through
    Custom(Vec<TimelineEntry>),
}

impl Default for SequencePolicy {
    fn default() -> Self {
        SequencePolicy::NoOverlap
    }
}

impl SequencePolicy {
    /// Parse a named policy. `custom` needs an entry list and cannot be parsed from a name.
    pub fn parse(name: &str, broll_density: f64) -> Result<Self, DomainError> {
        let normalized = name.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "no-overlap" | "nooverlap" => Ok(SequencePolicy::NoOverlap),
            "standard" => Ok(SequencePolicy::Standard { broll_density }),
            "bookends" => Ok(SequencePolicy::Bookends),
            "sandwich" => Ok(SequencePolicy::Sandwich),
            "broll-heavy" | "brollheavy" => Ok(SequencePolicy::BRollHeavy),
            "broll-full" | "brollfull" => Ok(SequencePolicy::BRollFull),
            "custom" => Err(DomainError::BadArgs(
                "The custom policy needs an entry list (custom_sequence in the manifest)"
                    .to_string(),
            )),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid policy: {}. Valid policies: no-overlap, standard, bookends, sandwich, broll-heavy, broll-full, custom",
                name
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SequencePolicy::NoOverlap => "no-overlap",
            SequencePolicy::Standard { .. } => "standard",
            SequencePolicy::Bookends => "bookends",
            SequencePolicy::Sandwich => "sandwich",
            SequencePolicy::BRollHeavy => "broll-heavy",
            SequencePolicy::BRollFull => "broll-full",
            SequencePolicy::Custom(_) => "custom",
        }
    }
}

impl fmt::Display for SequencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Builds assembly sequences
#[derive(Debug, Clone)]
pub struct SequencePlanner {
    target_resolution: Resolution,
    crossfade_duration: f64,
}

impl Default for SequencePlanner {
    fn default() -> Self {
        Self::new(Resolution::default(), DEFAULT_CROSSFADE)
    }
}

impl SequencePlanner {
    pub fn new(target_resolution: Resolution, crossfade_duration: f64) -> Self {
        Self {
            target_resolution,
            crossfade_duration: crossfade_duration.max(0.0),
        }
    }

    /// Plan a sequence for the given segments and policy
    pub fn plan(
        &self,
        a_roll: &[ARollSegment],
        b_roll: &[BRollSegment],
        policy: &SequencePolicy,
    ) -> Result<AssemblySequence, DomainError> {
        info!(
            policy = policy.name(),
            a_roll = a_roll.len(),
            b_roll = b_roll.len(),
            "Planning assembly sequence"
        );

        if a_roll.is_empty() {
            return Err(DomainError::EmptyInput {
                input: "A-Roll segments".to_string(),
            });
        }
        Self::check_unique_ids(a_roll)?;

        let entries = match policy {
            SequencePolicy::Custom(entries) => Self::validate_custom(entries, a_roll, b_roll)?,
            _ => Self::build_entries(a_roll, b_roll, policy),
        };

        let sequence = AssemblySequence::new(
            entries,
            self.target_resolution,
            self.crossfade_duration,
            a_roll.to_vec(),
        );

        info!(
            entries = sequence.len(),
            total_duration = sequence.total_duration(),
            "Sequence planned"
        );
        Ok(sequence)
    }

    fn check_unique_ids(a_roll: &[ARollSegment]) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for segment in a_roll {
            if !seen.insert(segment.id()) {
                return Err(DomainError::InvalidSegment {
                    segment_id: segment.id().to_string(),
                    message: "appears more than once in the A-Roll list".to_string(),
                });
            }
        }
        Ok(())
    }

    /// One entry per A-Roll segment, in script order
    fn build_entries(
        a_roll: &[ARollSegment],
        b_roll: &[BRollSegment],
        policy: &SequencePolicy,
    ) -> Vec<TimelineEntry> {
        let slots = strategy::assign_visuals(policy, a_roll.len(), b_roll.len());
        let mut used: HashSet<&str> = HashSet::with_capacity(a_roll.len());
        let mut entries = Vec::with_capacity(a_roll.len());

        for (index, (segment, slot)) in a_roll.iter().zip(slots).enumerate() {
            let inserted = used.insert(segment.id());
            debug_assert!(inserted, "A-Roll id {} planned twice", segment.id());

            let entry = match slot.and_then(|i| b_roll.get(i)) {
                Some(broll) => {
                    debug!(segment = segment.id(), broll = broll.id(), "B-Roll overlay");
                    TimelineEntry::broll_with_aroll_audio(index, segment, broll)
                }
                None => {
                    debug!(segment = segment.id(), "A-Roll full");
                    TimelineEntry::aroll_full(index, segment)
                }
            };
            entries.push(entry);
        }

        entries
    }

    /// Check every id a custom list refers to; the list itself is returned unchanged
    fn validate_custom(
        entries: &[TimelineEntry],
        a_roll: &[ARollSegment],
        b_roll: &[BRollSegment],
    ) -> Result<Vec<TimelineEntry>, DomainError> {
        if entries.is_empty() {
            return Err(DomainError::EmptyInput {
                input: "custom sequence entries".to_string(),
            });
        }

        let a_ids: HashSet<&str> = a_roll.iter().map(|s| s.id()).collect();
        let b_ids: HashSet<&str> = b_roll.iter().map(|s| s.id()).collect();
        let mut unresolved = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            if !entry.duration.is_finite() || entry.duration <= 0.0 {
                return Err(DomainError::InvalidSegment {
                    segment_id: entry.audio_source.clone(),
                    message: format!("custom entry {} has non-positive duration", index),
                });
            }

            if !a_ids.contains(entry.audio_source.as_str()) {
                unresolved.push(UnresolvedReference {
                    entry_index: Some(index),
                    segment_id: entry.audio_source.clone(),
                    reason: "is not a known A-Roll segment".to_string(),
                });
            }

            let visual_id = entry.visual_source.segment_id.as_str();
            let visual_known = match entry.kind {
                EntryKind::ArollFull => a_ids.contains(visual_id),
                EntryKind::BrollWithArollAudio => b_ids.contains(visual_id),
            };
            if !visual_known {
                let expected = match entry.kind {
                    EntryKind::ArollFull => "A-Roll",
                    EntryKind::BrollWithArollAudio => "B-Roll",
                };
                unresolved.push(UnresolvedReference {
                    entry_index: Some(index),
                    segment_id: visual_id.to_string(),
                    reason: format!("is not a known {} segment", expected),
                });
            }
        }

        if unresolved.is_empty() {
            Ok(entries.to_vec())
        } else {
            Err(DomainError::UnresolvedReferences(unresolved))
        }
    }
}

#[cfg(test)]
mod tests;
