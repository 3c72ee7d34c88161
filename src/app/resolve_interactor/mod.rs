// Resolve interactor - Turns manifest entries into validated segments

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::usecases::*;
use crate::ports::*;

/// Segments ready for planning
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProject {
    pub a_roll: Vec<ARollSegment>,
    pub b_roll: Vec<BRollSegment>,
    pub custom_sequence: Option<Vec<TimelineEntry>>,
}

/// Interactor resolving paths through a [`MediaLocator`] and durations through a [`ProbePort`]
pub struct ResolveInteractor {
    locator: Arc<dyn MediaLocator>,
    probe_port: Arc<dyn ProbePort>,
}

impl ResolveInteractor {
    pub fn new(locator: Arc<dyn MediaLocator>, probe_port: Arc<dyn ProbePort>) -> Self {
        Self {
            locator,
            probe_port,
        }
    }

    /// Resolve every segment of the manifest.
    ///
    /// Lookup failures are collected and reported together; other errors stop at the
    /// first offending segment.
    pub async fn resolve(&self, manifest: &ProjectManifest) -> Result<ResolvedProject, DomainError> {
        info!(
            a_roll = manifest.a_roll.len(),
            b_roll = manifest.b_roll.len(),
            "Resolving manifest segments"
        );

        let mut unresolved = Vec::new();
        let mut a_roll = Vec::with_capacity(manifest.a_roll.len());
        for spec in &manifest.a_roll {
            match self.resolve_aroll(spec).await {
                Ok(segment) => a_roll.push(segment),
                Err(DomainError::UnresolvedReferences(refs)) => unresolved.extend(refs),
                Err(other) => return Err(other),
            }
        }

        let mut b_roll = Vec::with_capacity(manifest.b_roll.len());
        for spec in &manifest.b_roll {
            match self.resolve_broll(spec).await {
                Ok(segment) => b_roll.push(segment),
                Err(DomainError::UnresolvedReferences(refs)) => unresolved.extend(refs),
                Err(other) => return Err(other),
            }
        }

        if !unresolved.is_empty() {
            return Err(DomainError::UnresolvedReferences(unresolved));
        }

        Ok(ResolvedProject {
            a_roll,
            b_roll,
            custom_sequence: manifest.custom_sequence.clone(),
        })
    }

    async fn locate(
        &self,
        id: &str,
        path: Option<&std::path::Path>,
        role: SegmentRole,
    ) -> Result<LocatedMedia, DomainError> {
        match path {
            Some(path) => Ok(LocatedMedia {
                path: path.to_path_buf(),
                duration: None,
            }),
            None => self.locator.resolve(id, role).await,
        }
    }

    async fn resolve_aroll(&self, spec: &ARollSpec) -> Result<ARollSegment, DomainError> {
        let located = self.locate(&spec.id, spec.path.as_deref(), SegmentRole::ARoll).await?;

        let duration = if spec.end_time > spec.start_time {
            spec.end_time - spec.start_time
        } else if let Some(duration) = spec.duration.or(located.duration) {
            duration
        } else {
            let probe = self.probe_port.probe(&located.path).await?;
            let total = probe.duration.ok_or_else(|| DomainError::InvalidSegment {
                segment_id: spec.id.clone(),
                message: format!("duration of {} is unknown", located.path.display()),
            })?;
            total - spec.start_time
        };

        debug!(segment = %spec.id, path = %located.path.display(), duration, "Resolved A-Roll");
        ARollSegment::new(
            spec.id.clone(),
            located.path,
            spec.start_time,
            spec.end_time,
            duration,
        )
    }

    async fn resolve_broll(&self, spec: &BRollSpec) -> Result<BRollSegment, DomainError> {
        let located = self.locate(&spec.id, spec.path.as_deref(), SegmentRole::BRoll).await?;

        let content_type = match spec.content_type {
            Some(content_type) => content_type,
            None => ContentType::from_path(&located.path).ok_or_else(|| DomainError::InvalidSegment {
                segment_id: spec.id.clone(),
                message: format!("cannot tell the content type of {}", located.path.display()),
            })?,
        };

        let segment = BRollSegment::new(spec.id.clone(), located.path.clone(), content_type)?;
        debug!(segment = %spec.id, path = %located.path.display(), %content_type, "Resolved B-Roll");
        match spec.explicit_duration.or(located.duration) {
            Some(duration) => segment.with_explicit_duration(duration),
            None => Ok(segment),
        }
    }
}
