//! Visual assignment per sequencing policy
//!
//! Every strategy answers one question per A-Roll position: which B-Roll (if any)
//! covers it. Entries are then built by walking the A-Roll list once, so each
//! narration segment lands in exactly one entry whatever the policy.

use tracing::debug;

use crate::planner::SequencePolicy;

/// Assign B-Roll pool indices to A-Roll positions.
///
/// Returns one slot per A-Roll segment; `None` keeps the A-Roll picture.
pub fn assign_visuals(policy: &SequencePolicy, a_count: usize, pool_size: usize) -> Vec<Option<usize>> {
    if a_count == 0 {
        return Vec::new();
    }
    if pool_size == 0 {
        debug!("Empty B-Roll pool, every segment keeps its own picture");
        return vec![None; a_count];
    }

    let slots = match policy {
        SequencePolicy::NoOverlap => bookended(a_count, |middle| Some(middle % pool_size)),
        SequencePolicy::Standard { broll_density } => {
            density_spread(a_count, pool_size, *broll_density)
        }
        SequencePolicy::Bookends => bookended(a_count, |middle| {
            if middle < pool_size {
                Some(middle)
            } else {
                None
            }
        }),
        SequencePolicy::Sandwich => bookended(a_count, |middle| {
            if middle % 2 == 0 {
                Some((middle / 2) % pool_size)
            } else {
                None
            }
        }),
        SequencePolicy::BRollHeavy => (0..a_count)
            .map(|i| if i == 0 { None } else { Some((i - 1) % pool_size) })
            .collect(),
        SequencePolicy::BRollFull => (0..a_count).map(|i| Some(i % pool_size)).collect(),
        // Custom lists are passed through; nothing to assign
        SequencePolicy::Custom(_) => vec![None; a_count],
    };

    debug_assert_eq!(slots.len(), a_count);
    slots
}

/// First and last positions keep A-Roll; `middle` decides for the rest by middle index
fn bookended<F>(a_count: usize, middle: F) -> Vec<Option<usize>>
where
    F: Fn(usize) -> Option<usize>,
{
    (0..a_count)
        .map(|i| {
            if i == 0 || i + 1 == a_count {
                None
            } else {
                middle(i - 1)
            }
        })
        .collect()
}

/// Spread a density-derived number of B-Roll overlays evenly over the middle segments
fn density_spread(a_count: usize, pool_size: usize, density: f64) -> Vec<Option<usize>> {
    if a_count <= 2 {
        return vec![None; a_count];
    }

    let middles = a_count - 2;
    let density = density.clamp(0.0, 1.0);
    let count = ((middles as f64 * density).round() as usize)
        .min(pool_size)
        .min(middles);

    let mut slots = vec![None; a_count];
    if count == 0 {
        return slots;
    }

    let chosen: Vec<usize> = if count < middles {
        let step = middles as f64 / count as f64;
        (0..count).map(|k| (k as f64 * step) as usize).collect()
    } else {
        (0..middles).collect()
    };

    for (k, middle) in chosen.into_iter().enumerate() {
        slots[middle + 1] = Some(k % pool_size);
    }
    slots
}
