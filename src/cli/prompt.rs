//! Interactive confirmation for duplicate audio

use std::io::IsTerminal;
use std::sync::Arc;

use dialoguer::Confirm;
use tracing::warn;

use crate::domain::model::AudioOverlap;
use crate::ports::{OverlapConfirmation, StaticConfirmation};

/// Asks on the terminal before rendering a sequence that repeats narration
pub struct DialoguerConfirmation;

impl OverlapConfirmation for DialoguerConfirmation {
    fn confirm(&self, overlaps: &[AudioOverlap]) -> bool {
        eprintln!("The sequence repeats narration audio:");
        for overlap in overlaps {
            eprintln!("  - {}", overlap);
        }

        match Confirm::new()
            .with_prompt("Render anyway?")
            .default(false)
            .interact()
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Confirmation prompt failed: {}", e);
                false
            }
        }
    }
}

/// `--yes` accepts, a terminal asks, anything else declines
pub fn confirmation_for(assume_yes: bool) -> Arc<dyn OverlapConfirmation> {
    if assume_yes {
        Arc::new(StaticConfirmation(true))
    } else if std::io::stdin().is_terminal() && std::io::stderr().is_terminal() {
        Arc::new(DialoguerConfirmation)
    } else {
        Arc::new(StaticConfirmation(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assume_yes_accepts() {
        assert!(confirmation_for(true).confirm(&[]));
    }
}
