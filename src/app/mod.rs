// Application layer - Use case interactors

pub mod assemble_interactor;
pub mod container;
pub mod resolve_interactor;
pub mod validate_interactor;

// Re-export interactors
pub use assemble_interactor::{AssemblyOrchestrator, AssemblyState};
pub use resolve_interactor::{ResolveInteractor, ResolvedProject};
pub use validate_interactor::{ValidateInteractor, ValidationReport};
