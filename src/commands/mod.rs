pub mod manifest;
pub mod probe;
pub mod run;

// Re-export command functions for convenience
pub use manifest::manifest;
pub use probe::probe;
pub use run::{run, RunParams};
