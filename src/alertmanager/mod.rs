//! Maintenance-window silences in Alertmanager.
pub mod silence;
pub mod window;

pub use silence::{Action, SilenceManager, SilenceOutcome, SilenceRequest};
