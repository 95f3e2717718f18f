//! Platform backends.

pub mod simulated;

pub use simulated::{AuthPrompt, BackendCall, CallRecord, SimulatedPlatform};
