#![deny(missing_docs)]
//! PandaPal AI gate library.
//!
//! Bounded concurrency gate for outbound AI requests: at most a
//! configured number of requests run at once, further callers wait
//! their turn, and a slot is always returned when a request finishes,
//! fails, or is cancelled.
//!
//! Construct one [`RequestGate`] from [`config::Settings`] during
//! process startup and pass it (in an `Arc`) to every caller that
//! issues AI requests:
//!
//! ```no_run
//! use pandapal_gate::config::Settings;
//! use pandapal_gate::RequestGate;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::new()?;
//! let gate = Arc::new(RequestGate::from_settings(&settings)?);
//! # Ok(())
//! # }
//! ```

/// Configuration management.
pub mod config;
/// Admission gate for outbound AI requests.
pub mod gate;

pub use gate::{GateError, RequestGate};
