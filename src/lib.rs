//! gait-flux - Real-time gait classification for armband sensor streams
//!
//! gait-flux turns a stream of timestamped peak/trough samples into motion
//! state changes through a deterministic pipeline: frequency/energy estimation
//! → threshold-band classification → edge detection → command.
//!
//! ## Modules
//!
//! - **Core filter**: `estimator`, `classifier` and the `GaitProcessor` that
//!   chains them, one instance per sensor stream
//! - **Transport**: `wire` message envelope and, with the `server` feature, a
//!   TCP `relay` that fans commands out to every listener

pub mod classifier;
pub mod config;
pub mod error;
pub mod estimator;
pub mod pipeline;
pub mod types;
pub mod wire;

#[cfg(feature = "server")]
pub mod relay;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::{classify, Classifier};
pub use config::{BandThresholds, GaitConfig, Range};
pub use error::GaitError;
pub use estimator::{Estimator, EstimatorState};
pub use pipeline::{replay_samples, GaitProcessor};
pub use types::{Command, Estimate, MotionState, Sample};

#[cfg(feature = "server")]
pub use relay::Relay;

/// Library version
pub const GAIT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "gait-flux";
