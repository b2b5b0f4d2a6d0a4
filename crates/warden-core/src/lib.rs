//! WARDEN Core
//!
//! Wires the safety substrate together for the build orchestration layer:
//!
//! - [`StepTracker`]: outcome callbacks for build steps; failed steps fold
//!   a failure observation into the regression engine.
//! - [`IdentitySource`] / [`CachedIdentity`]: the configuration/identity
//!   collaborator behind an explicit TTL cache with a documented lifecycle.
//! - [`Warden`]: the facade exposing guarded reads/writes, the budget
//!   gate, observation folding, and the watcher lifecycle.
//!
//! Planning, prompt construction, the model client, and any command
//! surface live outside this workspace and talk to it through these types.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod identity;
pub mod steps;
pub mod warden;

pub use identity::{CachedIdentity, IdentitySnapshot, IdentitySource};
pub use steps::{StepError, StepId, StepRecord, StepStatus, StepTracker};
pub use warden::{Warden, WardenConfig, WardenError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
