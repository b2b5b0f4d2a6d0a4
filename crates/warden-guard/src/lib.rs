//! WARDEN Guarded Mutation Pipeline
//!
//! The trusted boundary between the agent and the project filesystem. All
//! file mutations go through this crate:
//!
//! - **Read**: missing files produce a typed placeholder, oversized files
//!   are truncated with an explicit continuation contract.
//! - **Write**: the path policy is consulted first; prior content of an
//!   existing file is captured as a timestamped [`Backup`] before the
//!   overwrite, and the overwrite itself is temp-file + rename so no
//!   partial state is observable within the process.
//!
//! A rejected write is an outcome, not an error: the caller records it as a
//! step failure without crashing.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod backup;
pub mod error;
pub mod pipeline;

pub use backup::Backup;
pub use error::GuardError;
pub use pipeline::{MutationPipeline, SourceRead, WriteOutcome, MAX_READ_CHARS};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
