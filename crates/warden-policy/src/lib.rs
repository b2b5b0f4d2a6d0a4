//! WARDEN Path Policy
//!
//! Classifies candidate paths as mutable or protected before any write is
//! attempted. Policy is a pure function of the path and two ordered pattern
//! lists (allow, deny) supplied by configuration:
//!
//! - Deny membership is a hard veto: a path on both lists is `Protected`.
//! - A path on neither list is `Unspecified`, which fails closed when the
//!   classification gates a write.
//!
//! No I/O happens here; the matcher abstraction ([`PathPattern`]) keeps the
//! policy unit-testable independent of string-escaping concerns.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod pattern;
pub mod policy;

pub use pattern::{PathPattern, PatternError};
pub use policy::{PathClassification, PathPolicy};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
