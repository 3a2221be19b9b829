//! Override policy module.
//!
//! Decides, from a parsed relay option alone, whether the address a lease
//! would receive should be replaced.

mod override_policy;

pub use override_policy::{OverridePolicy, OverrideRule};
