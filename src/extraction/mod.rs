//! Untrusted vision-model rows in, canonical [`ExtractionRecord`]s out.
//!
//! This module provides:
//! - Row validation and repair (`normalize`)
//! - Team inference from player names (`identity`)

pub mod identity;
pub mod normalize;
pub mod record;

pub use identity::resolve_teams;
pub use normalize::{normalize, NormalizeOptions};
pub use record::{ExtractionRecord, RecordOrigin};
