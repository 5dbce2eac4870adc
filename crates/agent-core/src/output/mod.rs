//! Output Generation
//!
//! Writing engine snapshots for offline analysis.

pub mod snapshot;

pub use snapshot::*;
