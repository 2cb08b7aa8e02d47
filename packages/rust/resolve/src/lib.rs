//! Bundle resolution orchestration for bundlescout.
//!
//! Ties fetching and extraction together into the end-to-end
//! `resolve_bundles` flow: subject page scan, bounded concurrent detail
//! fetches, and incremental reporting to a pluggable observer.

pub mod limit;
pub mod pipeline;
pub mod report;
