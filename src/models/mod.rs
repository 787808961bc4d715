//! View models served to the dashboard UI.
//!
//! Everything in here is derived state: directory entries are recomputed
//! from the store on every listing, and cluster status is remapped from the
//! admin API on every poll. Nothing is persisted by this service.

pub mod cluster;
pub mod entry;
