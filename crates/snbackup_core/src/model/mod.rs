//! Note data model shared by the remote client, the cache and the exporter.
//!
//! # Responsibility
//! - Mirror the Simplenote api2 note shape closely enough to round-trip it.
//! - Carry index snapshots between the remote layer and the reconciler.
//!
//! # Invariants
//! - Every note is identified by its service-assigned `key`.
//! - `syncnum` is the only change signal used by the reconciler.

pub mod note;
