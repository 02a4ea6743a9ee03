/// Records handed to the record sink.
pub mod record;
/// Read-only session snapshots.
pub mod snapshot;
/// Validation helpers for content items.
pub mod validation;
