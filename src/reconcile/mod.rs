//! Reconciliation path: scan stored inventory into per-merchant and global
//! GTIN coverage, then fill per-merchant gaps with placeholder records. Runs
//! after ingestion has populated the store; gated by a dry-run flag that
//! defaults to on.

pub mod gaps;
pub mod scan;
