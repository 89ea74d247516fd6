//! Ingestion path: catalog index → per-location counts → projection →
//! dual-collection merge-upserts, orchestrated merchant by merchant.

pub mod catalog;
pub mod commit;
pub mod inventory;
pub mod orchestrator;
pub mod project;
pub mod record;
