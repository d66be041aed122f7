//! Vector index over the ETF knowledge corpus plus the update ledger that
//! drives idempotent incremental refresh.

mod ledger;
mod service;
mod store;
mod types;

pub use ledger::UpdateLedger;
pub use service::IndexService;
pub use store::VectorIndex;
pub use types::{Chunk, ChunkMetadata, RiskLevel, SearchHit, VectorRecord};
