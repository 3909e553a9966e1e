//! Spend Protocol
//!
//! Pure pieces of the spent pool and preview/commit flow: batch id
//! generation and the commit decision against stored preview artifacts.

mod batch;
mod commit;

pub use batch::{new_batch_id, BatchIdGenerator, BATCH_ID_PREFIX};
pub use commit::{decide_commit, latest_active_preview, CommitDecision};
