//! Narration Bounded Context
//!
//! Status summaries and the dedup record that rate-limits them.

pub mod narrator_state;
pub mod status_summary;

pub use narrator_state::{NarratorPolicy, NarratorRecord};
pub use status_summary::{Invalidation, StatusSummary};
