//! Convenience re-exports for consumers of the pipeline.
//!
//! ```
//! use custos_pipeline::prelude::*;
//! ```

pub use crate::error::{PipelineError, PipelineResult};
pub use crate::history::LedgerHistory;
pub use crate::ingest::{BatchFailure, BatchReport, CommitSignal, Ingestor};
pub use crate::pipeline::{DEFAULT_QUEUE_CAPACITY, Pipeline, PipelineHandle};
