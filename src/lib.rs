//! RunLog Oxide: ingestion, derivation, aggregation and chart composition for
//! per-tick experiment telemetry logs.
//!
//! ```text
//! RawTable -> parse_table -> RecordSet -> derive -> EnrichedSet
//!          -> summarize -> Summary -> compose -> Chart
//! ```
//!
//! Every stage is a pure function over immutable inputs.
//! [`pipeline::run`] chains them according to an [`ExperimentConfig`].

pub mod aggregate;
pub mod compose;
pub mod config;
pub mod constants;
pub mod data;
pub mod derive;
pub mod error;
pub mod pipeline;
pub mod presets;

pub use config::{ExperimentConfig, SummarySpec};
pub use error::{PipelineError, Result};
pub use pipeline::{Report, run};
