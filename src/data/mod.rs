pub mod parser;
pub mod record;
pub mod source;
pub mod stats;
pub mod value;

// Re-export key types for convenience
pub use parser::{DroppedRow, FieldMapping, ParseOutcome, parse_table};
pub use record::{FieldKind, FieldSource, Record, RecordSet, Schema};
pub use source::RawTable;
pub use stats::Stats;
pub use value::{GroupKey, Timestamp, Value};
