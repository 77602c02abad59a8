//! Application-wide constants and default values

/// Column naming defaults
pub mod columns {
    /// Timestamp column written by the experiment programs
    pub const DEFAULT_TIMESTAMP: &str = "timestamp";

    /// Categorical column identifying the method under test
    pub const METHOD: &str = "method_name";
}

/// Date/time parsing constants
pub mod datetime {
    /// Formats carrying an explicit UTC offset.
    /// The first one is what `chrono::Local::now().to_string()` produces.
    pub const OFFSET_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f %:z",
        "%Y-%m-%d %H:%M:%S %:z",
        "%Y-%m-%d %H:%M:%S%.f %z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
    ];

    /// Naive date-time formats, interpreted as UTC
    pub const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%d-%m-%Y %H:%M:%S",
        "%b %d, %Y %H:%M:%S",
        "%d %b %Y %H:%M:%S",
    ];

    /// Date-only formats, midnight UTC
    pub const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%b %d, %Y", "%d %b %Y",
    ];

    /// Compact `YYYYMMDD HHMMSS` form
    pub const DATE_FORMAT_LENGTH: usize = 8;
    pub const TIME_FORMAT_LENGTH: usize = 6;

    /// Numeric epochs in this range are read as seconds (2000-01-01 .. 2038-01-19)
    pub const EPOCH_SECONDS_RANGE: (f64, f64) = (946_684_800.0, 2_147_483_647.0);

    /// Numeric epochs in this range are read as milliseconds
    pub const EPOCH_MILLIS_RANGE: (f64, f64) = (946_684_800_000.0, 2_147_483_647_000.0);

    /// Largest magnitude a numeric tick may have (nanoseconds must fit in i64)
    pub const TICK_LIMIT: f64 = 9.2e18;
}

/// Performance and optimization constants
pub mod performance {
    /// Point threshold before applying LTTB downsampling in the viewer
    pub const DOWNSAMPLE_THRESHOLD: usize = 5000;
}

/// UI layout defaults
pub mod layout {
    /// Left panel (chart list) default width
    pub const CHART_LIST_WIDTH: f32 = 220.0;

    /// Bottom panel (summary table) default height
    pub const SUMMARY_PANEL_HEIGHT: f32 = 180.0;

    /// Table row height
    pub const TABLE_ROW_HEIGHT: f32 = 18.0;

    /// Table header row height
    pub const TABLE_HEADER_HEIGHT: f32 = 22.0;
}

/// Configuration file paths
pub mod config {
    /// Configuration file name
    pub const CONFIG_FILE: &str = "runlog-oxide.json";
}
