//! Reads HdrHistogram interval logs back into decoded, timestamped histograms.
//!
//! Interval logs are how HdrHistogram implementations record a sequence of histograms over time:
//! a load test might write one histogram per second so that latency can later be correlated with
//! whatever else was happening. Each interval line carries a start timestamp, an interval length,
//! a (human-readable) max value, an optional tag, and a base64-encoded serialized histogram. See
//! `hdrhistogram::serialization::interval_log` for the writing side.
//!
//! This crate does the reading: it walks a log line by line, keeps track of the log's
//! `StartTime` and `BaseTime` metadata, decodes each interval's histogram and stamps it with
//! absolute start and end times in milliseconds since the epoch.
//!
//! # Timestamps
//!
//! Interval timestamps in a log are either seconds since the epoch, or seconds since some base
//! time. When a `#[BaseTime: ...]` header is present, timestamps are relative to it. When it is
//! absent, the first interval decides: if its timestamp is more than a year before the log's
//! start time (from `#[StartTime: ...]`, or else the first interval itself), all timestamps are
//! taken to be relative to the start time; otherwise they are absolute. This is the same heuristic
//! the Java `HistogramLogReader` uses. See the `anchor` module.
//!
//! # Formats
//!
//! Two line grammars are supported (see `LogFormat`): the current one, with optional
//! `Tag=<tag>,` prefixes, and the legacy untagged one. Each has its own legend line. Both V2 and
//! V2 + DEFLATE histogram encodings are decoded.
//!
//! # Errors
//!
//! Logs are append-only artifacts, so a line that can't be parsed or decoded means the file is
//! damaged. Any error ends the read session; intervals read before it are unaffected. See
//! `ReadError`.
//!
//! # Examples
//!
//! ```
//! use hdrhistogram_log::HistogramLogReader;
//!
//! let log = "\
//!     #[StartTime: 1700000000.000 (seconds since epoch)]\n\
//!     \"StartTimestamp\",\"Interval_Length\",\"Interval_Max\",\"Interval_Compressed_Histogram\"\n\
//!     Tag=checkout,0.000,1.000,0.000,HISTEwAAAAEAAAAAAAAAAwAAAAAAAAAB//////////8/8AAAAAAAAAA=\n\
//!     1.000,1.000,0.000,HISTEwAAAAEAAAAAAAAAAwAAAAAAAAAB//////////8/8AAAAAAAAAA=\n";
//!
//! let mut reader = HistogramLogReader::new(log.as_bytes());
//!
//! let intervals = reader
//!     .histograms::<u64>()
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//!
//! assert_eq!(2, intervals.len());
//! assert_eq!(Some("checkout"), intervals[0].tag());
//! assert_eq!(1_700_000_000_000, intervals[0].start_timestamp_ms());
//! assert_eq!(1_700_000_002_000, intervals[1].end_timestamp_ms());
//! assert_eq!(0, intervals[1].histogram().len());
//! ```
//!
//! Only decode the intervals in the first minute of a log file:
//!
//! ```no_run
//! use hdrhistogram_log::{HistogramLogReader, TimeWindow};
//!
//! let mut reader = HistogramLogReader::open("latency.hlog").unwrap();
//!
//! for interval in reader
//!     .histograms::<u64>()
//!     .within(TimeWindow::offset_from_start(0.0, 60.0))
//! {
//!     let interval = interval.unwrap();
//!     println!(
//!         "{} {}",
//!         interval.start_timestamp_ms(),
//!         interval.histogram().value_at_quantile(0.99)
//!     );
//! }
//! ```

#![warn(missing_docs, trivial_casts, unused_import_braces)]

pub use hdrhistogram::{Counter, Histogram};

pub mod anchor;
pub mod errors;
pub mod line;
pub mod payload;
pub mod reader;

pub use self::anchor::{LogAnchor, TimeWindow, WindowReference};
pub use self::errors::{PayloadError, ReadError};
pub use self::line::LogFormat;
pub use self::payload::{IntervalHistogram, PayloadDecoder};
pub use self::reader::{HistogramLogReader, IntervalHistograms, ReaderOptions};
