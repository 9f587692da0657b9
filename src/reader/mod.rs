//! Reading timestamped histograms from a log.
//!
//! A `HistogramLogReader` owns the log stream. Each call to `histograms()` (or
//! `legacy_histograms()`) starts a read session: a lazy iterator that picks up wherever the
//! stream currently is, with fresh `StartTime`/`BaseTime` state. Lines are only read, and
//! histograms only decoded, as the iterator is advanced.
//!
//! Dropping the reader drops (and so closes) the stream. Abandoning an iterator part way leaves
//! the stream positioned after the last line it read.

use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::path::Path;
use std::{fs, io, time};

use hdrhistogram::Counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::anchor::{fp_seconds_as_system_time, LogAnchor, TimeWindow, WindowPosition};
use crate::errors::ReadError;
use crate::line::{self, LineKind, LogFormat};
use crate::payload::{IntervalHistogram, PayloadDecoder};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// How a `HistogramLogReader` reads.
///
/// Every field has a default, so with serde this can be deserialized from a partial (or empty)
/// map.
#[derive(Debug, Default, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Grammar used by `HistogramLogReader::histograms()`. Defaults to `LogFormat::Current`.
    pub format: LogFormat,
    /// Decoded histograms with a lower highest trackable value are widened to this. Defaults to 0,
    /// which leaves histograms as they were serialized.
    pub min_bar_for_highest_trackable_value: u64,
    /// Only yield intervals starting within this window. Defaults to all intervals.
    pub window: Option<TimeWindow>,
}

impl ReaderOptions {
    /// Default options.
    pub fn new() -> ReaderOptions {
        ReaderOptions::default()
    }

    /// Set the grammar used by `histograms()`.
    pub fn with_format(&mut self, format: LogFormat) -> &mut Self {
        self.format = format;
        self
    }

    /// Set the floor for decoded histograms' highest trackable value.
    pub fn with_min_bar_for_highest_trackable_value(&mut self, min_high: u64) -> &mut Self {
        self.min_bar_for_highest_trackable_value = min_high;
        self
    }

    /// Only read intervals starting within `window`.
    pub fn with_window(&mut self, window: TimeWindow) -> &mut Self {
        self.window = Some(window);
        self
    }

    /// Build a reader over `input` with these options.
    pub fn reader<R: io::BufRead>(&self, input: R) -> HistogramLogReader<R> {
        HistogramLogReader::with_options(input, *self)
    }
}

/// Reads interval histograms from a log stream.
///
/// ```
/// use hdrhistogram_log::{HistogramLogReader, LogFormat, ReaderOptions};
///
/// let log = "\
///     #[BaseTime: 1500000000.000 (seconds since epoch)]\n\
///     \"StartTimestamp\",\"EndTimestamp\",\"Interval_Max\",\"Interval_Compressed_Histogram\"\n\
///     60.000,60.000,0.000,HISTEwAAAAEAAAAAAAAAAwAAAAAAAAAB//////////8/8AAAAAAAAAA=\n";
///
/// let mut reader = ReaderOptions::new()
///     .with_format(LogFormat::Legacy)
///     .reader(log.as_bytes());
///
/// let intervals = reader
///     .histograms::<u64>()
///     .collect::<Result<Vec<_>, _>>()
///     .unwrap();
///
/// assert_eq!(1, intervals.len());
/// assert_eq!(1_500_000_060_000, intervals[0].start_timestamp_ms());
/// assert_eq!(1_500_000_120_000, intervals[0].end_timestamp_ms());
/// ```
pub struct HistogramLogReader<R> {
    input: R,
    options: ReaderOptions,
    anchor: LogAnchor,
    decoder: PayloadDecoder,
    line_buf: String,
    line_number: usize,
}

impl HistogramLogReader<io::BufReader<fs::File>> {
    /// Open a log file with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = fs::File::open(path)?;
        Ok(HistogramLogReader::new(io::BufReader::new(file)))
    }
}

impl<R> HistogramLogReader<R> {
    /// The options this reader was created with.
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// The start time of the current (or most recent) read session, in seconds since the epoch.
    ///
    /// This is only resolved once a `StartTime` directive or the first interval has been read.
    /// Before that, it is 0.0.
    pub fn start_time_secs(&self) -> f64 {
        self.anchor.start_time_secs()
    }

    /// The base time of the current (or most recent) read session, in seconds since the epoch.
    ///
    /// Like `start_time_secs()`, this is 0.0 until resolved.
    pub fn base_time_secs(&self) -> f64 {
        self.anchor.base_time_secs()
    }

    /// The start time of the current (or most recent) read session.
    ///
    /// Until at least one interval has been read (or a `StartTime` directive seen), this is the
    /// epoch, not the log's eventual start time.
    pub fn start_time(&self) -> time::SystemTime {
        fp_seconds_as_system_time(self.start_time_secs())
    }

    /// Give up the reader, returning the stream positioned after the last line read.
    pub fn into_inner(self) -> R {
        self.input
    }
}

impl<R: io::BufRead> HistogramLogReader<R> {
    /// Create a reader with default options.
    ///
    /// `input` should be positioned at the start of a line. A UTF-8 byte order mark at the very
    /// start is ignored.
    pub fn new(input: R) -> HistogramLogReader<R> {
        HistogramLogReader::with_options(input, ReaderOptions::default())
    }

    /// Create a reader with the provided options.
    pub fn with_options(input: R, options: ReaderOptions) -> HistogramLogReader<R> {
        HistogramLogReader {
            input,
            options,
            anchor: LogAnchor::new(),
            decoder: PayloadDecoder::new(options.min_bar_for_highest_trackable_value),
            line_buf: String::new(),
            line_number: 0,
        }
    }

    /// Start a read session using the configured format (the current format by default).
    pub fn histograms<T: Counter>(&mut self) -> IntervalHistograms<'_, R, T> {
        let format = self.options.format;
        self.histograms_in(format)
    }

    /// Start a read session using the legacy format.
    pub fn legacy_histograms<T: Counter>(&mut self) -> IntervalHistograms<'_, R, T> {
        self.histograms_in(LogFormat::Legacy)
    }

    /// Start a read session using `format`.
    pub fn histograms_in<T: Counter>(&mut self, format: LogFormat) -> IntervalHistograms<'_, R, T> {
        debug!(?format, line_number = self.line_number, "starting read session");
        self.anchor = LogAnchor::new();

        let window = self.options.window;
        IntervalHistograms {
            reader: self,
            format,
            window,
            ended: false,
            _counter: PhantomData,
        }
    }

    /// Read the next line into `line_buf` without its terminator. Returns false at end of stream.
    fn read_line(&mut self) -> io::Result<bool> {
        self.line_buf.clear();
        if self.input.read_line(&mut self.line_buf)? == 0 {
            return Ok(false);
        }

        self.line_number += 1;

        if self.line_number == 1 && self.line_buf.starts_with(BYTE_ORDER_MARK) {
            self.line_buf.replace_range(..BYTE_ORDER_MARK.len_utf8(), "");
        }

        if self.line_buf.ends_with('\n') {
            self.line_buf.pop();
            if self.line_buf.ends_with('\r') {
                self.line_buf.pop();
            }
        }

        Ok(true)
    }

    /// Advance to the next interval to yield. `Ok(None)` means the session is over: either the
    /// stream ended or an interval started after `window`.
    fn next_interval<T: Counter>(
        &mut self,
        format: LogFormat,
        window: Option<TimeWindow>,
    ) -> Result<Option<IntervalHistogram<T>>, ReadError> {
        loop {
            if !self.read_line()? {
                return Ok(None);
            }

            let line_number = self.line_number;
            let line = self.line_buf.as_str();

            match line::classify(line, format) {
                LineKind::Comment => match line::directive(line) {
                    Ok(Some(d)) => self.anchor.apply(d),
                    Ok(None) => trace!(line_number, "skipping comment"),
                    Err(_) => return Err(ReadError::MalformedDirective { line_number }),
                },
                LineKind::Legend => trace!(line_number, "skipping legend"),
                LineKind::Data => {
                    let interval = format
                        .parse_interval(line)
                        .map_err(|_| ReadError::MalformedDataLine { line_number })?;

                    let resolved = self
                        .anchor
                        .resolve(interval.start_timestamp(), interval.interval_length());

                    if let Some(w) = window {
                        match w.position(&resolved) {
                            WindowPosition::Before => continue,
                            WindowPosition::After => {
                                debug!(line_number, "interval starts after window");
                                return Ok(None);
                            }
                            WindowPosition::Inside => {}
                        }
                    }

                    let histogram = self
                        .decoder
                        .decode(interval.encoded_histogram())
                        .map_err(|cause| ReadError::PayloadDecode { line_number, cause })?;

                    return Ok(Some(IntervalHistogram::new(
                        histogram,
                        interval.tag().map(str::to_owned),
                        resolved.start_timestamp_ms(),
                        resolved.end_timestamp_ms(),
                    )));
                }
            }
        }
    }
}

/// One read session over a `HistogramLogReader`.
///
/// Yields decoded histograms in log order. After an error, or once the stream (or time window)
/// is exhausted, it yields `None`.
pub struct IntervalHistograms<'a, R: 'a, T: Counter> {
    reader: &'a mut HistogramLogReader<R>,
    format: LogFormat,
    window: Option<TimeWindow>,
    ended: bool,
    _counter: PhantomData<T>,
}

impl<'a, R: 'a, T: Counter> IntervalHistograms<'a, R, T> {
    /// Only yield intervals starting within `window`, replacing any window from the reader's
    /// options. Intervals before the window are skipped without being decoded; the first interval
    /// after it ends the session.
    pub fn within(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// The grammar this session parses intervals with.
    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// The session's start time in seconds since the epoch, as resolved so far.
    pub fn start_time_secs(&self) -> f64 {
        self.reader.start_time_secs()
    }

    /// The session's start time, as resolved so far.
    pub fn start_time(&self) -> time::SystemTime {
        self.reader.start_time()
    }
}

impl<'a, R: io::BufRead + 'a, T: Counter> Iterator for IntervalHistograms<'a, R, T> {
    type Item = Result<IntervalHistogram<T>, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ended {
            return None;
        }

        match self.reader.next_interval(self.format, self.window) {
            Ok(Some(h)) => Some(Ok(h)),
            Ok(None) => {
                self.ended = true;
                None
            }
            Err(e) => {
                self.ended = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a, R: io::BufRead + 'a, T: Counter> FusedIterator for IntervalHistograms<'a, R, T> {}

#[cfg(test)]
mod tests;
