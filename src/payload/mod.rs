//! Decoding the histogram column of an interval line.
//!
//! The column holds a base64 (standard alphabet, padded) encoding of a serialized histogram in
//! any format `hdrhistogram::serialization::Deserializer` understands: V2 or V2 + DEFLATE.

use std::io;
use std::time;

use hdrhistogram::serialization::Deserializer;
use hdrhistogram::{Counter, Histogram};

use crate::anchor::millis_as_system_time;
use crate::errors::PayloadError;

/// Decodes encoded histograms.
///
/// Re-use a decoder for all the lines in a log: its buffers are kept between calls.
pub struct PayloadDecoder {
    deserializer: Deserializer,
    decode_buf: Vec<u8>,
    min_bar_for_highest_trackable_value: u64,
}

impl Default for PayloadDecoder {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PayloadDecoder {
    /// Create a decoder.
    ///
    /// Decoded histograms whose highest trackable value is below
    /// `min_bar_for_highest_trackable_value` are widened to track up to that value. Use 0 to keep
    /// histograms exactly as they were serialized.
    pub fn new(min_bar_for_highest_trackable_value: u64) -> PayloadDecoder {
        PayloadDecoder {
            deserializer: Deserializer::new(),
            decode_buf: Vec::new(),
            min_bar_for_highest_trackable_value,
        }
    }

    /// The configured floor for the highest trackable value.
    pub fn min_bar_for_highest_trackable_value(&self) -> u64 {
        self.min_bar_for_highest_trackable_value
    }

    /// Decode one base64-encoded histogram.
    pub fn decode<T: Counter>(&mut self, encoded: &str) -> Result<Histogram<T>, PayloadError> {
        self.decode_buf.clear();
        base64::decode_config_buf(encoded, base64::STANDARD, &mut self.decode_buf)
            .map_err(PayloadError::Base64)?;

        let h: Histogram<T> = self
            .deserializer
            .deserialize(&mut io::Cursor::new(&self.decode_buf))
            .map_err(PayloadError::Histogram)?;

        widen(h, self.min_bar_for_highest_trackable_value)
    }
}

fn widen<T: Counter>(h: Histogram<T>, min_high: u64) -> Result<Histogram<T>, PayloadError> {
    if min_high <= h.high() {
        return Ok(h);
    }

    let mut widened =
        Histogram::new_with_bounds(h.low(), min_high, h.sigfig()).map_err(PayloadError::Widen)?;
    widened.add(&h).map_err(PayloadError::Merge)?;

    Ok(widened)
}

/// A decoded histogram with the time range and tag of its interval.
#[derive(Debug, Clone)]
pub struct IntervalHistogram<T: Counter> {
    histogram: Histogram<T>,
    tag: Option<String>,
    start_timestamp_ms: i64,
    end_timestamp_ms: i64,
}

impl<T: Counter> IntervalHistogram<T> {
    /// Wrap a histogram with interval metadata.
    pub fn new(
        histogram: Histogram<T>,
        tag: Option<String>,
        start_timestamp_ms: i64,
        end_timestamp_ms: i64,
    ) -> IntervalHistogram<T> {
        IntervalHistogram {
            histogram,
            tag,
            start_timestamp_ms,
            end_timestamp_ms,
        }
    }

    /// The decoded histogram.
    pub fn histogram(&self) -> &Histogram<T> {
        &self.histogram
    }

    /// The decoded histogram, mutably.
    pub fn histogram_mut(&mut self) -> &mut Histogram<T> {
        &mut self.histogram
    }

    /// Discard the interval metadata.
    pub fn into_histogram(self) -> Histogram<T> {
        self.histogram
    }

    /// The interval's tag, if any.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Replace the tag.
    pub fn set_tag(&mut self, tag: Option<String>) {
        self.tag = tag;
    }

    /// Start of the interval in milliseconds since the epoch.
    pub fn start_timestamp_ms(&self) -> i64 {
        self.start_timestamp_ms
    }

    /// Replace the start timestamp.
    pub fn set_start_timestamp_ms(&mut self, millis: i64) {
        self.start_timestamp_ms = millis;
    }

    /// End of the interval in milliseconds since the epoch.
    pub fn end_timestamp_ms(&self) -> i64 {
        self.end_timestamp_ms
    }

    /// Replace the end timestamp.
    pub fn set_end_timestamp_ms(&mut self, millis: i64) {
        self.end_timestamp_ms = millis;
    }

    /// Start of the interval.
    pub fn start_time(&self) -> time::SystemTime {
        millis_as_system_time(self.start_timestamp_ms)
    }

    /// End of the interval.
    pub fn end_time(&self) -> time::SystemTime {
        millis_as_system_time(self.end_timestamp_ms)
    }
}
