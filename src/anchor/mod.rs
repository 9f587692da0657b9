//! Turning per-interval log timestamps into absolute time.
//!
//! A log's interval timestamps are either seconds since the epoch or seconds since some base time.
//! The log may say which through its `BaseTime` header; when it doesn't, the first interval
//! decides:
//!
//! 1. Without a `StartTime` header, the first interval's timestamp becomes the start time.
//! 2. Without a `BaseTime` header, intervals are relative to the start time if the first
//! interval's timestamp is more than a year before the start time, and absolute otherwise.
//!
//! Both decisions are made once per read session and never revisited. See `LogAnchor`.

use std::time;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::line::Directive;

/// Seconds in a 365-day year. A first interval timestamp more than this far before the start
/// time marks the log as relative.
pub const RELATIVE_TIMESTAMP_THRESHOLD_SECS: f64 = 365.0 * 24.0 * 3600.0;

/// The start time and base time of one read session.
///
/// Each is latched the first time it is known: directives set (and may later overwrite) them,
/// and the first resolved interval fills in whichever is still missing.
#[derive(Debug, Default, PartialEq, Clone, Copy)]
pub struct LogAnchor {
    start_time: Option<f64>,
    base_time: Option<f64>,
}

impl LogAnchor {
    /// An anchor with neither time known.
    pub fn new() -> LogAnchor {
        LogAnchor::default()
    }

    /// Record a directive. A repeated directive replaces the earlier value.
    pub fn apply(&mut self, directive: Directive) {
        match directive {
            Directive::StartTime(secs) => {
                debug!(start_time_secs = secs, "applying StartTime directive");
                self.start_time = Some(secs);
            }
            Directive::BaseTime(secs) => {
                debug!(base_time_secs = secs, "applying BaseTime directive");
                self.base_time = Some(secs);
            }
        }
    }

    /// Whether the start time has been latched.
    pub fn has_start_time(&self) -> bool {
        self.start_time.is_some()
    }

    /// Whether the base time has been latched.
    pub fn has_base_time(&self) -> bool {
        self.base_time.is_some()
    }

    /// Start time in seconds since the epoch, or `0.0` if it isn't known yet.
    pub fn start_time_secs(&self) -> f64 {
        self.start_time.unwrap_or(0.0)
    }

    /// Base time in seconds since the epoch, or `0.0` if it isn't known yet.
    pub fn base_time_secs(&self) -> f64 {
        self.base_time.unwrap_or(0.0)
    }

    /// Resolve an interval to absolute time, latching any still-unknown anchor times from it.
    ///
    /// `log_timestamp` and `interval_length` are in seconds, as written in the log.
    pub fn resolve(&mut self, log_timestamp: f64, interval_length: f64) -> ResolvedInterval {
        let start_time = *self.start_time.get_or_insert(log_timestamp);

        let base_time = match self.base_time {
            Some(b) => b,
            None => {
                let relative = log_timestamp < start_time - RELATIVE_TIMESTAMP_THRESHOLD_SECS;
                let b = if relative { start_time } else { 0.0 };
                debug!(
                    start_time_secs = start_time,
                    base_time_secs = b,
                    relative,
                    "inferred interval timestamp origin"
                );
                self.base_time = Some(b);
                b
            }
        };

        let absolute_start = log_timestamp + base_time;

        ResolvedInterval {
            absolute_start_secs: absolute_start,
            absolute_end_secs: absolute_start + interval_length,
            offset_start_secs: absolute_start - start_time,
        }
    }
}

/// An interval's position in absolute time.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ResolvedInterval {
    absolute_start_secs: f64,
    absolute_end_secs: f64,
    offset_start_secs: f64,
}

impl ResolvedInterval {
    /// Start in seconds since the epoch.
    pub fn absolute_start_secs(&self) -> f64 {
        self.absolute_start_secs
    }

    /// End in seconds since the epoch.
    pub fn absolute_end_secs(&self) -> f64 {
        self.absolute_end_secs
    }

    /// Start in seconds since the log's start time.
    pub fn offset_start_secs(&self) -> f64 {
        self.offset_start_secs
    }

    /// Start in milliseconds since the epoch, truncated.
    pub fn start_timestamp_ms(&self) -> i64 {
        fp_seconds_as_millis(self.absolute_start_secs)
    }

    /// End in milliseconds since the epoch, truncated.
    pub fn end_timestamp_ms(&self) -> i64 {
        fp_seconds_as_millis(self.absolute_end_secs)
    }
}

/// Which timestamp a `TimeWindow` is compared against.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowReference {
    /// Seconds since the epoch.
    Absolute,
    /// Seconds since the log's start time.
    OffsetFromStart,
}

/// Where an interval's start falls relative to a `TimeWindow`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum WindowPosition {
    /// Starts before the window.
    Before,
    /// Starts within the window (bounds inclusive).
    Inside,
    /// Starts after the window.
    After,
}

/// A range of interval start times, in seconds, to read from a log.
///
/// Intervals are assumed to be ordered by start time, so the first interval after the window
/// ends reading.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive lower bound.
    pub start_secs: f64,
    /// Inclusive upper bound.
    pub end_secs: f64,
    /// What the bounds are measured against.
    pub reference: WindowReference,
}

impl TimeWindow {
    /// A window over seconds since the epoch.
    pub fn absolute(start_secs: f64, end_secs: f64) -> TimeWindow {
        TimeWindow {
            start_secs,
            end_secs,
            reference: WindowReference::Absolute,
        }
    }

    /// A window over seconds since the log's start time.
    pub fn offset_from_start(start_secs: f64, end_secs: f64) -> TimeWindow {
        TimeWindow {
            start_secs,
            end_secs,
            reference: WindowReference::OffsetFromStart,
        }
    }

    /// Locate an interval's start relative to this window.
    pub fn position(&self, interval: &ResolvedInterval) -> WindowPosition {
        let t = match self.reference {
            WindowReference::Absolute => interval.absolute_start_secs(),
            WindowReference::OffsetFromStart => interval.offset_start_secs(),
        };

        if t < self.start_secs {
            WindowPosition::Before
        } else if t > self.end_secs {
            WindowPosition::After
        } else {
            WindowPosition::Inside
        }
    }
}

pub(crate) fn fp_seconds_as_millis(secs: f64) -> i64 {
    (secs * 1000.0) as i64
}

pub(crate) fn fp_seconds_as_system_time(secs: f64) -> time::SystemTime {
    let offset = time::Duration::try_from_secs_f64(secs.abs()).unwrap_or_default();
    let t = if secs.is_sign_negative() {
        time::UNIX_EPOCH.checked_sub(offset)
    } else {
        time::UNIX_EPOCH.checked_add(offset)
    };

    t.unwrap_or(time::UNIX_EPOCH)
}

pub(crate) fn millis_as_system_time(millis: i64) -> time::SystemTime {
    let offset = time::Duration::from_millis(millis.unsigned_abs());
    let t = if millis < 0 {
        time::UNIX_EPOCH.checked_sub(offset)
    } else {
        time::UNIX_EPOCH.checked_add(offset)
    };

    t.unwrap_or(time::UNIX_EPOCH)
}
