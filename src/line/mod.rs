//! Line-level recognition of interval logs.
//!
//! Every line of a log is one of three things (see `LineKind`):
//!
//! - a comment, starting with `#`. Two comment shapes carry metadata: `#[StartTime: ...` and
//! `#[BaseTime: ...`. See `directive`. All other comments are ignored.
//! - a legend naming the columns. The legend is format-specific: the current format uses
//! `LEGEND`, the legacy format uses `LEGACY_LEGEND`. Legends are matched exactly.
//! - an interval, i.e. anything else. Intervals are parsed with the grammar of the active
//! `LogFormat`.
//!
//! All numbers are parsed with `str::parse::<f64>`, so `.` is the only decimal separator
//! regardless of the host's locale.

use std::str::FromStr;
use std::{error, fmt};

use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while_m_n};
use nom::character::complete::{char, digit0, digit1};
use nom::combinator::{map_res, opt, recognize, rest};
use nom::sequence::{pair, tuple};
use nom::IResult;
use serde::{Deserialize, Serialize};

/// Column legend written by current-format log writers.
pub const LEGEND: &str =
    "\"StartTimestamp\",\"Interval_Length\",\"Interval_Max\",\"Interval_Compressed_Histogram\"";

/// Column legend written by legacy-format log writers.
pub const LEGACY_LEGEND: &str =
    "\"StartTimestamp\",\"EndTimestamp\",\"Interval_Max\",\"Interval_Compressed_Histogram\"";

const START_TIME_PREFIX: &str = "#[StartTime: ";
const BASE_TIME_PREFIX: &str = "#[BaseTime: ";
const TAG_PREFIX: &str = "Tag=";

/// The line grammar used for interval lines.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `[Tag=<tag>,]<start>,<interval length>,<max>,<histogram>`
    Current,
    /// `<start>,<interval length>,<max>,<histogram>`, never tagged.
    ///
    /// The second column was historically labelled `EndTimestamp`, but it holds the interval
    /// length just like the current format does.
    Legacy,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Current
    }
}

impl LogFormat {
    /// The legend line for this format.
    pub fn legend(self) -> &'static str {
        match self {
            LogFormat::Current => LEGEND,
            LogFormat::Legacy => LEGACY_LEGEND,
        }
    }

    /// Parse an interval line with this format's grammar.
    ///
    /// `line` must not include the line terminator. The histogram field runs to the end of the
    /// line and is not inspected here.
    pub fn parse_interval(self, line: &str) -> Result<IntervalLine<'_>, MalformedLine> {
        let parsed = match self {
            LogFormat::Current => current_interval(line),
            LogFormat::Legacy => legacy_interval(line),
        };

        parsed.map(|(_, l)| l).map_err(|_| MalformedLine)
    }
}

/// What a single log line is.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LineKind {
    /// Starts with `#`. May be a directive; see `directive`.
    Comment,
    /// Exactly the legend of the active format.
    Legend,
    /// Anything else; must parse as an interval.
    Data,
}

/// Classify a line (without its terminator) for the given format.
pub fn classify(line: &str, format: LogFormat) -> LineKind {
    if line.starts_with('#') {
        LineKind::Comment
    } else if line == format.legend() {
        LineKind::Legend
    } else {
        LineKind::Data
    }
}

/// Metadata carried by a comment line.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Directive {
    /// `#[StartTime: <seconds since epoch> ...`
    StartTime(f64),
    /// `#[BaseTime: <seconds since epoch> ...`
    BaseTime(f64),
}

/// A comment line started like a directive but its value could not be parsed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MalformedDirective;

impl fmt::Display for MalformedDirective {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Directive value is not seconds with 1 to 3 decimal places")
    }
}

impl error::Error for MalformedDirective {}

/// An interval line did not match the grammar of the active format.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MalformedLine;

impl fmt::Display for MalformedLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Line does not match the interval grammar")
    }
}

impl error::Error for MalformedLine {}

/// Extract the directive from a comment line, if it has one.
///
/// Lines that don't start with a directive prefix yield `Ok(None)`. Lines that do must continue
/// with a number of seconds having between 1 and 3 decimal places, followed by a space.
pub fn directive(line: &str) -> Result<Option<Directive>, MalformedDirective> {
    let parsed = if line.starts_with(START_TIME_PREFIX) {
        start_time(line)
    } else if line.starts_with(BASE_TIME_PREFIX) {
        base_time(line)
    } else {
        return Ok(None);
    };

    parsed.map(|(_, d)| Some(d)).map_err(|_| MalformedDirective)
}

/// One parsed interval line. Timestamps are still as written in the log: whether they are
/// absolute or relative to some base time is decided later by a `LogAnchor`.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct IntervalLine<'a> {
    tag: Option<&'a str>,
    start_timestamp: f64,
    interval_length: f64,
    max_value: f64,
    encoded_histogram: &'a str,
}

impl<'a> IntervalLine<'a> {
    /// The tag, if a non-blank one was present.
    pub fn tag(&self) -> Option<&'a str> {
        self.tag
    }

    /// Start of the interval in seconds, absolute or relative.
    pub fn start_timestamp(&self) -> f64 {
        self.start_timestamp
    }

    /// Length of the interval in seconds.
    pub fn interval_length(&self) -> f64 {
        self.interval_length
    }

    /// Max value column. This is for human readers only and may be scaled by the writer; the
    /// decoded histogram has the real max.
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    /// The textual (base64) histogram.
    pub fn encoded_histogram(&self) -> &'a str {
        self.encoded_histogram
    }
}

fn start_time(input: &str) -> IResult<&str, Directive> {
    let (input, _) = tag(START_TIME_PREFIX)(input)?;
    let (input, seconds) = fract_seconds(input)?;
    let (input, _) = char(' ')(input)?;
    Ok((input, Directive::StartTime(seconds)))
}

fn base_time(input: &str) -> IResult<&str, Directive> {
    let (input, _) = tag(BASE_TIME_PREFIX)(input)?;
    let (input, seconds) = fract_seconds(input)?;
    let (input, _) = char(' ')(input)?;
    Ok((input, Directive::BaseTime(seconds)))
}

/// `\d*\.\d{1,3}`
fn fract_seconds(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((
            digit0,
            char('.'),
            take_while_m_n(1, 3, |c: char| c.is_ascii_digit()),
        ))),
        f64::from_str,
    )(input)
}

/// `\d+(\.\d*)?` or `\.\d+`
fn decimal(input: &str) -> IResult<&str, f64> {
    map_res(
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
        f64::from_str,
    )(input)
}

fn tag_field(input: &str) -> IResult<&str, Option<&str>> {
    let (input, _) = tag(TAG_PREFIX)(input)?;
    let (input, tag) = take_until(",")(input)?;
    let (input, _) = char(',')(input)?;

    // a blank tag is the same as no tag
    if tag.trim().is_empty() {
        Ok((input, None))
    } else {
        Ok((input, Some(tag)))
    }
}

fn interval_fields(input: &str) -> IResult<&str, (f64, f64, f64, &str)> {
    let (input, start_timestamp) = decimal(input)?;
    let (input, _) = char(',')(input)?;
    let (input, interval_length) = decimal(input)?;
    let (input, _) = char(',')(input)?;
    let (input, max_value) = decimal(input)?;
    let (input, _) = char(',')(input)?;
    // the histogram is everything up to the end of the line
    let (input, encoded_histogram) = rest(input)?;
    Ok((
        input,
        (start_timestamp, interval_length, max_value, encoded_histogram),
    ))
}

fn current_interval(input: &str) -> IResult<&str, IntervalLine<'_>> {
    let (input, tag) = opt(tag_field)(input)?;
    let (input, (start_timestamp, interval_length, max_value, encoded_histogram)) =
        interval_fields(input)?;

    Ok((
        input,
        IntervalLine {
            tag: tag.flatten(),
            start_timestamp,
            interval_length,
            max_value,
            encoded_histogram,
        },
    ))
}

fn legacy_interval(input: &str) -> IResult<&str, IntervalLine<'_>> {
    let (input, (start_timestamp, interval_length, max_value, encoded_histogram)) =
        interval_fields(input)?;

    Ok((
        input,
        IntervalLine {
            tag: None,
            start_timestamp,
            interval_length,
            max_value,
            encoded_histogram,
        },
    ))
}
