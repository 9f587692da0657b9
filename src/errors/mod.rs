//! Errors that end a read session.
//!
//! A log is either readable or it isn't: every error is fatal for the session it occurs in, and
//! the iterator that produced it yields nothing afterwards. Records produced before the error are
//! still valid.

use std::{error, fmt, io};

use hdrhistogram::serialization::DeserializeError;
use hdrhistogram::{AdditionError, CreationError};

/// Errors that can occur while reading histograms from a log.
#[derive(Debug)]
pub enum ReadError {
    /// Reading from the underlying stream failed. This includes lines that are not valid UTF-8.
    Io(io::Error),
    /// A comment line started like a `StartTime` or `BaseTime` directive, but its value was not
    /// seconds with 1 to 3 decimal places followed by a space.
    MalformedDirective {
        /// 1-based line number in the stream
        line_number: usize,
    },
    /// A line that was neither a comment nor the legend did not match the interval grammar.
    MalformedDataLine {
        /// 1-based line number in the stream
        line_number: usize,
    },
    /// The histogram column could not be decoded.
    PayloadDecode {
        /// 1-based line number in the stream
        line_number: usize,
        /// What went wrong
        cause: PayloadError,
    },
}

impl ReadError {
    /// The line the error occurred on, if it is tied to one.
    pub fn line_number(&self) -> Option<usize> {
        match self {
            ReadError::Io(_) => None,
            ReadError::MalformedDirective { line_number }
            | ReadError::MalformedDataLine { line_number }
            | ReadError::PayloadDecode { line_number, .. } => Some(*line_number),
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        ReadError::Io(e)
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "An i/o error occurred: {}", e),
            ReadError::MalformedDirective { line_number } => {
                write!(f, "Malformed StartTime or BaseTime on line {}", line_number)
            }
            ReadError::MalformedDataLine { line_number } => {
                write!(f, "Malformed interval on line {}", line_number)
            }
            ReadError::PayloadDecode { line_number, cause } => write!(
                f,
                "Could not decode the histogram on line {}: {}",
                line_number, cause
            ),
        }
    }
}

impl error::Error for ReadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ReadError::Io(e) => Some(e),
            ReadError::PayloadDecode { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Errors that can occur while decoding one encoded histogram.
#[derive(Debug)]
pub enum PayloadError {
    /// The text was not valid base64.
    Base64(base64::DecodeError),
    /// The bytes were not a serialized histogram, or were truncated.
    Histogram(DeserializeError),
    /// A histogram wide enough for the configured highest trackable value floor could not be
    /// created.
    Widen(CreationError),
    /// The decoded counts could not be copied into the widened histogram.
    Merge(AdditionError),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PayloadError::Base64(e) => write!(f, "Invalid base64: {}", e),
            PayloadError::Histogram(e) => write!(f, "Histogram deserialization failed: {}", e),
            PayloadError::Widen(e) => write!(f, "Could not widen histogram: {:?}", e),
            PayloadError::Merge(e) => write!(f, "Could not copy into widened histogram: {:?}", e),
        }
    }
}

impl error::Error for PayloadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            PayloadError::Base64(e) => Some(e),
            PayloadError::Histogram(e) => Some(e),
            _ => None,
        }
    }
}
