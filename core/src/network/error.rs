#![deny(unsafe_code)]
#![deny(warnings)]
//! Local (non-HTTP) failure codes
//!
//! These share the `status` field of [`super::HttpResponse`] with real HTTP
//! status codes. They are all negative, so callers can branch on the sign.

/// Transport or framing failure detected on this side of the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    /// TCP connection could not be opened
    ConnectFailed,
    /// No complete response before the deadline
    Timeout,
    /// Request could not be written
    WriteFailed,
    /// Transport failed while reading
    ReadFailed,
    /// Status line missing or unparseable, or body is not UTF-8
    MalformedResponse,
    /// Body larger than the response buffer
    BodyOverflow,
}

impl HttpError {
    /// Stable negative status code
    pub const fn code(self) -> i32 {
        match self {
            Self::ConnectFailed => -1,
            Self::Timeout => -2,
            Self::WriteFailed => -3,
            Self::ReadFailed => -4,
            Self::MalformedResponse => -5,
            Self::BodyOverflow => -6,
        }
    }

    /// Inverse of [`HttpError::code`]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::ConnectFailed),
            -2 => Some(Self::Timeout),
            -3 => Some(Self::WriteFailed),
            -4 => Some(Self::ReadFailed),
            -5 => Some(Self::MalformedResponse),
            -6 => Some(Self::BodyOverflow),
            _ => None,
        }
    }
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "Connect failed"),
            Self::Timeout => write!(f, "Response timeout"),
            Self::WriteFailed => write!(f, "Request write failed"),
            Self::ReadFailed => write!(f, "Response read failed"),
            Self::MalformedResponse => write!(f, "Malformed response"),
            Self::BodyOverflow => write!(f, "Response body overflow"),
        }
    }
}

impl core::error::Error for HttpError {}

impl embedded_io::Error for HttpError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::ConnectFailed => embedded_io::ErrorKind::ConnectionRefused,
            Self::Timeout => embedded_io::ErrorKind::TimedOut,
            Self::WriteFailed | Self::ReadFailed => embedded_io::ErrorKind::BrokenPipe,
            Self::MalformedResponse => embedded_io::ErrorKind::InvalidData,
            Self::BodyOverflow => embedded_io::ErrorKind::Other,
        }
    }
}
