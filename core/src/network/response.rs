#![deny(unsafe_code)]
#![deny(warnings)]
//! HTTP/1.1 response framing
//!
//! The parser is fed one byte at a time from whatever the socket hands over,
//! so memory use is bounded by the line and body buffers regardless of how
//! the peer fragments its response.
//!
//! ```text
//! StatusLine ──"HTTP/1.x NNN ..."──► Headers ──empty line──► Body ──► done
//! ```

use heapless::{String, Vec};

use super::error::HttpError;

/// Largest response body kept; anything longer is an overflow
pub const RESPONSE_BODY_CAPACITY: usize = 256;
/// Header lines longer than this are truncated (only their prefix matters)
pub const HEADER_LINE_CAPACITY: usize = 128;

/// Outcome of one GET or POST
///
/// `status` is either an HTTP status in `100..=599` or the negative code of
/// an [`HttpError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: i32,
    pub body: String<RESPONSE_BODY_CAPACITY>,
}

impl HttpResponse {
    /// Response with the given status and body
    ///
    /// A body longer than [`RESPONSE_BODY_CAPACITY`] yields
    /// [`HttpError::BodyOverflow`] instead, the same as an oversized reply on
    /// the wire.
    pub fn new(status: i32, body: &str) -> Self {
        let mut owned: String<RESPONSE_BODY_CAPACITY> = String::new();
        if owned.push_str(body).is_err() {
            return Self::from_error(HttpError::BodyOverflow);
        }
        Self {
            status,
            body: owned,
        }
    }

    /// Local failure with an empty body
    pub fn from_error(error: HttpError) -> Self {
        Self {
            status: error.code(),
            body: String::new(),
        }
    }

    /// Exactly `200 OK`
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Failure detected locally, never a peer status
    pub fn is_local_failure(&self) -> bool {
        self.status < 0
    }

    pub fn error(&self) -> Option<HttpError> {
        HttpError::from_code(self.status)
    }

    pub fn body(&self) -> &str {
        self.body.as_str()
    }
}

/// Extract the status code from a status line such as `HTTP/1.1 200 OK`
///
/// Returns -1 unless the protocol token is followed by a numeric status
/// token in `100..=599` and a further space-delimited token.
pub fn parse_status_line(line: &str) -> i32 {
    let Some(protocol_end) = line.find(' ') else {
        return -1;
    };
    let rest = &line[protocol_end + 1..];
    let Some(code_end) = rest.find(' ') else {
        return -1;
    };
    rest[..code_end]
        .parse::<i32>()
        .ok()
        .filter(|code| (100..=599).contains(code))
        .unwrap_or(-1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    StatusLine,
    Headers,
    Body,
}

/// Result of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    NeedMore,
    /// `Content-Length` bytes of body received
    Complete,
}

/// Incremental response parser
#[derive(Debug)]
pub struct ResponseParser {
    state: ParseState,
    line: Vec<u8, HEADER_LINE_CAPACITY>,
    status: Option<i32>,
    content_length: Option<usize>,
    body: Vec<u8, RESPONSE_BODY_CAPACITY>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StatusLine,
            line: Vec::new(),
            status: None,
            content_length: None,
            body: Vec::new(),
        }
    }

    /// Consume one byte of the response
    pub fn feed(&mut self, byte: u8) -> Result<Progress, HttpError> {
        match self.state {
            ParseState::StatusLine | ParseState::Headers => {
                if byte == b'\n' {
                    self.end_line()
                } else {
                    // Overlong header lines keep their prefix only
                    let _ = self.line.push(byte);
                    Ok(Progress::NeedMore)
                }
            }
            ParseState::Body => {
                if self.body.push(byte).is_err() {
                    return Err(HttpError::BodyOverflow);
                }
                Ok(self.body_progress())
            }
        }
    }

    /// True once the blank line after the headers has been seen
    pub fn headers_done(&self) -> bool {
        self.state == ParseState::Body
    }

    /// Whether the peer announced the body length
    pub fn has_content_length(&self) -> bool {
        self.content_length.is_some()
    }

    /// Turn what has been received into a response
    pub fn finish(self) -> Result<HttpResponse, HttpError> {
        let status = self.status.ok_or(HttpError::MalformedResponse)?;
        if self.state != ParseState::Body {
            return Err(HttpError::MalformedResponse);
        }
        if let Some(expected) = self.content_length {
            if self.body.len() < expected {
                return Err(HttpError::MalformedResponse);
            }
        }
        let text = core::str::from_utf8(&self.body).map_err(|_| HttpError::MalformedResponse)?;
        let mut body = String::new();
        body.push_str(text)
            .map_err(|_| HttpError::BodyOverflow)?;
        Ok(HttpResponse { status, body })
    }

    fn body_progress(&self) -> Progress {
        match self.content_length {
            Some(expected) if self.body.len() >= expected => Progress::Complete,
            _ => Progress::NeedMore,
        }
    }

    fn end_line(&mut self) -> Result<Progress, HttpError> {
        if self.line.last() == Some(&b'\r') {
            self.line.pop();
        }

        let progress = if self.line.is_empty() {
            if self.status.is_none() {
                return Err(HttpError::MalformedResponse);
            }
            self.state = ParseState::Body;
            if self.content_length.is_some_and(|len| len > RESPONSE_BODY_CAPACITY) {
                return Err(HttpError::BodyOverflow);
            }
            self.body_progress()
        } else {
            // A truncated line may have been cut mid-character
            let line = match core::str::from_utf8(&self.line) {
                Ok(line) => line,
                Err(e) => core::str::from_utf8(&self.line[..e.valid_up_to()]).unwrap_or(""),
            };
            if self.status.is_none() {
                if line.starts_with("HTTP/1.") {
                    let status = parse_status_line(line);
                    if status < 0 {
                        return Err(HttpError::MalformedResponse);
                    }
                    self.status = Some(status);
                    self.state = ParseState::Headers;
                }
            } else if let Some((name, value)) = line.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    self.content_length = value.trim().parse().ok();
                }
            }
            Progress::NeedMore
        };

        self.line.clear();
        Ok(progress)
    }
}
