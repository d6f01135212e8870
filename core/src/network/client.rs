#![deny(unsafe_code)]
#![deny(warnings)]
//! Gateway REST client
//!
//! Callers talk to the gateway through [`RestApi`], so the pairing, clock and
//! upload logic can be exercised against a scripted double. [`RestClient`] is
//! the real implementation: a deliberately small HTTP/1.1 client that opens a
//! fresh connection per request and always sends `Connection: close`.
//!
//! Failures never panic and never surface as `Err`: they come back as a
//! negative `status` in the [`HttpResponse`], see [`HttpError`].

use core::fmt::Write as _;

use embedded_io::ErrorKind;
use heapless::String;
use sensorunit_hal::{Clock, Connection, Connector};

use super::error::HttpError;
use super::response::{HttpResponse, Progress, ResponseParser};
use crate::config::RestClientConfig;

/// Room for the request line and headers
const REQUEST_HEAD_CAPACITY: usize = 256;
/// Bytes pulled from the socket per read
const READ_CHUNK: usize = 64;

/// Request/response exchange with the gateway
pub trait RestApi {
    /// `GET path`
    fn get_to(&mut self, path: &str) -> HttpResponse;

    /// `POST path` with a JSON body
    fn post_to(&mut self, path: &str, json_body: &str) -> HttpResponse;
}

impl<T: RestApi + ?Sized> RestApi for &mut T {
    fn get_to(&mut self, path: &str) -> HttpResponse {
        (**self).get_to(path)
    }

    fn post_to(&mut self, path: &str, json_body: &str) -> HttpResponse {
        (**self).post_to(path, json_body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// HTTP/1.1 client over a blocking [`Connector`]
pub struct RestClient<C, K> {
    connector: C,
    clock: K,
    config: RestClientConfig,
}

impl<C: Connector, K: Clock> RestClient<C, K> {
    pub fn new(connector: C, clock: K, config: RestClientConfig) -> Self {
        Self {
            connector,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    /// Direct access to the transport, mainly for inspection in tests
    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    fn request(&mut self, method: Method, path: &str, body: Option<&str>) -> HttpResponse {
        debug!("{} {}", method.as_str(), path);
        match self.exchange(method, path, body) {
            Ok(response) => {
                debug!("{} {} -> {}", method.as_str(), path, response.status);
                response
            }
            Err(e) => {
                warn!(
                    "{} {} failed: {} ({})",
                    method.as_str(),
                    path,
                    e,
                    e.code()
                );
                HttpResponse::from_error(e)
            }
        }
    }

    fn exchange(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&str>,
    ) -> Result<HttpResponse, HttpError> {
        let Self {
            connector,
            clock,
            config,
        } = self;

        let mut conn = connector
            .connect(config.host, config.port, config.connect_timeout_ms)
            .map_err(|_| HttpError::ConnectFailed)?;

        let result = send_request(&mut conn, config, method, path, body)
            .and_then(|()| read_response(&mut conn, clock, config.timeout_ms));
        conn.close();
        result
    }
}

impl<C: Connector, K: Clock> RestApi for RestClient<C, K> {
    fn get_to(&mut self, path: &str) -> HttpResponse {
        self.request(Method::Get, path, None)
    }

    fn post_to(&mut self, path: &str, json_body: &str) -> HttpResponse {
        self.request(Method::Post, path, Some(json_body))
    }
}

fn send_request<T: Connection>(
    conn: &mut T,
    config: &RestClientConfig,
    method: Method,
    path: &str,
    body: Option<&str>,
) -> Result<(), HttpError> {
    let mut head: String<REQUEST_HEAD_CAPACITY> = String::new();
    write!(
        head,
        "{} {} HTTP/1.1\r\nHost: {}:{}\r\n",
        method.as_str(),
        path,
        config.host,
        config.port
    )
    .map_err(|_| HttpError::WriteFailed)?;
    if let Some(body) = body {
        write!(
            head,
            "Content-Type: application/json\r\nContent-Length: {}\r\n",
            body.len()
        )
        .map_err(|_| HttpError::WriteFailed)?;
    }
    head.push_str("Connection: close\r\n\r\n")
        .map_err(|_| HttpError::WriteFailed)?;

    conn.write_all(head.as_bytes())
        .map_err(|_| HttpError::WriteFailed)?;
    if let Some(body) = body {
        conn.write_all(body.as_bytes())
            .map_err(|_| HttpError::WriteFailed)?;
    }
    conn.flush().map_err(|_| HttpError::WriteFailed)
}

/// Pull bytes until the peer closes, the announced body is complete, or the
/// deadline passes
fn read_response<T: Connection, K: Clock>(
    conn: &mut T,
    clock: &K,
    timeout_ms: u32,
) -> Result<HttpResponse, HttpError> {
    let mut parser = ResponseParser::new();
    let mut chunk = [0u8; READ_CHUNK];
    let started = clock.now_ms();

    loop {
        if clock.elapsed_since(started) >= timeout_ms {
            // A peer that never closes is tolerated once the headers are in
            // and no length was announced
            return if parser.headers_done() && !parser.has_content_length() {
                parser.finish()
            } else {
                Err(HttpError::Timeout)
            };
        }

        let n = match conn.read(&mut chunk) {
            Ok(0) => return parser.finish(),
            Ok(n) => n,
            Err(e) if embedded_io::Error::kind(&e) == ErrorKind::TimedOut => continue,
            Err(_) => return Err(HttpError::ReadFailed),
        };

        for &byte in &chunk[..n] {
            if parser.feed(byte)? == Progress::Complete {
                return parser.finish();
            }
        }
    }
}
