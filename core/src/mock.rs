//! Scripted [`RestApi`] double
//!
//! Replies are served in the order they were queued. Once the script runs
//! out every call fails as if the gateway were unreachable.

use heapless::{Deque, String, Vec};

use crate::network::{HttpError, HttpResponse, RestApi};

const MAX_SCRIPTED: usize = 16;
const MAX_RECORDED: usize = 16;

/// One call seen by [`MockRestApi`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String<32>,
    pub body: String<1024>,
}

#[derive(Debug, Default)]
pub struct MockRestApi {
    responses: Deque<HttpResponse, MAX_SCRIPTED>,
    requests: Vec<RecordedRequest, MAX_RECORDED>,
}

impl MockRestApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&mut self, status: i32, body: &str) {
        self.push(HttpResponse::new(status, body));
    }

    pub fn push(&mut self, response: HttpResponse) {
        self.responses
            .push_back(response)
            .expect("too many scripted responses");
    }

    /// Calls made so far, oldest first
    pub fn requests(&self) -> &[RecordedRequest] {
        &self.requests
    }

    /// Scripted replies not consumed yet
    pub fn pending(&self) -> usize {
        self.responses.len()
    }

    fn record(&mut self, method: &'static str, path: &str, body: &str) -> HttpResponse {
        let mut request = RecordedRequest {
            method,
            path: String::new(),
            body: String::new(),
        };
        let _ = request.path.push_str(path);
        let _ = request.body.push_str(body);
        let _ = self.requests.push(request);
        self.responses
            .pop_front()
            .unwrap_or_else(|| HttpResponse::from_error(HttpError::ConnectFailed))
    }
}

impl RestApi for MockRestApi {
    fn get_to(&mut self, path: &str) -> HttpResponse {
        self.record("GET", path, "")
    }

    fn post_to(&mut self, path: &str, json_body: &str) -> HttpResponse {
        self.record("POST", path, json_body)
    }
}
