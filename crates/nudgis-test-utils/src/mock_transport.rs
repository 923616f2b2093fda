//! Scripted HTTP transport.
//!
//! Replies are scripted per URL path. Each path holds a queue: replies are
//! consumed in order and the last one keeps answering once the queue is down
//! to it. Paths without a script fail with `TransportError::Request`.

use nudgis_service::{HttpTransport, TransportError};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// HTTP method of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub body: String,
}

impl RecordedRequest {
    /// URL path, without scheme, host or query.
    pub fn path(&self) -> &str {
        path_of(&self.url)
    }
}

/// Path component of `url`.
fn path_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .find('/')
        .map_or("/", |start| &without_scheme[start..]);
    path.split('?').next().unwrap_or(path)
}

/// Mock transport for unit and integration tests.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<Result<String, TransportError>>>>,
    calls: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response body for `path`.
    #[must_use]
    pub fn reply(self, path: &str, body: impl Into<String>) -> Self {
        self.push(path, Ok(body.into()))
    }

    /// Queue a transport failure for `path`.
    #[must_use]
    pub fn fail(self, path: &str, error: TransportError) -> Self {
        self.push(path, Err(error))
    }

    fn push(self, path: &str, reply: Result<String, TransportError>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Every request, in order.
    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// Requests sent to `path`.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.calls()
            .into_iter()
            .filter(|request| request.path() == path)
            .collect()
    }

    /// Number of requests sent to `path`.
    pub fn call_count(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    fn respond(&self, method: Method, url: &str, body: &str) -> Result<String, TransportError> {
        self.calls.lock().unwrap().push(RecordedRequest {
            method,
            url: url.to_string(),
            body: body.to_string(),
        });

        let mut replies = self.replies.lock().unwrap();
        let Some(queue) = replies.get_mut(path_of(url)) else {
            return Err(TransportError::Request(format!(
                "no mock response for {}",
                path_of(url)
            )));
        };

        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(TransportError::Request("empty mock script".to_string())))
        }
    }
}

impl HttpTransport for MockTransport {
    fn post_form(&self, url: &str, body: &str) -> Result<String, TransportError> {
        self.respond(Method::Post, url, body)
    }

    fn get(&self, url: &str) -> Result<String, TransportError> {
        self.respond(Method::Get, url, "")
    }
}
