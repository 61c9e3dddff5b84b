//! In-memory `Network` with canned replies.
//!
//! Used by tests and by dry runs that exercise the service without touching
//! the origin server. Requests are recorded so callers can assert on call
//! counts and on the headers that were sent.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bivouac_core::{Error, Request, Response};
use url::Url;

#[derive(Debug, Clone)]
enum Reply {
    Respond { status: u16, headers: Vec<(String, String)>, body: Vec<u8> },
    Fail(String),
}

#[derive(Debug, Default)]
pub struct StubNetwork {
    replies: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<Request>>,
    calls: AtomicUsize,
    offline: AtomicBool,
}

fn key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer GETs for `url` with `status` and `body`.
    pub fn respond(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.respond_with_headers(url, status, Vec::new(), body)
    }

    pub fn respond_with_headers(
        &self, url: &str, status: u16, headers: Vec<(String, String)>, body: impl Into<Vec<u8>>,
    ) -> &Self {
        let reply = Reply::Respond { status, headers, body: body.into() };
        self.insert(url, reply);
        self
    }

    /// Make requests for `url` fail at the transport level.
    pub fn fail(&self, url: &str, reason: &str) -> &Self {
        self.insert(url, Reply::Fail(reason.to_string()));
        self
    }

    /// Fail every request until `set_offline(false)`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of recorded requests for `url`.
    pub fn calls_for(&self, url: &str) -> usize {
        self.requests
            .lock()
            .map(|reqs| reqs.iter().filter(|r| r.url.as_str() == url).count())
            .unwrap_or(0)
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().map(|reqs| reqs.clone()).unwrap_or_default()
    }

    fn insert(&self, url: &str, reply: Reply) {
        let url = match Url::parse(url) {
            Ok(parsed) => key(&parsed),
            Err(_) => url.to_string(),
        };
        if let Ok(mut replies) = self.replies.lock() {
            replies.insert(url, reply);
        }
    }
}

#[async_trait::async_trait]
impl super::Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut reqs) = self.requests.lock() {
            reqs.push(request.clone());
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: network unreachable", request.url)));
        }

        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|replies| replies.get(&key(&request.url)).cloned());

        match reply {
            Some(Reply::Respond { status, headers, body }) => {
                let mut response = Response::new(request.url.clone(), status, body);
                response.headers = headers;
                Ok(response)
            }
            Some(Reply::Fail(reason)) => Err(Error::Network(format!("{}: {reason}", request.url))),
            None => Err(Error::Network(format!("{}: connection refused", request.url))),
        }
    }
}
