//! An [`HttpTransport`] that replays canned responses per URL.
//!
//! Each URL has a queue. Responses are consumed front to back and the last
//! one repeats forever, so `respond(url, 200, body)` scripts a stable page
//! and `fail_then(url, …)` scripts a recovery. Unscripted URLs answer 404.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use irminsul_common::{HttpResponse, HttpTransport, TransportError};

pub type Scripted = Result<HttpResponse, TransportError>;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedCall {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn respond(self, url: &str, status: u16, body: impl Into<String>) -> Self {
        self.push(url, Ok(HttpResponse { status, body: body.into() }));
        self
    }

    pub fn fail(self, url: &str, err: TransportError) -> Self {
        self.push(url, Err(err));
        self
    }

    /// Appends one response to the URL's queue. Usable mid-test to change a page.
    pub fn push(&self, url: &str, response: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Replaces the URL's whole queue with a single sticky response.
    pub fn set_page(&self, url: &str, status: u16, body: impl Into<String>) {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.entry(url.to_string()).or_default();
        queue.clear();
        queue.push_back(Ok(HttpResponse { status, body: body.into() }));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.url == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_response(&self, url: &str) -> Scripted {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

fn not_found() -> Scripted {
    Ok(HttpResponse { status: 404, body: String::new() })
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            headers: headers.to_vec(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.next_response(url)
    }
}
