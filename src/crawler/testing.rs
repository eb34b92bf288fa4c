//! In-memory transport for unit tests

use crate::crawler::fetcher::{Transport, TransportError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

type Response = Result<String, TransportError>;

/// Transport answering from per-URL scripts
///
/// Scripted responses (`then`) are consumed first, after which the URL's
/// `always` response repeats. Unknown URLs answer 404.
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Response>>>,
    fallback: Mutex<HashMap<String, Response>>,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            latency: Duration::from_millis(10),
        }
    }

    pub(crate) fn then(self, url: &Url, response: Response) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub(crate) fn always(self, url: &Url, response: Response) -> Self {
        self.fallback
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
        self
    }

    pub(crate) fn calls(&self, url: &Url) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(url.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &Url) -> Response {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url.as_str())
            .and_then(VecDeque::pop_front);
        if let Some(response) = scripted {
            return response;
        }

        self.fallback
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .unwrap_or(Err(TransportError::Status(404)))
    }
}
