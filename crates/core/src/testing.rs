//! Test helpers: scripted network and response builders.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use crate::{CacheDb, FetchError, Fetcher, GenerationId, Request, ServiceWorker, StoredResponse, WorkerConfig};

pub fn request(url: &str) -> Request {
    Request::get(Url::parse(url).unwrap())
}

pub fn page(url: &str, body: &str) -> StoredResponse {
    StoredResponse::new(
        Url::parse(url).unwrap(),
        200,
        vec![("content-type".into(), "text/html".into())],
        body.to_string(),
    )
}

/// In-process network with per-URL routes and an offline switch.
#[derive(Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, StoredResponse>>,
    unreachable: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `status` for `url`.
    pub fn route(&self, url: &str, status: u16, body: &str) {
        let response = StoredResponse::new(
            Url::parse(url).unwrap(),
            status,
            vec![("content-type".into(), "text/plain".into())],
            body.to_string(),
        );
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    /// Make a single URL fail at the network layer.
    pub fn break_url(&self, url: &str) {
        self.unreachable.lock().unwrap().insert(url.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let url = request.url().as_str();

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Connect("offline".into()));
        }
        if self.unreachable.lock().unwrap().contains(url) {
            return Err(FetchError::Timeout(url.to_string()));
        }

        self.routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Network(format!("dns error: {url}")))
    }
}

pub const SCOPE: &str = "https://app.example.com/";

pub fn worker_config(version: &str) -> WorkerConfig {
    WorkerConfig {
        generation: GenerationId::new("ns", version),
        scope: Url::parse(SCOPE).unwrap(),
        manifest: vec!["./".into(), "./tracker.html".into(), "./icon-512x512.png".into()],
        skip_waiting: true,
    }
}

/// Route every default manifest entry, with bodies tagged by `tag`.
pub fn serve_manifest(fetcher: &StubFetcher, tag: &str) {
    fetcher.route("https://app.example.com/", 200, &format!("root {tag}"));
    fetcher.route("https://app.example.com/tracker.html", 200, &format!("tracker {tag}"));
    fetcher.route("https://app.example.com/icon-512x512.png", 200, &format!("icon {tag}"));
}

pub async fn worker(version: &str) -> (ServiceWorker, Arc<StubFetcher>) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let fetcher = Arc::new(StubFetcher::new());
    let worker = ServiceWorker::new(db, fetcher.clone(), worker_config(version));
    (worker, fetcher)
}

/// Run raw SQL against the store, e.g. to install failure triggers.
pub async fn execute_sql(db: &CacheDb, sql: &'static str) {
    db.conn
        .call(move |conn| conn.execute_batch(sql))
        .await
        .unwrap();
}
