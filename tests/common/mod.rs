//! In-memory transport shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use jazz_client::document::{Document, MediaType};
use jazz_client::schema::Catalog;
use jazz_client::{Client, ClientConfig, Response, Result, Transport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = dyn Fn(&str) -> (u16, String) + Send + Sync;

/// Answers requests from a closure receiving the decoded URL.
pub struct MockTransport {
    handler: Box<Handler>,
    delay: Option<Duration>,
    gets: AtomicUsize,
    puts: Mutex<Vec<(String, String)>>,
    contexts: Mutex<Vec<(String, Option<String>)>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: None,
            gets: AtomicUsize::new(0),
            puts: Mutex::new(Vec::new()),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> Vec<(String, String)> {
        self.puts.lock().unwrap().clone()
    }

    /// Decoded URL and configuration context of every request, in order.
    pub fn contexts(&self) -> Vec<(String, Option<String>)> {
        self.contexts.lock().unwrap().clone()
    }

    fn record(&self, url: &str, configuration: Option<&str>) {
        self.contexts
            .lock()
            .unwrap()
            .push((url.to_string(), configuration.map(str::to_string)));
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(
        &self,
        url: &str,
        accept: MediaType,
        configuration: Option<&str>,
    ) -> Result<Response> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let url = urlencoding::decode(url).unwrap().into_owned();
        self.record(&url, configuration);
        let (status, body) = (self.handler)(&url);
        Ok(Response::new(status, Document::parse(&body, accept)?))
    }

    async fn put(
        &self,
        url: &str,
        _content_type: &str,
        body: Vec<u8>,
        configuration: Option<&str>,
    ) -> Result<u16> {
        self.record(url, configuration);
        self.puts
            .lock()
            .unwrap()
            .push((url.to_string(), String::from_utf8(body).unwrap()));
        Ok(200)
    }
}

pub fn client(transport: Arc<MockTransport>) -> Client {
    client_with(transport, ClientConfig::new("https://jazz.example.com/ccm", "jdoe"))
}

pub fn client_with(transport: Arc<MockTransport>, config: ClientConfig) -> Client {
    Client::with_transport(transport, Catalog::builtin(), config)
}

/// The item id requested by a single-item URL (`...[itemId=_x]...`).
pub fn requested_id(url: &str) -> Option<&str> {
    let start = url.find("[itemId=")? + "[itemId=".len();
    let end = url[start..].find(']')? + start;
    Some(&url[start..end])
}

pub fn contributor_xml(id: &str, name: &str) -> String {
    format!(
        "<foundation><contributor><itemId>{id}</itemId><name>{name}</name>\
         <userId>{id}</userId></contributor></foundation>"
    )
}

/// A listing page of contributor ids with an optional next link.
pub fn contributor_page(ids: &[&str], next: Option<&str>) -> String {
    let href = next.map(|n| format!(" href=\"{n}\"")).unwrap_or_default();
    let items: String = ids
        .iter()
        .map(|id| format!("<contributor><itemId>{id}</itemId></contributor>"))
        .collect();
    format!("<foundation{href}>{items}</foundation>")
}
