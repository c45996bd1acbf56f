//! Request and response model shared by the store, network client and worker.
//!
//! A request is identified by its method plus its full URL (fragment
//! stripped). A response carries its body as immutable [`Bytes`].

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::hash::compute_cache_key;

/// Semantic type of a request, as classified by the fetching runtime.
///
/// Deserializes leniently: a name this enum does not know becomes `Empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Destination {
    /// Full-document navigation.
    Document,
    Iframe,
    Frame,
    Image,
    Font,
    Script,
    Style,
    Json,
    Manifest,
    Audio,
    Video,
    Track,
    Object,
    Embed,
    Worker,
    SharedWorker,
    ServiceWorker,
    AudioWorklet,
    PaintWorklet,
    Report,
    Xslt,
    /// `fetch()`/XHR and anything else without a destination.
    #[default]
    Empty,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Document => "document",
            Destination::Iframe => "iframe",
            Destination::Frame => "frame",
            Destination::Image => "image",
            Destination::Font => "font",
            Destination::Script => "script",
            Destination::Style => "style",
            Destination::Json => "json",
            Destination::Manifest => "manifest",
            Destination::Audio => "audio",
            Destination::Video => "video",
            Destination::Track => "track",
            Destination::Object => "object",
            Destination::Embed => "embed",
            Destination::Worker => "worker",
            Destination::SharedWorker => "sharedworker",
            Destination::ServiceWorker => "serviceworker",
            Destination::AudioWorklet => "audioworklet",
            Destination::PaintWorklet => "paintworklet",
            Destination::Report => "report",
            Destination::Xslt => "xslt",
            Destination::Empty => "",
        }
    }

    /// Classify a destination name, case-insensitively.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "iframe" => Destination::Iframe,
            "frame" => Destination::Frame,
            "image" => Destination::Image,
            "font" => Destination::Font,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "json" => Destination::Json,
            "manifest" => Destination::Manifest,
            "audio" => Destination::Audio,
            "video" => Destination::Video,
            "track" => Destination::Track,
            "object" => Destination::Object,
            "embed" => Destination::Embed,
            "worker" => Destination::Worker,
            "sharedworker" => Destination::SharedWorker,
            "serviceworker" => Destination::ServiceWorker,
            "audioworklet" => Destination::AudioWorklet,
            "paintworklet" => Destination::PaintWorklet,
            "report" => Destination::Report,
            "xslt" => Destination::Xslt,
            "" | "empty" => Destination::Empty,
            other => {
                tracing::debug!(destination = other, "unknown destination, treating as empty");
                Destination::Empty
            }
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Destination {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl FromStr for Destination {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

/// An intercepted request descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Absolute URL without fragment.
    pub url: Url,
    pub destination: Destination,
}

impl Request {
    /// Create a request, normalizing the method and dropping any fragment.
    pub fn new(method: &str, mut url: Url) -> Self {
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url, destination: Destination::Empty }
    }

    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// Parse an absolute URL string into a request.
    pub fn parse(method: &str, url: &str) -> Result<Self, Error> {
        if method.trim().is_empty() {
            return Err(Error::InvalidInput("method cannot be empty".into()));
        }
        let url = Url::parse(url.trim()).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::new(method, url))
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Store key for this request (method + URL).
    pub fn cache_key(&self) -> String {
        compute_cache_key(&self.method, self.url.as_str())
    }
}

/// A response, either live from the network or read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    /// Header pairs in arrival order; names are kept as received.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Final URL after redirects, when known.
    pub url: Option<String>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, status_text: String::new(), headers: Vec::new(), body: body.into(), url: None }
    }

    /// A `200 OK` response with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(200, body).with_status_text("OK")
    }

    /// Synthetic empty `404 Not Found`, used in place of broken images.
    pub fn not_found() -> Self {
        Self::new(404, Bytes::new()).with_status_text("Not Found")
    }

    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Case-insensitive header lookup (first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Only exact `200` responses are ever written to a store.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    /// Byte-for-byte duplicate that shares no buffer with `self`.
    pub fn snapshot(&self) -> Self {
        Self {
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            body: Bytes::copy_from_slice(&self.body),
            url: self.url.clone(),
        }
    }
}
