//! HTTP seam between the lab and the backend under test.
//!
//! [`HttpClient`] is the single point where requests leave the process.
//! [`HyperHttpClient`] speaks HTTP/1.1 over any [`NetworkProvider`]; tests
//! substitute scripted clients.
//!
//! ```text
//! HttpRequest ──► HyperHttpClient
//!                   │ network.connect(authority)
//!                   ▼
//!                 TokioIo<N::TcpStream>
//!                   │ hyper http1::handshake()  (driver spawned via TaskProvider)
//!                   ▼
//!                 sender.send_request() ──► HttpResponse { status, body }
//! ```

use std::io;
use std::rc::Rc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use thiserror::Error;

use crate::{NetworkProvider, TaskProvider};

/// Errors raised while moving a request across the wire.
///
/// An HTTP error status is not a transport error: it arrives as a normal
/// [`HttpResponse`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The configured base URL cannot be used.
    #[error("invalid base url `{url}`: {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The TCP connection could not be established.
    #[error("connection failed: {0}")]
    Connect(#[source] io::Error),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    Request(String),

    /// The HTTP exchange failed after connecting.
    #[error("http error: {0}")]
    Http(String),

    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// Any other failure, rendered verbatim.
    #[error("{0}")]
    Other(String),
}

/// HTTP method subset used by the lab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
}

/// An outbound request, relative to the client's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Path and query, starting with `/`.
    pub path: String,
    /// Extra headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Request body; empty for GET.
    pub body: Bytes,
}

impl HttpRequest {
    /// Build a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Build a POST request with an empty body.
    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::get(path)
        }
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header value, ignoring ASCII case in the name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Path without the query string.
    pub fn route(&self) -> &str {
        self.path.split('?').next().unwrap_or_default()
    }
}

/// A fully-read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code from the response line.
    pub status: u16,
    /// Complete body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in `200..300`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client that sends one request and returns the complete response.
#[async_trait(?Send)]
pub trait HttpClient: Clone {
    /// Send a request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Parsed `http://host[:port][/prefix]` base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl {
    authority: String,
    prefix: String,
}

impl BaseUrl {
    /// Parse a base URL. Only plain `http` is supported.
    pub fn parse(url: &str) -> Result<Self, TransportError> {
        let invalid = |reason: &str| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let uri = url
            .trim()
            .parse::<hyper::Uri>()
            .map_err(|e| invalid(&e.to_string()))?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(invalid(&format!("unsupported scheme `{other}`"))),
            None => return Err(invalid("missing scheme")),
        }

        let host = uri.host().ok_or_else(|| invalid("missing host"))?;
        let port = uri.port_u16().unwrap_or(80);

        Ok(Self {
            authority: format!("{host}:{port}"),
            prefix: uri.path().trim_end_matches('/').to_string(),
        })
    }

    /// `host:port` to dial and send as the `Host` header.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Join a request path onto the base prefix.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }
}

/// HTTP/1.1 client built on hyper, one connection per request.
///
/// A fresh connection per call keeps concurrent probes independent: two
/// requests in flight never queue behind each other on a shared socket.
#[derive(Debug, Clone)]
pub struct HyperHttpClient<N, T> {
    network: N,
    task: T,
    base: Rc<BaseUrl>,
}

impl<N, T> HyperHttpClient<N, T>
where
    N: NetworkProvider + 'static,
    T: TaskProvider + 'static,
{
    /// Create a client for the given base URL.
    pub fn new(network: N, task: T, base_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            network,
            task,
            base: Rc::new(BaseUrl::parse(base_url)?),
        })
    }
}

#[async_trait(?Send)]
impl<N, T> HttpClient for HyperHttpClient<N, T>
where
    N: NetworkProvider + 'static,
    T: TaskProvider + 'static,
{
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let stream = self
            .network
            .connect(self.base.authority())
            .await
            .map_err(TransportError::Connect)?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        self.task.spawn_task("http-conn-driver", async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "connection driver error");
            }
        });

        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };
        let mut builder = Request::builder()
            .method(method)
            .uri(self.base.join(&request.path))
            .header(hyper::header::HOST, self.base.authority());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let req = builder
            .body(Full::new(request.body))
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let res = sender
            .send_request(req)
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = res.status().as_u16();
        let body = res
            .into_body()
            .collect()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_bytes();

        tracing::trace!(status, bytes = body.len(), "http response received");
        Ok(HttpResponse { status, body })
    }
}
