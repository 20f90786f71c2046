//! Request/response pipeline for metadata calls.
//!
//! A call runs through an ordered list of stages. Each stage gets the request and a
//! [`Next`] handle; it may change the request, call `next.run`, and change the response.
//! After the last stage the terminal sender stamps the metadata headers and hands the
//! request to the [`Transport`].

use crate::error::MetadataError;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Header the metadata service requires on every request
pub const METADATA_HEADER: &str = "Metadata";

#[derive(Debug, Clone)]
pub struct MetadataRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl MetadataRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct MetadataResponse {
    pub status: StatusCode,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl MetadataResponse {
    pub fn new(status: StatusCode, url: Url, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            url,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// The service treats anything above 299 as a failure.
    pub fn is_success(&self) -> bool {
        self.status.as_u16() <= 299
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One stage of the pipeline.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        request: MetadataRequest,
        next: Next<'_>,
    ) -> Result<MetadataResponse, MetadataError>;
}

/// Sends a request over the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: MetadataRequest) -> Result<MetadataResponse, MetadataError>;
}

/// The rest of the pipeline after the current stage.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub fn new(stages: &'a [Arc<dyn Middleware>], transport: &'a dyn Transport) -> Self {
        Self { stages, transport }
    }

    pub async fn run(self, mut request: MetadataRequest) -> Result<MetadataResponse, MetadataError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                stage
                    .handle(
                        request,
                        Next {
                            stages: rest,
                            transport: self.transport,
                        },
                    )
                    .await
            }
            None => {
                request
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                request
                    .headers
                    .insert(METADATA_HEADER, HeaderValue::from_static("true"));
                self.transport.send(request).await
            }
        }
    }
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Proxies are bypassed; the metadata address is only reachable directly.
    pub fn new(timeout: Duration) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: MetadataRequest) -> Result<MetadataResponse, MetadataError> {
        debug!(method = %request.method, uri = %request.url, "Sending metadata request");
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        debug!(uri = %url, status = status.as_u16(), "Metadata response received");

        Ok(MetadataResponse {
            status,
            url,
            headers,
            body,
        })
    }
}

/// Writes each request and response, headers and body, to a sink (stderr by default).
///
/// Neither message is altered.
pub struct HttpDump {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl HttpDump {
    pub fn stderr() -> Self {
        Self::to_writer(Box::new(std::io::stderr()))
    }

    pub fn to_writer(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    fn write(&self, text: &str) {
        let mut sink = self.sink.lock();
        if let Err(e) = sink.write_all(text.as_bytes()).and_then(|_| sink.flush()) {
            debug!(error = %e, "Failed to write http dump");
        }
    }
}

fn dump_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        out.push_str(name.as_str());
        out.push_str(": ");
        out.push_str(&String::from_utf8_lossy(value.as_bytes()));
        out.push_str("\r\n");
    }
}

fn dump_request(request: &MetadataRequest) -> String {
    let mut path = request.url.path().to_string();
    if let Some(query) = request.url.query() {
        path.push('?');
        path.push_str(query);
    }

    let mut out = format!("{} {} HTTP/1.1\r\n", request.method, path);
    if let Some(host) = request.url.host_str() {
        match request.url.port() {
            Some(port) => out.push_str(&format!("Host: {}:{}\r\n", host, port)),
            None => out.push_str(&format!("Host: {}\r\n", host)),
        }
    }
    dump_headers(&mut out, &request.headers);
    out.push_str("\r\n");
    if let Some(body) = &request.body {
        out.push_str(&String::from_utf8_lossy(body));
    }
    out.push('\n');
    out
}

fn dump_response(response: &MetadataResponse) -> String {
    let mut out = format!("HTTP/1.1 {}\r\n", response.status);
    dump_headers(&mut out, &response.headers);
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(&response.body));
    out.push('\n');
    out
}

#[async_trait]
impl Middleware for HttpDump {
    async fn handle(
        &self,
        request: MetadataRequest,
        next: Next<'_>,
    ) -> Result<MetadataResponse, MetadataError> {
        self.write(&dump_request(&request));
        let response = next.run(request).await?;
        self.write(&dump_response(&response));
        Ok(response)
    }
}
