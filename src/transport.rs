//! HTTP transport for delivery requests.
use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use url::Url;

use crate::{delivery::DeliveryRequest, Result};

/// A delivery request ready to be sent. Always a JSON `POST`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Delivery endpoint.
    pub url: Url,
    /// Request body.
    pub payload: DeliveryRequest,
    /// Connect and read timeout.
    pub timeout: Duration,
}

/// A completed HTTP round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

/// Performs delivery requests.
///
/// `send` blocks until the round trip completes, fails, or times out. It must return exactly once
/// for every call; the client does not accept new work while a call is in flight.
pub trait Transport: Send {
    /// Send `request` and return the raw response.
    ///
    /// Non-200 responses are returned as `Ok`; only transport failures are errors.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// A [`Transport`] backed by a blocking reqwest client.
pub struct ReqwestTransport {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Create a transport with a fresh connection pool.
    pub fn new() -> ReqwestTransport {
        ReqwestTransport {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        ReqwestTransport::new()
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        log::debug!(target: "target_delivery", url:display = request.url; "sending delivery request");
        log::trace!(target: "target_delivery", payload:serde = request.payload; "delivery request payload");

        let response = self
            .client
            .post(request.url.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .timeout(request.timeout)
            .json(&request.payload)
            .send()
            .map_err(|err| {
                log::warn!(target: "target_delivery", "delivery request failed: {:?}", err);
                err
            })?;

        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();

        log::debug!(target: "target_delivery", status; "received delivery response");

        Ok(HttpResponse { status, body })
    }
}
