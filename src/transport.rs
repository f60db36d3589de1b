use crate::error::Result;

use std::time::Duration;

use oauth2::{HttpRequest, HttpResponse};

/// Bound on establishing a connection. Requests themselves may take as long as they need.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Blocking HTTP client sending [`HttpRequest`]s over the network.
///
/// Use it through a closure, `|request| transport.send(request)`, wherever [`run`](crate::run)
/// expects an HTTP client.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::blocking::Client,
}

impl Transport {
    /// Builds the client. Redirects are not followed.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None::<Duration>)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Transport { client })
    }

    /// Sends `request` and reads the whole response body.
    pub fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let response = self
            .client
            .request(request.method, request.url.as_str())
            .headers(request.headers)
            .body(request.body)
            .send()?;

        let status_code = response.status();
        let headers = response.headers().clone();
        let body = response.bytes()?.to_vec();

        Ok(HttpResponse {
            status_code,
            headers,
            body,
        })
    }
}
