use crate::config::Config;
use crate::error::{Error, Result};

use oauth2::http::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use oauth2::http::{HeaderMap, Method};
use oauth2::url::{form_urlencoded, Url};
use oauth2::HttpRequest;

/// Dropbox token endpoint.
pub const TOKEN_URL: &str = "https://api.dropboxapi.com/oauth2/token";

/// Builds the form-encoded request exchanging `code` for an access token.
pub fn token_request(config: &Config, code: &str) -> Result<HttpRequest> {
    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("code", code)
        .append_pair("grant_type", "authorization_code")
        .append_pair("client_id", &config.client_id)
        .append_pair("client_secret", &config.client_secret)
        .append_pair("redirect_uri", &config.redirect_uri)
        .finish();

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Ok(HttpRequest {
        url: Url::parse(TOKEN_URL).map_err(|_| Error::InvalidUrl)?,
        method: Method::POST,
        headers,
        body: body.into_bytes(),
    })
}

/// Pulls the `access_token` string out of a token response body.
///
/// Anything that is not a JSON object with a string `access_token` yields `None`.
pub fn extract_access_token(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("access_token")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}
