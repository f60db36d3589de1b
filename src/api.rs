use crate::error::{Error, Result};

use oauth2::http::header::{HeaderValue, AUTHORIZATION};
use oauth2::http::{HeaderMap, Method};
use oauth2::url::Url;
use oauth2::HttpRequest;

/// Team information, reachable with a team scoped token.
pub const TEAM_INFO_URL: &str = "https://api.dropboxapi.com/2/team/get_info";
/// Account of the user who authorized the app.
pub const USER_INFO_URL: &str = "https://api.dropboxapi.com/2/users/get_current_account";
/// Scope marker selecting [`TEAM_INFO_URL`].
pub const TEAM_SCOPE_MARKER: &str = "team_info.read";

/// Picks the endpoint used to check the token. Any scope string containing
/// [`TEAM_SCOPE_MARKER`] goes to the team endpoint, everything else to the user endpoint.
pub fn select_endpoint(scopes: &str) -> &'static str {
    if scopes.contains(TEAM_SCOPE_MARKER) {
        TEAM_INFO_URL
    } else {
        USER_INFO_URL
    }
}

/// Builds the bearer authenticated POST with an empty body.
///
/// Without a token the header still goes out with an empty credential, the provider's
/// rejection then shows up in the printed response.
pub fn verification_request(url: &str, access_token: Option<&str>) -> Result<HttpRequest> {
    let token = access_token.unwrap_or_else(|| {
        tracing::warn!("token response had no access_token, calling the API without one");
        ""
    });

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token))?,
    );

    Ok(HttpRequest {
        url: Url::parse(url).map_err(|_| Error::InvalidUrl)?,
        method: Method::POST,
        headers,
        body: Vec::new(),
    })
}
