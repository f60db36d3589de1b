#![warn(missing_docs)]
//! Interactive check of a Dropbox OAuth2 app registration.
//!
//! [`run`] walks through the authorization code flow once: it listens on the redirect URI,
//! sends the user to the consent screen, exchanges the returned code for an access token and
//! calls one API endpoint with it.
//! ```rust,no_run
//! # fn main() -> Result<(), dropbox_oauth_probe::Error> {
//! let config = dropbox_oauth_probe::Config::from_env()?;
//! let transport = dropbox_oauth_probe::Transport::new()?;
//!
//! let outcome = dropbox_oauth_probe::run(&config, dropbox_oauth_probe::open_browser, |request| {
//!     transport.send(request)
//! })?;
//!
//! println!("{} answered: {}", outcome.api_url, outcome.api_response);
//! # Ok(())
//! # }
//! ```
//!
//! The `state` parameter sent to the consent screen is compared with the one coming back only
//! to log a warning on mismatch. The code is exchanged either way.

mod api;
mod authorize;
mod config;
mod error;
mod query;
mod server;
mod token;
mod transport;

pub use api::{select_endpoint, TEAM_INFO_URL, TEAM_SCOPE_MARKER, USER_INFO_URL};
pub use authorize::{authorization_url, open_browser, AUTH_URL};
pub use config::{Config, DEFAULT_SCOPE, REQUIRED_VARS};
pub use error::{Error, Result};
pub use oauth2::url::Url;
pub use oauth2::{HttpRequest, HttpResponse};
pub use query::{encode, parse_query};
pub use server::{Callback, CallbackServer, CONFIRMATION_BODY};
pub use token::{extract_access_token, TOKEN_URL};
pub use transport::Transport;

/// What a completed run saw, next to what it printed.
pub struct Outcome {
    /// Raw body of the token endpoint's answer.
    pub token_response: String,
    /// The access token found in [`token_response`](Outcome::token_response), if any.
    pub access_token: Option<String>,
    /// Endpoint the token was checked against.
    pub api_url: &'static str,
    /// Raw body of the endpoint's answer.
    pub api_response: String,
}

impl std::fmt::Debug for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outcome")
            .field("token_response", &format_args!("[redacted]"))
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("api_url", &self.api_url)
            .field("api_response", &self.api_response)
            .finish()
    }
}

/// Runs the authorization code flow once.
///
/// The callback listener is bound before `launch` receives the consent screen URL, and stopped
/// as soon as a code arrived (or on any error). `http_client` sends the token exchange and then
/// the verification call, one after the other.
pub fn run<L, C>(config: &Config, launch: L, mut http_client: C) -> Result<Outcome>
where
    L: FnOnce(&Url),
    C: FnMut(HttpRequest) -> Result<HttpResponse>,
{
    let server = CallbackServer::bind_on(config.callback_addr(), config.callback_path())?;
    let (auth_url, state) = authorization_url(config)?;

    println!("Open this following URL in your browser to authenticate:");
    println!();
    println!("{}", auth_url);
    println!();

    launch(&auth_url);

    let callback = server.wait_for_code(config.callback_timeout)?;
    server.stop();

    if callback.state.as_deref() != Some(state.secret().as_str()) {
        tracing::warn!("state returned with the code does not match the one sent");
    }

    let response = http_client(token::token_request(config, &callback.code)?)?;
    log_status(TOKEN_URL, &response);
    let token_response = String::from_utf8_lossy(&response.body).into_owned();

    println!();
    println!("Token response: {}", token_response);

    let access_token = extract_access_token(&token_response);
    let api_url = select_endpoint(&config.scopes);

    println!();
    println!("apiUrl: {}\n apiScope: {}", api_url, config.scopes);
    println!();

    let response = http_client(api::verification_request(
        api_url,
        access_token.as_deref(),
    )?)?;
    log_status(api_url, &response);
    let api_response = String::from_utf8_lossy(&response.body).into_owned();

    println!("API response: {}", api_response);

    Ok(Outcome {
        token_response,
        access_token,
        api_url,
        api_response,
    })
}

fn log_status(url: &str, response: &HttpResponse) {
    if response.status_code.is_success() {
        tracing::debug!(url, status = %response.status_code, "response received");
    } else {
        tracing::warn!(
            url,
            status = %response.status_code,
            "endpoint answered with an error status"
        );
    }
}
