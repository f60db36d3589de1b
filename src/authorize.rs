use crate::config::Config;
use crate::error::{Error, Result};

use oauth2::basic::BasicClient;
use oauth2::url::Url;
use oauth2::{AuthUrl, ClientId, CsrfToken, RedirectUrl, Scope};

/// Dropbox consent screen.
pub const AUTH_URL: &str = "https://www.dropbox.com/oauth2/authorize";

/// Builds the consent screen URL together with the random `state` it carries.
///
/// The scope string is sent as a single value, exactly as configured, and the provider is asked
/// for an offline token.
pub fn authorization_url(config: &Config) -> Result<(Url, CsrfToken)> {
    let client = BasicClient::new(
        ClientId::new(config.client_id.clone()),
        None,
        AuthUrl::new(AUTH_URL.to_string()).map_err(|_| Error::InvalidUrl)?,
        None,
    )
    .set_redirect_uri(
        RedirectUrl::new(config.redirect_uri.clone()).map_err(|_| Error::InvalidUrl)?,
    );

    Ok(client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new(config.scopes.clone()))
        .add_extra_param("token_access_type", "offline")
        .url())
}

/// Opens `url` in the default browser. A missing browser only produces a warning, the printed
/// URL is enough to continue by hand.
pub fn open_browser(url: &Url) {
    match open::that(url.as_str()) {
        Ok(()) => tracing::debug!("browser opened"),
        Err(e) => {
            tracing::warn!("failed to open a browser: {}", e);
            eprintln!("Could not open a browser, please open the URL above manually.");
        }
    }
}
