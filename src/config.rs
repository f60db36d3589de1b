use crate::error::{Error, Result};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use oauth2::url::{Host, Url};

/// Scope requested when `SCOPES` is not set.
pub const DEFAULT_SCOPE: &str = "team_info.read";

/// Names of the variables that must be present for a run.
pub const REQUIRED_VARS: [&str; 3] = ["CLIENT_ID", "CLIENT_SECRET", "REDIRECT_URI"];

/// Settings for one authorization run, read once at startup.
#[derive(Clone)]
pub struct Config {
    /// OAuth client identifier of the registered app.
    pub client_id: String,
    /// OAuth client secret of the registered app.
    pub client_secret: String,
    /// Redirect URI registered with the provider, sent exactly as configured.
    pub redirect_uri: String,
    /// Scope string, forwarded verbatim.
    pub scopes: String,
    /// Upper bound for the wait on the browser redirect. `None` waits forever.
    pub callback_timeout: Option<Duration>,
    redirect: Url,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &format_args!("[redacted]"))
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("callback_timeout", &self.callback_timeout)
            .finish()
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &'static str| lookup(name).ok_or(Error::MissingConfig(name));

        let client_id = required("CLIENT_ID")?;
        let client_secret = required("CLIENT_SECRET")?;
        let redirect_uri = required("REDIRECT_URI")?;
        let scopes = lookup("SCOPES").unwrap_or_else(|| DEFAULT_SCOPE.to_string());

        let redirect = Url::parse(&redirect_uri).map_err(|e| Error::InvalidConfig {
            name: "REDIRECT_URI",
            reason: e.to_string(),
        })?;
        if redirect.port_or_known_default().is_none() {
            return Err(Error::InvalidConfig {
                name: "REDIRECT_URI",
                reason: "no port can be derived from the uri".to_string(),
            });
        }

        let callback_timeout = match lookup("CALLBACK_TIMEOUT_SECS") {
            Some(secs) => {
                let secs = secs.trim().parse::<u64>().map_err(|e| Error::InvalidConfig {
                    name: "CALLBACK_TIMEOUT_SECS",
                    reason: e.to_string(),
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Config {
            client_id,
            client_secret,
            redirect_uri,
            scopes,
            callback_timeout,
            redirect,
        })
    }

    /// Port the local listener binds to.
    pub fn callback_port(&self) -> u16 {
        // checked in `from_lookup`
        self.redirect.port_or_known_default().unwrap_or(80)
    }

    /// Address the local listener binds to. IP literals in the redirect URI are used as they
    /// are, host names bind the IPv4 loopback.
    pub fn callback_addr(&self) -> SocketAddr {
        let ip = match self.redirect.host() {
            Some(Host::Ipv4(ip)) => IpAddr::V4(ip),
            Some(Host::Ipv6(ip)) => IpAddr::V6(ip),
            Some(Host::Domain(_)) | None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        SocketAddr::new(ip, self.callback_port())
    }

    /// Path the provider redirects the browser to.
    pub fn callback_path(&self) -> &str {
        self.redirect.path()
    }
}
