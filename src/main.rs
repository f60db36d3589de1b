use anyhow::Context;
use tracing_subscriber::EnvFilter;

use dropbox_oauth_probe::{Config, Error, Transport, REQUIRED_VARS};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // a missing .env file is fine, the variables may come from the environment
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e @ Error::MissingConfig(_)) | Err(e @ Error::InvalidConfig { .. }) => {
            eprintln!("{}", e);
            eprintln!("Please set {}", REQUIRED_VARS.join(", "));
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    tracing::debug!(?config, "configuration loaded");

    let transport = Transport::new().context("failed to build the http client")?;
    dropbox_oauth_probe::run(&config, dropbox_oauth_probe::open_browser, |request| {
        transport.send(request)
    })
    .context("authorization check failed")?;

    Ok(())
}
