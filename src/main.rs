// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! StreamVoice session driver
//!
//! Small command line front end over the session client: log in, inspect
//! the session, call the API, and keep a session alive in the foreground.

use anyhow::{bail, Context};
use std::sync::Arc;
use std::time::Duration;
use streamvoice_session::{
    config::ClientConfig,
    models::Credentials,
    services::{AuthService, HttpTransport},
    storage::{FileStorage, MemoryStorage, SessionStorage},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: streamvoice-session <login EMAIL PASSWORD | whoami | get PATH | logout | keepalive [SECONDS]>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(api = %config.api_base_url, "Starting StreamVoice session client");

    let storage: Arc<dyn SessionStorage> = match &config.session_dir {
        Some(dir) => Arc::new(FileStorage::open(dir).context("Failed to open session directory")?),
        None => {
            tracing::warn!("STREAMVOICE_SESSION_DIR not set, session will not survive restart");
            Arc::new(MemoryStorage::new())
        }
    };
    let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
    let auth = AuthService::from_config(config, storage, transport);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["login", email, password] => {
            let session = auth
                .login_with_credentials(&Credentials::new(*email, *password))
                .await?;
            println!("Logged in as {} ({})", session.user.email, session.role);
        }
        ["whoami"] => match auth.store().session() {
            Some(session) => {
                println!("{} ({})", session.user.email, session.role);
                if let Some(due) = auth.store().next_refresh_at() {
                    println!(
                        "next refresh: {}",
                        streamvoice_session::time_utils::format_utc_rfc3339(due)
                    );
                }
            }
            None => println!("Not logged in"),
        },
        ["get", path] => {
            let response = auth.client().get(path).await?;
            println!("{}", serde_json::to_string_pretty(&response.data)?);
        }
        ["logout"] => {
            if auth.logout().await {
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
        }
        ["keepalive", rest @ ..] => {
            if !auth.is_authenticated() {
                bail!("Not logged in");
            }
            let seconds = match rest {
                [] => None,
                [secs] => Some(secs.parse::<u64>().context("SECONDS must be a number")?),
                _ => bail!(USAGE),
            };
            keepalive(&auth, seconds.map(Duration::from_secs)).await;
        }
        _ => bail!(USAGE),
    }

    auth.store().dispose();
    Ok(())
}

/// Hold the process open so the scheduled refresh keeps the session alive.
async fn keepalive(auth: &AuthService, limit: Option<Duration>) {
    tracing::info!(
        due = ?auth.store().next_refresh_at(),
        "Keeping session alive, press Ctrl-C to stop"
    );
    let wait = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = wait => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    tracing::info!(
        refreshes = auth.store().refreshes_started(),
        authenticated = auth.is_authenticated(),
        "Keepalive finished"
    );
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("streamvoice_session=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
