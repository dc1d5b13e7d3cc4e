mod account;
mod listing;
mod shell;

use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use fys_client::DirectoryClient;
use fys_core::{AppConfig, GeoPoint};
use fys_sync::{App, FixedLocation, NoLocation, Notifier, TracingNotifier};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fys")]
#[command(about = "Find nearby services from the directory")]
struct Cli {
    /// Current latitude; used as the map center together with --lng
    #[arg(long, global = true, requires = "lng", allow_negative_numbers = true)]
    lat: Option<f64>,
    /// Current longitude
    #[arg(long, global = true, requires = "lat", allow_negative_numbers = true)]
    lng: Option<f64>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List services around the current center
    List {
        /// Search radius; stored for later runs
        #[arg(long)]
        distance: Option<String>,
        /// Narrow the listing by text (not sent to the directory)
        #[arg(long)]
        search: Option<String>,
    },
    /// Log in and keep the credential for later runs
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "FYS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and forget the stored credential
    Logout,
    /// Show session, filter and configuration state
    Status,
    /// Delete a listing (requires login)
    Delete { id: i64 },
    /// Edit fields of a listing (requires login)
    Edit {
        id: i64,
        #[command(flatten)]
        fields: listing::EditFields,
    },
    /// Interactive session reading commands from stdin
    Shell,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = load_env_then_parse(None, std::env::args_os()).unwrap_or_else(|e| e.exit());
    let config = fys_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(env = %config.env, api_url = %config.api_url, "configuration loaded");

    let location = match (cli.lat, cli.lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)?),
        _ => None,
    };

    let app = connect(&config, location).await?;
    let result = match cli.command {
        Some(Commands::List { distance, search }) => {
            listing::run_list(&app, distance.as_deref(), search.as_deref()).await
        }
        Some(Commands::Login { email, password }) => {
            account::run_login(&app, &email, &password).await
        }
        Some(Commands::Logout) => account::run_logout(&app).await,
        Some(Commands::Status) => {
            account::run_status(&app, &config);
            Ok(())
        }
        Some(Commands::Delete { id }) => listing::run_delete(&app, id).await,
        Some(Commands::Edit { id, fields }) => listing::run_edit(&app, id, fields).await,
        Some(Commands::Shell) => shell::run_shell(&app).await,
        None => listing::run_list(&app, None, None).await,
    };

    app.shutdown().await;
    if let Err(e) = &result {
        if let Some(hint) = account::unauthorized_hint(e) {
            eprintln!("{hint}");
        }
    }
    result
}

/// Loads `.env` (or the given file) into the process environment and then
/// parses arguments, so `env = "FYS_PASSWORD"` also sees values from it.
fn load_env_then_parse<I, T>(dotenv: Option<&Path>, args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    if let Some(path) = dotenv {
        dotenvy::from_path(path).ok();
    } else {
        dotenvy::dotenv().ok();
    }
    Cli::try_parse_from(args)
}

async fn connect(
    config: &AppConfig,
    location: Option<GeoPoint>,
) -> anyhow::Result<App<DirectoryClient>> {
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let app = match location {
        Some(position) => App::connect(config, notifier, FixedLocation(position)).await?,
        None => App::connect(config, notifier, NoLocation).await?,
    };
    Ok(app)
}

#[cfg(test)]
mod tests;
