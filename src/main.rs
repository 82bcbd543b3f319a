//! # Showcase Main Entry Point
//!
//! Bootstraps the portfolio application once, optionally navigates, prints
//! the status report as JSON and writes every rendered container to disk.

use anyhow::{bail, Context, Result};
use showcase::app::models::ContentSource;
use showcase::cmd_args::CommandLineArgs;
use showcase::config::{AppConfig, LOG_LEVEL_ENV_VAR};
use showcase::{AppBuilder, AppState, Navigation};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "showcase=debug" } else { "showcase=warn" };
    let filter = std::env::var(LOG_LEVEL_ENV_VAR)
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn write_containers(app: &showcase::Application, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    for container in app.surface().containers() {
        let Some(html) = app.surface().content(&container) else {
            continue;
        };
        let file = dir.join(format!("{}.html", container.replace(':', "_")));
        std::fs::write(&file, html)
            .with_context(|| format!("failed to write {}", file.display()))?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = CommandLineArgs::parse();
    init_tracing(args.verbose());

    let mut config = AppConfig::load(args.config()).context("failed to load config")?;
    if args.no_cache() {
        config.cache.enabled = false;
    }

    let mut builder = AppBuilder::new(config);
    if let Some(path) = args.content() {
        builder = builder.with_content(ContentSource::File(path.into()));
    }
    let mut app = builder.build().context("failed to wire the application")?;

    let report = app.init().await?;

    if report.state == AppState::Running {
        if let Some(path) = args.navigate() {
            match app.navigate(path).await? {
                Navigation::Navigated(route) => {
                    tracing::info!("showing {} (view '{}')", route.path, route.view)
                }
                Navigation::NotFound(path) => eprintln!("no route for {path}"),
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(dir) = args.out() {
        write_containers(&app, dir)?;
    }

    app.destroy();

    if report.state == AppState::Error {
        bail!("bootstrap failed: {}", report.failed_critical.join(", "));
    }
    Ok(())
}
