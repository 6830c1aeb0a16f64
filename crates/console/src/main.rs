use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use event_console::backend::HttpBackend;
use event_console::cli::{self, Cli, Context};
use event_console::clock::SystemClock;
use event_console::config::Config;
use event_console::jobs::SessionTimers;
use event_console::logging::init_logging;
use event_console::session::SessionGuard;
use event_console::storage::FileTokenStore;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_logging(&config.logging, args.verbose);

    info!("Starting event console v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(FileTokenStore::new(&config.session.token_path));
    let guard = Arc::new(SessionGuard::new(
        store,
        Arc::new(SystemClock),
        config.session.clone(),
    ));
    cli::restore_session(&guard)?;

    let backend = Arc::new(HttpBackend::new(&config, Arc::clone(&guard))?);
    let timers = SessionTimers::spawn(Arc::clone(&guard), backend.clone());

    let ctx = Context {
        config,
        guard,
        backend,
    };
    let result = cli::run(args.command, &ctx).await;

    timers.shutdown().await;

    if let Err(e) = result {
        eprintln!("{}", e.user_message(ctx.config.locale()));
        return Err(e.into());
    }
    Ok(())
}
