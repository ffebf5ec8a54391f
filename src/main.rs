//! Pomodoro - daemon and client entry point
//!
//! `pomodoro daemon` runs the server in the foreground; every other
//! subcommand talks to it, starting it first when needed.

use std::io::Write;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pomodoro_daemon::{
    config::Config, error::DaemonError, Client, Daemon, DaemonLauncher, Request,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Logs go to stderr; stdout carries protocol output only
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pomodoro_daemon={}", config.log_level())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match config.command().request() {
        None => run_daemon(&config).await,
        Some(request) => run_client(&config, request).await,
    }
}

async fn run_daemon(config: &Config) -> anyhow::Result<()> {
    let settings = config.timer_settings().context("Failed to load timer settings")?;

    info!("Starting pomodoro daemon v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: work={}s, short_break={}s, long_break={}s, interval={}",
        settings.work_duration,
        settings.short_break,
        settings.long_break,
        settings.long_break_interval
    );

    match Daemon::new(config.runtime_paths(), settings).run().await {
        Ok(()) => Ok(()),
        Err(e @ DaemonError::AlreadyRunning { .. }) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_client(config: &Config, request: Request) -> anyhow::Result<()> {
    let launcher = DaemonLauncher::current_exe(config.daemon_args())?;
    let client = Client::new(&config.socket).with_launcher(launcher);

    match request {
        Request::Listen => {
            let mut stdout = std::io::stdout();
            client.listen(|line| writeln!(stdout, "{}", line)).await?;
        }
        Request::State => {
            let snapshot = client.request(Request::State).await?;
            println!("{}", snapshot);
        }
        other => client.command(other).await?,
    }
    Ok(())
}
