use anyhow::{Context, Result};
use clap::Parser;
use irc_core::{Engine, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

mod chanlog;
mod commands;
mod config;
mod handlers;

use chanlog::{ChannelLogs, TrafficLog, TRAFFIC};
use config::BotConfig;
use handlers::BotState;

#[derive(Parser, Debug)]
#[command(name = "logbot", version, about = "IRC channel logging bot")]
struct Cli {
    #[arg(long, default_value = "./logbot.toml")]
    config: PathBuf,

    /// Overrides `server` from the config file.
    #[arg(long)]
    server: Option<String>,

    /// Overrides `identity.nick` from the config file.
    #[arg(long)]
    nick: Option<String>,

    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let keys = config
        .channels
        .iter()
        .map(String::as_str)
        .chain([TRAFFIC, config.identity.nick.as_str()]);
    let logs = Arc::new(ChannelLogs::open(&config.log_dir, keys)?);
    info!(dir = %logs.dir().display(), "channel logs open");

    let state = Arc::new(BotState::new(&config, logs.clone()));
    let dispatcher = Arc::new(handlers::dispatcher(state));
    let engine = Engine::new(dispatcher, config.engine.clone())
        .with_observer(Arc::new(TrafficLog::new(logs)));

    let retry = Duration::from_secs(config.connect_retry_secs);
    let restart = Duration::from_secs(config.restart_delay_secs);

    loop {
        let transport = match Transport::connect(&config.server).await {
            Ok(transport) => transport,
            Err(err) => {
                warn!(%err, "cannot connect to irc server");
                if sleep_or_quit(retry).await {
                    return Ok(());
                }
                continue;
            }
        };
        info!(server = %config.server, nick = %config.identity.nick, "connected");

        let mut session = engine.start(transport, config.identity.clone());
        let outcome = tokio::select! {
            res = session.join() => Some(res),
            _ = tokio::signal::ctrl_c() => None,
        };
        match outcome {
            Some(Ok(())) => return Ok(()),
            Some(Err(err)) => error!(%err, "session ended"),
            None => {
                info!("interrupted, stopping session");
                session.stop();
                let _ = session.join().await;
                return Ok(());
            }
        }

        info!(delay_secs = restart.as_secs(), "restarting bot");
        if sleep_or_quit(restart).await {
            return Ok(());
        }
    }
}

fn load_config(cli: &Cli) -> Result<BotConfig> {
    let mut config = if cli.config.exists() {
        BotConfig::load(&cli.config)?
    } else {
        let server = cli
            .server
            .clone()
            .context("no config file found and --server not given")?;
        let nick = cli
            .nick
            .clone()
            .context("no config file found and --nick not given")?;
        BotConfig::new(server, nick)
    };
    if let Some(server) = &cli.server {
        config.server = server.clone();
    }
    if let Some(nick) = &cli.nick {
        config.identity.nick = nick.clone();
    }
    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
    }
    Ok(config)
}

async fn sleep_or_quit(delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = tokio::signal::ctrl_c() => true,
    }
}
