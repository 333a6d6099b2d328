//! `sheetflow` binary: configuration, logging bootstrap and the HTTP server

use anyhow::{anyhow, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use sheetflow_server::{build_engine, routes, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("sheetflow")
        .version(sheetflow_core::VERSION)
        .about("Value-set lifecycle and variance service for filled datasheets")
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .value_parser(value_parser!(SocketAddr))
                .help("Listen address, overrides the configuration file"),
        )
        .arg(
            Arg::new("log-filter")
                .long("log-filter")
                .help("Tracing filter directives, e.g. \"sheetflow_core=debug,info\""),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(Command::new("serve").about("Run the HTTP server (default)"))
        .subcommand(Command::new("show-config").about("Print the effective configuration"))
}

fn resolve_config(matches: &ArgMatches) -> anyhow::Result<ServerConfig> {
    let path = matches.get_one::<PathBuf>("config");
    let mut config = ServerConfig::load(path.map(PathBuf::as_path))
        .context("failed to load configuration")?;

    if let Some(bind) = matches.get_one::<SocketAddr>("bind") {
        config = config.with_bind(*bind);
    }
    if let Some(filter) = matches.get_one::<String>("log-filter") {
        config = config.with_log_filter(filter.clone());
    }
    if matches.get_flag("json-logs") {
        config = config.with_json_logs(true);
    }
    Ok(config)
}

fn init_tracing(config: &ServerConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("invalid log filter {:?}", config.log_filter))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!(e))
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing(&config)?;

    let engine = build_engine(&config);
    let (addr, server) = warp::serve(routes(engine))
        .try_bind_with_graceful_shutdown(config.bind, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!(
        %addr,
        sheets = config.sheets.len(),
        freeze_locked_value_sets = config.engine.freeze_locked_value_sets,
        "sheetflow listening"
    );
    server.await;
    tracing::info!("sheetflow stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    let config = resolve_config(&matches)?;

    match matches.subcommand() {
        Some(("show-config", _)) => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        _ => serve(config).await,
    }
}
