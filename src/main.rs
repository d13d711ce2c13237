//! Binary entrypoint for the ansibbs CLI.
//!
//! Commands:
//! - `start [--bind <addr>]` - run the BBS server
//! - `init` - create a starter `config.toml`
//! - `status` - print configuration summary and negotiation counters as JSON
//!
//! See the library crate docs for module-level details: `ansibbs::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use ansibbs::bbs::BbsServer;
use ansibbs::config::Config;

#[derive(Parser)]
#[command(name = "ansibbs")]
#[command(about = "A telnet Bulletin Board System with ANSI terminal negotiation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the BBS server
    Start {
        /// Listen address, overriding `telnet.bind` (e.g. 0.0.0.0:2323)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Write a default configuration file
    Init,
    /// Show configuration summary and negotiation counters
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { bind } => {
            let mut config = Config::load(&cli.config).await?;
            init_logging(Some(&config), cli.verbose);
            info!("Starting ansibbs v{}", env!("CARGO_PKG_VERSION"));
            if let Some(addr) = bind {
                config.telnet.bind = addr;
            }
            let mut bbs = BbsServer::new(config).await?;
            bbs.run().await?;
        }
        Commands::Init => {
            init_logging(None, cli.verbose);
            info!("Initializing new BBS configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Status => {
            let config = Config::load(&cli.config).await?;
            init_logging(Some(&config), cli.verbose);
            let payload = serde_json::json!({
                "name": config.bbs.name,
                "sysop": config.bbs.sysop,
                "bind": config.telnet.bind,
                "telnet": config.telnet.enabled,
                "max_connections": config.bbs.max_connections,
                "terminal": {
                    "home_position_timeout_ms": config.terminal.home_position_timeout_ms,
                    "screen_size_timeout_ms": config.terminal.screen_size_timeout_ms,
                    "menu_handoff_delay_ms": config.terminal.menu_handoff_delay_ms,
                    "fallback": format!("{}x{}", config.terminal.fallback_width, config.terminal.fallback_height),
                    "entry_menu": config.terminal.entry_menu,
                },
                "counters": ansibbs::metrics::snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }

    Ok(())
}

fn init_logging(config: Option<&Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins; otherwise the configured level, otherwise info
    let configured = config
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = log_file {
        let file = std::sync::Mutex::new(f);
        // Mirror to the console only in the foreground
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = file.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
