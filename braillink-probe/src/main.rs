//! braillink probe entry point.
//!
//! ```text
//! braillink-probe                  Connect with the settings in braillink-probe.toml
//! braillink-probe --config <path>  Load a custom config TOML
//! braillink-probe --host <ep>      Override the service endpoint
//! braillink-probe --auth <path>    Override the key file ("" for none)
//! braillink-probe --tty <n>        Take terminal slot n
//! braillink-probe --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;

use braillink_core::Session;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use braillink_probe::config::ProbeConfig;
use braillink_probe::probe;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "braillink-probe", about = "Braille display service probe")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "braillink-probe.toml")]
    config: PathBuf,

    /// Service endpoint, e.g. ":0" or "host:1".
    #[arg(long)]
    host: Option<String>,

    /// Key file for authentication.
    #[arg(long)]
    auth: Option<String>,

    /// Terminal slot to take.
    #[arg(long)]
    tty: Option<u32>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ProbeConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ProbeConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.connection.host = host;
    }
    if let Some(auth) = cli.auth {
        config.connection.auth = auth;
    }
    if cli.tty.is_some() {
        config.connection.tty = cli.tty;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("braillink-probe v{}", env!("CARGO_PKG_VERSION"));

    let endpoint = config.endpoint()?;
    let credential = config.credential();
    info!(%endpoint, ?credential, "connecting");

    let mut session = match Session::connect(&endpoint, &credential).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", probe::diagnose(&e, &endpoint));
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    session.set_request_timeout(config.request_timeout());

    if let Ok(name) = session.driver_name().await {
        info!(driver = %name, "connected");
    }

    // Ctrl-C closes the transport, waking any blocked key read.
    let close = session.close_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, closing");
        close.close();
    });

    let result = probe::run(&mut session, config.connection.tty).await;
    session.disconnect().await;
    result?;

    Ok(())
}
