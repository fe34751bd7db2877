//! esxi-exporter - ESXi virtual switch port statistics over HTTP.
//!
//! Serves `GET /metrics`; each request runs a full `vsish` poll.

mod access_log;
mod handlers;
mod shutdown;
mod state;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use esxi_exporter_core::VERSION;
use esxi_exporter_core::collector::ResolverOptions;
use esxi_exporter_core::exporter::Exporter;
use esxi_exporter_core::vsish::{MockVsish, Vsish, VsishCommand};

use state::SharedExporter;

// ============================================================
// CLI
// ============================================================

#[derive(Parser, Debug)]
#[command(
    name = "esxi-exporter",
    about = "Exports ESXi virtual switch port statistics for scraping",
    version = VERSION
)]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 8080, env = "ESXI_EXPORTER_PORT")]
    port: u16,

    /// Address to listen on.
    #[arg(short, long, default_value = "0.0.0.0", env = "ESXI_EXPORTER_LISTEN")]
    listen: IpAddr,

    /// Path to the vsish binary.
    #[arg(long, default_value = "vsish", env = "ESXI_EXPORTER_VSISH")]
    vsish: PathBuf,

    /// Timeout in seconds for each vsish (and hostname) invocation.
    #[arg(
        long,
        default_value_t = 10,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        env = "ESXI_EXPORTER_COMMAND_TIMEOUT"
    )]
    command_timeout: u64,

    /// Also export e1000 rx/tx queue statistics for E1000 vNICs.
    #[arg(long)]
    e1000_stats: bool,

    /// Serve a built-in sample host instead of running vsish.
    #[arg(long)]
    mock: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes logging based on verbosity flags.
///
/// `RUST_LOG` directives are kept; the flags set the level for this crate
/// and the core library.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["esxi_exporter", "esxi_exporter_core"] {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(args)) {
        error!(error = %e, "server error");
        process::exit(1);
    }
}

async fn run(args: Args) -> std::io::Result<()> {
    let timeout = Duration::from_secs(args.command_timeout);
    let options = ResolverOptions {
        e1000_stats: args.e1000_stats,
    };

    let vsish: Box<dyn Vsish> = if args.mock {
        info!("serving built-in sample host");
        Box::new(MockVsish::sample_host())
    } else {
        info!(binary = %args.vsish.display(), timeout = ?timeout, "using vsish");
        Box::new(VsishCommand::new(&args.vsish).with_timeout(timeout))
    };

    let exporter = Exporter::new(vsish, options).with_hostname_timeout(timeout);
    let state: SharedExporter = Arc::new(Mutex::new(exporter));

    let app = handlers::router(state).into_make_service_with_connect_info::<SocketAddr>();

    let addr = SocketAddr::new(args.listen, args.port);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, version = VERSION, e1000_stats = args.e1000_stats, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    info!("stopped");
    Ok(())
}
