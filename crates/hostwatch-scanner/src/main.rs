//! CLI entry point for the hostwatch scanner daemon.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use hostwatch_store::{InventoryStore, Neo4jStore};

use hostwatch_scanner::clock::TokioSleeper;
use hostwatch_scanner::config;
use hostwatch_scanner::probe::NmapProbe;
use hostwatch_scanner::scheduler::ScanScheduler;

#[derive(Parser)]
#[command(name = "hostwatch-scanner")]
#[command(about = "Continuously inventory hosts, services and vulnerabilities on a network")]
struct Cli {
    /// Target to scan (CIDR notation or single IP). Overrides scanner.target.
    #[arg(short, long)]
    target: Option<String>,

    /// Run a single scan cycle and exit.
    #[arg(long)]
    once: bool,

    /// Create the inventory schema in Neo4j and exit.
    #[arg(long)]
    init_schema: bool,

    /// Skip the warm-up delay before the readiness check.
    #[arg(long)]
    skip_warmup: bool,

    /// Config file prefix (default: hostwatch).
    #[arg(short, long, default_value = "hostwatch")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();

    let cli = Cli::parse();
    let mut app = config::load(&cli.config)?;
    if let Some(target) = cli.target {
        app.scanner.target = Some(target);
    }
    if cli.skip_warmup {
        app.scanner.warmup_secs = 0;
    }

    let store = Neo4jStore::connect(&app.neo4j).await?;

    if cli.init_schema {
        store.ensure_schema().await?;
        return Ok(());
    }

    let probe = NmapProbe::new(&app.scanner.nmap_path);
    let version = probe.verify_installation().await?;
    tracing::info!(nmap_version = %version.lines().next().unwrap_or_default(), "Nmap verified");

    tracing::info!("Scanner service started");
    let sched = ScanScheduler::new(app.scanner, probe, store, TokioSleeper);

    if cli.once {
        let report = sched.run_once().await?;
        tracing::info!(
            live_hosts = report.live_hosts,
            failed = report.failed.len(),
            "One-shot scan finished"
        );
    } else {
        sched.run().await?;
    }

    Ok(())
}
