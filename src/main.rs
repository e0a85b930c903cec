use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use proxy_scraper_checker::{
    http::{HttpClient, ReqwestClient},
    logging::init_logging,
    output::{write_results, OutputOptions},
    progress::{ProgressBoard, ProgressSink},
    proxy::{sort_proxies, GeoLocator, Proxy, ProxyChecker, ProxyCrawler, ProxyParser, ProxyType},
    settings::Settings,
    storage::ProxyStorage,
    tui::run_with_dashboard,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Log file name under the output directory while the dashboard owns the terminal
const LOG_FILE_NAME: &str = "proxy_scraper_checker.log";

/// Scrape proxy lists from many sources and check them concurrently
#[derive(Parser)]
#[command(name = "proxy-scraper-checker")]
#[command(about = "Scrape proxy lists from many sources and check them concurrently")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log to the terminal instead of showing the dashboard
    #[arg(long)]
    no_tui: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape, check, sort and save proxies (default)
    Run,
    /// Print the proxies found in a file without checking them
    Parse {
        /// Input file containing proxies
        input: PathBuf,
        /// Protocol for entries without a scheme (http, socks4, socks5)
        #[arg(short = 't', long, default_value = "http")]
        proxy_type: ProxyType,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Parse { input, proxy_type }) => parse(input, *proxy_type),
        Some(Commands::Run) | None => run(&cli).await,
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(&cli.config)
        .with_context(|| format!("failed to load settings from {}", cli.config.display()))?;
    let settings = Arc::new(settings);

    let use_tui = !cli.no_tui && std::io::stdout().is_terminal();
    let log_file = use_tui.then(|| settings.output.path.join(LOG_FILE_NAME));
    init_logging(&settings.logging.level, log_file.as_deref())?;

    info!(
        sources = settings.total_sources(),
        max_connections = settings.max_connections,
        check_website = %settings.check_website,
        "starting"
    );

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestClient::new()?);
    let board = ProgressBoard::new();
    let work = scrape_and_check(settings.clone(), client, &board);

    let mut proxies = if use_tui {
        match run_with_dashboard(&board, work).await? {
            Some(proxies) => proxies,
            None => {
                info!("interrupted, nothing written");
                return Ok(());
            }
        }
    } else {
        work.await
    };

    sort_proxies(&mut proxies, settings.sort_by)?;

    let geo = settings.output.mmdb_path.as_ref().and_then(|path| {
        GeoLocator::from_path(path)
            .map_err(|err| warn!(path = %path.display(), "geolocation disabled: {}", err))
            .ok()
    });

    let options = OutputOptions::from_settings(&settings);
    write_results(&proxies, &options, geo.as_ref())?;

    println!(
        "{} working proxies saved to {}",
        proxies.len(),
        settings.output.path.display()
    );
    Ok(())
}

/// Scrape every configured source, then check everything that was found
async fn scrape_and_check(
    settings: Arc<Settings>,
    client: Arc<dyn HttpClient>,
    progress: &dyn ProgressSink,
) -> Vec<Proxy> {
    let storage = ProxyStorage::new();
    let crawler = ProxyCrawler::new(client.clone());
    crawler
        .scrape_all(&settings.sources, settings.source_timeout, &storage, progress)
        .await;
    for (protocol, proxies) in storage.grouped() {
        info!(protocol = protocol.name(), count = proxies.len(), "unique proxies");
    }

    let checker = ProxyChecker::new(client, settings);
    checker.check_all(storage.snapshot(), progress).await
}

fn parse(input: &Path, proxy_type: ProxyType) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    match ProxyParser::parse(&text, proxy_type) {
        Some(matches) => {
            for proxy in matches {
                println!("{}", proxy);
            }
        }
        None => eprintln!("No proxies found in {}", input.display()),
    }
    Ok(())
}
