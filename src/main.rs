use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pagerouter::api::HttpApiClient;
use pagerouter::core::cache::CacheSlot;
use pagerouter::core::config::{self, ResolvedConfig};
use pagerouter::core::document::PageMetadata;
use pagerouter::core::lifecycle::Announcement;
use pagerouter::core::nav_tree::{NavigationTree, resolve_root};
use pagerouter::core::storage::{FileStorage, SessionStorage};
use pagerouter::host::memory::{
    MemoryComponents, MemoryDom, MemoryLocation, RecordingAnnouncer, RecordingEngine, StepAnimator,
};
use pagerouter::{Host, NavigationController};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(name = "pagerouter", about = "Headless driver for the page navigation core")]
struct Args {
    /// Site origin to fetch collections from
    #[arg(short, long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct PageArgs {
    /// JSON file holding the navigation tree (`{"appTree": [...]}`)
    #[arg(long)]
    nav_tree: Option<PathBuf>,
    /// Page classification: index, offcanvas, collection, ...
    #[arg(long, default_value = "collection")]
    page_type: String,
    /// Page (collection) id
    #[arg(long)]
    page_id: Option<String>,
    /// Current location pathname
    #[arg(long, default_value = "/")]
    pathname: String,
}

#[derive(Subcommand)]
enum Command {
    /// Print the root path for a page
    Resolve(PageArgs),
    /// Load and parse the root index for a page, print its fragment markup
    FetchRoot(PageArgs),
    /// Load the root index as JSON and pretty-print it
    FetchIndex(PageArgs),
    /// Run cache operations (set:KEY=JSON, get:KEY, remove:KEY, dump, flush)
    Cache { ops: Vec<CacheOp> },
}

#[derive(Clone, Debug)]
enum CacheOp {
    Set(String, serde_json::Value),
    Get(String),
    Remove(String),
    Dump,
    Flush,
}

impl FromStr for CacheOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("set", rest)) => {
                let (key, json) = rest
                    .split_once('=')
                    .ok_or_else(|| format!("expected set:KEY=JSON, got {s:?}"))?;
                let value = serde_json::from_str(json).map_err(|e| format!("bad JSON: {e}"))?;
                Ok(CacheOp::Set(key.to_string(), value))
            }
            Some(("get", key)) => Ok(CacheOp::Get(key.to_string())),
            Some(("remove", key)) => Ok(CacheOp::Remove(key.to_string())),
            None if s == "dump" => Ok(CacheOp::Dump),
            None if s == "flush" => Ok(CacheOp::Flush),
            _ => Err(format!("unknown cache op {s:?}")),
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn load_page(
    args: &PageArgs,
) -> Result<(NavigationTree, PageMetadata), Box<dyn std::error::Error>> {
    let tree = match &args.nav_tree {
        Some(path) => NavigationTree::from_json(&std::fs::read_to_string(path)?)?,
        None => NavigationTree::default(),
    };
    let mut page = PageMetadata::new().with("type", args.page_type.as_str());
    if let Some(id) = &args.page_id {
        page = page.with("id", id.as_str());
    }
    Ok((tree, page))
}

/// A controller over the in-memory host, fetching from the configured site.
fn headless_controller(
    config: &ResolvedConfig,
    args: &PageArgs,
) -> Result<(NavigationController, Arc<RecordingAnnouncer>), Box<dyn std::error::Error>> {
    let (tree, page) = load_page(args)?;
    let announcer = Arc::new(RecordingAnnouncer::new());
    let host = Host {
        dom: Arc::new(MemoryDom::new(tree, page)),
        location: Arc::new(MemoryLocation::new(config.base_url.clone(), args.pathname.clone())),
        engine: Arc::new(RecordingEngine::new()),
        animator: Arc::new(StepAnimator::new(1)),
        components: Arc::new(MemoryComponents::default()),
        announcer: announcer.clone(),
        api: Arc::new(HttpApiClient::new(config.base_url.clone())),
    };
    let controller = NavigationController::new(host, config.router.clone())?;
    Ok((controller, announcer))
}

async fn fetch_root(config: &ResolvedConfig, args: &PageArgs) -> CliResult {
    let (mut controller, announcer) = headless_controller(config, args)?;
    controller.init().await?;
    if announcer.published().is_empty() {
        // Index pages are their own root and skip the background load.
        controller.load_root_index().await?;
    }
    for announcement in announcer.published() {
        if let Announcement::RootFragmentReady(markup) = announcement {
            println!("{markup}");
        }
    }
    Ok(())
}

async fn fetch_index(config: &ResolvedConfig, args: &PageArgs) -> CliResult {
    let (mut controller, _) = headless_controller(config, args)?;
    if let Err(e) = controller.init().await {
        log::warn!("Root index preload failed: {}", e);
    }
    let mut payload = None;
    controller.load_full_index(|value| payload = Some(value)).await?;
    if let Some(value) = payload {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

fn run_cache(config: &ResolvedConfig, ops: &[CacheOp]) -> CliResult {
    let dir = config
        .storage_dir
        .clone()
        .or_else(FileStorage::default_dir)
        .ok_or("could not determine storage directory")?;
    let storage = Arc::new(FileStorage::open(&dir)?);
    let slot = CacheSlot::new();
    let cache = slot.get_or_init(config.cache.clone(), storage.clone())?;

    for op in ops {
        match op {
            CacheOp::Set(key, value) => cache.set(key, value.clone())?,
            CacheOp::Get(key) => match cache.get(Some(key)) {
                Some(value) => println!("{key}: {value}"),
                None => println!("{key}: (not found)"),
            },
            CacheOp::Remove(key) => cache.remove(key),
            CacheOp::Dump => println!("{}", cache.get(None).unwrap_or_default()),
            CacheOp::Flush => cache.flush()?,
        }
    }

    match storage.get_item(&config.cache.storage_key) {
        Some(raw) => println!("stored: {raw}"),
        None => println!("stored: (nothing, storage disabled)"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> CliResult {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to pagerouter.log in current directory
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create("pagerouter.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config()?;
    let config = config::resolve(&file_config, args.base_url.as_deref());
    log::info!("pagerouter starting up against {}", config.base_url);

    match &args.command {
        Command::Resolve(page_args) => {
            let (tree, page) = load_page(page_args)?;
            println!("{}", resolve_root(&tree, &page, &page_args.pathname));
            Ok(())
        }
        Command::FetchRoot(page_args) => fetch_root(&config, page_args).await,
        Command::FetchIndex(page_args) => fetch_index(&config, page_args).await,
        Command::Cache { ops } => run_cache(&config, ops),
    }
}
