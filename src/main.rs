mod capture;
mod catalog;
mod config;
mod history;
mod logging;
mod resolver;
mod route;
mod search;
mod store;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use config::Config;
use resolver::ResultsPage;
use route::Route;
use store::{FileStore, StoreSource};

#[derive(Parser, Debug)]
#[command(name = "shopease", about = "Terminal storefront for the ShopEase catalog")]
struct Cli {
    /// Configuration file (defaults to <config dir>/shopease/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Store state file, overriding the configured one
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the catalog the way the navigation bar does
    Search(SearchArgs),
    /// Resolve a navigation target (e.g. "/productcherche?q=shirt")
    Open(OpenArgs),
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Free text, matched against product names
    query: String,

    /// Print the results as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct OpenArgs {
    target: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let _guard = logging::init_tui()?;
        let config = load_config(cli.config, cli.store)?;
        return run_tui(&config);
    };

    logging::init_cli();
    let config = load_config(cli.config, cli.store)?;
    match command {
        Command::Search(args) => handle_search(args, &config),
        Command::Open(args) => handle_open(args, &config),
    }
}

fn load_config(path: Option<PathBuf>, store: Option<PathBuf>) -> Result<Config> {
    let mut config = config::load(path.as_deref())?;
    if let Some(store) = store {
        config.store_path = store;
    }
    if let Some(path) = &config.config_path {
        tracing::debug!(path = %path.display(), "loaded configuration");
    }
    Ok(config)
}

fn open_store(config: &Config) -> Result<FileStore> {
    FileStore::open(&config.store_path)
        .with_context(|| format!("unable to open store {}", config.store_path.display()))
}

fn run_tui(config: &Config) -> Result<()> {
    // The first load happens inside the app, which reports a bad store file
    // on the status line instead of exiting.
    let store = FileStore::new(&config.store_path);
    let mut app = ui::app::App::new(config, Box::new(store));
    app.run()
}

fn handle_search(args: SearchArgs, config: &Config) -> Result<()> {
    let target = match capture::submit(&args.query).target() {
        Some(target) => target,
        None => {
            if args.json {
                print_json(&ResultsPage::default())?;
            } else {
                println!("Nothing to search");
            }
            return Ok(());
        }
    };

    let page = resolve_target(&target, config)?;
    if args.json {
        print_json(&page)
    } else {
        print_page(&page, config);
        Ok(())
    }
}

fn handle_open(args: OpenArgs, config: &Config) -> Result<()> {
    match Route::parse(&args.target) {
        Route::Search { .. } => {
            let page = resolve_target(&args.target, config)?;
            print_page(&page, config);
        }
        Route::NotFound { path } => println!("NOT FOUND: {}", path),
        route => println!("{}", route.title()),
    }
    Ok(())
}

fn resolve_target(target: &str, config: &Config) -> Result<ResultsPage> {
    let store = open_store(config)?;
    let snapshot = store.snapshot();
    Ok(resolver::resolve(target, &snapshot.catalog, config.search_fields))
}

fn print_page(page: &ResultsPage, config: &Config) {
    println!("{}", page.heading());
    println!("{}", page.count_label());

    // Results: name<TAB>price<TAB>image
    for row in page.rows(&config.currency) {
        println!("{}\t{}\t{}", row.name, row.price, row.image);
    }
}

fn print_json(page: &ResultsPage) -> Result<()> {
    let body = serde_json::json!({
        "query": page.query,
        "count": page.results.len(),
        "items": page.results.items(),
    });
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
