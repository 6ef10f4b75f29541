// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

use quote_sync::{
    export_to_dir, import_file, lock_store, logging, open_store, shared, CategoryIndex, Config,
    HttpRemoteSource, SyncScheduler, TickOutcome, ALL_CATEGORIES,
};

const USAGE: &str = "Usage: quote-sync [list [category] | categories | random [category] | \
add <text> <category> | import <file> | export [dir] | sync]";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = Config::from_env();

    match args.first().map(String::as_str) {
        None => run_ui_mode(&config)?,
        Some("help") | Some("--help") | Some("-h") => println!("{}", USAGE),
        Some(command) => {
            logging::init_tracing(config.log_format, &config.log_level);
            run_command(command, &args[1..], &config)?;
        }
    }

    Ok(())
}

fn build_scheduler(config: &Config) -> Result<SyncScheduler> {
    let store = shared(open_store(config));
    let remote = HttpRemoteSource::from_config(config).context("Failed to build HTTP client")?;
    log::debug!("Remote source: {}", remote.url());
    Ok(SyncScheduler::new(store, Arc::new(remote), config.sync_interval))
}

fn run_command(command: &str, rest: &[String], config: &Config) -> Result<()> {
    let scheduler = build_scheduler(config)?;
    let category = rest.first().map(String::as_str).unwrap_or(ALL_CATEGORIES);

    match command {
        "list" => {
            let store = lock_store(scheduler.store());
            let quotes = CategoryIndex::filter(&store, category);
            for quote in &quotes {
                println!("{:>4}  {}", quote.id, quote.display_line());
            }
            println!("\n✓ {} quote(s) in {:?}", quotes.len(), category);
        }
        "categories" => {
            let store = lock_store(scheduler.store());
            for name in CategoryIndex::categories(&store) {
                println!("{}", name);
            }
        }
        "random" => {
            let mut store = lock_store(scheduler.store());
            let picked = CategoryIndex::random(&store, category, &mut rand::thread_rng()).cloned();
            match picked {
                Some(quote) => {
                    println!("{}", quote.display_line());
                    store.remember_last_viewed(&quote);
                }
                None => println!("No quotes available in this category!"),
            }
        }
        "add" => {
            let (text, category) = match rest {
                [text, category, ..] => (text.as_str(), category.as_str()),
                _ => bail!("{}", USAGE),
            };
            let runtime = Runtime::new()?;
            let _enter = runtime.enter();

            let quote = lock_store(scheduler.store()).add(text, category)?;
            println!("✓ New quote added successfully! (id {})", quote.id);

            // Wait for the push so the process does not exit before it is sent
            let push = scheduler.push_in_background(quote);
            runtime.block_on(push)?;
        }
        "import" => {
            let path = rest.first().context(USAGE)?;
            let added = import_file(&mut lock_store(scheduler.store()), Path::new(path))?;
            println!("✓ Quotes imported successfully! ({} added)", added.len());
        }
        "export" => {
            let dir = rest.first().map(String::as_str).unwrap_or(".");
            let path = export_to_dir(&lock_store(scheduler.store()), Path::new(dir))?;
            println!("✓ Exported to {}", path.display());
        }
        "sync" => {
            let runtime = Runtime::new()?;
            match runtime.block_on(scheduler.tick()) {
                TickOutcome::Completed(report) => {
                    println!("✓ {}", report.summary());
                    if let Some(notice) = report.notice() {
                        println!("{}", notice);
                    }
                }
                TickOutcome::Skipped => println!("Sync already in progress"),
                TickOutcome::Failed(e) => bail!("Sync failed: {}", e),
            }
        }
        other => bail!("Unknown command {:?}\n{}", other, USAGE),
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    println!("🖥️  Loading Quote Sync UI...\n");

    let runtime = Runtime::new()?;
    let scheduler = build_scheduler(config)?;

    let count = lock_store(scheduler.store()).len();
    println!("✓ Loaded {} quotes\n", count);
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(scheduler, runtime.handle().clone());
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use a command: {}", USAGE);
    std::process::exit(1);
}
