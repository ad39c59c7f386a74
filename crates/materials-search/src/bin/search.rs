//! Run one catalog search from the command line.
//!
//! Usage: `materials-search --url-query "q=steel&sort_by=price" --page 2`

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use materials_search::{
    spawn_search_session, Availability, EngineResult, HistoryMode, HttpListingSource,
    IntentPatch, MemoryLocation, SearchConfig, SearchSnapshot, SortBy, SortOrder, UrlQuery,
};

#[derive(Parser)]
#[command(name = "materials-search")]
#[command(about = "Search the building materials catalog")]
#[command(version)]
struct Cli {
    /// JSON config file; environment overrides still apply
    #[arg(long)]
    config: Option<PathBuf>,

    /// Catalog API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Address query to start from, e.g. "q=steel&page=2"
    #[arg(long, default_value = "")]
    url_query: String,

    #[arg(short, long)]
    query: Option<String>,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    min_price: Option<f64>,

    #[arg(long)]
    max_price: Option<f64>,

    #[arg(long)]
    supplier: Option<String>,

    /// "In Stock", "Limited Stock" or "Out of Stock"
    #[arg(long)]
    availability: Option<Availability>,

    /// name, price, lead_time_days or availability
    #[arg(long)]
    sort_by: Option<SortBy>,

    #[arg(long)]
    sort_order: Option<SortOrder>,

    #[arg(short, long)]
    page: Option<u32>,
}

impl Cli {
    fn patch(&self) -> IntentPatch {
        let mut patch = IntentPatch::new();
        if let Some(query) = &self.query {
            patch = patch.query(query.clone());
        }
        if let Some(category) = &self.category {
            patch = patch.category(Some(category.clone()));
        }
        if let Some(min_price) = self.min_price {
            patch = patch.price_min(Some(min_price));
        }
        if let Some(max_price) = self.max_price {
            patch = patch.price_max(Some(max_price));
        }
        if let Some(supplier) = &self.supplier {
            patch = patch.supplier_id(Some(supplier.clone()));
        }
        if let Some(availability) = self.availability {
            patch = patch.availability(Some(availability));
        }
        if let Some(sort_by) = self.sort_by {
            patch = patch.sort_by(sort_by);
        }
        if let Some(sort_order) = self.sort_order {
            patch = patch.sort_order(sort_order);
        }
        if let Some(page) = self.page {
            patch = patch.page(page);
        }
        patch
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("materials_search=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run(Cli::parse()).await {
        eprintln!("materials-search: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> EngineResult<()> {
    let mut config = match &cli.config {
        Some(path) => SearchConfig::load(path)?,
        None => SearchConfig::from_env(),
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }

    let source = Arc::new(HttpListingSource::new(&config)?);
    let location = Arc::new(MemoryLocation::with_query(
        config.location_path.clone(),
        UrlQuery::from_raw(&cli.url_query),
    ));
    let session = spawn_search_session(config, source, location.clone());
    let handle = session.handle().clone();

    let patch = cli.patch();
    if !patch.is_empty() {
        handle.apply_external_intent_with_mode(patch, HistoryMode::Replace);
    }
    handle.sync().await?;
    let snapshot = handle.settled().await?;

    print_snapshot(&snapshot);
    println!("\nlocation: {}", location.href());

    session.join().await;
    Ok(())
}

fn print_snapshot(snapshot: &SearchSnapshot) {
    if let Some(error) = &snapshot.error {
        println!("error: {error}");
    }

    for material in snapshot.materials() {
        let price = match (material.price, material.unit.as_deref()) {
            (Some(price), Some(unit)) => format!("{price:.2}/{unit}"),
            (Some(price), None) => format!("{price:.2}"),
            _ => "-".to_string(),
        };
        println!(
            "{:>6}  {:<40}  {:<16}  {:>12}  {:<20}  {}",
            material.id,
            material.name,
            material.category.as_deref().unwrap_or("-"),
            price,
            material.supplier_name.as_deref().unwrap_or("-"),
            material.availability.as_deref().unwrap_or("-"),
        );
    }

    println!(
        "\npage {} of {} ({} materials)",
        snapshot.page(),
        snapshot.total_pages(),
        snapshot.total_materials()
    );
    if !snapshot.categories.is_empty() {
        println!("categories: {}", snapshot.categories.join(", "));
    }
}
