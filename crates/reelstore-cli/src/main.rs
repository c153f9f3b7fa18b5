//! reelstore - 1980s movie storefront catalog CLI.

/// Application configuration (TOML).
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, resolve_config_path};
use reelstore_api::tmdb::{ImageUrls, MovieSort, TmdbClient, extract_certification};
use reelstore_catalog::{
    CacheStore, Catalog, MOVIE_GENRES, Movie, PageFilter, PrefetchOutcome, PrefetchReport,
    format_runtime, release_year,
};

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config/data directory.
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Browse 1980s movies.
    Discover(DiscoverArgs),
    /// Search 1980s movies by title.
    Search(SearchArgs),
    /// Show one movie with certification and runtime.
    Details(DetailsArgs),
    /// List known genre IDs.
    Genres,
    /// Response cache operations.
    Cache(CacheCommand),
    /// Config file operations.
    Config(ConfigCommand),
}

/// Arguments for the `discover` subcommand.
#[derive(clap::Args)]
struct DiscoverArgs {
    /// Result page.
    #[arg(long, default_value_t = 1)]
    page: u32,
    /// Restrict to a genre ID (see `reelstore genres`).
    #[arg(long)]
    genre: Option<u32>,
    /// Sort order as a TMDB `sort_by` value (e.g. "vote_average.desc").
    #[arg(long)]
    sort: Option<MovieSort>,
    /// Fetch rating, runtime and tagline for every movie on the page.
    #[arg(long)]
    enrich: bool,
    /// Warm the cache for the next page before exiting.
    #[arg(long)]
    warm_next: bool,
}

/// Arguments for the `search` subcommand.
#[derive(clap::Args)]
struct SearchArgs {
    /// Title query (e.g. "back to the future").
    #[arg(long, required = true)]
    query: String,
    /// Result page.
    #[arg(long, default_value_t = 1)]
    page: u32,
}

/// Arguments for the `details` subcommand.
#[derive(clap::Args)]
struct DetailsArgs {
    /// TMDB movie ID.
    #[arg(long, required = true)]
    id: u64,
}

/// Arguments for the `cache` subcommand.
#[derive(clap::Args)]
struct CacheCommand {
    /// Cache subcommand to run.
    #[command(subcommand)]
    command: CacheSubcommands,
}

/// Available cache subcommands.
#[derive(Subcommand)]
enum CacheSubcommands {
    /// Remove every cached TMDB response.
    Clear,
}

/// Arguments for the `config` subcommand.
#[derive(clap::Args)]
struct ConfigCommand {
    /// Config subcommand to run.
    #[command(subcommand)]
    command: ConfigSubcommands,
}

/// Available config subcommands.
#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Write a config file with default values.
    Init(ConfigInitArgs),
}

/// Arguments for the `config init` subcommand.
#[derive(clap::Args)]
struct ConfigInitArgs {
    /// Overwrite an existing config file.
    #[arg(long)]
    force: bool,
}

/// Builds the TMDB client from `TMDB_API_KEY` and the configured base URL.
///
/// # Errors
///
/// Returns an error if `TMDB_API_KEY` is not set or the client fails to build.
fn build_tmdb_client(config: &AppConfig) -> Result<TmdbClient> {
    let api_key =
        std::env::var("TMDB_API_KEY").context("TMDB_API_KEY environment variable is required")?;

    TmdbClient::builder()
        .base_url(config.api_base_url()?)
        .api_key(api_key)
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .build()
        .context("failed to build TMDB client")
}

/// Opens the response cache, persistent unless disabled in config.
///
/// # Errors
///
/// Returns an error if the database cannot be opened.
fn open_cache(config: &AppConfig, dir: Option<&PathBuf>) -> Result<CacheStore> {
    if !config.cache.persist {
        return Ok(CacheStore::memory_only());
    }
    let conn = reelstore_db::open_cache_db(dir.map(PathBuf::as_path))
        .context("failed to open cache database")?;
    Ok(CacheStore::with_connection(conn))
}

/// Loads config and wires the catalog.
///
/// # Errors
///
/// Returns an error if config, client or cache setup fails.
fn build_catalog(dir: Option<&PathBuf>) -> Result<(AppConfig, Catalog<TmdbClient>)> {
    let config_path = resolve_config_path(dir)?;
    let config = AppConfig::load(&config_path)?;
    let client = build_tmdb_client(&config)?;
    let catalog_config = config.catalog_config()?;
    let cache = open_cache(&config, dir)?;
    Ok((config, Catalog::new(client, cache, catalog_config)))
}

/// Logs one movie as a table row.
fn log_movie_row(movie: &Movie) {
    tracing::info!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        movie.id,
        movie.year,
        movie.rating,
        if movie.runtime.is_empty() { "-" } else { movie.runtime.as_str() },
        if movie.available { "yes" } else { "no" },
        movie.title,
        movie.genres.join(", "),
    );
}

/// Logs how a cache-warming prefetch ended.
async fn report_prefetch(outcome: PrefetchOutcome) {
    match outcome {
        PrefetchOutcome::NoNextPage => tracing::info!("No next page to warm"),
        PrefetchOutcome::AlreadyCached => tracing::info!("Next page already cached"),
        PrefetchOutcome::Launched(handle) => match handle.await {
            Ok(PrefetchReport::Completed) => tracing::info!("Next page cached"),
            Ok(PrefetchReport::Failed(_)) => {}
            Err(e) => tracing::warn!(error = %e, "prefetch task did not finish"),
        },
    }
}

/// Runs the `discover` subcommand.
///
/// # Errors
///
/// Returns an error if setup fails or the page cannot be fetched.
#[instrument(skip_all)]
async fn run_discover(args: &DiscoverArgs, dir: Option<&PathBuf>) -> Result<()> {
    let (_, catalog) = build_catalog(dir)?;
    let catalog = Arc::new(catalog);
    let sort = args.sort.unwrap_or(catalog.config().default_sort);

    let page = catalog
        .fetch_basic_page_sorted(args.page, args.genre, sort)
        .await?;
    let movies = if args.enrich {
        catalog.enrich_many(&page.movies).await
    } else {
        page.movies.clone()
    };

    tracing::info!("ID\tYear\tRating\tRuntime\tInStock\tTitle\tGenres");
    for movie in &movies {
        log_movie_row(movie);
    }
    tracing::info!(
        "Page {}/{} ({} results)",
        page.page,
        page.total_pages,
        page.total_results
    );

    if args.warm_next {
        let outcome = catalog.prefetch_next_page(
            page.page,
            page.total_pages,
            PageFilter::Discover {
                genre: args.genre,
                sort,
            },
        );
        report_prefetch(outcome).await;
    }

    Ok(())
}

/// Runs the `search` subcommand.
///
/// # Errors
///
/// Returns an error if setup fails or the search request fails.
#[instrument(skip_all)]
async fn run_search(args: &SearchArgs, dir: Option<&PathBuf>) -> Result<()> {
    let (_, catalog) = build_catalog(dir)?;

    let page = catalog.search_basic_page(&args.query, args.page).await?;

    tracing::info!("ID\tYear\tRating\tRuntime\tInStock\tTitle\tGenres");
    for movie in &page.movies {
        log_movie_row(movie);
    }
    tracing::info!(
        "Page {}/{} ({} results)",
        page.page,
        page.total_pages,
        page.total_results
    );

    Ok(())
}

/// Runs the `details` subcommand.
///
/// # Errors
///
/// Returns an error if setup fails or the details cannot be fetched.
#[instrument(skip_all)]
async fn run_details(args: &DetailsArgs, dir: Option<&PathBuf>) -> Result<()> {
    let (config, catalog) = build_catalog(dir)?;
    let images = ImageUrls::new(&config.tmdb.image_base_url)?;

    let details = catalog.details_with_certification(args.id).await?;
    let genres: Vec<&str> = details.genres.iter().map(|g| g.name.as_str()).collect();

    tracing::info!("ID:       {}", details.id);
    tracing::info!("Title:    {}", details.title);
    tracing::info!("Year:     {}", release_year(details.release_date.as_deref()));
    tracing::info!(
        "Rating:   {}",
        extract_certification(details.release_dates.as_ref())
    );
    tracing::info!("Runtime:  {}", format_runtime(details.runtime));
    tracing::info!("Genres:   {}", genres.join(", "));
    tracing::info!("Tagline:  {}", details.tagline.as_deref().unwrap_or("-"));
    tracing::info!(
        "Poster:   {}",
        images
            .poster(details.poster_path.as_deref())
            .map_or_else(|| String::from("-"), String::from)
    );

    Ok(())
}

/// Runs the `genres` subcommand.
fn run_genres() {
    tracing::info!("ID\tName");
    for (id, name) in MOVIE_GENRES {
        tracing::info!("{id}\t{name}");
    }
}

/// Runs the `cache clear` subcommand.
///
/// # Errors
///
/// Returns an error if the cache database cannot be opened or cleared.
fn run_cache_clear(dir: Option<&PathBuf>) -> Result<()> {
    let config = AppConfig::load(&resolve_config_path(dir)?)?;
    let cache = open_cache(&config, dir)?;
    let removed = cache.clear()?;
    tracing::info!("Removed {removed} cached responses");
    Ok(())
}

/// Runs the `config init` subcommand.
///
/// # Errors
///
/// Returns an error if the file exists (without `--force`) or cannot be written.
fn run_config_init(args: &ConfigInitArgs, dir: Option<&PathBuf>) -> Result<()> {
    let path = resolve_config_path(dir)?;
    if path.exists() && !args.force {
        bail!(
            "config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    AppConfig::default().save(&path)?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();
    match cli.command {
        Commands::Discover(args) => run_discover(&args, cli.dir.as_ref()).await,
        Commands::Search(args) => run_search(&args, cli.dir.as_ref()).await,
        Commands::Details(args) => run_details(&args, cli.dir.as_ref()).await,
        Commands::Genres => {
            run_genres();
            Ok(())
        }
        Commands::Cache(cache) => match cache.command {
            CacheSubcommands::Clear => run_cache_clear(cli.dir.as_ref()),
        },
        Commands::Config(cfg) => match cfg.command {
            ConfigSubcommands::Init(args) => run_config_init(&args, cli.dir.as_ref()),
        },
    }
}
