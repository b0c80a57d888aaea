use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pantry_client::{ReqwestFetcher, ReqwestImageLoader};
use pantry_core::{
    ApiConfig, AppError, BatchConfig, BatchFetcher, ImagePreloader, Meal, RecipeService,
    Scheduler, SchedulerConfig, fallback_thumbnails, fill_with_fallback,
};

#[derive(Parser)]
#[command(name = "pantry", version, about = "Rate-limit-aware TheMealDB client")]
struct Cli {
    #[command(flatten)]
    api: ApiArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the `MEALDB_*` environment configuration.
#[derive(Args)]
struct ApiArgs {
    /// Recipe API base URL [env: MEALDB_BASE_URL]
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// API key path segment, the public test key is "1" [env: MEALDB_API_KEY]
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds [env: MEALDB_TIMEOUT_SECS]
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

impl ApiArgs {
    /// Layer the command-line flags over `base` and validate the result.
    fn apply(&self, mut base: ApiConfig) -> Result<ApiConfig, AppError> {
        if let Some(base_url) = &self.base_url {
            base.base_url = base_url.clone();
        }
        if let Some(api_key) = &self.api_key {
            base.api_key = api_key.clone();
        }
        if let Some(secs) = self.timeout {
            base.timeout = Duration::from_secs(secs);
        }
        base.validate()?;
        Ok(base)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search recipes by name
    Search {
        /// Name fragment to search for
        query: String,
    },

    /// Look up one recipe by id
    Lookup {
        /// Recipe id (e.g. 52772)
        id: String,
    },

    /// Fetch one random recipe
    Random,

    /// List recipes in a category
    Category {
        /// Category name (e.g. "Seafood")
        name: String,
    },

    /// List all categories
    Categories,

    /// Fetch a batch of distinct random recipes
    Batch {
        /// Number of distinct recipes wanted
        #[arg(short, long, default_value_t = 6)]
        count: usize,

        /// Skip warming the recipes' thumbnails
        #[arg(long, default_value_t = false)]
        no_preload: bool,

        /// Top up a short or empty batch with built-in recipes
        #[arg(long, default_value_t = false)]
        fallback: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pantry=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let service = build_service(&cli.api)?;

    match cli.command {
        Commands::Search { query } => {
            let meals = service.search(&query).await.map_err(report)?;
            if meals.is_empty() {
                tracing::info!(%query, "No recipes found");
            }
            print_json(&meals)?;
        }
        Commands::Lookup { id } => {
            let meal = service.lookup(&id).await.map_err(report)?;
            if meal.is_none() {
                tracing::info!(%id, "No recipe with this id");
            }
            print_json(&meal)?;
        }
        Commands::Random => {
            let meal = service.random().await.map_err(report)?;
            print_json(&meal)?;
        }
        Commands::Category { name } => {
            let meals = service.filter_by_category(&name).await.map_err(report)?;
            print_json(&meals)?;
        }
        Commands::Categories => {
            let categories = service.categories().await.map_err(report)?;
            print_json(&categories)?;
        }
        Commands::Batch {
            count,
            no_preload,
            fallback,
        } => {
            let meals = cmd_batch(service, count, !no_preload, fallback).await?;
            print_json(&meals)?;
        }
    }

    Ok(())
}

fn build_service(args: &ApiArgs) -> Result<RecipeService<ReqwestFetcher>> {
    let config = ApiConfig::from_env()
        .and_then(|env| args.apply(env))
        .map_err(|e| anyhow::anyhow!(e))?;

    let fetcher = ReqwestFetcher::from_config(&config).context("Failed to create HTTP client")?;
    let scheduler = Scheduler::new(SchedulerConfig::default().with_request_timeout(config.timeout));

    Ok(RecipeService::new(fetcher, config, Arc::new(scheduler)))
}

async fn cmd_batch(
    service: RecipeService<ReqwestFetcher>,
    count: usize,
    preload: bool,
    fallback: bool,
) -> Result<Vec<Meal>> {
    let scheduler = Arc::clone(service.scheduler());
    let batch = BatchFetcher::new(service, BatchConfig::default());
    let preloader = if preload {
        let loader = ReqwestImageLoader::new().context("Failed to create image client")?;
        Some(ImagePreloader::new(loader))
    } else {
        None
    };

    // Warm the fallback thumbnails while the batch runs.
    let warm_fallback = async {
        if let (true, Some(preloader)) = (fallback, &preloader) {
            preloader.preload_all(fallback_thumbnails()).await;
        }
    };
    let (fetched, ()) = tokio::join!(batch.fetch_unique_batch(count), warm_fallback);

    let mut meals = match fetched {
        Ok(meals) => meals,
        Err(e @ AppError::EmptyBatch { .. }) if fallback => {
            tracing::warn!(error = %e, "Using built-in recipes");
            Vec::new()
        }
        Err(e) => return Err(report(e)),
    };

    if fallback {
        fill_with_fallback(&mut meals, count);
    }

    if let Some(preloader) = &preloader {
        let summary = preloader.preload_meals(&meals).await;
        tracing::info!(loaded = summary.loaded, failed = summary.failed, "Thumbnails warmed");
    }

    let stats = scheduler.snapshot();
    tracing::info!(
        collected = meals.len(),
        requested = count,
        mode = %stats.mode,
        "Batch ready"
    );
    for meal in &meals {
        let label = meal.category_area_label();
        if label.is_empty() {
            tracing::info!("  {}", meal.name);
        } else {
            tracing::info!("  {} ({label})", meal.name);
        }
    }

    Ok(meals)
}

/// Attach a retry hint to errors the user can simply try again.
fn report(e: AppError) -> anyhow::Error {
    if e.is_user_retryable() {
        anyhow::Error::new(e)
            .context("The recipe service is busy or unreachable, please try again in a moment")
    } else {
        anyhow::Error::new(e)
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
