//! Typed access to the recipe API.
//!
//! Every call goes retry policy -> shared scheduler -> fetcher, then the
//! body is decoded. An empty answer (`"meals": null`) is never an error.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::endpoint::Endpoint;
use crate::error::AppError;
use crate::models::{CategoriesEnvelope, Category, Meal, MealSummary, MealsEnvelope};
use crate::retry::RetryPolicy;
use crate::scheduler::Scheduler;
use crate::traits::{Fetcher, RandomSource};

/// Recipe API client built on an injected [`Fetcher`].
#[derive(Clone)]
pub struct RecipeService<F: Fetcher> {
    fetcher: F,
    config: ApiConfig,
    scheduler: Arc<Scheduler>,
    retry: RetryPolicy,
    random_retry: RetryPolicy,
}

impl<F: Fetcher> RecipeService<F> {
    /// Random-recipe calls default to a single attempt: the batch loop
    /// already treats a failure as one spent attempt of its own budget.
    pub fn new(fetcher: F, config: ApiConfig, scheduler: Arc<Scheduler>) -> Self {
        Self {
            fetcher,
            config,
            scheduler,
            retry: RetryPolicy::default(),
            random_retry: RetryPolicy::fail_fast(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_random_retry(mut self, retry: RetryPolicy) -> Self {
        self.random_retry = retry;
        self
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        policy: &RetryPolicy,
    ) -> Result<T, AppError> {
        let url = endpoint.url(&self.config)?;
        tracing::debug!(%endpoint, "Calling recipe API");

        let body = policy
            .run(&self.scheduler, || self.fetcher.fetch(&url))
            .await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(%endpoint, error = %e, "Malformed response body");
            AppError::SerializationError(e)
        })
    }

    /// Recipes whose name matches `query`.
    pub async fn search(&self, query: &str) -> Result<Vec<Meal>, AppError> {
        let envelope: MealsEnvelope<Meal> =
            self.get_json(&Endpoint::search(query), &self.retry).await?;
        Ok(envelope.meals.unwrap_or_default())
    }

    pub async fn lookup(&self, id: &str) -> Result<Option<Meal>, AppError> {
        let envelope: MealsEnvelope<Meal> =
            self.get_json(&Endpoint::lookup(id), &self.retry).await?;
        Ok(first(envelope))
    }

    /// One random recipe, using the same retry policy as other lookups.
    pub async fn random(&self) -> Result<Option<Meal>, AppError> {
        self.random_with(&self.retry).await
    }

    async fn random_with(&self, policy: &RetryPolicy) -> Result<Option<Meal>, AppError> {
        let envelope: MealsEnvelope<Meal> = self.get_json(&Endpoint::Random, policy).await?;
        Ok(first(envelope))
    }

    pub async fn filter_by_category(&self, category: &str) -> Result<Vec<MealSummary>, AppError> {
        let envelope: MealsEnvelope<MealSummary> = self
            .get_json(&Endpoint::filter_by_category(category), &self.retry)
            .await?;
        Ok(envelope.meals.unwrap_or_default())
    }

    pub async fn categories(&self) -> Result<Vec<Category>, AppError> {
        let envelope: CategoriesEnvelope =
            self.get_json(&Endpoint::Categories, &self.retry).await?;
        Ok(envelope.categories.unwrap_or_default())
    }
}

fn first<T>(envelope: MealsEnvelope<T>) -> Option<T> {
    envelope.meals.and_then(|meals| meals.into_iter().next())
}

impl<F: Fetcher> RandomSource for RecipeService<F> {
    async fn random_meal(&self) -> Result<Option<Meal>, AppError> {
        self.random_with(&self.random_retry).await
    }
}
