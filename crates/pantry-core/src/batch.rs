//! Progressive, deduplicating batch of random recipes.
//!
//! Attempts run strictly one after another so the seen-set needs no lock
//! and the shared scheduler's pacing is respected without extra
//! coordination.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::AppError;
use crate::models::Meal;
use crate::preload::{ImagePreloader, PreloadSummary};
use crate::traits::{ImageLoader, RandomSource};

/// Tunables for one batch fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Attempt budget is `target * budget_multiplier`.
    pub budget_multiplier: u32,
    /// Courtesy delay before the second attempt.
    pub courtesy_base: Duration,
    /// Added to the courtesy delay for every attempt already made.
    pub courtesy_step: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            budget_multiplier: 2,
            courtesy_base: Duration::from_millis(200),
            courtesy_step: Duration::from_millis(50),
        }
    }
}

impl BatchConfig {
    pub fn with_budget_multiplier(mut self, multiplier: u32) -> Self {
        self.budget_multiplier = multiplier;
        self
    }

    pub fn without_courtesy_delay(mut self) -> Self {
        self.courtesy_base = Duration::ZERO;
        self.courtesy_step = Duration::ZERO;
        self
    }

    pub fn budget_for(&self, target: usize) -> u32 {
        let target = u32::try_from(target).unwrap_or(u32::MAX);
        target.saturating_mul(self.budget_multiplier.max(1))
    }

    fn courtesy_delay(&self, attempts: u32) -> Duration {
        self.courtesy_base + self.courtesy_step.saturating_mul(attempts)
    }
}

/// Events emitted while a batch is assembled.
#[derive(Debug, Clone)]
pub enum BatchEvent<'a> {
    Started {
        target: usize,
        budget: u32,
    },
    Attempt {
        attempt: u32,
        budget: u32,
        collected: usize,
    },
    Accepted {
        meal: &'a Meal,
        collected: usize,
    },
    Duplicate {
        id: &'a str,
    },
    Missing {
        attempt: u32,
    },
    Failed {
        attempt: u32,
        error: &'a AppError,
    },
    Finished {
        collected: usize,
        target: usize,
        attempts: u32,
    },
}

/// Receives batch progress (e.g. to drive a loading counter).
pub trait BatchReporter: Send + Sync {
    fn report(&self, event: BatchEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBatchReporter;

impl BatchReporter for TracingBatchReporter {
    fn report(&self, event: BatchEvent<'_>) {
        match event {
            BatchEvent::Started { target, budget } => {
                tracing::info!(target, budget, "Fetching unique random recipes");
            }
            BatchEvent::Attempt {
                attempt,
                budget,
                collected,
            } => {
                tracing::debug!(attempt, budget, collected, "Requesting random recipe");
            }
            BatchEvent::Accepted { meal, collected } => {
                tracing::debug!(id = %meal.id, name = %meal.name, collected, "Got unique recipe");
            }
            BatchEvent::Duplicate { id } => {
                tracing::debug!(%id, "Duplicate recipe, skipping");
            }
            BatchEvent::Missing { attempt } => {
                tracing::debug!(attempt, "API returned no recipe, skipping");
            }
            BatchEvent::Failed { attempt, error } => {
                tracing::warn!(attempt, %error, "Random recipe request failed");
            }
            BatchEvent::Finished {
                collected,
                target,
                attempts,
            } => {
                tracing::info!(collected, target, attempts, "Batch fetch finished");
            }
        }
    }
}

/// Assembles batches of distinct random recipes from a [`RandomSource`].
pub struct BatchFetcher<S> {
    source: S,
    config: BatchConfig,
}

impl<S: RandomSource> BatchFetcher<S> {
    pub fn new(source: S, config: BatchConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch up to `target` distinct recipes, logging progress via `tracing`.
    pub async fn fetch_unique_batch(&self, target: usize) -> Result<Vec<Meal>, AppError> {
        self.fetch_unique_batch_with(target, &TracingBatchReporter)
            .await
    }

    /// Fetch up to `target` distinct recipes.
    ///
    /// Individual failures, empty answers and duplicates each consume one
    /// attempt of the budget. Returns whatever was collected, in arrival
    /// order; fails with [`AppError::EmptyBatch`] only if nothing was.
    pub async fn fetch_unique_batch_with<R: BatchReporter>(
        &self,
        target: usize,
        reporter: &R,
    ) -> Result<Vec<Meal>, AppError> {
        if target == 0 {
            return Ok(Vec::new());
        }

        let budget = self.config.budget_for(target);
        let mut seen: HashSet<String> = HashSet::with_capacity(target);
        let mut items: Vec<Meal> = Vec::with_capacity(target);
        let mut attempts = 0u32;

        reporter.report(BatchEvent::Started { target, budget });

        while items.len() < target && attempts < budget {
            attempts += 1;
            reporter.report(BatchEvent::Attempt {
                attempt: attempts,
                budget,
                collected: items.len(),
            });

            match self.source.random_meal().await {
                Ok(Some(meal)) => match meal.identity().map(str::to_owned) {
                    None => reporter.report(BatchEvent::Missing { attempt: attempts }),
                    Some(id) if seen.contains(&id) => {
                        reporter.report(BatchEvent::Duplicate { id: &id });
                    }
                    Some(id) => {
                        seen.insert(id);
                        items.push(meal);
                        if let Some(meal) = items.last() {
                            reporter.report(BatchEvent::Accepted {
                                meal,
                                collected: items.len(),
                            });
                        }
                    }
                },
                Ok(None) => reporter.report(BatchEvent::Missing { attempt: attempts }),
                Err(error) => reporter.report(BatchEvent::Failed {
                    attempt: attempts,
                    error: &error,
                }),
            }

            if items.len() < target && attempts < budget {
                let delay = self.config.courtesy_delay(attempts);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        reporter.report(BatchEvent::Finished {
            collected: items.len(),
            target,
            attempts,
        });

        if items.is_empty() {
            return Err(AppError::EmptyBatch { attempts });
        }
        Ok(items)
    }

    /// Fetch a batch, then warm every thumbnail before handing it back.
    pub async fn fetch_and_preload<L: ImageLoader>(
        &self,
        target: usize,
        preloader: &ImagePreloader<L>,
    ) -> Result<(Vec<Meal>, PreloadSummary), AppError> {
        let items = self.fetch_unique_batch(target).await?;
        let summary = preloader.preload_meals(&items).await;
        Ok((items, summary))
    }
}
