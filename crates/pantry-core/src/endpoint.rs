use std::fmt;

use url::Url;

use crate::config::ApiConfig;
use crate::error::AppError;

/// One of the five read-only operations the recipe API exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Search { query: String },
    Lookup { id: String },
    Random,
    FilterByCategory { category: String },
    Categories,
}

impl Endpoint {
    pub fn search(query: impl Into<String>) -> Self {
        Endpoint::Search {
            query: query.into(),
        }
    }

    pub fn lookup(id: impl Into<String>) -> Self {
        Endpoint::Lookup { id: id.into() }
    }

    pub fn filter_by_category(category: impl Into<String>) -> Self {
        Endpoint::FilterByCategory {
            category: category.into(),
        }
    }

    fn path(&self) -> &'static str {
        match self {
            Endpoint::Search { .. } => "search.php",
            Endpoint::Lookup { .. } => "lookup.php",
            Endpoint::Random => "random.php",
            Endpoint::FilterByCategory { .. } => "filter.php",
            Endpoint::Categories => "categories.php",
        }
    }

    fn query(&self) -> Option<(&'static str, &str)> {
        match self {
            Endpoint::Search { query } => Some(("s", query)),
            Endpoint::Lookup { id } => Some(("i", id)),
            Endpoint::FilterByCategory { category } => Some(("c", category)),
            Endpoint::Random | Endpoint::Categories => None,
        }
    }

    /// Resolve the full request URL against the configured API root.
    pub fn url(&self, config: &ApiConfig) -> Result<String, AppError> {
        let raw = format!("{}/{}", config.api_root(), self.path());
        let mut url = Url::parse(&raw)
            .map_err(|e| AppError::ConfigError(format!("Invalid endpoint URL '{raw}': {e}")))?;
        if let Some((key, value)) = self.query() {
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url.into())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Search { query } => write!(f, "search({query})"),
            Endpoint::Lookup { id } => write!(f, "lookup({id})"),
            Endpoint::Random => write!(f, "random"),
            Endpoint::FilterByCategory { category } => write!(f, "filter({category})"),
            Endpoint::Categories => write!(f, "categories"),
        }
    }
}
