use std::fmt;

use serde::{Deserialize, Serialize};

/// Which provider client produced an article.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    NewsApi,
    Guardian,
    NyTimes,
}

impl ProviderTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTag::NewsApi => "newsapi",
            ProviderTag::Guardian => "guardian",
            ProviderTag::NyTimes => "nytimes",
        }
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A news article normalized from any provider.
///
/// Everything except `author`, `category` and `image_url` is always filled in.
/// Missing provider values become empty strings; `image_url` is empty when the
/// provider has no image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Unique within one fetch batch only.
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image_url: String,
    pub source: String,
    pub author: Option<String>,
    /// Provider vocabulary, not normalized across providers.
    pub category: Option<String>,
    /// ISO-8601 timestamp as delivered by the provider.
    pub published_at: String,
    pub provider: ProviderTag,
}

/// Filters for one request. Empty lists and `None` mean "not filtering on this".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilters {
    pub query: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub from_date: Option<String>,
    /// Inclusive through the end of that day.
    pub to_date: Option<String>,
    pub page: u32,
    /// Unset lets each provider use its own default.
    pub page_size: Option<u32>,
}

impl Default for QueryFilters {
    fn default() -> Self {
        Self {
            query: None,
            sources: Vec::new(),
            categories: Vec::new(),
            authors: Vec::new(),
            from_date: None,
            to_date: None,
            page: 1,
            page_size: None,
        }
    }
}

// Every edit except `with_page` starts over from the first page.
impl QueryFilters {
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = if query.trim().is_empty() { None } else { Some(query) };
        self.page = 1;
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self.page = 1;
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self.page = 1;
        self
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self.page = 1;
        self
    }

    pub fn with_date_range(mut self, from_date: Option<String>, to_date: Option<String>) -> Self {
        self.from_date = from_date;
        self.to_date = to_date;
        self.page = 1;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// The query text, if it has anything besides whitespace.
    pub fn active_query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }
}

/// What the reader wants to see more of. Owned by whatever stores it; the
/// ranking code only reads it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub preferred_sources: Vec<String>,
    #[serde(default)]
    pub preferred_categories: Vec<String>,
    #[serde(default)]
    pub preferred_authors: Vec<String>,
}

impl UserPreferences {
    pub fn is_empty(&self) -> bool {
        self.preferred_sources.is_empty()
            && self.preferred_categories.is_empty()
            && self.preferred_authors.is_empty()
    }

    pub fn reset(&mut self) {
        self.preferred_sources.clear();
        self.preferred_categories.clear();
        self.preferred_authors.clear();
    }
}
