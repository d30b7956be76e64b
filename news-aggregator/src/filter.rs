use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::news_utils::time;
use crate::types::{Article, QueryFilters};

/// Client-side filtering over an already fetched article list.
pub struct FilterEngine;

impl FilterEngine {
    /// Articles passing every active filter, in their original order.
    ///
    /// A filter is active when its field is set and non-empty. A date bound
    /// that does not parse is treated as absent.
    pub fn apply(articles: &[Article], filters: &QueryFilters) -> Vec<Article> {
        let predicate = Predicate::compile(filters);
        let kept: Vec<Article> = articles.iter().filter(|a| predicate.matches(a)).cloned().collect();
        debug!("Filter kept {}/{} articles", kept.len(), articles.len());
        kept
    }
}

struct Predicate<'a> {
    sources: &'a [String],
    categories: &'a [String],
    authors: &'a [String],
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    query: Option<String>,
}

impl<'a> Predicate<'a> {
    fn compile(filters: &'a QueryFilters) -> Self {
        let from = filters.from_date.as_deref().and_then(|raw| {
            let parsed = time::parse_timestamp(raw);
            if parsed.is_none() {
                warn!("Ignoring unparsable from date {:?}", raw);
            }
            parsed
        });
        let to = filters.to_date.as_deref().and_then(|raw| {
            let parsed = time::end_of_day(raw);
            if parsed.is_none() {
                warn!("Ignoring unparsable to date {:?}", raw);
            }
            parsed
        });

        Self {
            sources: &filters.sources,
            categories: &filters.categories,
            authors: &filters.authors,
            from,
            to,
            query: filters.active_query().map(str::to_lowercase),
        }
    }

    // Membership checks first, substring scans last.
    fn matches(&self, article: &Article) -> bool {
        if !self.sources.is_empty() && !self.sources.contains(&article.source) {
            return false;
        }
        if !self.categories.is_empty() && !contains_opt(self.categories, article.category.as_ref()) {
            return false;
        }
        if !self.authors.is_empty() && !contains_opt(self.authors, article.author.as_ref()) {
            return false;
        }
        if self.from.is_some() || self.to.is_some() {
            let Some(published) = time::parse_timestamp(&article.published_at) else {
                return false;
            };
            if self.from.is_some_and(|from| published < from) {
                return false;
            }
            if self.to.is_some_and(|to| published > to) {
                return false;
            }
        }
        if let Some(query) = &self.query {
            return [&article.title, &article.description, &article.content]
                .iter()
                .any(|field| field.to_lowercase().contains(query.as_str()));
        }
        true
    }
}

fn contains_opt(list: &[String], value: Option<&String>) -> bool {
    value.is_some_and(|v| list.contains(v))
}
