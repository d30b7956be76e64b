use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::news_utils::time;
use crate::types::{Article, UserPreferences};

const SOURCE_WEIGHT: u32 = 3;
const CATEGORY_WEIGHT: u32 = 2;
const AUTHOR_WEIGHT: u32 = 1;

/// Reorders (never filters) a feed by how well each article matches the
/// reader's preferences.
pub struct PersonalizationRanker;

impl PersonalizationRanker {
    /// 3 for a preferred source, 2 for a preferred category, 1 for a
    /// preferred author.
    pub fn score(article: &Article, preferences: &UserPreferences) -> u32 {
        let mut score = 0;
        if preferences.preferred_sources.contains(&article.source) {
            score += SOURCE_WEIGHT;
        }
        if article
            .category
            .as_ref()
            .is_some_and(|c| preferences.preferred_categories.contains(c))
        {
            score += CATEGORY_WEIGHT;
        }
        if article
            .author
            .as_ref()
            .is_some_and(|a| preferences.preferred_authors.contains(a))
        {
            score += AUTHOR_WEIGHT;
        }
        score
    }

    /// Highest score first, newer first within a score, input order within
    /// identical score and timestamp. With no preferences at all the input
    /// comes back untouched.
    pub fn rank(articles: Vec<Article>, preferences: &UserPreferences) -> Vec<Article> {
        if preferences.is_empty() {
            return articles;
        }

        let mut scored: Vec<(Reverse<u32>, Reverse<Option<DateTime<Utc>>>, Article)> = articles
            .into_iter()
            .map(|article| {
                let score = Self::score(&article, preferences);
                let published = time::parse_timestamp(&article.published_at);
                (Reverse(score), Reverse(published), article)
            })
            .collect();

        // Stable sort, so full ties stay in input order.
        scored.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        debug!("Ranked {} articles", scored.len());

        scored.into_iter().map(|(_, _, article)| article).collect()
    }
}
