/// News-specific helpers shared by the provider clients and the filters

/// Time utilities for provider timestamps and filter bounds
pub mod time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

    /// Parse the timestamp shapes the providers emit.
    ///
    /// Accepts RFC 3339 (`2024-01-01T10:00:00Z`), offsets without a colon
    /// (`2024-01-01T10:00:00+0000`), naive date-times (read as UTC) and plain
    /// dates (midnight UTC). Anything else is `None`.
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
            return Some(naive.and_utc());
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Some(naive.and_utc());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// 23:59:59.999 UTC on the day `raw` falls on.
    pub fn end_of_day(raw: &str) -> Option<DateTime<Utc>> {
        let day = parse_timestamp(raw)?.date_naive();
        day.and_hms_milli_opt(23, 59, 59, 999).map(|naive| naive.and_utc())
    }

    /// `2024-02-01` -> `20240201`
    pub fn compact_date(raw: &str) -> String {
        raw.trim().replace('-', "")
    }
}

/// Text utilities for normalizing provider fields
pub mod text {
    /// `newsapi-` style id fragment: lowercase, whitespace runs become `-`.
    pub fn slugify_title(title: &str) -> String {
        title
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
            .to_lowercase()
    }

    /// Cut to at most `max_chars` characters, adding `...` when anything was cut.
    pub fn truncate(text: &str, max_chars: usize) -> String {
        match text.char_indices().nth(max_chars) {
            None => text.to_string(),
            Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        }
    }

    pub fn strip_byline_prefix(byline: &str) -> String {
        let trimmed = byline.trim();
        trimmed.strip_prefix("By ").unwrap_or(trimmed).trim().to_string()
    }

    /// `Some` only when there is non-blank text.
    pub fn non_empty(value: Option<String>) -> Option<String> {
        value.filter(|v| !v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::{text, time};

    #[test]
    fn parses_provider_timestamp_shapes() {
        assert!(time::parse_timestamp("2024-01-01T10:00:00Z").is_some());
        assert!(time::parse_timestamp("2024-01-01T10:00:00+0000").is_some());
        assert!(time::parse_timestamp("2024-01-01T10:00:00").is_some());
        assert!(time::parse_timestamp("2024-01-01").is_some());
        assert!(time::parse_timestamp("last tuesday").is_none());
        assert!(time::parse_timestamp("").is_none());
    }

    #[test]
    fn end_of_day_is_last_millisecond() {
        let eod = time::end_of_day("2024-02-01").unwrap();
        assert_eq!(eod.to_rfc3339(), "2024-02-01T23:59:59.999+00:00");
    }

    #[test]
    fn text_helpers() {
        assert_eq!(text::slugify_title("Big  News Today"), "big-news-today");
        assert_eq!(text::truncate("héllo world", 5), "héllo...");
        assert_eq!(text::truncate("short", 10), "short");
        assert_eq!(text::strip_byline_prefix("By Jane Doe"), "Jane Doe");
        assert_eq!(time::compact_date("2024-02-01"), "20240201");
    }
}
