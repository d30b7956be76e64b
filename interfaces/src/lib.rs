pub mod defs;

pub use defs::{Article, ProviderTag, QueryFilters, UserPreferences};
