pub mod query_builder;

pub use query_builder::{like_pattern, FilterValue, ListQuery};
