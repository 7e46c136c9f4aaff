pub mod pagination;

pub use pagination::{PageMeta, PageQuery, Paginated};
