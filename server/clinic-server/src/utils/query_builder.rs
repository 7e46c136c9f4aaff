//! Filtered list queries
//!
//! List endpoints need the same WHERE clause twice, once for `COUNT(*)` and
//! once for the page itself. [`ListQuery`] records the filters and renders
//! them into as many `QueryBuilder`s as needed.
//!
//! ```rust,ignore
//! let mut query = ListQuery::new("FROM patients");
//! query
//!     .filter_eq("document_id", params.document_id)
//!     .search(&["full_name", "document_id"], params.search.as_deref())
//!     .order_by("created_at DESC");
//!
//! let total = query.count(&pool).await?;
//! let rows: Vec<PatientRow> = query.fetch_page(&pool, "SELECT *", limit, offset).await?;
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Uuid(Uuid),
    Text(String),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        FilterValue::Uuid(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::Timestamp(value)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        FilterValue::Date(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Sql(String),
    Bind(FilterValue),
}

#[derive(Debug, Clone)]
pub struct ListQuery {
    from: &'static str,
    segments: Vec<Segment>,
    order_by: Option<&'static str>,
}

/// `%term%` for ILIKE matching; `%`, `_` and `\` in the term match literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl ListQuery {
    /// `from` is everything between the select list and the WHERE clause,
    /// joins included.
    pub fn new(from: &'static str) -> Self {
        Self {
            from,
            segments: Vec::new(),
            order_by: None,
        }
    }

    fn compare<T: Into<FilterValue>>(&mut self, column: &str, op: &str, value: Option<T>) -> &mut Self {
        if let Some(value) = value {
            self.segments
                .push(Segment::Sql(format!(" AND {} {} ", column, op)));
            self.segments.push(Segment::Bind(value.into()));
        }
        self
    }

    /// Add an equality filter (only if value is Some)
    pub fn filter_eq<T: Into<FilterValue>>(&mut self, column: &str, value: Option<T>) -> &mut Self {
        self.compare(column, "=", value)
    }

    pub fn filter_gte<T: Into<FilterValue>>(&mut self, column: &str, value: Option<T>) -> &mut Self {
        self.compare(column, ">=", value)
    }

    pub fn filter_lte<T: Into<FilterValue>>(&mut self, column: &str, value: Option<T>) -> &mut Self {
        self.compare(column, "<=", value)
    }

    /// Case-insensitive substring match on any of `columns`. Blank terms
    /// are ignored.
    pub fn search(&mut self, columns: &[&str], term: Option<&str>) -> &mut Self {
        self.search_within(" AND (", columns, term, ")")
    }

    /// Like [`search`](Self::search) but wrapped in caller-provided SQL,
    /// e.g. an `EXISTS (...)` subquery.
    pub fn search_within(
        &mut self,
        prefix: &str,
        columns: &[&str],
        term: Option<&str>,
        suffix: &str,
    ) -> &mut Self {
        let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        if columns.is_empty() {
            return self;
        }

        let pattern = like_pattern(term);
        self.segments.push(Segment::Sql(prefix.to_string()));
        for (idx, column) in columns.iter().enumerate() {
            let joiner = if idx == 0 { "" } else { " OR " };
            self.segments
                .push(Segment::Sql(format!("{}{} ILIKE ", joiner, column)));
            self.segments
                .push(Segment::Bind(FilterValue::Text(pattern.clone())));
        }
        self.segments.push(Segment::Sql(suffix.to_string()));
        self
    }

    pub fn order_by(&mut self, clause: &'static str) -> &mut Self {
        self.order_by = Some(clause);
        self
    }

    fn render(&self, select: &str) -> QueryBuilder<'static, Postgres> {
        let mut query = QueryBuilder::new(select);
        query.push(" ");
        query.push(self.from);
        query.push(" WHERE 1 = 1");

        for segment in &self.segments {
            match segment {
                Segment::Sql(sql) => {
                    query.push(sql);
                }
                Segment::Bind(FilterValue::Uuid(v)) => {
                    query.push_bind(*v);
                }
                Segment::Bind(FilterValue::Text(v)) => {
                    query.push_bind(v.clone());
                }
                Segment::Bind(FilterValue::Timestamp(v)) => {
                    query.push_bind(*v);
                }
                Segment::Bind(FilterValue::Date(v)) => {
                    query.push_bind(*v);
                }
            }
        }

        query
    }

    fn render_ordered(&self, select: &str) -> QueryBuilder<'static, Postgres> {
        let mut query = self.render(select);
        if let Some(order) = self.order_by {
            query.push(" ORDER BY ");
            query.push(order);
        }
        query
    }

    pub async fn count(&self, pool: &PgPool) -> Result<i64, sqlx::Error> {
        let mut query = self.render("SELECT COUNT(*)");
        query.build_query_scalar::<i64>().fetch_one(pool).await
    }

    pub async fn fetch_page<T>(
        &self,
        pool: &PgPool,
        select: &str,
        limit: u32,
        offset: i64,
    ) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut query = self.render_ordered(select);
        query.push(" LIMIT ");
        query.push_bind(i64::from(limit));
        query.push(" OFFSET ");
        query.push_bind(offset);

        query.build_query_as::<T>().fetch_all(pool).await
    }

    pub async fn fetch_all<T>(&self, pool: &PgPool, select: &str) -> Result<Vec<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut query = self.render_ordered(select);
        query.build_query_as::<T>().fetch_all(pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filters() {
        let query = ListQuery::new("FROM patients");
        assert_eq!(
            query.render("SELECT COUNT(*)").sql(),
            "SELECT COUNT(*) FROM patients WHERE 1 = 1"
        );
    }

    #[test]
    fn test_filters_bind_in_order() {
        let mut query = ListQuery::new("FROM appointments a");
        query
            .filter_eq("a.patient_id", Some(Uuid::nil()))
            .filter_eq::<String>("a.status", None)
            .filter_gte("a.date_time", Some(Utc::now()))
            .order_by("a.date_time ASC");

        assert_eq!(
            query.render_ordered("SELECT a.*").sql(),
            "SELECT a.* FROM appointments a WHERE 1 = 1 AND a.patient_id = $1 AND a.date_time >= $2 ORDER BY a.date_time ASC"
        );
    }

    #[test]
    fn test_search_across_columns() {
        let mut query = ListQuery::new("FROM medications");
        query.search(&["name", "generic_name"], Some("  dipi "));

        assert_eq!(
            query.render("SELECT *").sql(),
            "SELECT * FROM medications WHERE 1 = 1 AND (name ILIKE $1 OR generic_name ILIKE $2)"
        );
        assert_eq!(
            query.segments.get(2),
            Some(&Segment::Bind(FilterValue::Text("%dipi%".to_string())))
        );
    }

    #[test]
    fn test_blank_search_ignored() {
        let mut query = ListQuery::new("FROM medications");
        query.search(&["name"], Some("   ")).search(&["name"], None);

        assert!(query.segments.is_empty());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }
}
