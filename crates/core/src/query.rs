//! Query definitions
//!
//! A `Query` names a table and a predicate over its rows. It is plain data:
//! evaluating it against two different versions yields two different
//! results, which is exactly what a result-set handoff relies on.

use crate::types::Key;
use crate::value::{Row, Value};
use serde::{Deserialize, Serialize};

/// Row predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Every row in the table
    All,
    /// Field equals value
    Eq {
        /// Field name
        field: String,
        /// Expected value
        value: Value,
    },
    /// Record id starts with prefix
    IdPrefix(String),
    /// All sub-filters match
    And(Vec<Filter>),
}

impl Filter {
    /// Field equality filter
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Evaluate against one row
    pub fn matches(&self, key: &Key, row: &Row) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => row.get(field) == Some(value),
            Filter::IdPrefix(prefix) => key.id.starts_with(prefix.as_str()),
            Filter::And(filters) => filters.iter().all(|f| f.matches(key, row)),
        }
    }
}

/// Sort order on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortBy {
    /// Field to sort by (missing fields sort as null)
    pub field: String,
    /// Descending order
    pub descending: bool,
}

/// Query over one table
///
/// Without `sort`, results are in ascending id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Table to read
    pub table: String,
    /// Row predicate
    pub filter: Filter,
    /// Optional sort
    pub sort: Option<SortBy>,
    /// Maximum number of rows
    pub limit: Option<usize>,
}

impl Query {
    /// All rows of a table
    pub fn table(table: impl Into<String>) -> Self {
        Query {
            table: table.into(),
            filter: Filter::All,
            sort: None,
            limit: None,
        }
    }

    /// Replace the filter
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Sort ascending by field
    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(SortBy {
            field: field.into(),
            descending: false,
        });
        self
    }

    /// Sort descending by field
    pub fn sort_by_desc(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(SortBy {
            field: field.into(),
            descending: true,
        });
        self
    }

    /// Limit the number of rows
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Apply filter, sort and limit to rows already in id order.
    pub fn evaluate(&self, rows: Vec<(Key, Row)>) -> Vec<(Key, Row)> {
        let mut matched: Vec<_> = rows
            .into_iter()
            .filter(|(key, row)| self.filter.matches(key, row))
            .collect();

        if let Some(sort) = &self.sort {
            // Stable sort keeps id order among equal values
            matched.sort_by(|(_, a), (_, b)| {
                let a = a.get(&sort.field).unwrap_or(&Value::Null);
                let b = b.get(&sort.field).unwrap_or(&Value::Null);
                let ord = a.sort_cmp(b);
                if sort.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}
