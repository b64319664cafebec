//! Query builder for table reads and writes.

/// An accumulating filter/projection for one table operation.
///
/// Only the operators the dashboard needs are modeled; values are
/// percent-free literals the way the store's API expects them.
#[derive(Debug, Clone, Default)]
pub struct TableQuery {
    columns: Option<String>,
    filters: Vec<(String, String)>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the returned columns (`select=` projection).
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    /// Adds an equality filter on a column.
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters
            .push((column.into(), format!("eq.{}", value.to_string())));
        self
    }

    /// Renders the query string, without a leading `?`. Empty when nothing
    /// was added.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = self
            .filters
            .iter()
            .map(|(column, op)| format!("{}={}", column, op))
            .collect();
        if let Some(columns) = &self.columns {
            parts.push(format!("select={}", columns));
        }
        parts.join("&")
    }
}
