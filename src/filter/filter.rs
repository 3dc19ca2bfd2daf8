use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::filter_eval;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterNode, FilterOrderInfo, SortDirection, SqlResult};

/// A compiled query over one document collection.
///
/// The same filter renders to Postgres SQL against `(id, doc JSONB)` tables and
/// evaluates directly against in-memory documents. Both paths compare values as
/// text in byte order, so either backend returns the same rows in the same order.
#[derive(Debug, Clone)]
pub struct Filter {
    table_name: String,
    search_fields: Vec<String>,
    where_nodes: Vec<FilterNode>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            search_fields: vec![],
            where_nodes: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    /// Fields matched by `$text`.
    pub fn with_search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        if data.limit.is_some() || data.offset.is_some() {
            self.limit(data.limit, data.offset)?;
        }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        self.where_nodes = FilterWhere::parse(&conditions)?;
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: Option<i64>, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if let Some(l) = limit {
            if l < 0 {
                return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
            }
        }
        if let Some(o) = offset {
            if o < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }
        self.limit = limit;
        self.offset = offset;
        Ok(self)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn offset_value(&self) -> usize {
        self.offset.unwrap_or(0) as usize
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit.map(|l| l as usize)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.effective_order());
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT doc".to_string(),
            format!("FROM \"{}\"", self.table_name),
            if where_result.query.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", where_result.query)
            },
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult {
            query,
            params: where_result.params,
        })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = FilterWhere::generate(&self.where_nodes, &self.search_fields)?;
        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let query = if where_result.query.is_empty() {
            format!("SELECT COUNT(*) as count FROM \"{}\"", self.table_name)
        } else {
            format!("SELECT COUNT(*) as count FROM \"{}\" WHERE {}", self.table_name, where_result.query)
        };
        Ok(SqlResult {
            query,
            params: where_result.params,
        })
    }

    /// Checks the where clause against a document.
    pub fn matches(&self, doc: &Value) -> Result<bool, FilterError> {
        if self.where_nodes.iter().any(uses_text) && self.search_fields.is_empty() {
            return Err(FilterError::InvalidOperatorData("free-text search is not supported here".to_string()));
        }
        Ok(filter_eval::matches_all(&self.where_nodes, doc, &self.search_fields))
    }

    /// Orders two documents the way `ORDER BY` in `to_sql` orders rows.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for info in self.effective_order() {
            let ordering = filter_eval::compare_at(a, b, &info.column, info.sort);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Requested ordering with `id` appended as the final tie-breaker.
    fn effective_order(&self) -> Vec<FilterOrderInfo> {
        let mut order = self.order_data.clone();
        if !order.iter().any(|o| o.column == "id") {
            order.push(FilterOrderInfo {
                column: "id".to_string(),
                sort: SortDirection::Asc,
            });
        }
        order
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        if !is_identifier(name) {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }
}

fn uses_text(node: &FilterNode) -> bool {
    match node {
        FilterNode::Condition(info) => info.operator == super::types::FilterOp::Text,
        FilterNode::And(children) | FilterNode::Or(children) | FilterNode::Not(children) => {
            children.iter().any(uses_text)
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Field paths are dot separated identifiers, e.g. `address.region`.
pub(crate) fn validate_column(column: &str) -> Result<(), FilterError> {
    if column.is_empty() {
        return Err(FilterError::InvalidColumn("Field name cannot be empty".to_string()));
    }
    if !column.split('.').all(is_identifier) {
        return Err(FilterError::InvalidColumn(format!("Invalid field name format: {}", column)));
    }
    Ok(())
}

/// Text extraction of a document path. Only call with validated columns.
pub(crate) fn json_path_sql(column: &str) -> String {
    format!("doc #>> '{{{}}}'", column.replace('.', ","))
}

/// Scalar rendered the way `#>>` renders it; `None` for null.
pub(crate) fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
