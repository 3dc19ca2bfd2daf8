use serde_json::Value;

use super::error::FilterError;
use super::filter::{json_path_sql, text_value, validate_column};
use super::types::{FilterNode, FilterOp, FilterWhereInfo};

/// Parses Mongo-style where clauses and renders them as SQL over a JSONB `doc` column.
pub struct FilterWhere<'a> {
    param_values: Vec<String>,
    search_fields: &'a [String],
}

impl<'a> FilterWhere<'a> {
    pub fn new(search_fields: &'a [String]) -> Self {
        Self {
            param_values: vec![],
            search_fields,
        }
    }

    /// Render `nodes` as a SQL predicate. An empty node list renders as an empty string.
    pub fn generate(nodes: &[FilterNode], search_fields: &'a [String]) -> Result<(String, Vec<String>), FilterError> {
        let mut filter_where = Self::new(search_fields);
        let sql = filter_where.build_all(nodes, " AND ")?;
        Ok((sql.unwrap_or_default(), filter_where.param_values))
    }

    pub fn parse(where_data: &Value) -> Result<Vec<FilterNode>, FilterError> {
        match where_data {
            Value::Null => Ok(vec![]),
            Value::Object(obj) => {
                let mut nodes = Vec::with_capacity(obj.len());
                for (key, value) in obj {
                    if key.starts_with('$') {
                        nodes.push(Self::parse_logical_operator(key, value)?);
                    } else {
                        nodes.extend(Self::parse_field_condition(key, value)?);
                    }
                }
                Ok(nodes)
            }
            _ => Err(FilterError::InvalidWhereClause("where must be an object".to_string())),
        }
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<FilterNode, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut children = Vec::with_capacity(arr.len());
                for v in arr {
                    children.push(FilterNode::And(Self::parse(v)?));
                }
                Ok(if op == "$and" { FilterNode::And(children) } else { FilterNode::Or(children) })
            }
            "$not" => Ok(FilterNode::Not(Self::parse(value)?)),
            "$text" => {
                let term = value
                    .as_str()
                    .ok_or_else(|| FilterError::InvalidOperatorData("$text requires a string".to_string()))?;
                Ok(FilterNode::Condition(FilterWhereInfo {
                    column: String::new(),
                    operator: FilterOp::Text,
                    data: Value::String(term.to_string()),
                }))
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<FilterNode>, FilterError> {
        validate_column(field)?;
        match value {
            Value::Object(obj) if obj.keys().any(|k| k.starts_with('$')) => {
                let mut nodes = Vec::with_capacity(obj.len());
                for (op_key, op_val) in obj {
                    let operator = Self::map_operator(op_key)?;
                    Self::validate_operand(operator, op_val)?;
                    nodes.push(FilterNode::Condition(FilterWhereInfo {
                        column: field.to_string(),
                        operator,
                        data: op_val.clone(),
                    }));
                }
                Ok(nodes)
            }
            // Implicit equality: { field: value }
            _ => Ok(vec![FilterNode::Condition(FilterWhereInfo {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            })]),
        }
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$exists" => FilterOp::Exists,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn validate_operand(operator: FilterOp, data: &Value) -> Result<(), FilterError> {
        match operator {
            FilterOp::In | FilterOp::NIn if !data.is_array() => {
                Err(FilterError::InvalidOperatorData("$in and $nin require an array".to_string()))
            }
            FilterOp::Exists if !data.is_boolean() => {
                Err(FilterError::InvalidOperatorData("$exists requires a boolean".to_string()))
            }
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte | FilterOp::ILike if data.is_null() => {
                Err(FilterError::InvalidOperatorData("comparison operators require a value".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn build_all(&mut self, nodes: &[FilterNode], joiner: &str) -> Result<Option<String>, FilterError> {
        let mut parts = Vec::with_capacity(nodes.len());
        for node in nodes {
            parts.push(self.build_node(node)?);
        }
        Ok(match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(format!("({})", parts.join(joiner))),
        })
    }

    fn build_node(&mut self, node: &FilterNode) -> Result<String, FilterError> {
        match node {
            FilterNode::Condition(info) => self.build_sql_condition(info),
            FilterNode::And(children) => Ok(self.build_all(children, " AND ")?.unwrap_or_else(|| "1=1".to_string())),
            FilterNode::Or(children) => Ok(self.build_all(children, " OR ")?.unwrap_or_else(|| "1=0".to_string())),
            FilterNode::Not(children) => {
                let inner = self.build_all(children, " AND ")?.unwrap_or_else(|| "1=1".to_string());
                Ok(format!("NOT ({})", inner))
            }
        }
    }

    fn build_sql_condition(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        if condition.operator == FilterOp::Text {
            return self.build_text_condition(&condition.data);
        }

        let path = json_path_sql(&condition.column);
        let sql = match condition.operator {
            FilterOp::Eq => match text_value(&condition.data) {
                None => format!("{} IS NULL", path),
                Some(v) => format!("{} = {}", path, self.param(v)),
            },
            FilterOp::Ne => match text_value(&condition.data) {
                None => format!("{} IS NOT NULL", path),
                Some(v) => format!("({} IS NULL OR {} <> {})", path, path, self.param(v)),
            },
            FilterOp::Gt => self.ordered(&path, ">", &condition.data),
            FilterOp::Gte => self.ordered(&path, ">=", &condition.data),
            FilterOp::Lt => self.ordered(&path, "<", &condition.data),
            FilterOp::Lte => self.ordered(&path, "<=", &condition.data),
            FilterOp::ILike => {
                let needle = text_value(&condition.data).unwrap_or_default();
                format!("{} ILIKE {}", path, self.param(contains_pattern(&needle)))
            }
            FilterOp::In => {
                let values = list_values(&condition.data);
                if values.is_empty() {
                    return Ok("1=0".to_string());
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                format!("{} IN ({})", path, params.join(", "))
            }
            FilterOp::NIn => {
                let values = list_values(&condition.data);
                if values.is_empty() {
                    return Ok("1=1".to_string());
                }
                let params: Vec<String> = values.into_iter().map(|v| self.param(v)).collect();
                format!("({} IS NULL OR {} NOT IN ({}))", path, path, params.join(", "))
            }
            FilterOp::Exists => {
                if condition.data.as_bool().unwrap_or(true) {
                    format!("{} IS NOT NULL", path)
                } else {
                    format!("{} IS NULL", path)
                }
            }
            FilterOp::Text => unreachable!("handled above"),
        };
        Ok(sql)
    }

    fn ordered(&mut self, path: &str, op: &str, data: &Value) -> String {
        let value = text_value(data).unwrap_or_default();
        format!("({}) COLLATE \"C\" {} {}", path, op, self.param(value))
    }

    fn build_text_condition(&mut self, data: &Value) -> Result<String, FilterError> {
        if self.search_fields.is_empty() {
            return Err(FilterError::InvalidOperatorData("free-text search is not supported here".to_string()));
        }
        let terms: Vec<String> = data.as_str().unwrap_or_default().split_whitespace().map(str::to_string).collect();
        if terms.is_empty() {
            return Ok("1=1".to_string());
        }

        let mut alternatives = Vec::new();
        for term in terms {
            let placeholder = self.param(contains_pattern(&term));
            for field in self.search_fields {
                alternatives.push(format!("{} ILIKE {}", json_path_sql(field), placeholder));
            }
        }
        Ok(format!("({})", alternatives.join(" OR ")))
    }

    fn param(&mut self, value: String) -> String {
        self.param_values.push(value);
        format!("${}", self.param_values.len())
    }
}

fn list_values(data: &Value) -> Vec<String> {
    data.as_array()
        .map(|arr| arr.iter().filter_map(text_value).collect())
        .unwrap_or_default()
}

/// `%needle%` with LIKE metacharacters escaped.
fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
