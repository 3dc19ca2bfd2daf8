use serde_json::Value;

use super::error::FilterError;
use super::filter::{json_path_sql, validate_column};
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let parsed = match order {
            Value::Null => vec![],
            Value::String(s) => Self::parse_order_string(s)?,
            Value::Array(arr) => {
                // ["-marriageDate", "firstName asc"]
                let mut out = Vec::new();
                for v in arr {
                    match v {
                        Value::String(s) => out.extend(Self::parse_order_string(s)?),
                        _ => return Err(FilterError::InvalidOrder("sort entries must be strings".to_string())),
                    }
                }
                out
            }
            Value::Object(obj) => {
                // { "dateOfDeath": "desc", "firstName": 1 }
                let mut out = Vec::new();
                for (k, v) in obj {
                    let sort = match v {
                        Value::Number(n) if n.as_i64() == Some(-1) => SortDirection::Desc,
                        Value::String(s) if s.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                        _ => SortDirection::Asc,
                    };
                    out.push(FilterOrderInfo { column: k.clone(), sort });
                }
                out
            }
            _ => return Err(FilterError::InvalidOrder("sort must be a string, array or object".to_string())),
        };

        for info in &parsed {
            validate_column(&info.column)?;
        }
        Ok(parsed)
    }

    /// Accepts `field`, `-field`, `field desc` and comma separated lists of those.
    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            let Some(col) = it.next() else { continue };
            let (col, mut sort) = match col.strip_prefix('-') {
                Some(rest) => (rest, SortDirection::Desc),
                None => (col.strip_prefix('+').unwrap_or(col), SortDirection::Asc),
            };
            match it.next() {
                Some(dir) if dir.eq_ignore_ascii_case("desc") => sort = SortDirection::Desc,
                Some(dir) if dir.eq_ignore_ascii_case("asc") => sort = SortDirection::Asc,
                Some(dir) => return Err(FilterError::InvalidOrder(format!("unknown direction '{}'", dir))),
                None => {}
            }
            out.push(FilterOrderInfo {
                column: col.to_string(),
                sort,
            });
        }
        Ok(out)
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("({}) COLLATE \"C\" {}", json_path_sql(&i.column), i.sort.to_sql()))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dash_prefix_means_descending() {
        let parsed = FilterOrder::validate_and_parse(&json!("-baptismDate, firstName")).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].column, "baptismDate");
        assert_eq!(parsed[0].sort, SortDirection::Desc);
        assert_eq!(parsed[1].sort, SortDirection::Asc);
    }

    #[test]
    fn word_direction_and_object_forms() {
        let parsed = FilterOrder::validate_and_parse(&json!("name desc")).unwrap();
        assert_eq!(parsed[0].sort, SortDirection::Desc);

        let parsed = FilterOrder::validate_and_parse(&json!({ "dateOfDeath": -1 })).unwrap();
        assert_eq!(parsed[0].sort, SortDirection::Desc);
    }

    #[test]
    fn rejects_injection_in_sort_field() {
        assert!(FilterOrder::validate_and_parse(&json!("name; DROP TABLE members")).is_err());
        assert!(FilterOrder::validate_and_parse(&json!("name sideways")).is_err());
    }

    #[test]
    fn generates_collated_order_by() {
        let parsed = FilterOrder::validate_and_parse(&json!("-marriageDate")).unwrap();
        assert_eq!(
            FilterOrder::generate(&parsed),
            "ORDER BY (doc #>> '{marriageDate}') COLLATE \"C\" DESC"
        );
    }
}
