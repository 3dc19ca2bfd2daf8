//! In-memory evaluation of parsed filters, mirroring the SQL that `FilterWhere`
//! and `FilterOrder` emit: values compare as text in byte order, missing and
//! null fields sort last ascending and first descending.

use std::cmp::Ordering;

use serde_json::Value;

use super::filter::text_value;
use super::types::{FilterNode, FilterOp, FilterWhereInfo, SortDirection};

pub fn matches_all(nodes: &[FilterNode], doc: &Value, search_fields: &[String]) -> bool {
    nodes.iter().all(|node| matches_node(node, doc, search_fields))
}

fn matches_node(node: &FilterNode, doc: &Value, search_fields: &[String]) -> bool {
    match node {
        FilterNode::Condition(info) => matches_condition(info, doc, search_fields),
        FilterNode::And(children) => matches_all(children, doc, search_fields),
        FilterNode::Or(children) => children.iter().any(|c| matches_node(c, doc, search_fields)),
        FilterNode::Not(children) => !matches_all(children, doc, search_fields),
    }
}

fn matches_condition(info: &FilterWhereInfo, doc: &Value, search_fields: &[String]) -> bool {
    if info.operator == FilterOp::Text {
        let mut terms = info.data.as_str().unwrap_or_default().split_whitespace().peekable();
        if terms.peek().is_none() {
            return true;
        }
        return terms.any(|term| {
            let term = term.to_lowercase();
            search_fields
                .iter()
                .any(|field| text_at(doc, field).is_some_and(|v| v.to_lowercase().contains(&term)))
        });
    }

    let actual = text_at(doc, &info.column);
    let expected = text_value(&info.data);

    match info.operator {
        FilterOp::Eq => actual == expected,
        FilterOp::Ne => match expected {
            None => actual.is_some(),
            Some(_) => actual != expected,
        },
        FilterOp::Gt => ordered(actual, expected, |o| o == Ordering::Greater),
        FilterOp::Gte => ordered(actual, expected, |o| o != Ordering::Less),
        FilterOp::Lt => ordered(actual, expected, |o| o == Ordering::Less),
        FilterOp::Lte => ordered(actual, expected, |o| o != Ordering::Greater),
        FilterOp::ILike => match (actual, expected) {
            (Some(a), Some(e)) => a.to_lowercase().contains(&e.to_lowercase()),
            _ => false,
        },
        FilterOp::In => match actual {
            Some(a) => list(&info.data).iter().any(|v| *v == a),
            None => false,
        },
        FilterOp::NIn => match actual {
            Some(a) => !list(&info.data).iter().any(|v| *v == a),
            None => true,
        },
        FilterOp::Exists => actual.is_some() == info.data.as_bool().unwrap_or(true),
        FilterOp::Text => false,
    }
}

fn ordered(actual: Option<String>, expected: Option<String>, accept: impl Fn(Ordering) -> bool) -> bool {
    match (actual, expected) {
        (Some(a), Some(e)) => accept(a.as_bytes().cmp(e.as_bytes())),
        _ => false,
    }
}

fn list(data: &Value) -> Vec<String> {
    data.as_array()
        .map(|arr| arr.iter().filter_map(text_value).collect())
        .unwrap_or_default()
}

/// Text at a dotted path, following `#>>` semantics.
pub fn text_at(doc: &Value, path: &str) -> Option<String> {
    let mut current = doc;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    text_value(current)
}

pub fn compare_at(a: &Value, b: &Value, column: &str, sort: SortDirection) -> Ordering {
    let ordering = match (text_at(a, column), text_at(b, column)) {
        (Some(x), Some(y)) => x.as_bytes().cmp(y.as_bytes()),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    };
    match sort {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}
