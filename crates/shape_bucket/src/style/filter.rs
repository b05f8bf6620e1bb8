//! Legacy style filters: `["==", key, value]`, `["all", ...]`, `["has", key]`, ...

use super::function::json_eq;
use crate::error::{Error, Result};
use crate::geometry::VectorTileFeature;
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All(Vec<Filter>),
    Any(Vec<Filter>),
    None(Vec<Filter>),
    Has(String),
    NotHas(String),
    In(String, Vec<Value>),
    NotIn(String, Vec<Value>),
    Compare(String, Comparison, Value),
}

impl Filter {
    pub fn from_json(value: &Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::Filter(format!("expected an array, got {}", value)))?;

        let (op, args) = match items.split_first() {
            Some((Value::String(op), args)) => (op.as_str(), args),
            _ => return Err(Error::Filter(format!("missing operator in {}", value))),
        };

        let key = |i: usize| -> Result<String> {
            args.get(i)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::Filter(format!("{:?} needs a key", op)))
        };

        let compare = |cmp: Comparison| -> Result<Filter> {
            match args {
                [_, value] => Ok(Filter::Compare(key(0)?, cmp, value.clone())),
                _ => Err(Error::Filter(format!("{:?} takes a key and a value", op))),
            }
        };

        let children = || args.iter().map(Filter::from_json).collect::<Result<Vec<_>>>();

        match op {
            "all" => Ok(Filter::All(children()?)),
            "any" => Ok(Filter::Any(children()?)),
            "none" => Ok(Filter::None(children()?)),
            "has" => Ok(Filter::Has(key(0)?)),
            "!has" => Ok(Filter::NotHas(key(0)?)),
            "in" => Ok(Filter::In(key(0)?, args[1..].to_vec())),
            "!in" => Ok(Filter::NotIn(key(0)?, args[1..].to_vec())),
            "==" => compare(Comparison::Eq),
            "!=" => compare(Comparison::Ne),
            "<" => compare(Comparison::Lt),
            "<=" => compare(Comparison::Le),
            ">" => compare(Comparison::Gt),
            ">=" => compare(Comparison::Ge),
            other => Err(Error::Filter(format!("unknown operator {:?}", other))),
        }
    }

    pub fn evaluate<F: VectorTileFeature + ?Sized>(&self, feature: &F) -> bool {
        match self {
            Filter::All(filters) => filters.iter().all(|f| f.evaluate(feature)),
            Filter::Any(filters) => filters.iter().any(|f| f.evaluate(feature)),
            Filter::None(filters) => !filters.iter().any(|f| f.evaluate(feature)),
            Filter::Has(key) => lookup(feature, key).is_some(),
            Filter::NotHas(key) => lookup(feature, key).is_none(),
            Filter::In(key, values) => contains(feature, key, values),
            Filter::NotIn(key, values) => !contains(feature, key, values),
            Filter::Compare(key, cmp, expected) => {
                let actual = lookup(feature, key);
                match cmp {
                    Comparison::Eq => actual.map_or(false, |a| json_eq(&a, expected)),
                    Comparison::Ne => !actual.map_or(false, |a| json_eq(&a, expected)),
                    ordering => match actual.and_then(|a| order(&a, expected)) {
                        Some(o) => match ordering {
                            Comparison::Lt => o == Ordering::Less,
                            Comparison::Le => o != Ordering::Greater,
                            Comparison::Gt => o == Ordering::Greater,
                            Comparison::Ge => o != Ordering::Less,
                            Comparison::Eq | Comparison::Ne => unreachable!(),
                        },
                        None => false,
                    },
                }
            }
        }
    }
}

fn lookup<'a, F: VectorTileFeature + ?Sized>(feature: &'a F, key: &str) -> Option<Cow<'a, Value>> {
    match key {
        "$type" => Some(Cow::Owned(Value::from(feature.geometry_type().as_str()))),
        "$id" => feature.id().map(|id| Cow::Owned(Value::from(id))),
        _ => feature.properties().get(key).map(Cow::Borrowed),
    }
}

fn contains<F: VectorTileFeature + ?Sized>(feature: &F, key: &str, values: &[Value]) -> bool {
    lookup(feature, key).map_or(false, |actual| values.iter().any(|v| json_eq(&actual, v)))
}

/// Orders two values of the same kind; mixed kinds never compare.
fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{GeometryType, TileFeature};
    use serde_json::json;

    fn feature(properties: Value) -> TileFeature {
        TileFeature {
            id: Some(42),
            geometry_type: GeometryType::Point,
            geometry: vec![vec![[0, 0]]],
            properties: properties.as_object().cloned().unwrap(),
        }
    }

    fn filter(value: Value) -> Filter {
        Filter::from_json(&value).unwrap()
    }

    #[test]
    fn equality_and_membership() {
        let f = feature(json!({"kind": "cafe", "rank": 2}));

        assert!(filter(json!(["==", "kind", "cafe"])).evaluate(&f));
        assert!(!filter(json!(["==", "kind", "bar"])).evaluate(&f));
        assert!(filter(json!(["!=", "missing", 1])).evaluate(&f));
        assert!(filter(json!(["in", "rank", 1, 2, 3])).evaluate(&f));
        assert!(filter(json!(["!in", "kind", "bar", "pub"])).evaluate(&f));
        assert!(filter(json!(["==", "rank", 2.0])).evaluate(&f));
    }

    #[test]
    fn ordering_requires_matching_kinds() {
        let f = feature(json!({"rank": 2, "name": "b"}));

        assert!(filter(json!(["<", "rank", 3])).evaluate(&f));
        assert!(filter(json!([">=", "rank", 2])).evaluate(&f));
        assert!(!filter(json!([">", "rank", 2])).evaluate(&f));
        assert!(filter(json!([">", "name", "a"])).evaluate(&f));
        assert!(!filter(json!(["<", "rank", "3"])).evaluate(&f));
        assert!(!filter(json!(["<", "missing", 3])).evaluate(&f));
    }

    #[test]
    fn special_keys_and_combinators() {
        let f = feature(json!({"kind": "cafe"}));

        assert!(filter(json!(["==", "$type", "Point"])).evaluate(&f));
        assert!(filter(json!(["==", "$id", 42])).evaluate(&f));
        assert!(filter(json!(["all", ["has", "kind"], ["!has", "rank"]])).evaluate(&f));
        assert!(filter(json!(["any", ["has", "rank"], ["has", "kind"]])).evaluate(&f));
        assert!(filter(json!(["none", ["has", "rank"]])).evaluate(&f));
        assert!(filter(json!(["all"])).evaluate(&f));
    }

    #[test]
    fn rejects_malformed_filters() {
        assert!(Filter::from_json(&json!("kind")).is_err());
        assert!(Filter::from_json(&json!([])).is_err());
        assert!(Filter::from_json(&json!(["==", "kind"])).is_err());
        assert!(Filter::from_json(&json!(["~=", "kind", 1])).is_err());
        assert!(Filter::from_json(&json!(["in"])).is_err());
    }
}
