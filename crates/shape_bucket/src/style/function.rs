//! Style property values: constants, zoom functions and feature-property functions.

use crate::color::Color;
use crate::error::{Error, Result};
use crate::Properties;
use serde_json::Value;

/// Evaluation state shared by every feature of a bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalProperties {
    pub zoom: f32,
}

/// A value type a style property can produce.
pub trait StyleValue: Sized + Clone {
    fn from_json(value: &Value) -> Option<Self>;

    fn interpolate(a: &Self, b: &Self, t: f32) -> Self;
}

impl StyleValue for f32 {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64().map(|v| v as f32)
    }

    fn interpolate(a: &Self, b: &Self, t: f32) -> Self {
        a + (b - a) * t
    }
}

impl StyleValue for [f32; 2] {
    fn from_json(value: &Value) -> Option<Self> {
        match value.as_array()?.as_slice() {
            [x, y] => Some([x.as_f64()? as f32, y.as_f64()? as f32]),
            _ => None,
        }
    }

    fn interpolate(a: &Self, b: &Self, t: f32) -> Self {
        [f32::interpolate(&a[0], &b[0], t), f32::interpolate(&a[1], &b[1], t)]
    }
}

impl StyleValue for Color {
    fn from_json(value: &Value) -> Option<Self> {
        Color::from_json(value)
    }

    fn interpolate(a: &Self, b: &Self, t: f32) -> Self {
        a.lerp(*b, t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Identity,
    Categorical,
    Interval,
    Exponential,
}

/// A function over zoom (`property == None`) or over one feature property.
#[derive(Debug, Clone)]
pub struct StyleFunction<T> {
    pub kind: FunctionKind,
    pub property: Option<String>,
    pub base: f32,
    pub stops: Vec<(Value, T)>,
    pub default: Option<T>,
}

#[derive(Debug, Clone)]
pub enum PropertyValue<T> {
    Constant(T),
    Function(StyleFunction<T>),
}

impl<T: StyleValue> PropertyValue<T> {
    pub fn from_json(value: &Value) -> Result<Self> {
        if let Value::Object(object) = value {
            if object.contains_key("stops") || object.contains_key("type") {
                return parse_function(object).map(PropertyValue::Function);
            }
        }

        T::from_json(value)
            .map(PropertyValue::Constant)
            .ok_or_else(|| Error::Style(format!("unsupported property value {}", value)))
    }

    /// `true` when every feature of a bucket evaluates to the same value.
    pub fn is_feature_constant(&self) -> bool {
        match self {
            PropertyValue::Constant(_) => true,
            PropertyValue::Function(f) => f.property.is_none(),
        }
    }

    /// Evaluate for one feature; `fallback` is used when neither a stop nor
    /// the function default applies.
    pub fn evaluate(&self, globals: &GlobalProperties, properties: &Properties, fallback: &T) -> T {
        match self {
            PropertyValue::Constant(value) => value.clone(),
            PropertyValue::Function(f) => f
                .evaluate(globals, properties)
                .or_else(|| f.default.clone())
                .unwrap_or_else(|| fallback.clone()),
        }
    }
}

impl<T: StyleValue> StyleFunction<T> {
    fn evaluate(&self, globals: &GlobalProperties, properties: &Properties) -> Option<T> {
        let zoom_input;
        let input = match &self.property {
            Some(key) => properties.get(key)?,
            None => {
                zoom_input = Value::from(globals.zoom as f64);
                &zoom_input
            }
        };

        match self.kind {
            FunctionKind::Identity => T::from_json(input),
            FunctionKind::Categorical => self
                .stops
                .iter()
                .find(|(key, _)| json_eq(key, input))
                .map(|(_, out)| out.clone()),
            FunctionKind::Interval => self.interval(input.as_f64()?),
            FunctionKind::Exponential => self.exponential(input.as_f64()?),
        }
    }

    fn interval(&self, x: f64) -> Option<T> {
        let mut current = self.stops.first()?;

        for stop in &self.stops {
            match stop.0.as_f64() {
                Some(at) if at <= x => current = stop,
                _ => break,
            }
        }

        Some(current.1.clone())
    }

    fn exponential(&self, x: f64) -> Option<T> {
        let first = self.stops.first()?;
        let last = self.stops.last()?;

        if x <= first.0.as_f64()? {
            return Some(first.1.clone());
        }

        if x >= last.0.as_f64()? {
            return Some(last.1.clone());
        }

        let upper = self.stops.iter().position(|(at, _)| at.as_f64().map_or(false, |at| at > x))?;
        let (lo_at, lo) = &self.stops[upper - 1];
        let (hi_at, hi) = &self.stops[upper];
        let (lo_at, hi_at) = (lo_at.as_f64()?, hi_at.as_f64()?);

        let t = interpolation_factor(x - lo_at, hi_at - lo_at, self.base as f64);
        Some(T::interpolate(lo, hi, t as f32))
    }
}

fn interpolation_factor(progress: f64, span: f64, base: f64) -> f64 {
    if span <= 0.0 {
        0.0
    } else if (base - 1.0).abs() < f64::EPSILON {
        progress / span
    } else {
        (base.powf(progress) - 1.0) / (base.powf(span) - 1.0)
    }
}

fn parse_function<T: StyleValue>(object: &serde_json::Map<String, Value>) -> Result<StyleFunction<T>> {
    let property = match object.get("property") {
        None => None,
        Some(Value::String(key)) => Some(key.clone()),
        Some(other) => return Err(Error::Style(format!("function property must be a string, got {}", other))),
    };

    let mut stops = Vec::new();
    if let Some(raw) = object.get("stops") {
        let raw = raw
            .as_array()
            .ok_or_else(|| Error::Style("function stops must be an array".into()))?;

        for stop in raw {
            let pair = stop.as_array().filter(|p| p.len() == 2).ok_or_else(|| {
                Error::Style(format!("function stop must be an [input, output] pair, got {}", stop))
            })?;
            let output = T::from_json(&pair[1])
                .ok_or_else(|| Error::Style(format!("unsupported stop output {}", pair[1])))?;
            stops.push((pair[0].clone(), output));
        }
    }

    let numeric_inputs = stops.iter().all(|(input, _)| input.is_number());

    let kind = match object.get("type").and_then(Value::as_str) {
        Some("identity") => FunctionKind::Identity,
        Some("categorical") => FunctionKind::Categorical,
        Some("interval") => FunctionKind::Interval,
        Some("exponential") => FunctionKind::Exponential,
        Some(other) => return Err(Error::Style(format!("unknown function type {:?}", other))),
        None if numeric_inputs => FunctionKind::Exponential,
        None => FunctionKind::Categorical,
    };

    if kind != FunctionKind::Identity && stops.is_empty() {
        return Err(Error::Style("function needs at least one stop".into()));
    }

    if matches!(kind, FunctionKind::Interval | FunctionKind::Exponential) && !numeric_inputs {
        return Err(Error::Style("interval and exponential stops need numeric inputs".into()));
    }

    if property.is_none() && (kind == FunctionKind::Identity || !numeric_inputs) {
        return Err(Error::Style("zoom functions need numeric stops".into()));
    }

    if matches!(kind, FunctionKind::Interval | FunctionKind::Exponential) {
        stops.sort_by(|a, b| {
            let (a, b) = (a.0.as_f64().unwrap_or(0.0), b.0.as_f64().unwrap_or(0.0));
            a.total_cmp(&b)
        });
    }

    let default = match object.get("default") {
        Some(value) => Some(
            T::from_json(value).ok_or_else(|| Error::Style(format!("unsupported default {}", value)))?,
        ),
        None => None,
    };

    let base = object.get("base").and_then(Value::as_f64).unwrap_or(1.0) as f32;

    Ok(StyleFunction {
        kind,
        property,
        base,
        stops,
        default,
    })
}

/// JSON equality that treats `1` and `1.0` as the same number.
pub(crate) fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    const Z10: GlobalProperties = GlobalProperties { zoom: 10.0 };

    #[test]
    fn constants_are_feature_constant() {
        let v = PropertyValue::<f32>::from_json(&json!(0.5)).unwrap();

        assert!(v.is_feature_constant());
        assert_eq!(v.evaluate(&Z10, &Properties::new(), &1.0), 0.5);
    }

    #[test]
    fn zoom_function_interpolates_with_base() {
        let v = PropertyValue::<f32>::from_json(&json!({"stops": [[0, 0], [20, 20]]})).unwrap();
        assert!(v.is_feature_constant());
        assert_eq!(v.evaluate(&Z10, &Properties::new(), &0.0), 10.0);

        let v = PropertyValue::<f32>::from_json(&json!({"base": 2, "stops": [[8, 0], [10, 3]]})).unwrap();
        // (2^1 - 1) / (2^2 - 1) of the way from 0 to 3 at zoom 9.
        let at9 = v.evaluate(&GlobalProperties { zoom: 9.0 }, &Properties::new(), &0.0);
        assert!((at9 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn property_functions_vary_per_feature() {
        let v = PropertyValue::<f32>::from_json(&json!({
            "property": "rank",
            "type": "interval",
            "stops": [[0, 0.2], [5, 0.6], [10, 1.0]]
        }))
        .unwrap();

        assert!(!v.is_feature_constant());
        assert_eq!(v.evaluate(&Z10, &props(json!({"rank": 7})), &0.0), 0.6);
        assert_eq!(v.evaluate(&Z10, &props(json!({"rank": -3})), &0.0), 0.2);
        assert_eq!(v.evaluate(&Z10, &props(json!({})), &0.9), 0.9);
    }

    #[test]
    fn categorical_and_identity_functions() {
        let v = PropertyValue::<Color>::from_json(&json!({
            "property": "kind",
            "type": "categorical",
            "stops": [["park", "#00ff00"], ["shop", "#0000ff"]],
            "default": "#ffffff"
        }))
        .unwrap();

        let shop = v.evaluate(&Z10, &props(json!({"kind": "shop"})), &Color::BLACK);
        assert_eq!(shop, Color::new(0.0, 0.0, 1.0, 1.0));
        let other = v.evaluate(&Z10, &props(json!({"kind": "bank"})), &Color::BLACK);
        assert_eq!(other, Color::WHITE);

        let v = PropertyValue::<f32>::from_json(&json!({"property": "o", "type": "identity"})).unwrap();
        assert_eq!(v.evaluate(&Z10, &props(json!({"o": 0.25})), &1.0), 0.25);
        assert_eq!(v.evaluate(&Z10, &props(json!({"o": "x"})), &1.0), 1.0);
    }

    #[test]
    fn categorical_numbers_match_across_representations() {
        let v = PropertyValue::<f32>::from_json(&json!({
            "property": "n",
            "type": "categorical",
            "stops": [[1, 10.0]]
        }))
        .unwrap();

        assert_eq!(v.evaluate(&Z10, &props(json!({"n": 1.0})), &0.0), 10.0);
    }

    #[test]
    fn rejects_malformed_functions() {
        assert!(PropertyValue::<f32>::from_json(&json!({"stops": []})).is_err());
        assert!(PropertyValue::<f32>::from_json(&json!({"type": "identity"})).is_err());
        assert!(PropertyValue::<f32>::from_json(&json!({"stops": [["a", 1]]})).is_err());
        assert!(PropertyValue::<f32>::from_json(&json!({"property": "p", "type": "cubic", "stops": [[0, 1]]})).is_err());
        assert!(PropertyValue::<f32>::from_json(&json!("wide")).is_err());
    }
}
