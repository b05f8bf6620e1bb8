use crate::Properties;
use serde_json::Value;

/// Replace every `{key}` in `template` with the string form of `properties[key]`.
///
/// Missing keys become the empty string. Braces that do not enclose a
/// non-empty key without nested braces are copied through unchanged.
pub fn resolve_tokens(properties: &Properties, template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];

        match after.find(['{', '}']) {
            Some(close) if close > 0 && after.as_bytes()[close] == b'}' => {
                out.push_str(&rest[..open]);

                if let Some(value) = properties.get(&after[..close]) {
                    push_value(&mut out, value);
                }

                rest = &after[close + 1..];
            }
            _ => {
                out.push_str(&rest[..=open]);
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Resolve an icon name; an empty result means the feature has no icon.
pub fn resolve_icon(properties: &Properties, template: &str) -> Option<String> {
    let icon = resolve_tokens(properties, template);
    (!icon.is_empty()).then_some(icon)
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Number(n) => match n.as_f64() {
            // Integral floats print without a fractional part ("3", not "3.0").
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                out.push_str(&(f as i64).to_string())
            }
            _ => out.push_str(&n.to_string()),
        },
        other => out.push_str(&other.to_string()),
    }
}
