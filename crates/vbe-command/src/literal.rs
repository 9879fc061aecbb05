//! Value literal coercion
//!
//! Instruction arguments arrive as raw text. [`coerce`] turns them into JSON
//! values in a fixed priority order: quoted string, integer, float, boolean,
//! `null`/`undefined`, structured JSON, then the raw text itself.

use serde_json::{Number, Value};

/// Coerce a raw literal into a value; never fails
#[must_use]
pub fn coerce(raw: &str) -> Value {
    let s = raw.trim();

    if let Some(inner) = unquote(s) {
        return Value::String(inner);
    }
    if let Ok(int) = s.parse::<i64>() {
        return Value::from(int);
    }
    if looks_numeric(s) {
        if let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if s == "null" || s == "undefined" {
        return Value::Null;
    }
    if let Some(structured) = parse_structured(s) {
        return structured;
    }
    Value::String(s.to_string())
}

/// Render a value the way the call form writes it back out
#[must_use]
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => {
            let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
            format!("'{escaped}'")
        }
        other => other.to_string(),
    }
}

/// Strip matching quotes and resolve simple escapes
///
/// Returns `None` if `s` is not a complete quoted literal.
#[must_use]
pub fn unquote(s: &str) -> Option<String> {
    let mut chars = s.chars();
    let open = chars.next()?;
    let close = match open {
        '\'' | '"' | '`' => open,
        '“' => '”',
        '‘' => '’',
        _ => return None,
    };
    let body = s[open.len_utf8()..].strip_suffix(close)?;

    let mut out = String::with_capacity(body.len());
    let mut escaped = false;
    for c in body.chars() {
        if escaped {
            out.push(match c {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == close && close == open {
            // An unescaped closing quote inside the body means this was not one literal
            return None;
        } else {
            out.push(c);
        }
    }
    if escaped {
        return None;
    }
    Some(out)
}

fn looks_numeric(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
}

fn parse_structured(s: &str) -> Option<Value> {
    if !(s.starts_with('[') || s.starts_with('{')) {
        return None;
    }
    serde_json::from_str(s)
        .ok()
        .or_else(|| serde_json::from_str(&s.replace('\'', "\"")).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn quoted_strings() {
        assert_eq!(coerce("'calm'"), json!("calm"));
        assert_eq!(coerce("\"5\""), json!("5"));
        assert_eq!(coerce("`tick`"), json!("tick"));
        assert_eq!(coerce("“你好”"), json!("你好"));
        assert_eq!(coerce(r"'it\'s'"), json!("it's"));
    }

    #[test]
    fn numbers() {
        assert_eq!(coerce("5"), json!(5));
        assert_eq!(coerce(" -12 "), json!(-12));
        assert_eq!(coerce("2.5"), json!(2.5));
        assert_eq!(coerce("1e3"), json!(1000.0));
    }

    #[test]
    fn non_finite_words_stay_text() {
        assert_eq!(coerce("inf"), json!("inf"));
        assert_eq!(coerce("NaN"), json!("NaN"));
    }

    #[test]
    fn booleans_and_null() {
        assert_eq!(coerce("true"), json!(true));
        assert_eq!(coerce("FALSE"), json!(false));
        assert_eq!(coerce("null"), Value::Null);
        assert_eq!(coerce("undefined"), Value::Null);
    }

    #[test]
    fn structured_values() {
        assert_eq!(coerce("[1, 2]"), json!([1, 2]));
        assert_eq!(coerce(r#"{"a": 1}"#), json!({"a": 1}));
        assert_eq!(coerce("['x', 'y']"), json!(["x", "y"]));
        assert_eq!(coerce("[broken"), json!("[broken"));
    }

    #[test]
    fn raw_fallback() {
        assert_eq!(coerce("anxious"), json!("anxious"));
        assert_eq!(coerce("  two words "), json!("two words"));
        assert_eq!(coerce(""), json!(""));
    }

    #[test]
    fn half_quoted_is_raw() {
        assert_eq!(coerce("'a' + 'b'"), json!("'a' + 'b'"));
        assert_eq!(coerce("'open"), json!("'open"));
    }

    #[test]
    fn render_quotes_strings_only() {
        assert_eq!(render(&json!("it's")), r"'it\'s'");
        assert_eq!(render(&json!(0)), "0");
        assert_eq!(render(&json!(null)), "null");
    }

    proptest! {
        #[test]
        fn prop_render_then_coerce_keeps_strings(s in "[a-zA-Z0-9 '\\\\]{0,20}") {
            prop_assert_eq!(coerce(&render(&json!(s.clone()))), json!(s));
        }

        #[test]
        fn prop_integers_roundtrip(n in any::<i64>()) {
            prop_assert_eq!(coerce(&n.to_string()), json!(n));
        }
    }
}
