//! The external rule-declaration format.
//!
//! Form-definition tooling hands the engine a JSON mapping from field name to
//! an ordered mapping from rule kind to `[...parameters, errorMessage]`:
//!
//! ```json
//! {
//!   "email": {
//!     "kind": "text",
//!     "rules": {
//!       "required": ["Email is required!"],
//!       "email":    ["Email address seems to be invalid!"]
//!     }
//!   },
//!   "extra": {
//!     "kind": "checkboxes",
//!     "rules": {
//!       "required": ["Pick at least one extra"],
//!       "dependencies": [{ "room": "A" }, "toggle_extras, fade"]
//!     }
//!   }
//! }
//! ```
//!
//! Declaration order is significant on both levels and is preserved. The
//! error message is always the last string entry of a rule's array; `length`
//! may therefore carry it in position 2 (`[min, message]`) or position 3-of-4
//! (`[min, max, message, flag]`) with a trailing display flag ignored.
//!
//! Custom functions and callbacks referenced by name here must be registered
//! on the returned [`FormBuilder`] before `compile()`, which is where
//! unresolved names surface as configuration errors.

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use crate::types::{DependencyBinding, Expected, FieldKind, FormBuilder, Rule};
use crate::DateOp;

/// Errors produced when reading declaration input.
#[derive(Debug, Error)]
pub enum DeclError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("field '{field}': {message}")]
    BadField { field: String, message: String },

    #[error("field '{field}', rule '{rule}': {message}")]
    BadRule {
        field: String,
        rule: String,
        message: String,
    },
}

fn bad_field(field: &str, message: impl Into<String>) -> DeclError {
    DeclError::BadField {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn bad_rule(field: &str, rule: &str, message: impl Into<String>) -> DeclError {
    DeclError::BadRule {
        field: field.to_owned(),
        rule: rule.to_owned(),
        message: message.into(),
    }
}

/// Parse a JSON declaration into a [`FormBuilder`]. Register any custom
/// functions, callbacks, and the mime table on the result, then `compile()`.
///
/// # Errors
///
/// Returns [`DeclError`] on malformed JSON or declaration shapes.
pub fn from_json(json: &str) -> Result<FormBuilder, DeclError> {
    let root: Value = serde_json::from_str(json)?;
    let Value::Object(fields) = root else {
        return Err(bad_field("", "top level must be an object of fields"));
    };

    let mut builder = FormBuilder::new();
    for (id, spec) in &fields {
        let Value::Object(spec) = spec else {
            return Err(bad_field(id, "field declaration must be an object"));
        };

        let kind = match spec.get("kind").and_then(Value::as_str) {
            Some(name) => parse_kind(id, name)?,
            None => FieldKind::Text,
        };
        let group = spec.get("group").and_then(Value::as_str).map(str::to_owned);
        let after = spec.get("after").and_then(Value::as_str).map(str::to_owned);

        let mut rules = Vec::new();
        let mut dependency = None;
        if let Some(declared) = spec.get("rules") {
            let Value::Object(declared) = declared else {
                return Err(bad_field(id, "'rules' must be an object"));
            };
            for (rule_name, params) in declared {
                if rule_name == "dependencies" {
                    dependency = Some(parse_dependencies(id, params)?);
                } else {
                    rules.push(parse_rule(id, rule_name, params)?);
                }
            }
        }
        if let Some(params) = spec.get("dependencies") {
            dependency = Some(parse_dependencies(id, params)?);
        }

        let define = move |mut f: crate::FieldBuilder| {
            for rule in rules {
                f = f.rule(rule);
            }
            if let Some(group) = &group {
                f = f.group(group);
            }
            if let Some(binding) = dependency {
                f = f.depends_on(binding);
            }
            f
        };
        builder = match &after {
            Some(anchor) => builder.field_after(id, anchor, kind, define),
            None => builder.field(id, kind, define),
        };
    }
    Ok(builder)
}

/// Read a declaration file and parse it into a [`FormBuilder`].
///
/// # Errors
///
/// Returns [`FormicError`](crate::FormicError) on I/O or declaration failure.
pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<FormBuilder, crate::FormicError> {
    let input = std::fs::read_to_string(path)?;
    Ok(from_json(&input)?)
}

fn parse_kind(field: &str, name: &str) -> Result<FieldKind, DeclError> {
    match name {
        "text" | "password" | "textarea" => Ok(FieldKind::Text),
        "select" | "select-one" | "radio" | "radios" => Ok(FieldKind::ChoiceOne),
        "select-multiple" => Ok(FieldKind::ChoiceMany),
        "checkbox" | "checkboxes" => Ok(FieldKind::BoolGroup),
        "file" => Ok(FieldKind::File),
        "time" => Ok(FieldKind::Time),
        other => Err(bad_field(field, format!("unknown field kind '{other}'"))),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_rule(field: &str, name: &str, params: &Value) -> Result<Rule, DeclError> {
    let Value::Array(entries) = params else {
        return Err(bad_rule(field, name, "parameters must be an array"));
    };
    // The message is the last string entry; trailing flags after it are
    // presentation hints and ignored here.
    let msg_idx = entries
        .iter()
        .rposition(Value::is_string)
        .ok_or_else(|| bad_rule(field, name, "missing error message"))?;
    let message = entries[msg_idx]
        .as_str()
        .unwrap_or_default()
        .to_owned();
    let params = &entries[..msg_idx];

    let rule = match name {
        "required" => Rule::required(&message),
        "length" => {
            let min = params.first().and_then(Value::as_u64).map(|n| n as u32);
            let max = params.get(1).and_then(Value::as_u64).map(|n| n as u32);
            Rule::length(min, max, &message)
        }
        "range" => {
            let (min, max) = numeric_pair(params);
            Rule::range(min, max, &message)
        }
        "age" => {
            let (min, max) = numeric_pair(params);
            Rule::age(min as u32, max as u32, &message)
        }
        "email" => Rule::email(&message),
        "emails" => Rule::emails(&message),
        "regexp" => {
            let pattern = params
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| bad_rule(field, name, "missing pattern"))?;
            Rule::regexp(pattern, &message)
        }
        "compare" => {
            let other = params
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| bad_rule(field, name, "missing field to compare with"))?;
            Rule::compare(other, &message)
        }
        "date" => {
            let format = params
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| bad_rule(field, name, "missing date format"))?;
            Rule::date(format, &message)
        }
        "datecompare" => {
            let other = params
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| bad_rule(field, name, "missing field to compare with"))?;
            let op = params
                .get(1)
                .and_then(Value::as_str)
                .and_then(DateOp::parse)
                .ok_or_else(|| bad_rule(field, name, "operator must be >, >=, < or <="))?;
            Rule::datecompare(other, op, &message)
        }
        "alphabet" => Rule::alphabet(&leading_extra(params), &message),
        "alphanumeric" => Rule::alphanumeric(&leading_extra(params), &message),
        "digits" => Rule::digits(&leading_extra(params), &message),
        "number" => Rule::number(&leading_extra(params), &message),
        "float" => Rule::float(&leading_extra(params), &message),
        "url" => {
            let require_protocol = params.first().and_then(Value::as_bool).unwrap_or(false);
            Rule::url(require_protocol, &message)
        }
        "custom" => {
            let function = params
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| bad_rule(field, name, "missing function name"))?;
            let args: Vec<String> = params[1..].iter().filter_map(scalar).collect();
            Rule::custom(function, args, &message)
        }
        "filesize" => {
            let limit = params
                .first()
                .and_then(Value::as_u64)
                .ok_or_else(|| bad_rule(field, name, "missing byte limit"))?;
            Rule::filesize(limit, &message)
        }
        "filetype" => {
            let allowed: Vec<String> = match params.first() {
                Some(Value::String(csv)) => {
                    csv.split(',').map(|s| s.trim().to_owned()).collect()
                }
                Some(Value::Array(entries)) => entries.iter().filter_map(scalar).collect(),
                _ => return Err(bad_rule(field, name, "missing allowed file types")),
            };
            Rule::filetype(allowed, &message)
        }
        "upload" => Rule::upload(&message),
        "image" => Rule::image(&message),
        other => return Err(bad_rule(field, other, "unknown rule kind")),
    };
    Ok(rule)
}

fn numeric_pair(params: &[Value]) -> (f64, f64) {
    // Bounds come flat (`[min, max, msg]`) or nested (`[[min, max], msg]`).
    if let Some(Value::Array(pair)) = params.first() {
        (
            pair.first().and_then(Value::as_f64).unwrap_or(0.0),
            pair.get(1).and_then(Value::as_f64).unwrap_or(0.0),
        )
    } else {
        (
            params.first().and_then(Value::as_f64).unwrap_or(0.0),
            params.get(1).and_then(Value::as_f64).unwrap_or(0.0),
        )
    }
}

fn leading_extra(params: &[Value]) -> String {
    params.first().and_then(scalar).unwrap_or_default()
}

fn parse_dependencies(field: &str, value: &Value) -> Result<DependencyBinding, DeclError> {
    // Either the conditions object alone, or `[conditions, "callback, args"]`.
    let (conditions, callback) = match value {
        Value::Array(entries) => {
            let conditions = entries
                .first()
                .ok_or_else(|| bad_field(field, "empty dependencies declaration"))?;
            (conditions, entries.get(1).and_then(Value::as_str))
        }
        other => (other, None),
    };
    let Value::Object(conditions) = conditions else {
        return Err(bad_field(field, "dependency conditions must be an object"));
    };

    let mut binding = DependencyBinding::new();
    for (proxy, expected) in conditions {
        binding = binding.when(proxy, parse_expected(field, expected)?);
    }
    if let Some(spec) = callback {
        let mut parts = spec.split(',').map(str::trim);
        let name = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| bad_field(field, "empty callback name"))?;
        binding = binding.with_callback(name, parts.map(str::to_owned));
    }
    Ok(binding)
}

fn parse_expected(field: &str, value: &Value) -> Result<Expected, DeclError> {
    if let Some(s) = scalar(value) {
        return Ok(Expected::equals(s));
    }
    let Value::Array(entries) = value else {
        return Err(bad_field(field, "expected value must be a scalar or array"));
    };
    // `[[...]]` means every listed entry must be selected; a flat array
    // means the proxy's value must be one of the entries.
    if let [Value::Array(inner)] = entries.as_slice() {
        let all: Option<Vec<String>> = inner.iter().map(scalar).collect();
        return all
            .map(Expected::all_of)
            .ok_or_else(|| bad_field(field, "expected values must be scalars"));
    }
    let any: Option<Vec<String>> = entries.iter().map(scalar).collect();
    any.map(Expected::any_of)
        .ok_or_else(|| bad_field(field, "expected values must be scalars"))
}

/// Mime-type lookup table consulted by `filetype` rules: file extension to
/// the mime type (or types) it may arrive as. Loaded once at form-definition
/// time so no rule ever waits on it mid-pass.
#[derive(Debug, Clone, Default)]
pub struct MimeTable {
    map: HashMap<String, Vec<String>>,
}

impl MimeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table from its JSON form: extension to a mime-type string or
    /// array of them.
    ///
    /// # Errors
    ///
    /// Returns [`DeclError`] on malformed JSON or entry shapes.
    pub fn from_json(json: &str) -> Result<Self, DeclError> {
        let root: Value = serde_json::from_str(json)?;
        let Value::Object(entries) = root else {
            return Err(bad_field("", "mime table must be an object"));
        };
        let mut table = Self::new();
        for (ext, mimes) in &entries {
            match mimes {
                Value::String(mime) => table.insert(ext, [mime.clone()]),
                Value::Array(list) => {
                    let list: Option<Vec<String>> = list.iter().map(scalar).collect();
                    match list {
                        Some(list) => table.insert(ext, list),
                        None => {
                            return Err(bad_field(ext, "mime types must be strings"));
                        }
                    }
                }
                _ => return Err(bad_field(ext, "mime types must be strings")),
            }
        }
        Ok(table)
    }

    pub fn insert<I, S>(&mut self, extension: &str, mimes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map
            .entry(extension.to_owned())
            .or_default()
            .extend(mimes.into_iter().map(Into::into));
    }

    /// Every extension the given mime type may belong to.
    #[must_use]
    pub fn extensions_for(&self, mime: &str) -> Vec<&str> {
        let mut extensions: Vec<&str> = self
            .map
            .iter()
            .filter(|(_, mimes)| mimes.iter().any(|m| m == mime))
            .map(|(ext, _)| ext.as_str())
            .collect();
        extensions.sort_unstable();
        extensions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_table_from_json() {
        let table = MimeTable::from_json(
            r#"{
                "jpg": ["image/jpeg", "image/pjpeg"],
                "png": "image/png"
            }"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.extensions_for("image/pjpeg"), vec!["jpg"]);
        assert_eq!(table.extensions_for("image/png"), vec!["png"]);
        assert!(table.extensions_for("application/pdf").is_empty());
    }

    #[test]
    fn mime_table_rejects_non_object() {
        assert!(MimeTable::from_json("[1, 2]").is_err());
    }

    #[test]
    fn expected_scalar_becomes_equals() {
        let e = parse_expected("f", &serde_json::json!("A")).unwrap();
        assert_eq!(e, Expected::equals("A"));
    }

    #[test]
    fn expected_flat_array_becomes_any_of() {
        let e = parse_expected("f", &serde_json::json!(["A", "B"])).unwrap();
        assert_eq!(e, Expected::any_of(["A", "B"]));
    }

    #[test]
    fn expected_nested_array_becomes_all_of() {
        let e = parse_expected("f", &serde_json::json!([["A", "B"]])).unwrap();
        assert_eq!(e, Expected::all_of(["A", "B"]));
    }

    #[test]
    fn rule_message_is_last_string_entry() {
        let rule = parse_rule("pw", "length", &serde_json::json!([6, 10, "Too short", true]))
            .unwrap();
        assert_eq!(rule.message(), "Too short");
        match rule.kind() {
            crate::RuleKind::Length { min, max } => {
                assert_eq!((*min, *max), (Some(6), Some(10)));
            }
            other => panic!("expected Length, got {other:?}"),
        }
    }

    #[test]
    fn length_with_single_bound() {
        let rule = parse_rule("pw", "length", &serde_json::json!([6, "Too short"])).unwrap();
        match rule.kind() {
            crate::RuleKind::Length { min, max } => {
                assert_eq!((*min, *max), (Some(6), None));
            }
            other => panic!("expected Length, got {other:?}"),
        }
    }

    #[test]
    fn range_accepts_nested_bounds() {
        let flat = parse_rule("n", "range", &serde_json::json!([1, 10, "Out of range"])).unwrap();
        let nested =
            parse_rule("n", "range", &serde_json::json!([[1, 10], "Out of range"])).unwrap();
        for rule in [flat, nested] {
            match rule.kind() {
                crate::RuleKind::Range { min, max } => assert_eq!((*min, *max), (1.0, 10.0)),
                other => panic!("expected Range, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_message_is_an_error() {
        let err = parse_rule("f", "length", &serde_json::json!([6, 10])).unwrap_err();
        assert!(matches!(err, DeclError::BadRule { .. }));
    }

    #[test]
    fn unknown_rule_kind_is_an_error() {
        let err = parse_rule("f", "sparkles", &serde_json::json!(["msg"])).unwrap_err();
        assert!(err.to_string().contains("unknown rule kind"));
    }

    #[test]
    fn datecompare_operator_is_validated() {
        let err =
            parse_rule("d", "datecompare", &serde_json::json!(["other", "~", "msg"])).unwrap_err();
        assert!(err.to_string().contains("operator"));
    }
}
