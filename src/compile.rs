//! Definition-time compilation: orders the field registry, verifies the form
//! definition, and resolves every string reference (compare targets, custom
//! functions, callbacks, regex patterns, date formats) so validation passes
//! never fail on configuration.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::debug;

use crate::types::{
    Check, CompiledBinding, CompiledCallback, CompiledCondition, CompiledField, CompiledRule,
    ConfigError, Field, FormBuilder, FormSet, Placement, ProxyEntry, Rule, RuleKind,
};
use crate::datetime::DateFormat;

pub(crate) fn compile(builder: FormBuilder) -> Result<FormSet, ConfigError> {
    let FormBuilder {
        fields,
        customs,
        callbacks,
        mimes,
    } = builder;

    if fields.is_empty() {
        return Err(ConfigError::NoFields);
    }

    let ordered = apply_placement(fields)?;
    check_duplicates(&ordered)?;

    let index: HashMap<String, usize> = ordered
        .iter()
        .enumerate()
        .map(|(i, f)| (f.id.clone(), i))
        .collect();

    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, field) in ordered.iter().enumerate() {
        groups.entry(field.name.clone()).or_default().push(i);
    }

    let customs_index: HashMap<&str, usize> = customs
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (name.as_str(), i))
        .collect();
    let callbacks_index: HashMap<&str, usize> = callbacks
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (name.as_str(), i))
        .collect();

    let mut compiled = Vec::with_capacity(ordered.len());
    let mut proxies: HashMap<String, ProxyEntry> = HashMap::new();

    for (i, field) in ordered.iter().enumerate() {
        let rules = field
            .rules
            .iter()
            .map(|rule| compile_rule(&field.id, rule, &index, &customs_index))
            .collect::<Result<Vec<_>, _>>()?;

        let dependency = match &field.dependency {
            None => None,
            Some(binding) => {
                let conditions = binding
                    .conditions
                    .iter()
                    .map(|(proxy, expected)| {
                        let entry = proxies.entry(proxy.clone()).or_default();
                        if !entry.dependents.contains(&i) {
                            entry.dependents.push(i);
                        }
                        CompiledCondition {
                            proxy: proxy.clone(),
                            expected: expected.clone(),
                            signature: expected.signature(),
                        }
                    })
                    .collect();
                let callback = match &binding.callback {
                    None => None,
                    Some((name, args)) => {
                        let function = *callbacks_index.get(name.as_str()).ok_or_else(|| {
                            ConfigError::UnknownCallback {
                                field: field.id.clone(),
                                callback: name.clone(),
                            }
                        })?;
                        Some(CompiledCallback {
                            function,
                            args: args.clone(),
                        })
                    }
                };
                Some(CompiledBinding {
                    conditions,
                    callback,
                })
            }
        };

        compiled.push(CompiledField {
            id: field.id.clone(),
            name: field.name.clone(),
            kind: field.kind,
            rules,
            dependency,
        });
    }

    debug!(
        fields = compiled.len(),
        proxies = proxies.len(),
        "form compiled"
    );

    Ok(FormSet {
        fields: compiled,
        index,
        groups,
        proxies,
        customs: customs.into_iter().map(|(_, f)| f).collect(),
        callbacks: callbacks.into_iter().map(|(_, f)| f).collect(),
        mimes,
    })
}

/// Resolve the declared registration order: appended fields keep their
/// position; a field registered `after` another is inserted right behind it.
fn apply_placement(fields: Vec<(Field, Placement)>) -> Result<Vec<Field>, ConfigError> {
    let mut ordered: Vec<Field> = Vec::with_capacity(fields.len());
    for (field, placement) in fields {
        match placement {
            Placement::Append => ordered.push(field),
            Placement::After(anchor) => {
                let pos = ordered.iter().position(|f| f.id == anchor).ok_or_else(|| {
                    ConfigError::UnknownInsertionPoint {
                        field: field.id.clone(),
                        after: anchor.clone(),
                    }
                })?;
                ordered.insert(pos + 1, field);
            }
        }
    }
    Ok(ordered)
}

fn check_duplicates(fields: &[Field]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.id.as_str()) {
            return Err(ConfigError::DuplicateField {
                id: field.id.clone(),
            });
        }
    }
    Ok(())
}

fn compile_rule(
    field_id: &str,
    rule: &Rule,
    index: &HashMap<String, usize>,
    customs_index: &HashMap<&str, usize>,
) -> Result<CompiledRule, ConfigError> {
    let name = rule.kind().name();
    let check = match rule.kind() {
        RuleKind::Required => Check::Required,
        RuleKind::Length { min, max } => Check::Length {
            min: *min,
            max: *max,
        },
        RuleKind::Range { min, max } => Check::Range {
            min: *min,
            max: *max,
        },
        RuleKind::Email => Check::Email,
        RuleKind::Emails => Check::Emails,
        RuleKind::Regexp { pattern } => {
            let re = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                field: field_id.to_owned(),
                source,
            })?;
            Check::Regexp(re)
        }
        RuleKind::Compare { other } => Check::Compare {
            other: resolve_target(field_id, name, other, index)?,
        },
        RuleKind::Date { format } => Check::Date(DateFormat::scan(format)),
        RuleKind::DateCompare { other, op } => Check::DateCompare {
            other: resolve_target(field_id, name, other, index)?,
            op: *op,
        },
        RuleKind::Age { min, max } => Check::Age {
            min: *min,
            max: *max,
        },
        RuleKind::Alphabet { extra } => Check::Alphabet(char_class(field_id, "a-z", extra)?),
        RuleKind::Alphanumeric { extra } => {
            Check::Alphanumeric(char_class(field_id, "a-z0-9", extra)?)
        }
        RuleKind::Digits { extra } => Check::Digits(char_class(field_id, "0-9", extra)?),
        RuleKind::Number { extra } => Check::Number(char_class(field_id, r"0-9\-", extra)?),
        RuleKind::Float { extra } => Check::Float(char_class(field_id, r"0-9\-\.", extra)?),
        RuleKind::Url { require_protocol } => {
            let optional = if *require_protocol { "" } else { "?" };
            let pattern = format!(r"(?i)^(http(s)?://){optional}[^\s.]+\..{{2,}}");
            let re = Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
                field: field_id.to_owned(),
                source,
            })?;
            Check::Url(re)
        }
        RuleKind::Custom { function, args } => {
            let resolved =
                *customs_index
                    .get(function.as_str())
                    .ok_or_else(|| ConfigError::UnknownFunction {
                        field: field_id.to_owned(),
                        function: function.clone(),
                    })?;
            Check::Custom {
                function: resolved,
                args: args.clone(),
            }
        }
        RuleKind::Filesize { limit } => Check::Filesize { limit: *limit },
        RuleKind::Filetype { allowed } => Check::Filetype {
            allowed: allowed.clone(),
        },
        RuleKind::Upload => Check::Upload,
        RuleKind::Image => Check::Image,
    };

    Ok(CompiledRule {
        name,
        check,
        message: rule.message().to_owned(),
    })
}

fn resolve_target(
    field_id: &str,
    rule: &'static str,
    target: &str,
    index: &HashMap<String, usize>,
) -> Result<usize, ConfigError> {
    index
        .get(target)
        .copied()
        .ok_or_else(|| ConfigError::UnknownTarget {
            field: field_id.to_owned(),
            rule,
            target: target.to_owned(),
        })
}

/// Build the `^[...]+$` character-class pattern the simple character rules
/// use, folding the author's extra characters in. Whitespace in `extra`
/// admits any whitespace.
fn char_class(field_id: &str, base: &str, extra: &str) -> Result<Regex, ConfigError> {
    let mut class = String::from(base);
    let mut saw_whitespace = false;
    for c in extra.chars() {
        if c.is_whitespace() {
            if !saw_whitespace {
                class.push_str(r"\s");
                saw_whitespace = true;
            }
        } else {
            let mut buf = [0u8; 4];
            class.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
    }
    Regex::new(&format!("(?i)^[{class}]+$")).map_err(|source| ConfigError::InvalidPattern {
        field: field_id.to_owned(),
        source,
    })
}
