//! Rule evaluation: one pure predicate per rule kind.
//!
//! Every function takes the field's current value plus the rule's resolved
//! parameters and answers pass/fail. The only recorded state is the derived
//! timestamp a `date` rule leaves in the [`PassContext`] for comparison
//! rules later in the same pass. A rule attached to a field kind it does not
//! support passes unconditionally.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{
    Check, CompiledField, CompiledRule, FieldKind, FieldValue, FormSet, FormState, PassContext,
};

static CONSECUTIVE_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());

static EMAIL_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[^.][a-z0-9_+~^{}.\-]{1,64}@[a-z0-9_+~^{}.\-]{1,255}\.[a-z0-9]{2,}$")
        .unwrap()
});

static EMAIL_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_+~^{}\-]+\.?)+@([A-Za-z0-9_+~^{}\-]+\.?)+\.[A-Za-z0-9]{2,}$")
        .unwrap()
});

static IMAGE_MIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)image/(gif|jpeg|png|pjpeg)").unwrap());

/// A numeric literal with no stray characters: digits, optional sign,
/// optional single decimal point.
static PLAIN_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").unwrap());

/// Character length with line endings normalized to the two-character
/// convention used server-side, so both passes count the same.
pub(crate) fn newline_adjusted_len(s: &str) -> usize {
    let crlf = s.matches("\r\n").count();
    let bare = (s.matches('\r').count() - crlf) + (s.matches('\n').count() - crlf);
    s.chars().count() + bare
}

/// Which field kinds a rule kind is defined for. Anything else is a no-op
/// pass: irrelevant rules on a field are ignored rather than erroring.
fn applies(check: &Check, kind: FieldKind) -> bool {
    match check {
        Check::Required | Check::Custom { .. } => true,
        Check::Filesize { .. } | Check::Filetype { .. } | Check::Upload | Check::Image => {
            kind == FieldKind::File
        }
        _ => kind == FieldKind::Text,
    }
}

/// Evaluate one rule against a field's current value. `true` means the rule
/// passed (or did not apply).
pub(crate) fn evaluate(
    form: &FormSet,
    field: &CompiledField,
    rule: &CompiledRule,
    value: &FieldValue,
    state: &FormState,
    ctx: &mut PassContext,
) -> bool {
    if !applies(&rule.check, field.kind) {
        return true;
    }

    let raw = value.as_text().unwrap_or("");
    let trimmed = raw.trim();

    match &rule.check {
        Check::Required => !value.is_empty(),

        Check::Length { min, max } => {
            if raw.is_empty() {
                return true;
            }
            let len = newline_adjusted_len(raw);
            if min.is_some_and(|min| len < min as usize) {
                return false;
            }
            !max.is_some_and(|max| max > 0 && len > max as usize)
        }

        Check::Range { min, max } => {
            if trimmed.is_empty() {
                return true;
            }
            if !PLAIN_NUMBER.is_match(trimmed) {
                return false;
            }
            let Ok(v) = trimmed.parse::<f64>() else {
                return false;
            };
            (*min == 0.0 || v >= *min) && (*max == 0.0 || v <= *max)
        }

        Check::Email => {
            trimmed.is_empty()
                || (!CONSECUTIVE_DOTS.is_match(raw)
                    && raw.len() <= 254
                    && EMAIL_FORMAT.is_match(raw))
        }

        Check::Emails => raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .all(|entry| EMAIL_ENTRY.is_match(entry)),

        Check::Regexp(re) => trimmed.is_empty() || re.is_match(raw),

        Check::Compare { other } => {
            let other_field = &form.fields[*other];
            let other_value = state
                .get(&other_field.id)
                .cloned()
                .unwrap_or_else(|| FieldValue::empty(other_field.kind));
            raw == other_value.snapshot()
        }

        Check::Date(format) => {
            if trimmed.is_empty() {
                return true;
            }
            match format.timestamp(raw) {
                Some(ts) => {
                    ctx.record_timestamp(&field.id, ts);
                    true
                }
                None => false,
            }
        }

        Check::DateCompare { other, op } => {
            if trimmed.is_empty() {
                return true;
            }
            let Some(own) = derived_timestamp(field, state, ctx) else {
                return false;
            };
            let other_field = &form.fields[*other];
            let Some(other_ts) = derived_timestamp(other_field, state, ctx) else {
                return false;
            };
            op.holds(own, other_ts)
        }

        Check::Age { min, max } => {
            if trimmed.is_empty() {
                return true;
            }
            // Needs the birth date derived by a `date` rule earlier in the
            // chain; without one there is nothing to check.
            let Some(ts) = ctx.timestamp(&field.id) else {
                return true;
            };
            let Some(birth) = chrono::DateTime::from_timestamp(ts, 0) else {
                return true;
            };
            let birth = birth.date_naive();
            let today = Utc::now().date_naive();
            let mut age = today.year() - birth.year();
            let months = today.month() as i32 - birth.month() as i32;
            if months < 0 || (months == 0 && today.day() < birth.day()) {
                age -= 1;
            }
            (*min == 0 || age >= *min as i32) && (*max == 0 || age <= *max as i32)
        }

        Check::Alphabet(re) | Check::Alphanumeric(re) | Check::Digits(re) => {
            trimmed.is_empty() || re.is_match(raw)
        }

        Check::Number(re) => {
            if trimmed.is_empty() {
                return true;
            }
            if trimmed == "-" || raw.matches('-').count() > 1 {
                return false;
            }
            if raw.find('-').is_some_and(|pos| pos > 0) {
                return false;
            }
            re.is_match(raw)
        }

        Check::Float(re) => {
            if trimmed.is_empty() {
                return true;
            }
            if trimmed == "-" || trimmed == "." {
                return false;
            }
            if raw.matches('-').count() > 1 || raw.matches('.').count() > 1 {
                return false;
            }
            if raw.find('-').is_some_and(|pos| pos > 0) {
                return false;
            }
            re.is_match(raw)
        }

        Check::Url(re) => trimmed.is_empty() || re.is_match(raw),

        Check::Custom { function, args } => (form.customs[*function])(value, args),

        Check::Filesize { limit } => match value.upload() {
            None => true,
            Some(info) => info.error_code == 0 && info.byte_size <= *limit,
        },

        Check::Filetype { allowed } => match value.upload() {
            None => true,
            Some(info) => form
                .mimes
                .extensions_for(&info.mime_type)
                .iter()
                .any(|ext| allowed.iter().any(|a| a == ext)),
        },

        Check::Upload => match value.upload() {
            None => true,
            Some(info) => info.error_code == 0,
        },

        Check::Image => match value.upload() {
            None => true,
            Some(info) => IMAGE_MIME.is_match(&info.mime_type),
        },
    }
}

/// The timestamp a field's `date` rule derives from its current value.
/// Computed on demand (and cached) so comparison rules work no matter which
/// field of the pair validates first.
fn derived_timestamp(
    field: &CompiledField,
    state: &FormState,
    ctx: &mut PassContext,
) -> Option<i64> {
    if let Some(ts) = ctx.timestamp(&field.id) {
        return Some(ts);
    }
    let format = field.rules.iter().find_map(|r| match &r.check {
        Check::Date(f) => Some(f),
        _ => None,
    })?;
    let value = state
        .get(&field.id)
        .cloned()
        .unwrap_or_else(|| FieldValue::empty(field.kind));
    let raw = value.as_text()?;
    if raw.trim().is_empty() {
        return None;
    }
    let ts = format.timestamp(raw)?;
    ctx.record_timestamp(&field.id, ts);
    Some(ts)
}
