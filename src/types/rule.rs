use regex::Regex;

use crate::datetime::DateFormat;

/// A single validation rule bound to a field: a kind with its parameters and
/// the error message surfaced when the rule fails.
///
/// Rule order within a field is significant: evaluation stops at the first
/// failing rule, so only one message is ever shown per field per pass.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) kind: RuleKind,
    pub(crate) message: String,
}

/// Comparison operators accepted by the `datecompare` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOp {
    After,
    AfterOrEqual,
    Before,
    BeforeOrEqual,
}

impl DateOp {
    /// Parse the operator from its declaration form (`>`, `>=`, `<`, `<=`).
    #[must_use]
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            ">" => Some(DateOp::After),
            ">=" => Some(DateOp::AfterOrEqual),
            "<" => Some(DateOp::Before),
            "<=" => Some(DateOp::BeforeOrEqual),
            _ => None,
        }
    }

    pub(crate) fn holds(self, own: i64, other: i64) -> bool {
        match self {
            DateOp::After => own > other,
            DateOp::AfterOrEqual => own >= other,
            DateOp::Before => own < other,
            DateOp::BeforeOrEqual => own <= other,
        }
    }
}

/// The declared rule kinds. Parameters are kept in declaration form here;
/// compilation resolves them (regex patterns, target fields, custom function
/// names) into a [`CompiledRule`].
#[derive(Debug, Clone)]
pub enum RuleKind {
    Required,
    /// `min`/`max` character bounds; `None` leaves that side unbounded.
    Length { min: Option<u32>, max: Option<u32> },
    /// Numeric range; a bound of `0` leaves that side unbounded.
    Range { min: f64, max: f64 },
    Email,
    Emails,
    Regexp { pattern: String },
    Compare { other: String },
    Date { format: String },
    DateCompare { other: String, op: DateOp },
    /// Age bounds derived from a birth date; a bound of `0` is unbounded.
    Age { min: u32, max: u32 },
    Alphabet { extra: String },
    Alphanumeric { extra: String },
    Digits { extra: String },
    Number { extra: String },
    Float { extra: String },
    Url { require_protocol: bool },
    Custom { function: String, args: Vec<String> },
    Filesize { limit: u64 },
    Filetype { allowed: Vec<String> },
    Upload,
    Image,
}

impl RuleKind {
    /// The rule's declaration name, reported as the failing rule on error.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Required => "required",
            RuleKind::Length { .. } => "length",
            RuleKind::Range { .. } => "range",
            RuleKind::Email => "email",
            RuleKind::Emails => "emails",
            RuleKind::Regexp { .. } => "regexp",
            RuleKind::Compare { .. } => "compare",
            RuleKind::Date { .. } => "date",
            RuleKind::DateCompare { .. } => "datecompare",
            RuleKind::Age { .. } => "age",
            RuleKind::Alphabet { .. } => "alphabet",
            RuleKind::Alphanumeric { .. } => "alphanumeric",
            RuleKind::Digits { .. } => "digits",
            RuleKind::Number { .. } => "number",
            RuleKind::Float { .. } => "float",
            RuleKind::Url { .. } => "url",
            RuleKind::Custom { .. } => "custom",
            RuleKind::Filesize { .. } => "filesize",
            RuleKind::Filetype { .. } => "filetype",
            RuleKind::Upload => "upload",
            RuleKind::Image => "image",
        }
    }
}

impl Rule {
    /// Build a rule from an already-assembled kind.
    pub fn new(kind: RuleKind, message: impl Into<String>) -> Self {
        Rule {
            kind,
            message: message.into(),
        }
    }

    pub fn required(message: &str) -> Self {
        Rule::new(RuleKind::Required, message)
    }

    pub fn length(min: impl Into<Option<u32>>, max: impl Into<Option<u32>>, message: &str) -> Self {
        Rule::new(
            RuleKind::Length {
                min: min.into(),
                max: max.into(),
            },
            message,
        )
    }

    pub fn range(min: f64, max: f64, message: &str) -> Self {
        Rule::new(RuleKind::Range { min, max }, message)
    }

    pub fn email(message: &str) -> Self {
        Rule::new(RuleKind::Email, message)
    }

    pub fn emails(message: &str) -> Self {
        Rule::new(RuleKind::Emails, message)
    }

    pub fn regexp(pattern: &str, message: &str) -> Self {
        Rule::new(
            RuleKind::Regexp {
                pattern: pattern.to_owned(),
            },
            message,
        )
    }

    pub fn compare(other: &str, message: &str) -> Self {
        Rule::new(
            RuleKind::Compare {
                other: other.to_owned(),
            },
            message,
        )
    }

    pub fn date(format: &str, message: &str) -> Self {
        Rule::new(
            RuleKind::Date {
                format: format.to_owned(),
            },
            message,
        )
    }

    pub fn datecompare(other: &str, op: DateOp, message: &str) -> Self {
        Rule::new(
            RuleKind::DateCompare {
                other: other.to_owned(),
                op,
            },
            message,
        )
    }

    pub fn age(min: u32, max: u32, message: &str) -> Self {
        Rule::new(RuleKind::Age { min, max }, message)
    }

    pub fn alphabet(extra: &str, message: &str) -> Self {
        Rule::new(
            RuleKind::Alphabet {
                extra: extra.to_owned(),
            },
            message,
        )
    }

    pub fn alphanumeric(extra: &str, message: &str) -> Self {
        Rule::new(
            RuleKind::Alphanumeric {
                extra: extra.to_owned(),
            },
            message,
        )
    }

    pub fn digits(extra: &str, message: &str) -> Self {
        Rule::new(
            RuleKind::Digits {
                extra: extra.to_owned(),
            },
            message,
        )
    }

    pub fn number(extra: &str, message: &str) -> Self {
        Rule::new(
            RuleKind::Number {
                extra: extra.to_owned(),
            },
            message,
        )
    }

    pub fn float(extra: &str, message: &str) -> Self {
        Rule::new(
            RuleKind::Float {
                extra: extra.to_owned(),
            },
            message,
        )
    }

    pub fn url(require_protocol: bool, message: &str) -> Self {
        Rule::new(RuleKind::Url { require_protocol }, message)
    }

    pub fn custom<I, S>(function: &str, args: I, message: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::new(
            RuleKind::Custom {
                function: function.to_owned(),
                args: args.into_iter().map(Into::into).collect(),
            },
            message,
        )
    }

    pub fn filesize(limit: u64, message: &str) -> Self {
        Rule::new(RuleKind::Filesize { limit }, message)
    }

    pub fn filetype<I, S>(allowed: I, message: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::new(
            RuleKind::Filetype {
                allowed: allowed.into_iter().map(Into::into).collect(),
            },
            message,
        )
    }

    pub fn upload(message: &str) -> Self {
        Rule::new(RuleKind::Upload, message)
    }

    pub fn image(message: &str) -> Self {
        Rule::new(RuleKind::Image, message)
    }

    #[must_use]
    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A rule whose parameters have been resolved for evaluation: regex patterns
/// compiled, target fields and custom functions resolved to indices, date
/// formats pre-scanned.
///
/// Produced by the compilation step and stored inside a
/// [`FormSet`](super::FormSet).
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub(crate) name: &'static str,
    pub(crate) check: Check,
    pub(crate) message: String,
}

#[derive(Debug, Clone)]
pub(crate) enum Check {
    Required,
    Length { min: Option<u32>, max: Option<u32> },
    Range { min: f64, max: f64 },
    Email,
    Emails,
    Regexp(Regex),
    Compare { other: usize },
    Date(DateFormat),
    DateCompare { other: usize, op: DateOp },
    Age { min: u32, max: u32 },
    Alphabet(Regex),
    Alphanumeric(Regex),
    Digits(Regex),
    Number(Regex),
    Float(Regex),
    Url(Regex),
    Custom { function: usize, args: Vec<String> },
    Filesize { limit: u64 },
    Filetype { allowed: Vec<String> },
    Upload,
    Image,
}
