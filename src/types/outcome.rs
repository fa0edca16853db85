use std::fmt;

/// The result of validating a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum FieldOutcome {
    /// Every applicable rule passed.
    Valid,
    /// The field's dependency preconditions were unmet; it was skipped and
    /// counts as valid for the form-level aggregate.
    Exempt,
    /// The first failing rule, its error message, and a snapshot of the
    /// offending value. Later rules were not evaluated.
    Invalid {
        rule: String,
        message: String,
        value: String,
    },
}

impl FieldOutcome {
    /// Whether the field counts as valid for form aggregation.
    /// Exempt fields do.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !matches!(self, FieldOutcome::Invalid { .. })
    }

    /// The name of the failing rule, `None` when the field is valid or
    /// exempt. This is the "returns the rule name instead of a boolean"
    /// contract: presentation code dispatches on it to pick the message.
    #[must_use]
    pub fn failing_rule(&self) -> Option<&str> {
        match self {
            FieldOutcome::Invalid { rule, .. } => Some(rule),
            _ => None,
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            FieldOutcome::Invalid { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Aggregate result of a full-form pass: per-field outcomes in validation
/// order.
#[derive(Debug, Clone)]
#[must_use]
pub struct FormReport {
    outcomes: Vec<(String, FieldOutcome)>,
}

impl FormReport {
    pub(crate) fn new(outcomes: Vec<(String, FieldOutcome)>) -> Self {
        Self { outcomes }
    }

    /// `true` when every visited field is valid or exempt.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.outcomes.iter().all(|(_, o)| o.is_valid())
    }

    /// Per-field outcomes, in validation order.
    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &FieldOutcome)> {
        self.outcomes.iter().map(|(id, o)| (id.as_str(), o))
    }

    /// The outcome recorded for one field, if that field was visited.
    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&FieldOutcome> {
        self.outcomes
            .iter()
            .find(|(fid, _)| fid == id)
            .map(|(_, o)| o)
    }

    /// The first invalid field, in validation order.
    #[must_use]
    pub fn first_invalid(&self) -> Option<(&str, &FieldOutcome)> {
        self.outcomes
            .iter()
            .find(|(_, o)| !o.is_valid())
            .map(|(id, o)| (id.as_str(), o))
    }

    /// Presentation-boundary view: one feedback entry per visited field.
    pub fn feedback(&self) -> impl Iterator<Item = Feedback> + '_ {
        self.outcomes.iter().map(|(id, o)| Feedback {
            field: id.clone(),
            valid: o.is_valid(),
            message: o.message().map(str::to_owned),
        })
    }
}

impl fmt::Display for FormReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let invalid = self.outcomes.iter().filter(|(_, o)| !o.is_valid()).count();
        write!(
            f,
            "FormReport({} fields, {} invalid)",
            self.outcomes.len(),
            invalid
        )
    }
}

/// What the engine hands to the presentation layer for one field. The engine
/// never touches presentation state itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub field: String,
    pub valid: bool,
    pub message: Option<String>,
}

/// Presentation adapter boundary. Implementations render or clear
/// user-visible feedback; the engine only calls them.
pub trait Presenter {
    fn present(&mut self, feedback: &Feedback);

    /// Called before a pass re-populates feedback. Default: nothing.
    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid(rule: &str) -> FieldOutcome {
        FieldOutcome::Invalid {
            rule: rule.into(),
            message: format!("{rule} failed"),
            value: String::new(),
        }
    }

    #[test]
    fn exempt_counts_as_valid() {
        assert!(FieldOutcome::Valid.is_valid());
        assert!(FieldOutcome::Exempt.is_valid());
        assert!(!invalid("required").is_valid());
    }

    #[test]
    fn failing_rule_name() {
        assert_eq!(FieldOutcome::Valid.failing_rule(), None);
        assert_eq!(invalid("email").failing_rule(), Some("email"));
    }

    #[test]
    fn report_aggregation() {
        let report = FormReport::new(vec![
            ("a".into(), FieldOutcome::Valid),
            ("b".into(), invalid("required")),
            ("c".into(), FieldOutcome::Exempt),
        ]);
        assert!(!report.is_valid());
        let (id, outcome) = report.first_invalid().unwrap();
        assert_eq!(id, "b");
        assert_eq!(outcome.failing_rule(), Some("required"));
        assert_eq!(report.outcome("c"), Some(&FieldOutcome::Exempt));
    }

    #[test]
    fn feedback_carries_messages_only_for_invalid() {
        let report = FormReport::new(vec![
            ("a".into(), FieldOutcome::Valid),
            ("b".into(), invalid("required")),
        ]);
        let feedback: Vec<Feedback> = report.feedback().collect();
        assert_eq!(feedback[0].message, None);
        assert!(feedback[0].valid);
        assert_eq!(feedback[1].message.as_deref(), Some("required failed"));
        assert!(!feedback[1].valid);
    }

    #[test]
    fn report_display() {
        let report = FormReport::new(vec![
            ("a".into(), FieldOutcome::Valid),
            ("b".into(), invalid("length")),
        ]);
        assert_eq!(report.to_string(), "FormReport(2 fields, 1 invalid)");
    }
}
