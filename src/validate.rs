//! The validation orchestrator: drives fields through their rule chains in
//! declared order, consulting dependency resolution before each field.
//!
//! [`FormSet::validate()`](crate::FormSet::validate) runs one stateless pass.
//! [`Session`] wraps repeated passes over a single form instance with the
//! re-entrancy and double-submission guards interactive forms need.

use tracing::{debug, debug_span};

use crate::depend;
use crate::rules;
use crate::types::{
    FieldOutcome, FieldValue, FormReport, FormSet, FormState, PassContext, Presenter, UploadInfo,
    ValidateError,
};

/// Form-level aggregation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Stop visiting fields at the first invalid one.
    #[default]
    FailFast,
    /// Validate every field and surface every error.
    CollectAll,
}

/// Where a [`Session`] stands in its pass lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    AllValid,
    SomeInvalid,
}

/// Run a full pass: clear the pass context, then visit fields in declared
/// validation order.
pub(crate) fn validate_all(
    form: &FormSet,
    state: &FormState,
    mode: Mode,
    ctx: &mut PassContext,
) -> Result<FormReport, ValidateError> {
    let _span = debug_span!("validate_all", ?mode).entered();
    ctx.reset();

    let mut outcomes = Vec::with_capacity(form.fields.len());
    for idx in 0..form.fields.len() {
        let outcome = validate_field(form, idx, state, ctx)?;
        let invalid = !outcome.is_valid();
        outcomes.push((form.fields[idx].id.clone(), outcome));
        if invalid && mode == Mode::FailFast {
            break;
        }
    }

    let report = FormReport::new(outcomes);
    debug!(%report, "pass finished");
    Ok(report)
}

/// Validate one field: dependency short-circuit first, then the rule chain
/// in declared order, stopping at the first failure.
pub(crate) fn validate_field(
    form: &FormSet,
    idx: usize,
    state: &FormState,
    ctx: &mut PassContext,
) -> Result<FieldOutcome, ValidateError> {
    let field = &form.fields[idx];

    if !depend::is_satisfied(form, idx, state, ctx)? {
        debug!(field = %field.id, "preconditions unmet; exempt");
        return Ok(FieldOutcome::Exempt);
    }

    let value = state
        .get(&field.id)
        .cloned()
        .unwrap_or_else(|| FieldValue::empty(field.kind));

    for rule in &field.rules {
        if !rules::evaluate(form, field, rule, &value, state, ctx) {
            debug!(field = %field.id, rule = rule.name, "rule failed");
            return Ok(FieldOutcome::Invalid {
                rule: rule.name.to_owned(),
                message: rule.message.clone(),
                value: value.snapshot(),
            });
        }
    }
    Ok(FieldOutcome::Valid)
}

/// Stateful validation for one form instance.
///
/// Holds the live [`FormState`], the pass context, and the guards the
/// interactive flow needs: a pass cannot start while another runs (busy
/// flag), and a second submit in the same turn returns the previous result
/// instead of re-running (`validated` flag, cleared when any value changes).
#[derive(Debug)]
pub struct Session<'a> {
    form: &'a FormSet,
    state: FormState,
    ctx: PassContext,
    mode: Mode,
    phase: Phase,
    busy: bool,
    validated: bool,
    report: FormReport,
}

impl<'a> Session<'a> {
    pub(crate) fn new(form: &'a FormSet) -> Self {
        Self {
            form,
            state: FormState::new(),
            ctx: PassContext::new(),
            mode: Mode::default(),
            phase: Phase::Idle,
            busy: false,
            validated: false,
            report: FormReport::new(Vec::new()),
        }
    }

    /// Select the aggregation mode (fail-fast by default).
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Update a field's live value. Invalidates the current turn's result,
    /// so the next [`validate_all`](Self::validate_all) runs a fresh pass.
    pub fn set_value(&mut self, id: &str, value: impl Into<FieldValue>) {
        self.state.insert(id, value);
        self.validated = false;
        self.phase = Phase::Idle;
    }

    /// Feed the upload side-channel result for a file field.
    pub fn upload_result(&mut self, id: &str, info: UploadInfo) {
        self.set_value(id, FieldValue::File(Some(info)));
    }

    /// Notify that a proxy field's value changed: dependents are recomputed
    /// and declared callbacks fired.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError::DependencyCycle`] if resolution loops.
    pub fn proxy_changed(&mut self, proxy: &str) -> Result<(), ValidateError> {
        depend::proxy_changed(self.form, proxy, &self.state)
    }

    /// Run a full-form pass, or return the existing result when this turn
    /// already validated (submitting twice must not evaluate twice).
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError`] if a dependency cycle aborts the pass.
    pub fn validate_all(&mut self) -> Result<&FormReport, ValidateError> {
        if self.busy {
            debug!("pass already in progress; ignoring");
            return Ok(&self.report);
        }
        if !self.validated {
            self.busy = true;
            self.phase = Phase::Running;
            let result = validate_all(self.form, &self.state, self.mode, &mut self.ctx);
            self.busy = false;
            let report = match result {
                Ok(report) => report,
                Err(err) => {
                    self.phase = Phase::Idle;
                    return Err(err);
                }
            };
            self.phase = if report.is_valid() {
                Phase::AllValid
            } else {
                Phase::SomeInvalid
            };
            self.report = report;
            self.validated = true;
        }
        Ok(&self.report)
    }

    /// Re-validate a single field (after a value change, say) without
    /// clearing the cached proxy results of the surrounding pass.
    ///
    /// # Errors
    ///
    /// [`ValidateError::UnknownField`] for an unregistered id,
    /// [`ValidateError::DependencyCycle`] if resolution loops.
    pub fn validate_field(&mut self, id: &str) -> Result<FieldOutcome, ValidateError> {
        let idx = self
            .form
            .field_index(id)
            .ok_or_else(|| ValidateError::UnknownField { id: id.to_owned() })?;
        validate_field(self.form, idx, &self.state, &mut self.ctx)
    }

    /// The last pass's report. Empty until the first pass runs; check
    /// [`phase()`](Self::phase) to distinguish.
    #[must_use]
    pub fn report(&self) -> &FormReport {
        &self.report
    }

    /// Hand the last report to the presentation adapter, one feedback entry
    /// per visited field.
    pub fn present(&self, presenter: &mut dyn Presenter) {
        presenter.clear();
        for feedback in self.report.feedback() {
            presenter.present(&feedback);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::{DependencyBinding, Expected, FieldKind, FormBuilder, Rule};

    fn email_form() -> FormSet {
        FormBuilder::new()
            .field("email", FieldKind::Text, |f| {
                f.rule(Rule::required("Required")).rule(Rule::email("Invalid"))
            })
            .compile()
            .unwrap()
    }

    #[test]
    fn empty_email_fails_required_with_its_message() {
        let form = email_form();
        let report = form
            .validate(&FormState::new().set("email", ""), Mode::FailFast)
            .unwrap();
        let outcome = report.outcome("email").unwrap();
        assert_eq!(outcome.failing_rule(), Some("required"));
        assert_eq!(outcome.message(), Some("Required"));
    }

    #[test]
    fn malformed_email_fails_email_rule() {
        let form = email_form();
        let report = form
            .validate(&FormState::new().set("email", "a@@b"), Mode::FailFast)
            .unwrap();
        assert_eq!(
            report.outcome("email").unwrap().failing_rule(),
            Some("email")
        );
    }

    #[test]
    fn well_formed_email_is_valid() {
        let form = email_form();
        let report = form
            .validate(&FormState::new().set("email", "a@b.com"), Mode::FailFast)
            .unwrap();
        assert!(report.is_valid());
        assert_eq!(report.outcome("email"), Some(&FieldOutcome::Valid));
    }

    #[test]
    fn password_length_scenario() {
        let form = FormBuilder::new()
            .field("password", FieldKind::Text, |f| {
                f.rule(Rule::length(6, 10, "Too short/long"))
            })
            .compile()
            .unwrap();

        let report = form
            .validate(&FormState::new().set("password", "abc"), Mode::FailFast)
            .unwrap();
        assert_eq!(
            report.outcome("password").unwrap().failing_rule(),
            Some("length")
        );

        let report = form
            .validate(&FormState::new().set("password", "abcdefgh"), Mode::FailFast)
            .unwrap();
        assert!(report.is_valid());
    }

    #[test]
    fn unmet_dependency_exempts_field_with_failing_rules() {
        let form = FormBuilder::new()
            .field("room", FieldKind::ChoiceOne, |f| f)
            .field("extra_requirements", FieldKind::Text, |f| {
                f.rule(Rule::required("Tell us what you need"))
                    .depends_on(DependencyBinding::new().when("room", Expected::equals("A")))
            })
            .compile()
            .unwrap();

        let state = FormState::new().set("room", FieldValue::selected(["B"]));
        let report = form.validate(&state, Mode::CollectAll).unwrap();
        assert!(report.is_valid());
        assert_eq!(
            report.outcome("extra_requirements"),
            Some(&FieldOutcome::Exempt)
        );

        // Room A re-arms the field's own rules.
        let state = FormState::new().set("room", FieldValue::selected(["A"]));
        let report = form.validate(&state, Mode::CollectAll).unwrap();
        assert_eq!(
            report.outcome("extra_requirements").unwrap().failing_rule(),
            Some("required")
        );
    }

    #[test]
    fn first_failing_rule_wins_even_when_later_rules_fail_too() {
        let form = FormBuilder::new()
            .field("code", FieldKind::Text, |f| {
                f.rule(Rule::length(10, 20, "Too short"))
                    .rule(Rule::digits("", "Digits only"))
            })
            .compile()
            .unwrap();
        // "abc" fails both rules; only the first is reported.
        let report = form
            .validate(&FormState::new().set("code", "abc"), Mode::FailFast)
            .unwrap();
        assert_eq!(report.outcome("code").unwrap().failing_rule(), Some("length"));
    }

    #[test]
    fn fail_fast_stops_visiting_fields() {
        let form = FormBuilder::new()
            .field("first", FieldKind::Text, |f| f.rule(Rule::required("r1")))
            .field("second", FieldKind::Text, |f| f.rule(Rule::required("r2")))
            .compile()
            .unwrap();

        let report = form.validate(&FormState::new(), Mode::FailFast).unwrap();
        assert_eq!(report.outcomes().count(), 1);
        assert_eq!(report.first_invalid().unwrap().0, "first");

        let report = form.validate(&FormState::new(), Mode::CollectAll).unwrap();
        assert_eq!(report.outcomes().count(), 2);
        assert!(report.outcomes().all(|(_, o)| !o.is_valid()));
    }

    #[test]
    fn validate_all_is_idempotent() {
        let form = FormBuilder::new()
            .field("a", FieldKind::Text, |f| f.rule(Rule::required("req")))
            .field("b", FieldKind::Text, |f| f.rule(Rule::email("mail")))
            .compile()
            .unwrap();
        let state = FormState::new().set("a", "x").set("b", "not-an-email");

        let first = form.validate(&state, Mode::CollectAll).unwrap();
        let second = form.validate(&state, Mode::CollectAll).unwrap();
        let a: Vec<_> = first.outcomes().collect();
        let b: Vec<_> = second.outcomes().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn date_compare_round_trip() {
        let form = FormBuilder::new()
            .field("arrival", FieldKind::Text, |f| {
                f.rule(Rule::date("Y-m-d", "Bad date"))
                    .rule(Rule::datecompare(
                        "departure",
                        crate::DateOp::Before,
                        "Arrival must precede departure",
                    ))
            })
            .field("departure", FieldKind::Text, |f| {
                f.rule(Rule::date("Y-m-d", "Bad date"))
            })
            .compile()
            .unwrap();

        let state = FormState::new()
            .set("arrival", "2024-01-10")
            .set("departure", "2024-02-01");
        assert!(form.validate(&state, Mode::CollectAll).unwrap().is_valid());

        let state = FormState::new()
            .set("arrival", "2024-02-01")
            .set("departure", "2024-01-10");
        let report = form.validate(&state, Mode::CollectAll).unwrap();
        assert_eq!(
            report.outcome("arrival").unwrap().failing_rule(),
            Some("datecompare")
        );
    }

    #[test]
    fn invalid_snapshot_carries_offending_value() {
        let form = email_form();
        let report = form
            .validate(&FormState::new().set("email", "a@@b"), Mode::FailFast)
            .unwrap();
        match report.outcome("email").unwrap() {
            FieldOutcome::Invalid { value, .. } => assert_eq!(value, "a@@b"),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn session_does_not_rerun_a_validated_turn() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let form = FormBuilder::new()
            .custom_fn("count_runs", move |_value, _args| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            })
            .field("x", FieldKind::Text, |f| {
                f.rule(Rule::custom("count_runs", Vec::<String>::new(), "never"))
            })
            .compile()
            .unwrap();

        let mut session = form.session();
        session.set_value("x", "v");
        session.validate_all().unwrap();
        session.validate_all().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // A value change opens a new turn.
        session.set_value("x", "w");
        session.validate_all().unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn session_phase_tracks_pass_outcome() {
        let form = email_form();
        let mut session = form.session();
        assert_eq!(session.phase(), Phase::Idle);

        session.set_value("email", "a@b.com");
        session.validate_all().unwrap();
        assert_eq!(session.phase(), Phase::AllValid);

        session.set_value("email", "");
        assert_eq!(session.phase(), Phase::Idle);
        session.validate_all().unwrap();
        assert_eq!(session.phase(), Phase::SomeInvalid);
    }

    #[test]
    fn session_validate_field_unknown_id() {
        let form = email_form();
        let mut session = form.session();
        let err = session.validate_field("nope").unwrap_err();
        assert!(matches!(err, ValidateError::UnknownField { id } if id == "nope"));
    }

    #[test]
    fn upload_side_channel_drives_file_rules() {
        let form = FormBuilder::new()
            .field("attachment", FieldKind::File, |f| {
                f.rule(Rule::filesize(1024, "File too large"))
                    .rule(Rule::upload("Upload failed"))
            })
            .compile()
            .unwrap();
        let mut session = form.session();

        // Nothing uploaded yet: file rules stay quiet.
        assert!(session.validate_all().unwrap().is_valid());

        session.upload_result(
            "attachment",
            UploadInfo {
                file_name: "big.bin".into(),
                mime_type: "application/octet-stream".into(),
                error_code: 0,
                byte_size: 4096,
            },
        );
        let report = session.validate_all().unwrap();
        assert_eq!(
            report.outcome("attachment").unwrap().failing_rule(),
            Some("filesize")
        );
    }

    #[test]
    fn present_hands_feedback_to_adapter() {
        struct Sink {
            cleared: bool,
            entries: Vec<crate::Feedback>,
        }
        impl Presenter for Sink {
            fn present(&mut self, feedback: &crate::Feedback) {
                self.entries.push(feedback.clone());
            }
            fn clear(&mut self) {
                self.cleared = true;
            }
        }

        let form = email_form();
        let mut session = form.session();
        session.set_value("email", "a@@b");
        session.validate_all().unwrap();

        let mut sink = Sink {
            cleared: false,
            entries: Vec::new(),
        };
        session.present(&mut sink);
        assert!(sink.cleared);
        assert_eq!(sink.entries.len(), 1);
        assert_eq!(sink.entries[0].field, "email");
        assert!(!sink.entries[0].valid);
        assert_eq!(sink.entries[0].message.as_deref(), Some("Invalid"));
    }
}
