use std::collections::HashMap;

use super::value::FieldValue;

/// The live form values, keyed by field id. The engine reads from this on
/// every pass; it never stores values of its own.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    values: HashMap<String, FieldValue>,
}

impl FormState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field's value, builder style.
    #[must_use]
    pub fn set(mut self, id: &str, value: impl Into<FieldValue>) -> Self {
        self.insert(id, value.into());
        self
    }

    /// Set a field's value (mutable reference version).
    pub fn insert(&mut self, id: &str, value: impl Into<FieldValue>) {
        self.values.insert(id.to_owned(), value.into());
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        self.values.get(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<FieldValue> {
        self.values.remove(id)
    }
}

/// Mutable state scoped to one validation pass: the memoized proxy-condition
/// results and the timestamps derived by `date` rules for later comparison
/// rules.
///
/// The orchestrator clears this at the start of every full-form pass.
/// Single-field re-validation reuses it without clearing, so results cached
/// by the previous full pass stay visible, matching the pass-scoped cache
/// contract.
#[derive(Debug, Default)]
pub struct PassContext {
    /// proxy name -> condition signature -> result.
    conditions: HashMap<String, HashMap<String, bool>>,
    /// field id -> timestamp derived by that field's `date` rule.
    timestamps: HashMap<String, i64>,
    evaluations: usize,
}

impl PassContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reset(&mut self) {
        self.conditions.clear();
        self.timestamps.clear();
        self.evaluations = 0;
    }

    pub(crate) fn cached_condition(&self, proxy: &str, signature: &str) -> Option<bool> {
        self.conditions.get(proxy)?.get(signature).copied()
    }

    pub(crate) fn cache_condition(&mut self, proxy: &str, signature: &str, result: bool) {
        self.conditions
            .entry(proxy.to_owned())
            .or_default()
            .entry(signature.to_owned())
            .or_insert(result);
    }

    pub(crate) fn timestamp(&self, id: &str) -> Option<i64> {
        self.timestamps.get(id).copied()
    }

    pub(crate) fn record_timestamp(&mut self, id: &str, ts: i64) {
        self.timestamps.insert(id.to_owned(), ts);
    }

    pub(crate) fn record_evaluation(&mut self) {
        self.evaluations += 1;
    }

    /// How many proxy conditions were actually evaluated (cache misses) since
    /// the last reset. Lets callers verify the sharing contract: dependents
    /// with identical conditions on one proxy cost a single evaluation.
    #[must_use]
    pub fn proxy_evaluations(&self) -> usize {
        self.evaluations
    }
}
