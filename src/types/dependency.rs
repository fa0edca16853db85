/// The value a proxy field must hold for a dependency condition to be met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    /// The proxy's value (any entry of a group's merged value) equals this.
    Equals(String),
    /// The proxy's value is a member of this set.
    AnyOf(Vec<String>),
    /// Every entry of this set is present in the proxy's merged value.
    /// Meaningful for checkbox-group proxies that must all be ticked.
    AllOf(Vec<String>),
}

impl Expected {
    pub fn equals(value: impl Into<String>) -> Self {
        Expected::Equals(value.into())
    }

    pub fn any_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expected::AnyOf(values.into_iter().map(Into::into).collect())
    }

    pub fn all_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expected::AllOf(values.into_iter().map(Into::into).collect())
    }

    /// Whether the proxy's current (group-merged) values meet this condition.
    /// A proxy with no value at all meets nothing.
    pub(crate) fn matches(&self, values: &[String]) -> bool {
        if values.is_empty() {
            return false;
        }
        match self {
            Expected::Equals(want) => values.iter().any(|v| v == want),
            Expected::AnyOf(set) => values.iter().any(|v| set.contains(v)),
            Expected::AllOf(set) => {
                !set.is_empty() && set.iter().all(|want| values.contains(want))
            }
        }
    }

    /// Canonical string form of the condition, used as the per-pass
    /// memoization key so that two dependents requiring the same condition
    /// on the same proxy share one evaluation.
    #[must_use]
    pub(crate) fn signature(&self) -> String {
        match self {
            Expected::Equals(v) => format!("={v}"),
            Expected::AnyOf(set) => format!("any|{}", set.join("|")),
            Expected::AllOf(set) => format!("all|{}", set.join("|")),
        }
    }
}

/// A field's dependency binding: the conditions (ANDed, in declaration
/// order) under which the field is validated at all, plus an optional
/// callback fired when a proxy's value changes.
#[derive(Debug, Clone, Default)]
pub struct DependencyBinding {
    pub(crate) conditions: Vec<(String, Expected)>,
    pub(crate) callback: Option<(String, Vec<String>)>,
}

impl DependencyBinding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition on a proxy field. Conditions are evaluated in the
    /// order they were added, short-circuiting on the first unmet one.
    #[must_use]
    pub fn when(mut self, proxy: &str, expected: Expected) -> Self {
        self.conditions.push((proxy.to_owned(), expected));
        self
    }

    /// Register a callback (by registry name) invoked with
    /// `(satisfied, args...)` whenever one of the binding's proxies changes.
    #[must_use]
    pub fn with_callback<I, S>(mut self, name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.callback = Some((
            name.to_owned(),
            args.into_iter().map(Into::into).collect(),
        ));
        self
    }

    #[must_use]
    pub fn conditions(&self) -> &[(String, Expected)] {
        &self.conditions
    }
}

/// A binding with its callback resolved to a registry index.
#[derive(Debug, Clone)]
pub(crate) struct CompiledBinding {
    pub(crate) conditions: Vec<CompiledCondition>,
    pub(crate) callback: Option<CompiledCallback>,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledCondition {
    pub(crate) proxy: String,
    pub(crate) expected: Expected,
    pub(crate) signature: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledCallback {
    pub(crate) function: usize,
    pub(crate) args: Vec<String>,
}

/// Derived at compile time: one entry per proxy field name, listing the
/// fields whose validation depends on it.
#[derive(Debug, Clone, Default)]
pub(crate) struct ProxyEntry {
    pub(crate) dependents: Vec<usize>,
}
