use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::dependency::{DependencyBinding, ProxyEntry};
use super::error::{ConfigError, ValidateError};
use super::field::{CompiledField, Field, FieldKind};
use super::outcome::{FieldOutcome, FormReport};
use super::rule::Rule;
use super::state::{FormState, PassContext};
use crate::decl::MimeTable;
use crate::validate::{Mode, Session};

/// A custom rule predicate: `(value, declared args) -> passes?`.
pub type CustomFn = Arc<dyn Fn(&super::FieldValue, &[String]) -> bool + Send + Sync>;

/// A dependency callback: `(satisfied, declared args)`.
pub type CallbackFn = Arc<dyn Fn(bool, &[String]) + Send + Sync>;

/// Builder for constructing a [`FormSet`].
///
/// Fields are registered in validation order and compiled into an immutable,
/// shareable structure. Custom predicates and dependency callbacks live in a
/// typed registry; a rule referencing an unregistered name fails
/// [`compile()`](Self::compile) instead of silently passing at validation
/// time.
///
/// # Example
///
/// ```
/// use formic::{DependencyBinding, Expected, FieldKind, FormBuilder, Rule};
///
/// let form = FormBuilder::new()
///     .field("email", FieldKind::Text, |f| {
///         f.rule(Rule::required("Email is required"))
///             .rule(Rule::email("Email address seems to be invalid"))
///     })
///     .field("extra", FieldKind::BoolGroup, |f| {
///         f.rule(Rule::required("Pick at least one extra"))
///             .depends_on(DependencyBinding::new().when("room", Expected::equals("A")))
///     })
///     .field("room", FieldKind::ChoiceOne, |f| {
///         f.rule(Rule::required("Room selection is required"))
///     })
///     .compile()
///     .unwrap();
/// assert_eq!(form.field_order(), vec!["email", "extra", "room"]);
/// ```
#[derive(Default)]
pub struct FormBuilder {
    pub(crate) fields: Vec<(Field, Placement)>,
    pub(crate) customs: Vec<(String, CustomFn)>,
    pub(crate) callbacks: Vec<(String, CallbackFn)>,
    pub(crate) mimes: MimeTable,
}

/// Where a field lands in the validation order.
#[derive(Debug, Clone, Default)]
pub(crate) enum Placement {
    /// Appended in registration order.
    #[default]
    Append,
    /// Inserted right after the named field.
    After(String),
}

/// Intermediate builder passed to the field definition closure.
#[derive(Default)]
pub struct FieldBuilder {
    name: Option<String>,
    rules: Vec<Rule>,
    dependency: Option<DependencyBinding>,
}

impl FormBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field. Validation order is registration order unless
    /// [`field_after`](Self::field_after) is used.
    #[must_use]
    pub fn field(
        mut self,
        id: &str,
        kind: FieldKind,
        f: impl FnOnce(FieldBuilder) -> FieldBuilder,
    ) -> Self {
        let builder = f(FieldBuilder::default());
        self.fields
            .push((builder.into_field(id, kind), Placement::Append));
        self
    }

    /// Register a field that is validated right after `after`, regardless of
    /// registration order. Compilation fails if `after` is never registered.
    #[must_use]
    pub fn field_after(
        mut self,
        id: &str,
        after: &str,
        kind: FieldKind,
        f: impl FnOnce(FieldBuilder) -> FieldBuilder,
    ) -> Self {
        let builder = f(FieldBuilder::default());
        self.fields.push((
            builder.into_field(id, kind),
            Placement::After(after.to_owned()),
        ));
        self
    }

    /// Register a custom rule predicate under a name that `custom` rules can
    /// reference.
    #[must_use]
    pub fn custom_fn(
        mut self,
        name: &str,
        f: impl Fn(&super::FieldValue, &[String]) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.customs.push((name.to_owned(), Arc::new(f)));
        self
    }

    /// Register a dependency callback under a name that bindings can
    /// reference.
    #[must_use]
    pub fn callback(
        mut self,
        name: &str,
        f: impl Fn(bool, &[String]) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.push((name.to_owned(), Arc::new(f)));
        self
    }

    /// Attach the mime-type lookup table consulted by `filetype` rules. The
    /// table is resolved here, before any validation pass can need it.
    #[must_use]
    pub fn mime_table(mut self, table: MimeTable) -> Self {
        self.mimes = table;
        self
    }

    /// Compile the fields into an immutable `FormSet`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the definition is broken: duplicate ids,
    /// unresolved compare targets, custom functions, callbacks, insertion
    /// points, or invalid rule parameters.
    pub fn compile(self) -> Result<FormSet, ConfigError> {
        crate::compile::compile(self)
    }
}

impl FieldBuilder {
    /// Append a rule. Rules run in the order they were added.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Override the group name (defaults to the field id). Radio and
    /// checkbox groups share a name across controls.
    #[must_use]
    pub fn group(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    /// Attach the field's dependency binding. At most one per field; a
    /// later call replaces the earlier binding.
    #[must_use]
    pub fn depends_on(mut self, binding: DependencyBinding) -> Self {
        self.dependency = Some(binding);
        self
    }

    fn into_field(self, id: &str, kind: FieldKind) -> Field {
        Field {
            id: id.to_owned(),
            name: self.name.unwrap_or_else(|| id.to_owned()),
            kind,
            rules: self.rules,
            dependency: self.dependency,
        }
    }
}

/// A compiled, immutable form definition. Thread-safe and designed to live
/// behind `Arc`; all per-pass mutable state lives in [`PassContext`] or a
/// [`Session`].
pub struct FormSet {
    pub(crate) fields: Vec<CompiledField>,
    /// field id -> index into `fields`.
    pub(crate) index: HashMap<String, usize>,
    /// group name -> indices of every field sharing it.
    pub(crate) groups: HashMap<String, Vec<usize>>,
    /// proxy name -> fields whose validation depends on it.
    pub(crate) proxies: HashMap<String, ProxyEntry>,
    pub(crate) customs: Vec<CustomFn>,
    pub(crate) callbacks: Vec<CallbackFn>,
    pub(crate) mimes: MimeTable,
}

impl FormSet {
    /// Run a full-form pass against the given state with a fresh pass
    /// context. For repeated passes over one form instance (re-entrancy and
    /// double-submission guards, presentation hand-off) use
    /// [`session()`](Self::session).
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError`] if a dependency cycle is hit; rule failures
    /// are reported in the [`FormReport`], not as errors.
    pub fn validate(&self, state: &FormState, mode: Mode) -> Result<FormReport, ValidateError> {
        let mut ctx = PassContext::new();
        crate::validate::validate_all(self, state, mode, &mut ctx)
    }

    /// Re-validate a single field, reusing the caller's pass context (cached
    /// proxy results from an earlier pass stay valid).
    ///
    /// # Errors
    ///
    /// [`ValidateError::UnknownField`] for an unregistered id,
    /// [`ValidateError::DependencyCycle`] if resolution loops.
    pub fn validate_field(
        &self,
        id: &str,
        state: &FormState,
        ctx: &mut PassContext,
    ) -> Result<FieldOutcome, ValidateError> {
        let idx = self
            .index
            .get(id)
            .copied()
            .ok_or_else(|| ValidateError::UnknownField { id: id.to_owned() })?;
        crate::validate::validate_field(self, idx, state, ctx)
    }

    /// Recompute dependency satisfaction for every field depending on
    /// `proxy` and fire declared callbacks with `(satisfied, args)`. Call
    /// this when a proxy's value changes outside a validation pass.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError::DependencyCycle`] if resolution loops.
    pub fn proxy_changed(&self, proxy: &str, state: &FormState) -> Result<(), ValidateError> {
        crate::depend::proxy_changed(self, proxy, state)
    }

    /// Create a stateful validation session for one form instance.
    #[must_use]
    pub fn session(&self) -> Session<'_> {
        Session::new(self)
    }

    /// Field ids in validation order.
    #[must_use]
    pub fn field_order(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.id.as_str()).collect()
    }

    /// The number of registered fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn field_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }
}

impl fmt::Debug for FormSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSet")
            .field("fields", &self.fields)
            .field("proxies", &self.proxies)
            .field("customs", &self.customs.len())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl fmt::Debug for FormBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormBuilder")
            .field("fields", &self.fields.len())
            .field("customs", &self.customs.len())
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl fmt::Display for FormSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FormSet({} fields, {} proxies)",
            self.fields.len(),
            self.proxies.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expected, FieldValue};

    #[test]
    fn builder_collects_fields_in_order() {
        let builder = FormBuilder::new()
            .field("name", FieldKind::Text, |f| {
                f.rule(Rule::required("Name is required"))
            })
            .field("email", FieldKind::Text, |f| {
                f.rule(Rule::required("Email is required"))
                    .rule(Rule::email("Invalid email"))
            });
        assert_eq!(builder.fields.len(), 2);
        assert_eq!(builder.fields[0].0.id(), "name");
        assert_eq!(builder.fields[1].0.id(), "email");
        assert_eq!(builder.fields[1].0.rules().len(), 2);
    }

    #[test]
    fn group_name_defaults_to_id() {
        let builder = FormBuilder::new()
            .field("room", FieldKind::ChoiceOne, |f| f)
            .field("extra_1", FieldKind::BoolGroup, |f| f.group("extra"));
        assert_eq!(builder.fields[0].0.name(), "room");
        assert_eq!(builder.fields[1].0.name(), "extra");
    }

    #[test]
    fn field_after_records_placement() {
        let builder = FormBuilder::new()
            .field("a", FieldKind::Text, |f| f)
            .field_after("b", "a", FieldKind::Text, |f| f);
        assert!(matches!(&builder.fields[1].1, Placement::After(x) if x == "a"));
    }

    #[test]
    fn dependency_binding_is_kept() {
        let builder = FormBuilder::new().field("extra", FieldKind::BoolGroup, |f| {
            f.depends_on(DependencyBinding::new().when("room", Expected::equals("A")))
        });
        let dep = builder.fields[0].0.dependency().unwrap();
        assert_eq!(dep.conditions().len(), 1);
    }

    #[test]
    fn custom_fn_registry_collects_names() {
        let builder = FormBuilder::new()
            .custom_fn("always", |_v: &FieldValue, _args: &[String]| true)
            .callback("noop", |_s, _args| {});
        assert_eq!(builder.customs[0].0, "always");
        assert_eq!(builder.callbacks[0].0, "noop");
    }
}
