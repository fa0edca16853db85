use super::dependency::{CompiledBinding, DependencyBinding};
use super::rule::{CompiledRule, Rule};

/// The closed set of field kinds. Each rule applies only to a subset of
/// kinds; a rule attached to an unsupported kind is ignored during
/// evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free-text input (text, password, textarea).
    Text,
    /// Single choice out of a fixed option set (select, radio group).
    ChoiceOne,
    /// Multiple choices out of a fixed option set (multi-select).
    ChoiceMany,
    /// A group of independent on/off options (checkbox group).
    BoolGroup,
    /// File upload control.
    File,
    /// Composite time control made of several part selectors.
    Time,
}

/// A field as declared: identity, kind, rule chain, optional dependency
/// binding. Shape is immutable once the form is compiled; only the field's
/// *value* changes between passes.
#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) id: String,
    /// Group name. Defaults to the id; radio/checkbox groups may share one.
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) rules: Vec<Rule>,
    pub(crate) dependency: Option<DependencyBinding>,
}

impl Field {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn dependency(&self) -> Option<&DependencyBinding> {
        self.dependency.as_ref()
    }
}

/// A field with its rule chain and dependency binding resolved by the
/// compilation step.
#[derive(Debug, Clone)]
pub(crate) struct CompiledField {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) kind: FieldKind,
    pub(crate) rules: Vec<CompiledRule>,
    pub(crate) dependency: Option<CompiledBinding>,
}
