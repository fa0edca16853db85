mod dependency;
mod error;
mod field;
mod form;
mod outcome;
mod rule;
mod state;
mod value;

pub use dependency::{DependencyBinding, Expected};
pub use error::{ConfigError, ValidateError};
pub use field::{Field, FieldKind};
pub use form::{CallbackFn, CustomFn, FieldBuilder, FormBuilder, FormSet};
pub use outcome::{Feedback, FieldOutcome, FormReport, Presenter};
pub use rule::{DateOp, Rule, RuleKind};
pub use state::{FormState, PassContext};
pub use value::{FieldValue, UploadInfo};

pub(crate) use dependency::{CompiledBinding, CompiledCallback, CompiledCondition, ProxyEntry};
pub(crate) use field::CompiledField;
pub(crate) use form::Placement;
pub(crate) use rule::{Check, CompiledRule};
