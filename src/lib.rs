mod compile;
mod datetime;
pub mod decl;
mod depend;
mod error;
mod rules;
mod types;
mod validate;

pub use decl::{DeclError, MimeTable};
pub use error::FormicError;
pub use types::{
    CallbackFn, ConfigError, CustomFn, DateOp, DependencyBinding, Expected, Feedback, Field,
    FieldBuilder, FieldKind, FieldOutcome, FieldValue, FormBuilder, FormReport, FormSet, FormState,
    PassContext, Presenter, Rule, RuleKind, UploadInfo, ValidateError,
};
pub use validate::{Mode, Phase, Session};
