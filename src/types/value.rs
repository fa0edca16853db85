use std::fmt;

use super::field::FieldKind;

/// A field's current value, read fresh from the [`FormState`](super::FormState)
/// on every validation pass. Values are never cached across passes.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text-like controls: inputs, passwords, textareas.
    Text(String),
    /// Choice controls: the selected entries. Single-choice controls hold at
    /// most one entry; multi-choice and boolean groups hold zero or more.
    Selected(Vec<String>),
    /// File controls. `None` until the upload side-channel reports a result.
    File(Option<UploadInfo>),
    /// Composite time controls: one slot per part (hours, minutes, ...),
    /// `None` for a part that has not been picked yet.
    Parts(Vec<Option<String>>),
}

/// Result of an out-of-band file upload, delivered after the transport
/// (which is not this crate's concern) finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadInfo {
    pub file_name: String,
    pub mime_type: String,
    /// `0` means the upload succeeded; any other value is a transport error code.
    pub error_code: u32,
    pub byte_size: u64,
}

impl FieldValue {
    /// Shorthand for a text value.
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Shorthand for a set of selected entries.
    pub fn selected<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::Selected(entries.into_iter().map(Into::into).collect())
    }

    /// The empty value for a field of the given kind. Used when the form
    /// state holds no entry for a field.
    #[must_use]
    pub fn empty(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => FieldValue::Text(String::new()),
            FieldKind::ChoiceOne | FieldKind::ChoiceMany | FieldKind::BoolGroup => {
                FieldValue::Selected(Vec::new())
            }
            FieldKind::File => FieldValue::File(None),
            FieldKind::Time => FieldValue::Parts(Vec::new()),
        }
    }

    /// Whether the value counts as "nothing entered" for the `required` rule.
    ///
    /// Text is empty when it is whitespace-only; a choice group when nothing
    /// is selected; a file control until an upload was reported; a composite
    /// time control when it has no parts or any part is still unset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Selected(entries) => entries.is_empty(),
            FieldValue::File(info) => info.is_none(),
            FieldValue::Parts(parts) => parts.is_empty() || parts.iter().any(Option::is_none),
        }
    }

    /// The raw text of a text-like value, `None` for other kinds.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The selected entries of a choice value; empty slice for other kinds.
    #[must_use]
    pub fn selections(&self) -> &[String] {
        match self {
            FieldValue::Selected(entries) => entries,
            _ => &[],
        }
    }

    /// The reported upload, if this is a file value and an upload happened.
    #[must_use]
    pub fn upload(&self) -> Option<&UploadInfo> {
        match self {
            FieldValue::File(info) => info.as_ref(),
            _ => None,
        }
    }

    /// A flat text rendering, used for error-report value snapshots.
    #[must_use]
    pub fn snapshot(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Selected(entries) => entries.join(", "),
            FieldValue::File(Some(info)) => info.file_name.clone(),
            FieldValue::File(None) => String::new(),
            FieldValue::Parts(parts) => parts
                .iter()
                .map(|p| p.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join(":"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<UploadInfo> for FieldValue {
    fn from(v: UploadInfo) -> Self {
        FieldValue::File(Some(v))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.snapshot())
    }
}
