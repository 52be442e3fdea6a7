use crate::schema::FieldKind;
use std::fmt;
use thiserror::Error;

/// What went wrong at the innermost point of a failed conversion.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MarshalErrorKind {
    #[error("value must be a table, got {found}")]
    NotATable { found: &'static str },

    #[error("non-string key in table")]
    NonStringKey,

    #[error("could not find field {0:?}")]
    UnknownField(String),

    #[error("expected {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("non-integer value")]
    NonIntegerValue(String),

    #[error("fields {first:?} and {second:?} are members of the same union")]
    UnionConflict {
        first: &'static str,
        second: &'static str,
    },

    #[error("could not find enum value {name:?}")]
    UnknownEnumerant { field: String, name: String },

    #[error("can't map field kind {kind} from a script value")]
    UnsupportedFieldKind { field: String, kind: String },

    #[error("recursion depth exceeded (limit {limit})")]
    RecursionLimitExceeded { limit: u32 },
}

/// One step of the path from the converted root to the offending value.
#[derive(Clone, Debug, PartialEq)]
pub enum Breadcrumb {
    Struct(&'static str),
    Field(&'static str),
    Element { list: String, index: usize },
}

impl fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Breadcrumb::Struct(name) => write!(f, "struct {name}"),
            Breadcrumb::Field(name) => write!(f, "field {name:?}"),
            Breadcrumb::Element { list, index } => write!(f, "{list}[{index}]"),
        }
    }
}

/// Conversion failure plus the breadcrumbs gathered while unwinding.
///
/// `path` is stored innermost-first as it is pushed during unwinding and is
/// rendered outermost-first.
#[derive(Clone, Debug, PartialEq)]
pub struct MarshalError {
    pub kind: MarshalErrorKind,
    pub path: Vec<Breadcrumb>,
}

impl MarshalError {
    pub fn new(kind: MarshalErrorKind) -> Self {
        Self {
            kind,
            path: Vec::new(),
        }
    }

    pub(crate) fn within_struct(mut self, name: &'static str) -> Self {
        self.path.push(Breadcrumb::Struct(name));
        self
    }

    pub(crate) fn within_field(mut self, name: &'static str) -> Self {
        self.path.push(Breadcrumb::Field(name));
        self
    }

    pub(crate) fn within_element(mut self, element: FieldKind, index: usize) -> Self {
        self.path.push(Breadcrumb::Element {
            list: format!("List({element})"),
            index,
        });
        self
    }

    /// Breadcrumbs from the root down to the failure.
    pub fn path_from_root(&self) -> impl Iterator<Item = &Breadcrumb> {
        self.path.iter().rev()
    }
}

impl fmt::Display for MarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, crumb) in self.path_from_root().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{crumb}")?;
        }
        if !self.path.is_empty() {
            f.write_str(": ")?;
        }
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for MarshalError {}

impl From<MarshalErrorKind> for MarshalError {
    fn from(kind: MarshalErrorKind) -> Self {
        MarshalError::new(kind)
    }
}
