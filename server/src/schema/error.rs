use std::fmt;

use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrorsKind;

/// One failed check, addressed by the dotted path of the offending field.
///
/// Array elements use their index as a segment (`tickets.0.price`). Errors
/// about the value as a whole carry an empty path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every field error found while validating one value. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub(crate) fn from_vec(errors: Vec<FieldError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(path, message)])
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// First error reported for `path`, if any.
    pub fn field(&self, path: &str) -> Option<&FieldError> {
        self.0.iter().find(|e| e.path == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.field(path).is_some()
    }

    /// Move every error under `prefix` (`answers` + `age` → `answers.age`).
    pub fn prefixed(self, prefix: &str) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|e| {
                    let path = if e.path.is_empty() {
                        prefix.to_string()
                    } else {
                        format!("{}.{}", prefix, e.path)
                    };
                    FieldError::new(path, e.message)
                })
                .collect(),
        )
    }

    pub fn merge(mut self, other: ValidationErrors) -> Self {
        self.0.extend(other.0);
        self
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn collect_validator_errors(
    errors: &validator::ValidationErrors,
    prefix: &str,
    out: &mut Vec<FieldError>,
) {
    for (field, kind) in errors.errors() {
        let field = camel_case(field);
        let path = if prefix.is_empty() {
            field
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    let message = failure
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", failure.code));
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_validator_errors(inner, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validator_errors(inner, &format!("{}.{}", path, index), out);
                }
            }
        }
    }
}

/// Request bodies checked with `#[derive(Validate)]` report through the
/// same error list as the declared shapes.
impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = Vec::new();
        collect_validator_errors(&errors, "", &mut out);
        out.sort_by(|a, b| a.path.cmp(&b.path));
        if out.is_empty() {
            out.push(FieldError::new("", "Invalid input"));
        }
        Self(out)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}
