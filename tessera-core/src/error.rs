use crate::Error;
use std::fmt::{self, Display};

/// Failures callers are expected to branch on.
///
/// They travel inside [`anyhow::Error`] like every other error of the crate, possibly under
/// several `context` frames; [`ErrorExt::kind`] recovers them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    SchemaNotFound {
        schema: Option<String>,
    },
    MultipleResults {
        table: String,
        operation: &'static str,
    },
    UnknownAssociation {
        model: String,
        association: String,
    },
    UnknownModel {
        name: String,
    },
    AssociationCollision {
        table: String,
        association: String,
    },
    AssociationNotAssignable {
        model: String,
        association: String,
    },
    TooManyTargets {
        association: String,
        count: usize,
    },
    InvalidEnumerationValue {
        enumeration: String,
        value: String,
    },
    DestroyedRecord {
        model: String,
    },
    RecordNotFound {
        table: String,
    },
    MissingPrimaryKey {
        table: String,
    },
    LockUnavailable {
        message: String,
    },
    QueryTimeout {
        message: String,
    },
    ConstraintViolation {
        code: String,
        constraint: Option<String>,
        message: String,
    },
}

impl ErrorKind {
    pub fn into_error(self) -> Error {
        Error::new(self)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::SchemaNotFound { schema: Some(schema) } => {
                write!(f, "Schema `{}` does not exist", schema)
            }
            ErrorKind::SchemaNotFound { schema: None } => {
                f.write_str("None of the schemas in the search path exists")
            }
            ErrorKind::MultipleResults { table, operation } => {
                write!(f, "{} on `{}` matched more than one row", operation, table)
            }
            ErrorKind::UnknownAssociation { model, association } => {
                write!(f, "`{}` has no association named `{}`", model, association)
            }
            ErrorKind::UnknownModel { name } => write!(f, "There is no model named `{}`", name),
            ErrorKind::AssociationCollision { table, association } => write!(
                f,
                "Table `{}` would get two associations named `{}`",
                table, association
            ),
            ErrorKind::AssociationNotAssignable { model, association } => write!(
                f,
                "Association `{}` of `{}` does not target an enumeration and cannot be assigned",
                association, model
            ),
            ErrorKind::TooManyTargets { association, count } => write!(
                f,
                "Association `{}` references a single row but {} were given",
                association, count
            ),
            ErrorKind::InvalidEnumerationValue { enumeration, value } => write!(
                f,
                "`{}` is not a value of the enumeration `{}`",
                value, enumeration
            ),
            ErrorKind::DestroyedRecord { model } => {
                write!(f, "Cannot save a destroyed `{}` record", model)
            }
            ErrorKind::RecordNotFound { table } => {
                write!(f, "The record does not exist anymore in `{}`", table)
            }
            ErrorKind::MissingPrimaryKey { table } => {
                write!(f, "Table `{}` does not have a single column primary key", table)
            }
            ErrorKind::LockUnavailable { message } => write!(f, "Lock not available: {}", message),
            ErrorKind::QueryTimeout { message } => write!(f, "Query timed out: {}", message),
            ErrorKind::ConstraintViolation {
                code,
                constraint,
                message,
            } => {
                write!(f, "Constraint violation ({})", code)?;
                if let Some(constraint) = constraint {
                    write!(f, " on `{}`", constraint)?;
                }
                write!(f, ": {}", message)
            }
        }
    }
}

impl std::error::Error for ErrorKind {}

/// Typed inspection of [`Error`].
pub trait ErrorExt {
    fn kind(&self) -> Option<&ErrorKind>;

    fn is_schema_not_found(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::SchemaNotFound { .. }))
    }
    fn is_multiple_results(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::MultipleResults { .. }))
    }
    fn is_unknown_association(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::UnknownAssociation { .. }))
    }
    fn is_invalid_enumeration_value(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::InvalidEnumerationValue { .. }))
    }
    fn is_destroyed_record(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::DestroyedRecord { .. }))
    }
    fn is_record_not_found(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::RecordNotFound { .. }))
    }
    fn is_lock_unavailable(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::LockUnavailable { .. }))
    }
    fn is_query_timeout(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::QueryTimeout { .. }))
    }
    fn is_constraint_violation(&self) -> bool {
        matches!(self.kind(), Some(ErrorKind::ConstraintViolation { .. }))
    }
}

impl ErrorExt for Error {
    fn kind(&self) -> Option<&ErrorKind> {
        self.chain().find_map(|e| e.downcast_ref::<ErrorKind>())
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorExt, ErrorKind};

    #[test]
    fn kind_survives_context() {
        let error = ErrorKind::MultipleResults {
            table: "account".into(),
            operation: "updateOne",
        }
        .into_error()
        .context("While updating the account");
        assert!(error.is_multiple_results());
        assert!(!error.is_lock_unavailable());
        assert_eq!(
            format!("{:#}", error),
            "While updating the account: updateOne on `account` matched more than one row"
        );
    }

    #[test]
    fn plain_errors_have_no_kind() {
        let error = anyhow::Error::msg("boom");
        assert!(error.kind().is_none());
    }
}
