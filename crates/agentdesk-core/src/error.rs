//! Error taxonomy shared by the store and the HTTP layer.

use thiserror::Error;
use validator::ValidationErrors;

/// All errors that can occur while operating on the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Missing or malformed required input.
    #[error("{0}")]
    Validation(String),

    /// The referenced resource (or child resource) does not exist.
    #[error("{0}")]
    NotFound(String),

    /// No bearer credential was presented.
    #[error("not logged in")]
    Unauthenticated,

    /// A bearer credential was presented but does not match.
    #[error("invalid token")]
    InvalidCredential,

    /// Capability check failed. Reserved; no route raises it today.
    #[error("{0}")]
    Unauthorized(String),

    /// An unclassified internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(kind: &str, id: &str) -> Self {
        CoreError::NotFound(format!("{kind} {id} not found"))
    }
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        // Report fields in a stable order so messages are predictable.
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reason = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_owned());
                format!("{field} {reason}")
            })
            .collect();
        fields.sort();
        CoreError::Validation(fields.join("; "))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod test {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Named {
        #[validate(length(min = 1, message = "is required"))]
        name: String,
    }

    #[test]
    fn validation_errors_become_validation_variant() {
        let err: CoreError = Named { name: String::new() }.validate().unwrap_err().into();
        assert_eq!(err, CoreError::Validation("name is required".into()));
    }

    #[test]
    fn auth_errors_have_distinct_messages() {
        assert_ne!(
            CoreError::Unauthenticated.to_string(),
            CoreError::InvalidCredential.to_string()
        );
    }
}
