use thiserror::Error;

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required field was absent from a client draft. Reported before
    /// anything is written.
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    /// Whatever the storage engine reported, passed through unmodified.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    fn sqlstate(&self) -> Option<String> {
        match self {
            StoreError::Database(sqlx::Error::Database(db_err)) => {
                db_err.code().map(|code| code.into_owned())
            }
            _ => None,
        }
    }

    /// Unique-constraint violation: duplicate email or phone number.
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate().as_deref() == Some("23505")
    }

    /// Foreign-key violation: a phone added against an unknown client id.
    pub fn is_foreign_key_violation(&self) -> bool {
        self.sqlstate().as_deref() == Some("23503")
    }

    /// Check-constraint violation: an email that fails the format check.
    pub fn is_check_violation(&self) -> bool {
        self.sqlstate().as_deref() == Some("23514")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_names_the_field() {
        let err = StoreError::MissingField { field: "email" };
        assert_eq!(err.to_string(), "missing required field: email");
    }

    #[test]
    fn missing_field_is_not_a_constraint_violation() {
        let err = StoreError::MissingField { field: "first_name" };
        assert!(!err.is_unique_violation());
        assert!(!err.is_foreign_key_violation());
        assert!(!err.is_check_violation());
    }
}
