use crate::error::StoreError;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Client {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Input for creating a client. The required fields stay optional here so a
/// half-filled draft fails softly inside `add_client` instead of being
/// unrepresentable.
#[derive(Debug, Clone, Default)]
pub struct ClientDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phones: Vec<String>,
}

impl ClientDraft {
    /// Checks the required triple is present, naming the first missing field.
    pub fn validate(&self) -> Result<(&str, &str, &str), StoreError> {
        let first_name = self
            .first_name
            .as_deref()
            .ok_or(StoreError::MissingField { field: "first_name" })?;
        let last_name = self
            .last_name
            .as_deref()
            .ok_or(StoreError::MissingField { field: "last_name" })?;
        let email = self
            .email
            .as_deref()
            .ok_or(StoreError::MissingField { field: "email" })?;
        Ok((first_name, last_name, email))
    }
}

/// Subset update for a client row; absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl ClientUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

/// Exact-match filter over clients; supplied fields are ANDed together, and
/// `phone` matches through the phones table.
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_draft_validates() {
        let draft = ClientDraft {
            first_name: Some("Elena".to_string()),
            last_name: Some("Anisimova".to_string()),
            email: Some("eanisimova@test.com".to_string()),
            phones: vec!["555-55-55".to_string()],
        };
        let (first_name, last_name, email) = draft.validate().expect("draft is complete");
        assert_eq!(first_name, "Elena");
        assert_eq!(last_name, "Anisimova");
        assert_eq!(email, "eanisimova@test.com");
    }

    #[test]
    fn missing_email_is_reported_by_name() {
        let draft = ClientDraft {
            first_name: Some("Elena".to_string()),
            last_name: Some("Anisimova".to_string()),
            ..Default::default()
        };
        match draft.validate() {
            Err(StoreError::MissingField { field }) => assert_eq!(field, "email"),
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn first_missing_field_wins() {
        let draft = ClientDraft {
            email: Some("eanisimova@test.com".to_string()),
            ..Default::default()
        };
        match draft.validate() {
            Err(StoreError::MissingField { field }) => assert_eq!(field, "first_name"),
            other => panic!("expected missing field, got {other:?}"),
        }
    }

    #[test]
    fn update_with_no_fields_is_empty() {
        assert!(ClientUpdate::default().is_empty());
        let update = ClientUpdate {
            email: Some("one@two.com".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
