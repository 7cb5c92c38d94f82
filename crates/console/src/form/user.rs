//! Account form.

use secrecy::{ExposeSecret, SecretString};

use backoffice_core::{Email, EmailError, Role, TenantId, UserRecord};

use super::{FormMode, FormValues};
use crate::api::UserPayload;
use crate::error::FieldErrors;

/// Minimum password length accepted when creating an account.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Account form fields.
///
/// The record's tenant reference is flattened into `tenant_id`.
#[derive(Debug, Clone, Default)]
pub struct UserForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Only used in create mode.
    pub password: SecretString,
    pub role: Option<Role>,
    pub tenant_id: Option<TenantId>,
}

impl FormValues for UserForm {
    type Record = UserRecord;
    type Payload = UserPayload;

    fn from_record(record: &UserRecord) -> Self {
        Self {
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            password: SecretString::default(),
            role: Some(record.role),
            tenant_id: record.tenant.as_ref().map(|tenant| tenant.id),
        }
    }

    fn validate(&self, mode: FormMode) -> Result<UserPayload, FieldErrors> {
        let mut errors = FieldErrors::new();

        let first_name = self.first_name.trim();
        if first_name.is_empty() {
            errors.add("firstName", "First name is required");
        }
        let last_name = self.last_name.trim();
        if last_name.is_empty() {
            errors.add("lastName", "Last name is required");
        }

        let email = match Email::parse(&self.email) {
            Ok(email) => Some(email),
            Err(EmailError::Empty) => {
                errors.add("email", "Email is required");
                None
            }
            Err(err) => {
                errors.add("email", format!("Invalid email: {err}"));
                None
            }
        };

        let typed = self.password.expose_secret();
        let password = match mode {
            FormMode::Edit => None,
            FormMode::Create if typed.is_empty() => {
                errors.add("password", "Password is required");
                None
            }
            FormMode::Create if typed.chars().count() < MIN_PASSWORD_LENGTH => {
                errors.add(
                    "password",
                    format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
                );
                None
            }
            FormMode::Create => Some(self.password.clone()),
        };

        match self.role {
            None => errors.add("role", "Role is required"),
            Some(Role::Manager) if self.tenant_id.is_none() => {
                errors.add("tenantId", "Restaurant is required for managers");
            }
            Some(_) => {}
        }

        match (email, self.role) {
            (Some(email), Some(role)) if errors.is_empty() => Ok(UserPayload {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email,
                password,
                role,
                tenant_id: self.tenant_id,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use backoffice_core::{TenantRef, UserId};

    use super::*;

    fn filled() -> UserForm {
        UserForm {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@pizza.example".to_string(),
            password: SecretString::from("analytical"),
            role: Some(Role::Manager),
            tenant_id: Some(TenantId::new(5)),
        }
    }

    #[test]
    fn test_from_record_flattens_tenant_reference() {
        let record = UserRecord {
            id: UserId::new(9),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@pizza.example".to_string(),
            role: Role::Manager,
            tenant: Some(TenantRef {
                id: TenantId::new(5),
                name: "Pizza Hut".to_string(),
            }),
            created_at: None,
        };

        let form = UserForm::from_record(&record);
        assert_eq!(form.tenant_id, Some(TenantId::new(5)));
        assert_eq!(form.email, "ada@pizza.example");
        assert!(form.password.expose_secret().is_empty());
    }

    #[test]
    fn test_create_requires_long_enough_password() {
        let mut form = filled();
        form.password = SecretString::from("short");
        let errors = form.validate(FormMode::Create).unwrap_err();
        assert_eq!(
            errors.get("password"),
            ["Password must be at least 8 characters"]
        );

        form.password = SecretString::default();
        let errors = form.validate(FormMode::Create).unwrap_err();
        assert_eq!(errors.get("password"), ["Password is required"]);
    }

    #[test]
    fn test_edit_omits_password() {
        let mut form = filled();
        form.password = SecretString::default();
        let payload = form.validate(FormMode::Edit).unwrap();
        assert!(payload.password.is_none());

        let payload = filled().validate(FormMode::Create).unwrap();
        assert_eq!(
            payload.password.as_ref().map(ExposeSecret::expose_secret),
            Some("analytical")
        );
    }

    #[test]
    fn test_manager_needs_a_restaurant() {
        let mut form = filled();
        form.tenant_id = None;
        let errors = form.validate(FormMode::Edit).unwrap_err();
        assert!(!errors.get("tenantId").is_empty());

        form.role = Some(Role::Admin);
        assert!(form.validate(FormMode::Edit).is_ok());
    }

    #[test]
    fn test_every_invalid_field_is_reported() {
        let errors = UserForm::default().validate(FormMode::Create).unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["email", "firstName", "lastName", "password", "role"]
        );
    }

    #[test]
    fn test_malformed_email() {
        let mut form = filled();
        form.email = "ada@localhost".to_string();
        let errors = form.validate(FormMode::Create).unwrap_err();
        assert!(errors.get("email")[0].starts_with("Invalid email"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let form = filled();
        assert!(!format!("{form:?}").contains("analytical"));

        let payload = form.validate(FormMode::Create).unwrap();
        assert!(!format!("{payload:?}").contains("analytical"));
    }
}
