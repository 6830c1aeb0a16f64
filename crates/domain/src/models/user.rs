//! Operator account models.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::role::Role;

/// Operator account as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserListResponse {
    #[serde(default)]
    pub users: Vec<AdminUser>,
}

/// Create/update form for an operator account.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UserForm {
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub username: String,

    /// Required on create; left empty on update to keep the current one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[validate(length(min = 1, message = "At least one role is required"))]
    pub roles: Vec<Role>,
}

impl UserForm {
    /// Creating an account requires a password.
    pub fn validate_for_create(&self) -> Result<(), String> {
        match self.password.as_deref() {
            Some(p) if !p.is_empty() => Ok(()),
            _ => Err("passwordRequired".to_string()),
        }
    }

    /// Blank passwords are not sent on update.
    pub fn into_update(mut self) -> Self {
        if self.password.as_deref().is_some_and(str::is_empty) {
            self.password = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> UserForm {
        UserForm {
            username: "door-1".into(),
            password: Some("s3cret".into()),
            roles: vec![Role::CheckInEditor],
        }
    }

    #[test]
    fn test_valid_form() {
        assert!(form().validate().is_ok());
        assert!(form().validate_for_create().is_ok());
    }

    #[test]
    fn test_roles_required() {
        let f = UserForm {
            roles: vec![],
            ..form()
        };
        let errors = f.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("roles"));
    }

    #[test]
    fn test_password_required_on_create_only() {
        let f = UserForm {
            password: None,
            ..form()
        };
        assert!(f.validate().is_ok());
        assert_eq!(f.validate_for_create(), Err("passwordRequired".to_string()));
    }

    #[test]
    fn test_update_drops_blank_password() {
        let f = UserForm {
            password: Some(String::new()),
            ..form()
        };
        let json = serde_json::to_value(f.into_update()).unwrap();
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_user_list_wire_shape() {
        let list: UserListResponse = serde_json::from_str(
            r#"{"users": [{"_id": "u1", "username": "ops", "roles": ["Admin", "Editor"]}]}"#,
        )
        .unwrap();
        assert_eq!(list.users[0].roles, vec![Role::Admin, Role::Editor]);
    }
}
