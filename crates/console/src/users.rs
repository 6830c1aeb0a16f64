//! Operator account administration.

use std::sync::Arc;

use domain::models::{AdminUser, UserForm, UserListResponse};
use reqwest::Method;
use serde_json::Value;
use tracing::info;
use validator::Validate;

use crate::backend::{Auth, HttpBackend};
use crate::error::ConsoleError;

const USERS_PATH: &str = "/api/admin/users";

pub struct UserAdmin {
    backend: Arc<HttpBackend>,
}

impl UserAdmin {
    pub fn new(backend: Arc<HttpBackend>) -> Self {
        Self { backend }
    }

    pub async fn list(&self) -> Result<Vec<AdminUser>, ConsoleError> {
        let reply: UserListResponse = self
            .backend
            .get_json("users.list", USERS_PATH, &[], Auth::Operator)
            .await?;
        Ok(reply.users)
    }

    pub async fn create(&self, form: UserForm) -> Result<(), ConsoleError> {
        check_form(&form)?;
        form.validate_for_create().map_err(ConsoleError::Validation)?;

        let _: Value = self
            .backend
            .send_json(Method::POST, "users.create", USERS_PATH, &form, Auth::Operator)
            .await?;
        info!(username = %form.username, roles = form.roles.len(), "Operator account created");
        Ok(())
    }

    /// Updates an account; a blank password keeps the current one.
    pub async fn update(&self, id: &str, form: UserForm) -> Result<(), ConsoleError> {
        check_form(&form)?;

        let _: Value = self
            .backend
            .send_json(
                Method::PUT,
                "users.update",
                &format!("{}/{}", USERS_PATH, id),
                &form.into_update(),
                Auth::Operator,
            )
            .await?;
        info!(user_id = id, "Operator account updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ConsoleError> {
        self.backend
            .send_empty(
                Method::DELETE,
                "users.delete",
                &format!("{}/{}", USERS_PATH, id),
                Auth::Operator,
            )
            .await?;
        info!(user_id = id, "Operator account deleted");
        Ok(())
    }
}

/// Maps form failures onto the catalogue keys shown to the operator.
fn check_form(form: &UserForm) -> Result<(), ConsoleError> {
    if form.username.trim().is_empty() {
        return Err(ConsoleError::Validation("usernameRequired".to_string()));
    }
    if form.roles.is_empty() {
        return Err(ConsoleError::Validation("rolesRequired".to_string()));
    }
    form.validate()?;
    Ok(())
}
