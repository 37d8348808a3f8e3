use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user;

/// Body of `POST /user/create` and `PUT /user/me`.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupReq {
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "This field is required."),
        length(min = 7, message = "Ensure this field has at least 7 characters.")
    )]
    pub password: Option<String>,

    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,
}

/// Body of `PATCH /user/me`; every field is optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProfilePatch {
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub email: Option<String>,

    #[validate(length(min = 7, message = "Ensure this field has at least 7 characters."))]
    pub password: Option<String>,

    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
}

/// Body of `POST /user/token`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginReq {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, message = "This field may not be blank.")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "This field is required."),
        length(min = 1, message = "This field may not be blank.")
    )]
    pub password: Option<String>,
}

/// What callers see of an account. The password hash never leaves the store.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserPublic {
    pub email: String,
    pub name: String,
}

impl From<user::Model> for UserPublic {
    fn from(m: user::Model) -> Self {
        Self {
            email: m.email,
            name: m.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResp {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_password_is_rejected() {
        let req: SignupReq = serde_json::from_value(serde_json::json!({
            "email": "testuser@company.com",
            "password": "ste",
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
        assert!(!errors.field_errors().contains_key("email"));
    }

    #[test]
    fn missing_fields_are_required() {
        let req: SignupReq = serde_json::from_value(serde_json::json!({})).unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(!fields.contains_key("name"));
    }

    #[test]
    fn empty_patch_is_valid() {
        assert!(ProfilePatch::default().validate().is_ok());
    }
}
