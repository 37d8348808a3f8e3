use cookbook_core::models::{ingredient, tag};
use cookbook_core::AppError;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Wire shape of a tag or an ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrOut {
    pub id: i64,
    pub title: String,
}

impl From<tag::Model> for AttrOut {
    fn from(m: tag::Model) -> Self {
        Self { id: m.id, title: m.title }
    }
}

impl From<ingredient::Model> for AttrOut {
    fn from(m: ingredient::Model) -> Self {
        Self { id: m.id, title: m.title }
    }
}

/// Body of `POST` and `PUT` on tags/ingredients.
#[derive(Debug, Deserialize, Validate)]
pub struct AttrIn {
    #[validate(
        required(message = "This field is required."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub title: Option<String>,
}

/// Body of `PATCH` on tags/ingredients.
#[derive(Debug, Deserialize, Validate)]
pub struct AttrPatch {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub title: Option<String>,
}

/// Trims a title and rejects one that is empty afterwards.
pub fn clean_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::field("title", "This field may not be blank."));
    }
    Ok(title.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_titles_are_rejected() {
        assert!(clean_title("").is_err());
        assert!(clean_title("   ").is_err());
        assert_eq!(clean_title("  Vegan ").unwrap(), "Vegan");
    }

    #[test]
    fn missing_title_is_required() {
        let req: AttrIn = serde_json::from_str("{}").unwrap();
        assert!(req.validate().unwrap_err().field_errors().contains_key("title"));
    }
}
