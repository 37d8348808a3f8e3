use cookbook_core::models::recipe;
use cookbook_core::FieldErrors;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use validator::Validate;

use super::attr::AttrOut;

const PRICE_MAX_DIGITS: u32 = 5;
const PRICE_DECIMAL_PLACES: u32 = 2;

/// Body of `POST /recipes` and `PUT /recipes/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct RecipeIn {
    #[validate(
        required(message = "This field is required."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    pub title: Option<String>,

    #[validate(
        required(message = "This field is required."),
        range(min = 0, message = "Ensure this value is greater than or equal to 0.")
    )]
    pub time_minutes: Option<i32>,

    #[validate(required(message = "This field is required."))]
    pub price: Option<Decimal>,

    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub link: String,

    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

/// Body of `PATCH /recipes/{id}`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RecipePatch {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub title: Option<String>,

    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub time_minutes: Option<i32>,

    pub price: Option<Decimal>,

    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub link: Option<String>,

    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

/// Checks the rules `validator` cannot express: titles that are only
/// whitespace and the `5,2` shape of the price column.
pub fn field_checks(title: Option<&str>, price: Option<&Decimal>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if title.is_some_and(|t| t.trim().is_empty()) {
        errors.add("title", "This field may not be blank.");
    }
    if let Some(msg) = price.and_then(price_error) {
        errors.add("price", msg);
    }
    errors
}

fn price_error(price: &Decimal) -> Option<&'static str> {
    let normalized = price.normalize();
    let places = normalized.scale();
    let whole = normalized.abs().trunc();
    let whole_digits = if whole.is_zero() { 0 } else { whole.to_string().len() as u32 };

    if whole_digits + places > PRICE_MAX_DIGITS {
        Some("Ensure that there are no more than 5 digits in total.")
    } else if places > PRICE_DECIMAL_PLACES {
        Some("Ensure that there are no more than 2 decimal places.")
    } else if whole_digits > PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES {
        Some("Ensure that there are no more than 3 digits before the decimal point.")
    } else {
        None
    }
}

/// Prices always leave as a two-place decimal string, e.g. `"5.00"`.
fn price_str<S: Serializer>(price: &Decimal, s: S) -> Result<S::Ok, S::Error> {
    let mut p = *price;
    p.rescale(PRICE_DECIMAL_PLACES);
    s.serialize_str(&p.to_string())
}

/// List shape: related rows as ids.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeOut {
    pub id: i64,
    pub title: String,
    pub ingredients: Vec<i64>,
    pub tags: Vec<i64>,
    pub time_minutes: i32,
    #[serde(serialize_with = "price_str")]
    pub price: Decimal,
    pub link: String,
}

impl RecipeOut {
    pub fn new(m: recipe::Model, tags: Vec<i64>, ingredients: Vec<i64>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            ingredients,
            tags,
            time_minutes: m.time_minutes,
            price: m.price,
            link: m.link,
        }
    }
}

/// Detail shape: related rows nested, plus the public image URL.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetailOut {
    pub id: i64,
    pub title: String,
    pub ingredients: Vec<AttrOut>,
    pub tags: Vec<AttrOut>,
    pub time_minutes: i32,
    #[serde(serialize_with = "price_str")]
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeImageOut {
    pub id: i64,
    pub image: Option<String>,
}
