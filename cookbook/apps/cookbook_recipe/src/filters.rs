//! Query string parsing for list endpoints.

use cookbook_core::settings::parse_flag;
use cookbook_core::{AppError, FieldErrors};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct AttrListQuery {
    pub assigned_only: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

/// `1`/`true` turns the filter on; absent, `0` or `false` leaves it off.
pub fn parse_assigned_only(raw: Option<&str>) -> Result<bool, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) => parse_flag(v).ok_or_else(|| {
            AppError::field("assigned_only", format!("\"{v}\" is not a valid boolean."))
        }),
    }
}

/// Comma separated ids, e.g. `?tags=1,3`. An empty value means no filter.
pub fn parse_ids(field: &str, raw: Option<&str>) -> Result<Option<Vec<i64>>, FieldErrors> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    let mut ids = Vec::new();
    let mut errors = FieldErrors::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(_) => errors.add(field, format!("\"{part}\" is not a valid id.")),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok((!ids.is_empty()).then_some(ids))
}
