pub mod attr;
pub mod recipe;
