pub mod filters;
pub mod kinds;
pub mod media;
pub mod serializers;
pub mod urls;
pub mod views;
