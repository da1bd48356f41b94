pub mod assets;
pub mod auth;
pub mod content;
pub mod files;
pub mod images;
pub mod uploads;
