pub mod auth;
pub mod content;
pub mod file;
pub mod shared;
