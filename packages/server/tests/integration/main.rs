mod auth;
mod common;
mod content;
mod files;
