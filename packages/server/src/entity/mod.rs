pub mod document;
pub mod event;
pub mod file_record;
pub mod image;
pub mod news;
pub mod user;
