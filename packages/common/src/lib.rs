pub mod storage;
pub mod upload_type;

pub use upload_type::UploadType;
