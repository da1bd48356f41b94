use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of an uploaded file.
///
/// Selects the storage subdirectory and the validation rules applied at upload time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UploadType {
    Gallery,
    News,
    Documents,
    Events,
}

impl UploadType {
    pub const ALL: [UploadType; 4] = [
        UploadType::Gallery,
        UploadType::News,
        UploadType::Documents,
        UploadType::Events,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gallery => "gallery",
            Self::News => "news",
            Self::Documents => "documents",
            Self::Events => "events",
        }
    }
}

impl fmt::Display for UploadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown upload type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown upload type: {0}")]
pub struct UnknownUploadType(pub String);

impl FromStr for UploadType {
    type Err = UnknownUploadType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gallery" => Ok(Self::Gallery),
            "news" => Ok(Self::News),
            "documents" => Ok(Self::Documents),
            "events" => Ok(Self::Events),
            other => Err(UnknownUploadType(other.to_string())),
        }
    }
}
