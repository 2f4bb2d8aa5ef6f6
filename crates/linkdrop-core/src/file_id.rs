use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Length of generated file identifiers.
pub const FILE_ID_LENGTH: usize = 8;

/// Identifier of an uploaded file: exactly [`FILE_ID_LENGTH`] ASCII
/// alphanumeric characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(String);

impl FileId {
    /// Parses a file id coming from an untrusted source (e.g. a URL path).
    pub fn parse(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into();
        if id.len() != FILE_ID_LENGTH || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidFileId(format!(
                "expected {FILE_ID_LENGTH} alphanumeric characters: '{id}'"
            )));
        }
        Ok(Self(id))
    }

    /// Wraps an id produced by a trusted generator.
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for FileId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FileId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileId::parse(s).map_err(serde::de::Error::custom)
    }
}
