//! Wire formats and their media types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::SerializerError;
use crate::value::Value;

pub const MIME_JSON: &str = "application/json";
pub const MIME_YAML: &str = "application/x-yaml";
pub const MIME_YAML_ALT: &str = "application/yaml";
pub const MIME_YAML_TEXT: &str = "text/yaml";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl Format {
    /// Media types recognized for this format; the first is canonical.
    pub const fn media_types(self) -> &'static [&'static str] {
        match self {
            Self::Json => &[MIME_JSON],
            Self::Yaml => &[MIME_YAML, MIME_YAML_ALT, MIME_YAML_TEXT],
        }
    }

    pub const fn content_type(self) -> &'static str {
        self.media_types()[0]
    }

    /// Resolve a `Content-Type` or `Accept` entry, ignoring parameters such
    /// as `charset` and letter case.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type.split(';').next()?.trim();
        Self::iter().find(|format| {
            format
                .media_types()
                .iter()
                .any(|m| m.eq_ignore_ascii_case(essence))
        })
    }

    pub fn decode(self, bytes: &[u8]) -> Result<Value, SerializerError> {
        let decoded = match self {
            Self::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_slice(bytes).map_err(|e| e.to_string()),
        };
        decoded.map_err(|message| SerializerError::Decode {
            format: self,
            message,
        })
    }

    pub fn encode(self, value: &Value) -> Result<Vec<u8>, SerializerError> {
        let encoded = match self {
            Self::Json => serde_json::to_vec(value).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::to_string(value)
                .map(String::into_bytes)
                .map_err(|e| e.to_string()),
        };
        encoded.map_err(|message| SerializerError::Encode {
            format: self,
            message,
        })
    }
}
