//! Supported model identifiers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// The fixed set of models the structured-output client accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OpenAiModel {
    /// Latest `o1` release (default).
    #[default]
    O1Latest,
    /// `o1` pinned to the 2024-12-17 snapshot.
    O1,
    /// `gpt-4o-mini` pinned to the 2024-07-18 snapshot.
    Gpt4oMini,
    /// `gpt-4o` pinned to the 2024-08-06 snapshot.
    Gpt4o,
}

impl OpenAiModel {
    /// Every supported model, in display order.
    pub const ALL: [Self; 4] = [Self::O1Latest, Self::O1, Self::Gpt4oMini, Self::Gpt4o];

    /// Returns the identifier sent to the provider.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::O1Latest => "o1",
            Self::O1 => "o1-2024-12-17",
            Self::Gpt4oMini => "gpt-4o-mini-2024-07-18",
            Self::Gpt4o => "gpt-4o-2024-08-06",
        }
    }
}

/// Returns `true` if `model` is one of the supported identifiers.
#[must_use]
pub fn is_valid_model(model: &str) -> bool {
    OpenAiModel::ALL.iter().any(|m| m.as_str() == model)
}

impl FromStr for OpenAiModel {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| LlmError::invalid_model(s))
    }
}

impl std::fmt::Display for OpenAiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OpenAiModel {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            serde::de::Error::custom(format!(
                "invalid model '{s}': expected one of 'o1', 'o1-2024-12-17', 'gpt-4o-mini-2024-07-18', 'gpt-4o-2024-08-06'"
            ))
        })
    }
}

impl Serialize for OpenAiModel {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
