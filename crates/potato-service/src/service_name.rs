use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAX_SERVICE_NAME_CHARS: usize = 256;

/// Validated systemd unit name passed as a single argv entry to the service manager.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceName(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceNameError {
    #[error("service name must not be empty")]
    Empty,
    #[error("service name exceeds {max} characters", max = MAX_SERVICE_NAME_CHARS)]
    TooLong,
    #[error("service name '{0}' must not start with '-'")]
    LeadingDash(String),
    #[error("service name '{name}' contains unsupported character {character:?}")]
    UnsupportedCharacter { name: String, character: char },
}

impl ServiceName {
    pub fn new(raw: impl Into<String>) -> Result<Self, ServiceNameError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ServiceNameError::Empty);
        }
        if raw.chars().count() > MAX_SERVICE_NAME_CHARS {
            return Err(ServiceNameError::TooLong);
        }
        if raw.starts_with('-') {
            return Err(ServiceNameError::LeadingDash(raw));
        }
        if let Some(character) = raw.chars().find(|ch| !is_unit_name_char(*ch)) {
            return Err(ServiceNameError::UnsupportedCharacter {
                name: raw,
                character,
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unit file name, appending `.service` only when no unit suffix is present.
    pub fn unit_file_name(&self) -> String {
        if self.0.ends_with(".service") {
            self.0.clone()
        } else {
            format!("{}.service", self.0)
        }
    }
}

fn is_unit_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '@' | ':' | '\\')
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ServiceName {
    type Err = ServiceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ServiceName {
    type Error = ServiceNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServiceName> for String {
    fn from(value: ServiceName) -> Self {
        value.0
    }
}

impl AsRef<str> for ServiceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
