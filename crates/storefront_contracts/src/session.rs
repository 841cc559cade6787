#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::validate_text;
use crate::ContractViolation;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let id = id.into();
        validate_text("user_id", &id, 128)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Opaque bearer credential. Absence short-circuits cart load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Result<Self, ContractViolation> {
        let token = token.into();
        validate_text("session_token", &token, 512)?;
        if token.chars().any(|c| c.is_whitespace()) {
            return Err(ContractViolation::InvalidValue {
                field: "session_token",
                reason: "must contain no whitespace",
            });
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
