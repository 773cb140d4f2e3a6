// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use jsonwebtoken::errors::{Error as JwtLibError, ErrorKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // Subject (user id)
    pub iat: i64,    // Issued at
    pub exp: i64,    // Expiration
    pub iss: String, // Issuer
    pub aud: String, // Audience
    pub jti: String, // JWT ID
}

impl Claims {
    /// Decodes the identity id carried in `sub`.
    pub fn identity_id(&self) -> Result<u64, JwtError> {
        self.sub
            .parse::<u64>()
            .map_err(|_| JwtError::Malformed("subject is not an identity id".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JwtError {
    #[error("Token signature is invalid")]
    InvalidSignature,
    #[error("Token has expired")]
    Expired,
    #[error("Token is malformed: {0}")]
    Malformed(String),
    #[error("Token creation error: {0}")]
    TokenCreation(String),
    #[error("JWT configuration error: {0}")]
    Configuration(String),
}

impl From<JwtLibError> for JwtError {
    fn from(err: JwtLibError) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => JwtError::InvalidSignature,
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Malformed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims_with_sub(sub: &str) -> Claims {
        serde_json::from_value(json!({
            "sub": sub,
            "iat": 1700000000,
            "exp": 1700003600,
            "iss": "nop-accounts",
            "aud": "nop-accounts-users",
            "jti": "jwt-id"
        }))
        .expect("claims should deserialize")
    }

    #[test]
    fn identity_id_parses_numeric_subject() {
        assert_eq!(claims_with_sub("42").identity_id(), Ok(42));
    }

    #[test]
    fn identity_id_rejects_non_numeric_subject() {
        assert!(matches!(
            claims_with_sub("alice").identity_id(),
            Err(JwtError::Malformed(_))
        ));
    }

    #[test]
    fn library_errors_map_to_token_failures() {
        assert_eq!(
            JwtError::from(JwtLibError::from(ErrorKind::InvalidSignature)),
            JwtError::InvalidSignature
        );
        assert_eq!(
            JwtError::from(JwtLibError::from(ErrorKind::ExpiredSignature)),
            JwtError::Expired
        );
        assert!(matches!(
            JwtError::from(JwtLibError::from(ErrorKind::InvalidToken)),
            JwtError::Malformed(_)
        ));
    }
}
