// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::types::{Claims, JwtError};
use crate::config::JwtConfig;
use crate::iam::User;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

/// Mints and checks bearer tokens. Never consults the credential store.
pub trait TokenSigner: Send + Sync {
    fn issue_token(&self, user: &User) -> Result<String, JwtError>;
    fn validate_token(&self, token: &str) -> Result<Claims, JwtError>;
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    expiration: Duration,
    leeway_seconds: i64,
}

impl JwtService {
    /// Create a new JwtService from configuration
    pub fn new(config: &JwtConfig) -> Result<Self, JwtError> {
        if config.secret.is_empty() {
            return Err(JwtError::Configuration(
                "signing secret is not configured".to_string(),
            ));
        }
        if config.expiration_seconds == 0 {
            return Err(JwtError::Configuration(
                "token lifetime must be greater than zero".to_string(),
            ));
        }
        let expiration_seconds = i64::try_from(config.expiration_seconds).map_err(|_| {
            JwtError::Configuration("token lifetime is out of range".to_string())
        })?;
        let leeway_seconds = i64::try_from(config.leeway_seconds)
            .map_err(|_| JwtError::Configuration("leeway is out of range".to_string()))?;

        Ok(JwtService {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            expiration: Duration::seconds(expiration_seconds),
            leeway_seconds,
        })
    }

    pub fn issue_token_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, JwtError> {
        let expiration = now + self.expiration;

        let claims = Claims {
            sub: user.id.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::TokenCreation(e.to_string()))
    }

    /// Verify signature, issuer and audience, then apply `now < exp + leeway`.
    pub fn validate_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        // Expiry is checked below against the supplied clock
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        let claims = token_data.claims;

        if now.timestamp() >= claims.exp.saturating_add(self.leeway_seconds) {
            return Err(JwtError::Expired);
        }

        Ok(claims)
    }
}

impl TokenSigner for JwtService {
    fn issue_token(&self, user: &User) -> Result<String, JwtError> {
        self.issue_token_at(user, Utc::now())
    }

    fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.validate_token_at(token, Utc::now())
    }
}
