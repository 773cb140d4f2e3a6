// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::Argon2Params;
use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    rand_core::RngCore,
};
use argon2::{Algorithm, Argon2, Params, Version};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("{0}")]
    HashError(String),
    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// One-way password hashing. Plaintext never leaves `hash`/`verify`.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, PasswordError>;
    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, PasswordError>;
}

pub struct Argon2PasswordHasher {
    params: Argon2Params,
}

impl Argon2PasswordHasher {
    pub fn new(params: Argon2Params) -> Result<Self, PasswordError> {
        // Fail at construction rather than on the first signup
        build_argon2(&params)?;
        Ok(Self { params })
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt_bytes = generate_salt(self.params.salt_len);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|err| PasswordError::HashError(err.to_string()))?;
        let argon2 = build_argon2(&self.params)?;
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| PasswordError::HashError(err.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|err| PasswordError::MalformedHash(err.to_string()))?;
        // Cost parameters come from the PHC string, not from current config
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default());
        Ok(argon2.verify_password(password.as_bytes(), &parsed).is_ok())
    }
}

fn build_argon2(params: &Argon2Params) -> Result<Argon2<'static>, PasswordError> {
    let output_len = params.output_len as usize;
    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(output_len),
    )
    .map_err(|err| PasswordError::HashError(err.to_string()))?;
    Ok(Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        argon2_params,
    ))
}

fn generate_salt(length: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; length as usize];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> Argon2Params {
        Argon2Params {
            memory_kib: 8192,
            iterations: 1,
            parallelism: 1,
            output_len: 32,
            salt_len: 16,
        }
    }

    fn hasher() -> Argon2PasswordHasher {
        Argon2PasswordHasher::new(test_params()).expect("hasher")
    }

    #[test]
    fn hash_produces_argon2id_phc_string() {
        let hash = hasher().hash("secret").expect("hash");
        assert!(hash.starts_with("$argon2id$v=19$m=8192,t=1,p=1$"));
        assert!(!hash.contains("secret"));
    }

    #[test]
    fn hash_is_salted() {
        let hasher = hasher();
        let first = hasher.hash("secret").expect("hash");
        let second = hasher.hash("secret").expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn verify_accepts_matching_password() {
        let hasher = hasher();
        let hash = hasher.hash("secret").expect("hash");
        assert!(hasher.verify("secret", &hash).expect("verify"));
        assert!(!hasher.verify("Secret", &hash).expect("verify"));
    }

    #[test]
    fn verify_uses_parameters_from_stored_hash() {
        let stronger = Argon2PasswordHasher::new(Argon2Params {
            iterations: 2,
            ..test_params()
        })
        .expect("hasher");
        let hash = stronger.hash("secret").expect("hash");
        assert!(hasher().verify("secret", &hash).expect("verify"));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        let err = hasher().verify("secret", "not-a-phc-string").expect_err("malformed");
        assert!(matches!(err, PasswordError::MalformedHash(_)));
    }

    #[test]
    fn new_rejects_invalid_params() {
        let params = Argon2Params {
            memory_kib: 1,
            ..test_params()
        };
        assert!(Argon2PasswordHasher::new(params).is_err());
    }
}
