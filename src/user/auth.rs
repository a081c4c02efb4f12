//! Password hashing schemes.

use anyhow::{bail, Result};
use std::str::FromStr;

/// Cost parameters for newly created argon2 hashes. Verification always uses
/// the parameters encoded in the stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

mod jukebox_argon2 {
    use super::HashingParams;
    use anyhow::{anyhow, Result};
    use argon2::{
        password_hash::{
            rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        },
        Algorithm, Argon2, Params, Version,
    };

    fn argon2(params: &HashingParams) -> Result<Argon2<'static>> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash(plain: &[u8], params: &HashingParams) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash_string = argon2(params)?
            .hash_password(plain, &salt)
            .map_err(|err| anyhow!("{}", err))?
            .to_string();
        Ok(hash_string)
    }

    pub fn verify<T: AsRef<str>>(plain_pw: &[u8], target_hash: T) -> Result<bool> {
        let password_hash =
            PasswordHash::new(target_hash.as_ref()).map_err(|err| anyhow!("{}", err))?;
        Ok(Argon2::default()
            .verify_password(plain_pw, &password_hash)
            .is_ok())
    }
}

mod legacy_sha256 {
    use sha2::{Digest, Sha256};

    pub fn hash(plain: &[u8]) -> String {
        Sha256::digest(plain)
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    pub fn looks_like(stored: &str) -> bool {
        stored.len() == 64 && stored.chars().all(|c| c.is_ascii_hexdigit())
    }

    pub fn verify(plain_pw: &[u8], target_hash: &str) -> bool {
        hash(plain_pw).eq_ignore_ascii_case(target_hash)
    }
}

/// Schemes a stored password hash may be encoded with. New hashes always use
/// [`PasswordScheme::CURRENT`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordScheme {
    Argon2,
    /// Unsalted hex SHA-256, accepted on login and upgraded afterwards.
    LegacySha256,
}

impl FromStr for PasswordScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "argon2" => Ok(PasswordScheme::Argon2),
            "sha256" => Ok(PasswordScheme::LegacySha256),
            _ => bail!("Unknown hasher {}", s),
        }
    }
}

impl std::fmt::Display for PasswordScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordScheme::Argon2 => f.write_str("argon2"),
            PasswordScheme::LegacySha256 => f.write_str("sha256"),
        }
    }
}

impl PasswordScheme {
    pub const CURRENT: PasswordScheme = PasswordScheme::Argon2;

    /// Recognises the scheme of a stored hash, None if it is not a hash we
    /// know how to check.
    pub fn detect(stored_hash: &str) -> Option<PasswordScheme> {
        if stored_hash.starts_with("$argon2") {
            Some(PasswordScheme::Argon2)
        } else if legacy_sha256::looks_like(stored_hash) {
            Some(PasswordScheme::LegacySha256)
        } else {
            None
        }
    }

    pub fn hash(&self, plain: &str, params: &HashingParams) -> Result<String> {
        match self {
            PasswordScheme::Argon2 => jukebox_argon2::hash(plain.as_bytes(), params),
            PasswordScheme::LegacySha256 => Ok(legacy_sha256::hash(plain.as_bytes())),
        }
    }

    pub fn verify(&self, plain_pw: &str, target_hash: &str) -> Result<bool> {
        match self {
            PasswordScheme::Argon2 => jukebox_argon2::verify(plain_pw.as_bytes(), target_hash),
            PasswordScheme::LegacySha256 => {
                Ok(legacy_sha256::verify(plain_pw.as_bytes(), target_hash))
            }
        }
    }

    pub fn is_current(&self) -> bool {
        *self == Self::CURRENT
    }
}

/// Hashes with the current scheme.
pub fn hash_password(plain: &str, params: &HashingParams) -> Result<String> {
    PasswordScheme::CURRENT.hash(plain, params)
}

/// Checks `plain` against a stored hash of any known scheme. Unknown formats
/// never match.
pub fn verify_password(plain: &str, stored_hash: &str) -> Result<bool> {
    match PasswordScheme::detect(stored_hash) {
        Some(scheme) => scheme.verify(plain, stored_hash),
        None => Ok(false),
    }
}

#[cfg(test)]
pub(crate) fn cheap_params() -> HashingParams {
    HashingParams {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn argon2_hash() {
        let params = cheap_params();
        let hash1 = PasswordScheme::Argon2.hash("123mypw", &params).unwrap();
        let hash2 = PasswordScheme::Argon2.hash("123mypw", &params).unwrap();
        // Salted, so two hashes of the same password differ.
        assert_ne!(hash1, hash2);

        assert_eq!(PasswordScheme::detect(&hash1), Some(PasswordScheme::Argon2));
        assert!(verify_password("123mypw", &hash1).unwrap());
        assert!(!verify_password("not the pw", &hash1).unwrap());
    }

    #[test]
    fn legacy_sha256_hash() {
        let hash = PasswordScheme::LegacySha256
            .hash("secret1", &cheap_params())
            .unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(
            PasswordScheme::detect(&hash),
            Some(PasswordScheme::LegacySha256)
        );
        assert!(!PasswordScheme::LegacySha256.is_current());
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(verify_password("secret1", &hash.to_uppercase()).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
    }

    #[test]
    fn unknown_hash_format_never_matches() {
        assert_eq!(PasswordScheme::detect("plaintext"), None);
        assert!(!verify_password("plaintext", "plaintext").unwrap());
    }

    #[test]
    fn parses_scheme_names() {
        assert_eq!(
            "argon2".parse::<PasswordScheme>().unwrap(),
            PasswordScheme::Argon2
        );
        assert!("md5".parse::<PasswordScheme>().is_err());
        assert_eq!(PasswordScheme::LegacySha256.to_string(), "sha256");
    }
}
