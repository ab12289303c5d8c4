//! Password hashing and verification
//!
//! Stored form is `hex(derived_key) + "." + hex(salt)`. Keys are derived with
//! Argon2id; the cost parameters are fixed per deployment and are not part
//! of the stored string.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::{RngCore, rngs::OsRng};
use thiserror::Error;

/// Length of the derived key in bytes
pub const KEY_LEN: usize = 64;
/// Length of freshly generated salts in bytes
pub const SALT_LEN: usize = 16;
/// Shortest salt Argon2 accepts
const MIN_SALT_LEN: usize = 8;

const SEPARATOR: char = '.';

/// Errors raised while producing a new hash
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("key derivation failed: {0}")]
    Derivation(argon2::Error),

    #[error("hashing task failed: {0}")]
    Task(String),
}

/// Derives and checks password hashes
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            params: Params::new(
                Params::DEFAULT_M_COST,
                Params::DEFAULT_T_COST,
                Params::DEFAULT_P_COST,
                Some(KEY_LEN),
            )
            .unwrap_or_default(),
        }
    }
}

impl CredentialHasher {
    /// Create a hasher with explicit Argon2 cost parameters
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params =
            Params::new(m_cost, t_cost, p_cost, Some(KEY_LEN)).map_err(PasswordError::Derivation)?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    fn derive(&self, plaintext: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], PasswordError> {
        let mut key = [0u8; KEY_LEN];
        self.argon2()
            .hash_password_into(plaintext.as_bytes(), salt, &mut key)
            .map_err(PasswordError::Derivation)?;
        Ok(key)
    }

    /// Hash a plaintext password with a fresh random salt
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let key = self.derive(plaintext, &salt)?;
        Ok(format!("{}{}{}", hex::encode(key), SEPARATOR, hex::encode(salt)))
    }

    /// Check a plaintext password against a stored form
    ///
    /// Malformed stored forms never match. They still cost one full
    /// derivation so they cannot be told apart from a wrong password by
    /// timing.
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let (expected, salt, well_formed) = match parse_stored(stored) {
            Some((key, salt)) => (key, salt, true),
            None => (vec![0u8; KEY_LEN], vec![0u8; SALT_LEN], false),
        };

        let derived = match self.derive(plaintext, &salt) {
            Ok(key) => key,
            Err(_) => return false,
        };

        constant_time_eq(&derived, &expected) && well_formed
    }

    /// [`hash`](Self::hash) on the blocking thread pool
    pub async fn hash_async(&self, plaintext: String) -> Result<String, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking thread pool
    ///
    /// A failed task counts as a mismatch.
    pub async fn verify_async(&self, plaintext: String, stored: String) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &stored))
            .await
            .unwrap_or(false)
    }
}

fn parse_stored(stored: &str) -> Option<(Vec<u8>, Vec<u8>)> {
    let (key_hex, salt_hex) = stored.split_once(SEPARATOR)?;
    let key = hex::decode(key_hex).ok()?;
    let salt = hex::decode(salt_hex).ok()?;

    if key.len() != KEY_LEN || salt.len() < MIN_SALT_LEN {
        return None;
    }

    Some((key, salt))
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::with_cost(1024, 1, 1).unwrap()
    }

    #[test]
    fn hash_then_verify_succeeds() {
        let h = hasher();
        for password in ["secret1", "", "pässwörd with spaces", "a.b.c"] {
            let stored = h.hash(password).unwrap();
            assert!(h.verify(password, &stored), "password {:?}", password);
        }
    }

    #[test]
    fn wrong_password_is_rejected() {
        let h = hasher();
        let stored = h.hash("secret1").unwrap();
        assert!(!h.verify("secret2", &stored));
        assert!(!h.verify("Secret1", &stored));
        assert!(!h.verify("", &stored));
    }

    #[test]
    fn stored_form_is_key_dot_salt_in_hex() {
        let stored = hasher().hash("secret1").unwrap();
        let (key, salt) = stored.split_once('.').unwrap();
        assert_eq!(key.len(), KEY_LEN * 2);
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!stored.contains("secret1"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let h = hasher();
        let a = h.hash("secret1").unwrap();
        let b = h.hash("secret1").unwrap();
        assert_ne!(a, b);
        assert!(h.verify("secret1", &a));
        assert!(h.verify("secret1", &b));
    }

    #[test]
    fn malformed_stored_forms_fail_closed() {
        let h = hasher();
        let good = h.hash("secret1").unwrap();
        let (key, salt) = good.split_once('.').unwrap();

        let cases = vec![
            String::new(),
            "no-separator".to_string(),
            key.to_string(),
            format!("{}.", key),
            format!(".{}", salt),
            format!("zz{}.{}", &key[2..], salt),
            format!("{}.{}", &key[..key.len() - 2], salt),
            format!("{}.abcd", key),
            format!("{}.{}.{}", key, salt, salt),
        ];

        for stored in cases {
            assert!(!h.verify("secret1", &stored), "stored {:?}", stored);
        }
    }

    #[test]
    fn hashes_from_other_cost_settings_do_not_verify() {
        let cheap = hasher();
        let other = CredentialHasher::with_cost(2048, 1, 1).unwrap();
        let stored = cheap.hash("secret1").unwrap();
        assert!(!other.verify("secret1", &stored));
    }

    #[test]
    fn invalid_cost_is_rejected() {
        assert!(CredentialHasher::with_cost(1, 0, 1).is_err());
    }

    #[test]
    fn byte_comparison_rejects_any_difference() {
        let key = [0xa5u8; 32];
        assert!(constant_time_eq(&key, &key));
        assert!(constant_time_eq(b"", b""));

        let mut last = key;
        last[31] ^= 0x01;
        assert!(!constant_time_eq(&key, &last));

        let mut first = key;
        first[0] ^= 0x80;
        assert!(!constant_time_eq(&key, &first));

        assert!(!constant_time_eq(&key, &key[..31]));
        assert!(!constant_time_eq(b"", &key));
    }

    #[tokio::test]
    async fn async_wrappers_round_trip() {
        let h = hasher();
        let stored = h.hash_async("secret1".to_string()).await.unwrap();
        assert!(h.verify_async("secret1".to_string(), stored.clone()).await);
        assert!(!h.verify_async("nope".to_string(), stored).await);
    }
}
