use anyhow::{Context, Result};

/// Work factor used for new hashes unless configured otherwise.
pub const DEFAULT_COST: u32 = 12;

/// Hash a plaintext password.
///
/// CPU-bound (hundreds of ms at cost 12); async callers run it on
/// `tokio::task::spawn_blocking`.
pub fn hash_password(plain: &str, cost: u32) -> Result<String> {
    bcrypt::hash(plain, cost).context("bcrypt hash failed")
}

/// Check a plaintext password against a stored hash.
///
/// A malformed stored hash is treated as a mismatch rather than an error so
/// that a corrupt row cannot be distinguished from a wrong password.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost keeps the tests fast.
    const TEST_COST: u32 = 4;

    #[test]
    fn hash_then_verify() {
        let h = hash_password("fan123", TEST_COST).unwrap();
        assert!(h.starts_with("$2"));
        assert!(verify_password("fan123", &h));
        assert!(!verify_password("fan124", &h));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same-password", TEST_COST).unwrap();
        let b = hash_password("same-password", TEST_COST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
        assert!(!verify_password("", ""));
    }
}
