use bcrypt::BcryptError;

/// Work factor held above the library default.
const BCRYPT_COST: u32 = 12;

pub fn hash_password(plain: &str) -> Result<String, BcryptError> {
    bcrypt::hash(plain, BCRYPT_COST)
}

/// Any verification failure, including a malformed stored hash, reads as a
/// mismatch so callers cannot distinguish the two.
pub fn verify_password(plain: &str, hashed: &str) -> bool {
    bcrypt::verify(plain, hashed).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trips() {
        let hash = hash_password("registrar-secret").expect("hashing succeeds");
        assert!(verify_password("registrar-secret", &hash));
        assert!(!verify_password("wrong-secret", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }
}
