//! # Authorization Collaborator
//!
//! Resolves an administrative credential to an actor display name.
//!
//! ## The Only Gate in the Engine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Credential Resolution                                │
//! │                                                                         │
//! │  Validate(batch_id, credential)                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load active admins  ← INSIDE the validation transaction               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  argon2 verify credential against each stored hash                     │
//! │       │                                                                 │
//! │       ├── match → actor display name recorded on the batch             │
//! │       └── none  → Unauthorized, zero mutations                         │
//! │                                                                         │
//! │  Only the hash is ever stored; the batch records the NAME, never the   │
//! │  credential.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use crate::error::{EngineError, EngineResult};
use feira_core::Admin;

/// Hashes a credential for storage.
pub fn hash_credential(credential: &str) -> EngineResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(credential.as_bytes(), &salt)
        .map_err(|e| EngineError::Validation(format!("Failed to hash credential: {e}")))?;

    Ok(hash.to_string())
}

/// Verifies a credential against its stored hash.
pub fn verify_credential(credential: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(credential.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Resolves a credential against the active admin set.
///
/// Returns the matching actor, or `None` when no active admin's hash
/// verifies. Inactive admins never reach this function — the repository
/// filters them out.
pub fn resolve_actor<'a>(admins: &'a [Admin], credential: &str) -> Option<&'a Admin> {
    admins
        .iter()
        .find(|admin| verify_credential(credential, &admin.credential_hash))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn admin(name: &str, credential: &str) -> Admin {
        Admin {
            id: format!("id-{name}"),
            name: name.to_string(),
            credential_hash: hash_credential(credential).unwrap(),
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hash = hash_credential("1234").unwrap();
        assert!(verify_credential("1234", &hash));
        assert!(!verify_credential("4321", &hash));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_credential("1234", "not-a-hash"));
    }

    #[test]
    fn test_resolve_actor() {
        let admins = vec![admin("Padre João", "1234"), admin("Irmã Clara", "9999")];

        let actor = resolve_actor(&admins, "9999").unwrap();
        assert_eq!(actor.name, "Irmã Clara");

        assert!(resolve_actor(&admins, "0000").is_none());
        assert!(resolve_actor(&[], "1234").is_none());
    }
}
