//! Account registration and credential checks.

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use regex::Regex;
use storage::{NewUser, PvzStore, Role, User};

use crate::error::DomainError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// One-way hashing of user secrets.
pub trait SecretHasher: Send + Sync {
    /// Produces a self-describing hash of `secret`.
    fn hash(&self, secret: &str) -> Result<String, DomainError>;

    /// Returns true if `secret` matches `hash`. Malformed hashes never match.
    fn verify(&self, secret: &str, hash: &str) -> bool;
}

/// Argon2id hasher with the crate's default parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl SecretHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::Internal(format!("secret cannot be hashed: {e}")))
    }

    fn verify(&self, secret: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Registers accounts and authenticates them.
pub struct IdentityService<S: PvzStore, H: SecretHasher = Argon2Hasher> {
    store: S,
    hasher: H,
}

impl<S: PvzStore> IdentityService<S> {
    /// Creates a service hashing secrets with Argon2.
    pub fn new(store: S) -> Self {
        Self::with_hasher(store, Argon2Hasher)
    }
}

impl<S: PvzStore, H: SecretHasher> IdentityService<S, H> {
    pub fn with_hasher(store: S, hasher: H) -> Self {
        Self { store, hasher }
    }

    /// Registers an account.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed email, an empty secret or no roles,
    /// `Conflict` if the email is already registered, and `Internal` if the
    /// secret cannot be hashed.
    #[tracing::instrument(skip(self, secret))]
    pub async fn create_user(
        &self,
        email: &str,
        secret: &str,
        roles: &[Role],
    ) -> Result<User, DomainError> {
        let email = normalize_email(email)?;
        if secret.is_empty() {
            return Err(DomainError::Validation("password must not be empty".to_string()));
        }
        if roles.is_empty() {
            return Err(DomainError::Validation("at least one role is required".to_string()));
        }

        let mut roles = roles.to_vec();
        roles.sort();
        roles.dedup();

        let secret_hash = self.hasher.hash(secret)?;
        let user = self
            .store
            .create_user(NewUser {
                email,
                secret_hash,
                roles,
            })
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Checks credentials.
    ///
    /// Unknown emails and wrong secrets both yield `DomainError::Auth`.
    #[tracing::instrument(skip(self, secret))]
    pub async fn authenticate(&self, email: &str, secret: &str) -> Result<User, DomainError> {
        let Ok(email) = normalize_email(email) else {
            return Err(DomainError::Auth);
        };
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(DomainError::Auth)?;

        if !self.hasher.verify(secret, &user.secret_hash) {
            tracing::debug!("credential check failed");
            return Err(DomainError::Auth);
        }
        Ok(user)
    }
}

fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(DomainError::Validation(format!("invalid email: {email}")));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use storage::InMemoryPvzStore;

    use super::*;

    /// Cheap reversible stand-in so tests do not pay for Argon2.
    struct PlainHasher;

    impl SecretHasher for PlainHasher {
        fn hash(&self, secret: &str) -> Result<String, DomainError> {
            Ok(format!("plain:{secret}"))
        }

        fn verify(&self, secret: &str, hash: &str) -> bool {
            hash.strip_prefix("plain:") == Some(secret)
        }
    }

    struct BrokenHasher;

    impl SecretHasher for BrokenHasher {
        fn hash(&self, _secret: &str) -> Result<String, DomainError> {
            Err(DomainError::Internal("rng unavailable".to_string()))
        }

        fn verify(&self, _secret: &str, _hash: &str) -> bool {
            false
        }
    }

    fn service() -> IdentityService<InMemoryPvzStore, PlainHasher> {
        IdentityService::with_hasher(InMemoryPvzStore::new(), PlainHasher)
    }

    #[test]
    fn argon2_hash_verifies() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("hunter2").unwrap();
        assert_ne!(hash, "hunter2");
        assert!(hasher.verify("hunter2", &hash));
        assert!(!hasher.verify("hunter3", &hash));
        assert!(!hasher.verify("hunter2", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn create_user_stores_hash_not_secret() {
        let service = service();
        let user = service
            .create_user("Mod@Example.com", "s3cret", &[Role::Moderator])
            .await
            .unwrap();
        assert_eq!(user.email, "mod@example.com");
        assert_ne!(user.secret_hash, "s3cret");
        assert_eq!(user.roles, vec![Role::Moderator]);
    }

    #[tokio::test]
    async fn create_user_rejects_duplicate_email() {
        let service = service();
        service
            .create_user("a@example.com", "x", &[Role::Employee])
            .await
            .unwrap();
        let result = service
            .create_user("A@example.com", "y", &[Role::Employee])
            .await;
        assert!(matches!(result, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn create_user_validates_input() {
        let service = service();
        assert!(matches!(
            service.create_user("nope", "x", &[Role::Employee]).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            service.create_user("a@example.com", "", &[Role::Employee]).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            service.create_user("a@example.com", "x", &[]).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn hashing_failure_is_internal_and_stores_nothing() {
        let store = InMemoryPvzStore::new();
        let service = IdentityService::with_hasher(store.clone(), BrokenHasher);

        let result = service
            .create_user("e@example.com", "right", &[Role::Employee])
            .await;
        assert!(matches!(result, Err(DomainError::Internal(_))));
        assert!(store.find_user_by_email("e@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn authenticate_is_uniform() {
        let service = service();
        service
            .create_user("e@example.com", "right", &[Role::Employee])
            .await
            .unwrap();

        let user = service.authenticate("e@example.com", "right").await.unwrap();
        assert!(user.has_role(Role::Employee));

        let wrong_secret = service
            .authenticate("e@example.com", "wrong")
            .await
            .unwrap_err();
        let unknown_email = service
            .authenticate("ghost@example.com", "right")
            .await
            .unwrap_err();
        assert!(matches!(wrong_secret, DomainError::Auth));
        assert!(matches!(unknown_email, DomainError::Auth));
        assert_eq!(wrong_secret.to_string(), unknown_email.to_string());
    }
}
