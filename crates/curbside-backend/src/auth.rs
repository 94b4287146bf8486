//! Authentication provider abstraction.
//!
//! The provider owns credentials and assigns user ids; profile data lives in
//! the database under `users/{uid}`.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use curbside_core::env::Environment;
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Email/password identity provider.
pub trait AuthProvider: Send + Sync {
    /// Register a new account and sign it in. Returns the new uid.
    fn create_user(&self, email: &str, password: &str) -> Result<String, AuthError>;

    /// Authenticate and sign in. Returns the account's uid.
    fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError>;

    /// Sign out the current account. Signing out twice is not an error.
    fn sign_out(&self) -> Result<(), AuthError>;

    /// Uid of the signed-in account.
    fn current_uid(&self) -> Option<String>;
}

struct Account {
    uid: String,
    password_hash: [u8; 32],
}

#[derive(Default)]
struct AuthState {
    /// Accounts by lowercased email
    accounts: HashMap<String, Account>,
    current: Option<String>,
}

/// In-memory provider with salted SHA-256 password hashes.
///
/// Uids come from the environment, so a seeded environment gives
/// reproducible identities.
#[derive(Clone)]
pub struct MemoryAuth<E: Environment> {
    env: E,
    state: Arc<Mutex<AuthState>>,
}

impl<E: Environment> MemoryAuth<E> {
    /// Create a provider with no accounts.
    pub fn new(env: E) -> Self {
        Self { env, state: Arc::new(Mutex::new(AuthState::default())) }
    }

    /// Number of registered accounts.
    pub fn account_count(&self) -> usize {
        self.state.lock().map(|s| s.accounts.len()).unwrap_or(0)
    }
}

fn hash_password(uid: &str, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(uid.as_bytes());
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AuthError::InvalidEmail),
    }
}

impl<E: Environment> AuthProvider for MemoryAuth<E> {
    fn create_user(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword { min: MIN_PASSWORD_LEN });
        }

        let mut state = self.state.lock()?;
        if state.accounts.contains_key(&email) {
            return Err(AuthError::EmailInUse);
        }

        let uid = self.env.random_uid();
        let password_hash = hash_password(&uid, password);
        state.accounts.insert(email, Account { uid: uid.clone(), password_hash });
        state.current = Some(uid.clone());

        tracing::info!(%uid, "account created");
        Ok(uid)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;

        let mut state = self.state.lock()?;
        let account = state.accounts.get(&email).ok_or(AuthError::InvalidCredentials)?;
        if hash_password(&account.uid, password) != account.password_hash {
            return Err(AuthError::InvalidCredentials);
        }

        let uid = account.uid.clone();
        state.current = Some(uid.clone());
        tracing::info!(%uid, "signed in");
        Ok(uid)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(uid) = self.state.lock()?.current.take() {
            tracing::info!(%uid, "signed out");
        }
        Ok(())
    }

    fn current_uid(&self) -> Option<String> {
        self.state.lock().ok().and_then(|s| s.current.clone())
    }
}
