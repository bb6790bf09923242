//! Account operations: registration, login, profile and password changes.
//!
//! Passwords are stored as Argon2id PHC strings. Hashing runs on the
//! blocking pool so a slow hash never stalls the async workers.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use toneshift_core::store::UserStore;
use toneshift_core::{Error, Result, User};
use tracing::{info, warn};

pub const MIN_PASSWORD_LEN: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const TAKEN: &str = "User with this email or username already exists";

/// Password hashing with a fixed Argon2id cost.
#[derive(Clone, Default)]
pub struct Credentials {
    argon2: Argon2<'static>,
}

impl Credentials {
    /// Argon2id with explicit cost parameters (memory in KiB, iterations, lanes).
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| Error::Config {
                message: format!("invalid Argon2 parameters: {e}"),
            })?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub async fn hash(&self, password: &str) -> Result<String> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| Error::Internal(format!("Argon2 password hashing failed: {e}")))
        })
        .await
        .map_err(|e| Error::Internal(format!("hashing task failed: {e}")))?
    }

    /// `false` for a wrong password or an unreadable stored hash.
    pub async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let argon2 = self.argon2.clone();
        let password = password.to_owned();
        let stored_hash = stored_hash.to_owned();
        tokio::task::spawn_blocking(move || match PasswordHash::new(&stored_hash) {
            Ok(parsed) => argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                warn!("Failed to parse stored password hash: {e}");
                false
            }
        })
        .await
        .map_err(|e| Error::Internal(format!("verification task failed: {e}")))
    }
}

// ── Requests ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Shallow-merged into the stored preferences.
    #[serde(default)]
    pub preferences: Option<serde_json::Map<String, serde_json::Value>>,
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<()> {
    if !email.contains('@') {
        return Err(Error::InvalidInput("Invalid email format".into()));
    }
    Ok(())
}

async fn load_user<S>(store: &S, user_id: &str) -> Result<User>
where
    S: UserStore + ?Sized,
{
    store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))
}

async fn save_user<S>(store: &S, user: &mut User) -> Result<()>
where
    S: UserStore + ?Sized,
{
    user.updated_at = chrono::Utc::now();
    if !store.update_user(user).await? {
        return Err(Error::not_found("User", &user.id));
    }
    Ok(())
}

// ── Operations ────────────────────────────────────────────────────────────

pub async fn register<S>(store: &S, credentials: &Credentials, request: Registration) -> Result<User>
where
    S: UserStore + ?Sized,
{
    let username = request.username.trim();
    let email = request.email.trim();
    if username.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(Error::InvalidInput(
            "Username, email, and password are required".into(),
        ));
    }
    check_password(&request.password)?;
    check_email(email)?;

    if store
        .find_user_by_email_or_username(email, username)
        .await?
        .is_some()
    {
        return Err(Error::InvalidInput(TAKEN.into()));
    }

    let hash = credentials.hash(&request.password).await?;
    let user = User::new(username, email, hash);
    store.insert_user(&user).await?;

    info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(user)
}

/// Unknown email and wrong password fail identically.
pub async fn login<S>(store: &S, credentials: &Credentials, email: &str, password: &str) -> Result<User>
where
    S: UserStore + ?Sized,
{
    if email.trim().is_empty() || password.is_empty() {
        return Err(Error::InvalidInput("Email and password are required".into()));
    }

    let Some(user) = store.find_user_by_email(email.trim()).await? else {
        return Err(Error::Unauthorized(INVALID_CREDENTIALS.into()));
    };
    if !credentials.verify(password, &user.password_hash).await? {
        return Err(Error::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    info!(user_id = %user.id, "User logged in");
    Ok(user)
}

pub async fn profile<S>(store: &S, user_id: &str) -> Result<User>
where
    S: UserStore + ?Sized,
{
    load_user(store, user_id).await
}

pub async fn update_profile<S>(store: &S, user_id: &str, update: ProfileUpdate) -> Result<User>
where
    S: UserStore + ?Sized,
{
    let mut user = load_user(store, user_id).await?;

    let username = update
        .username
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let email = update.email.as_deref().map(str::trim).filter(|s| !s.is_empty());

    if let Some(email) = email {
        check_email(email)?;
        let holder = store.find_user_by_email(email).await?;
        if holder.is_some_and(|other| other.id != user.id) {
            return Err(Error::InvalidInput(TAKEN.into()));
        }
    }
    if let Some(username) = username {
        let holder = store.find_user_by_username(username).await?;
        if holder.is_some_and(|other| other.id != user.id) {
            return Err(Error::InvalidInput(TAKEN.into()));
        }
    }

    if let Some(username) = username {
        user.username = username.to_string();
    }
    if let Some(email) = email {
        user.email = email.to_string();
    }
    if let Some(patch) = &update.preferences {
        user.preferences
            .merge(patch)
            .map_err(|e| Error::InvalidInput(format!("Invalid preferences: {e}")))?;
    }

    save_user(store, &mut user).await?;
    Ok(user)
}

pub async fn change_password<S>(
    store: &S,
    credentials: &Credentials,
    user_id: &str,
    current: &str,
    new: &str,
) -> Result<()>
where
    S: UserStore + ?Sized,
{
    let mut user = load_user(store, user_id).await?;
    if !credentials.verify(current, &user.password_hash).await? {
        return Err(Error::Unauthorized("Current password is incorrect".into()));
    }
    check_password(new)?;

    user.password_hash = credentials.hash(new).await?;
    save_user(store, &mut user).await?;
    info!(user_id = %user.id, "Password changed");
    Ok(())
}

pub async fn preferred_tones<S>(store: &S, user_id: &str) -> Result<Vec<String>>
where
    S: UserStore + ?Sized,
{
    Ok(load_user(store, user_id).await?.preferences.default_tones)
}

pub async fn set_preferred_tones<S>(store: &S, user_id: &str, tones: Vec<String>) -> Result<Vec<String>>
where
    S: UserStore + ?Sized,
{
    let mut user = load_user(store, user_id).await?;
    user.preferences.default_tones = tones;
    save_user(store, &mut user).await?;
    Ok(user.preferences.default_tones)
}
