use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    auth::{
        claims::Identity,
        dto::{present, AuthResponse, LoginRequest, RegisterRequest},
        repo_types::{NewUser, Role, User},
    },
    error::{AppError, AppResult},
    state::AppState,
};

/// Entropy of a reset token, before hex encoding.
const RESET_TOKEN_BYTES: usize = 20;

fn session(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let identity = Identity::from(user);
    let token = state.keys.issue(&identity)?;
    Ok(AuthResponse {
        token,
        user: identity,
    })
}

pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<AuthResponse> {
    let (Some(name), Some(email), Some(password)) =
        (present(req.name), present(req.email), present(req.password))
    else {
        return Err(AppError::validation("Please provide name, email, password"));
    };

    let role = match present(req.role) {
        Some(r) => r.parse::<Role>().map_err(AppError::Validation)?,
        None => Role::default(),
    };

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = state.passwords.hash_async(password).await?;
    // the store re-checks uniqueness, so a racing registration still fails cleanly
    let user = state
        .users
        .create(NewUser {
            name,
            email,
            role,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, role = %user.role, "user registered");
    session(state, &user)
}

pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<AuthResponse> {
    let (Some(email), Some(password)) = (present(req.email), present(req.password)) else {
        return Err(AppError::validation("Please provide email and password"));
    };

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    let ok = state
        .passwords
        .verify_async(password, user.password_hash.clone())
        .await?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    session(state, &user)
}

pub async fn current_user(state: &AppState, identity: &Identity) -> AppResult<User> {
    state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// 20 bytes from the OS RNG, hex encoded.
pub(crate) fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues a reset token for `email` and returns the link embedding it.
pub async fn request_password_reset(state: &AppState, email: Option<String>) -> AppResult<String> {
    request_password_reset_at(state, email, OffsetDateTime::now_utc()).await
}

pub(crate) async fn request_password_reset_at(
    state: &AppState,
    email: Option<String>,
    now: OffsetDateTime,
) -> AppResult<String> {
    let email = present(email).ok_or_else(|| AppError::validation("Email required"))?;

    let Some(mut user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "reset requested for unknown email");
        return Err(AppError::UserNotFound);
    };

    let token = generate_reset_token();
    let expiry = now + Duration::minutes(state.config.reset.ttl_minutes);
    // replaces any token still pending for this user
    user.set_reset_token(token.clone(), expiry);
    state.users.save(&user).await?;

    info!(user_id = %user.id, "password reset requested");
    Ok(format!("{}?token={}", state.config.reset.link_base, token))
}

/// Redeems a reset token. Unknown and expired tokens fail identically.
pub async fn reset_password(
    state: &AppState,
    token: Option<String>,
    new_password: Option<String>,
) -> AppResult<()> {
    reset_password_at(state, token, new_password, OffsetDateTime::now_utc()).await
}

pub(crate) async fn reset_password_at(
    state: &AppState,
    token: Option<String>,
    new_password: Option<String>,
    now: OffsetDateTime,
) -> AppResult<()> {
    let new_password =
        present(new_password).ok_or_else(|| AppError::validation("New password required"))?;
    let token = present(token).ok_or(AppError::InvalidOrExpiredToken)?;

    // skip hashing for tokens that cannot match
    if state.users.find_by_reset_token(&token, now).await?.is_none() {
        warn!("invalid or expired reset token");
        return Err(AppError::InvalidOrExpiredToken);
    }

    let password_hash = state.passwords.hash_async(new_password).await?;
    let Some(user) = state
        .users
        .consume_reset_token(&token, now, &password_hash)
        .await?
    else {
        warn!("reset token already used");
        return Err(AppError::InvalidOrExpiredToken);
    };

    info!(user_id = %user.id, "password reset completed");
    Ok(())
}
