use crate::crypto::password::{hash_password, verify_password, verify_without_account};
use crate::error::{AppError, AuthError, Result};
use crate::models::account::{Account, NewAccount};
use crate::models::session::{SessionContext, SessionRecord};
use crate::state::AppState;
use crate::validation::auth::*;

/// Registration input as received from the client.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub full_name: String,
    pub telephone: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub avatar: Option<String>,
}

/// Validates and stores a new account.
pub async fn register(state: &AppState, registration: Registration) -> Result<Account> {
    validate_username(&registration.username)?;
    validate_full_name(&registration.full_name)?;
    validate_telephone(&registration.telephone)?;
    validate_email(&registration.email)?;
    validate_password(&registration.password)?;
    validate_password_confirmation(&registration.password, &registration.confirm_password)?;

    let password_hash = hash_password(&registration.password)?;
    let account = state
        .accounts
        .insert_account(NewAccount {
            username: registration.username,
            full_name: registration.full_name.trim().to_string(),
            telephone: registration.telephone,
            email: registration.email,
            avatar: registration.avatar.filter(|a| !a.is_empty()),
            password_hash,
        })
        .await?;

    tracing::info!("✅ Account registered: {}", account.id);
    Ok(account)
}

/// Checks the credentials, persists a new session and signs its token.
///
/// The login fails if the session cannot be durably written.
pub async fn login(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<(String, SessionRecord)> {
    validate_login(username, password)?;
    tracing::debug!("🔐 Authenticating user: {}", username);

    let invalid = || AppError::Authentication("Invalid username or password".to_string());

    let Some(account) = state.accounts.find_account_by_username(username).await? else {
        verify_without_account(password);
        return Err(invalid());
    };

    if !verify_password(password, &account.password)? {
        return Err(invalid());
    }

    let session = state.sessions.create(account.snapshot()).await?;
    let token = state.tokens.issue(&session.session_id)?;

    tracing::info!("✅ User logged in: {} (session {})", account.id, session.session_id);
    Ok((token, session))
}

/// Revokes the session behind `token`.
///
/// Only the signature is checked, so logging out an already revoked or
/// expired session succeeds.
pub async fn logout(state: &AppState, token: &str) -> std::result::Result<(), AuthError> {
    let session_id = state.tokens.verify(token)?;
    state.sessions.delete(&session_id).await;
    tracing::info!("👋 Session closed: {}", session_id);
    Ok(())
}

/// Resolves a presented token to a live session without touching it.
pub async fn guard(
    state: &AppState,
    token: Option<&str>,
) -> std::result::Result<SessionContext, AuthError> {
    let token = token.filter(|t| !t.is_empty()).ok_or(AuthError::NoToken)?;
    let session_id = state.tokens.verify(token)?;
    let session = state
        .sessions
        .get(&session_id)
        .await
        .map_err(|_| AuthError::SessionExpiredOrRevoked)?;

    Ok(SessionContext {
        token: token.to_string(),
        session,
    })
}

/// Returns the session behind `token`.
pub async fn whoami(state: &AppState, token: &str) -> std::result::Result<SessionRecord, AuthError> {
    guard(state, Some(token)).await.map(|ctx| ctx.session)
}

/// Restarts the session's lifetime and re-reads its profile.
pub async fn refresh_session(state: &AppState, token: &str) -> Result<SessionRecord> {
    let session_id = state.tokens.verify(token)?;
    let session = state
        .sessions
        .refresh(&session_id, state.accounts.as_ref())
        .await?;
    tracing::info!("🔄 Session refreshed: {}", session.session_id);
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::repositories::account::MemoryAccountDirectory;
    use crate::services::sweeper::ExpirySweeper;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn state(dir: &TempDir, clock: &ManualClock) -> AppState {
        let config = Config::from_lookup(|key| match key {
            "SERVER_SECRET_TOKEN_KEY" => Some("unit-test-secret".to_string()),
            "SESSIONS_DIR" => Some(dir.path().display().to_string()),
            _ => None,
        })
        .unwrap();
        AppState::with_parts(
            config,
            Arc::new(MemoryAccountDirectory::new()),
            Arc::new(clock.clone()),
        )
        .await
        .unwrap()
    }

    fn registration(username: &str) -> Registration {
        Registration {
            username: username.to_string(),
            full_name: "Kim Keys".to_string(),
            telephone: "0833333".to_string(),
            email: "kim@example.com".to_string(),
            password: "Keyb0ard!".to_string(),
            confirm_password: "Keyb0ard!".to_string(),
            avatar: None,
        }
    }

    #[tokio::test]
    async fn login_admits_then_logout_rejects() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(1_000);
        let state = state(&dir, &clock).await;
        register(&state, registration("keys1")).await.unwrap();

        let (token, session) = login(&state, "keys1", "Keyb0ard!").await.unwrap();
        let ctx = guard(&state, Some(&token)).await.unwrap();
        assert_eq!(ctx.session, session);
        assert_eq!(whoami(&state, &token).await.unwrap(), session);

        logout(&state, &token).await.unwrap();
        assert_eq!(
            guard(&state, Some(&token)).await.unwrap_err(),
            AuthError::SessionExpiredOrRevoked
        );
        logout(&state, &token).await.unwrap();
    }

    #[tokio::test]
    async fn bad_credentials_are_uniform() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(1_000);
        let state = state(&dir, &clock).await;
        register(&state, registration("keys1")).await.unwrap();

        let unknown = login(&state, "nobody1", "Keyb0ard!").await.unwrap_err();
        let wrong = login(&state, "keys1", "Wr0ng!pass").await.unwrap_err();
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(state.sessions.list_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn guard_without_token() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(1_000);
        let state = state(&dir, &clock).await;

        assert_eq!(guard(&state, None).await.unwrap_err(), AuthError::NoToken);
        assert_eq!(guard(&state, Some("")).await.unwrap_err(), AuthError::NoToken);
    }

    #[tokio::test]
    async fn forged_token_is_rejected_even_with_live_session() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(1_000);
        let state = state(&dir, &clock).await;
        register(&state, registration("keys1")).await.unwrap();
        let (_, session) = login(&state, "keys1", "Keyb0ard!").await.unwrap();

        let forger = crate::crypto::token::TokenCodec::new(b"not-the-secret").unwrap();
        let forged = forger.issue(&session.session_id).unwrap();

        assert_eq!(
            guard(&state, Some(&forged)).await.unwrap_err(),
            AuthError::InvalidSignature
        );
        assert_eq!(logout(&state, &forged).await.unwrap_err(), AuthError::InvalidSignature);
        assert!(state.sessions.get(&session.session_id).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_extends_live_session() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(1_000);
        let state = state(&dir, &clock).await;
        register(&state, registration("keys1")).await.unwrap();
        let (token, session) = login(&state, "keys1", "Keyb0ard!").await.unwrap();

        clock.advance(5_000);
        let refreshed = refresh_session(&state, &token).await.unwrap();
        assert_eq!(refreshed.session_id, session.session_id);
        assert!(refreshed.expires_at > session.expires_at);
    }

    #[tokio::test]
    async fn swept_session_is_rejected() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(1_000);
        let state = state(&dir, &clock).await;
        register(&state, registration("keys1")).await.unwrap();
        let (token, _) = login(&state, "keys1", "Keyb0ard!").await.unwrap();

        clock.set(2_629_802_000);
        let sweeper = ExpirySweeper::new(state.sessions.clone(), Duration::from_secs(3));
        assert_eq!(sweeper.sweep_once().await.evicted, 1);

        assert_eq!(
            guard(&state, Some(&token)).await.unwrap_err(),
            AuthError::SessionExpiredOrRevoked
        );
        assert!(matches!(
            refresh_session(&state, &token).await.unwrap_err(),
            AppError::Auth(AuthError::SessionExpiredOrRevoked)
        ));
    }

    #[tokio::test]
    async fn registration_rules_apply() {
        let dir = TempDir::new().unwrap();
        let clock = ManualClock::new(1_000);
        let state = state(&dir, &clock).await;

        let mut mismatched = registration("keys1");
        mismatched.confirm_password = "Other0ne!".to_string();
        assert!(matches!(
            register(&state, mismatched).await.unwrap_err(),
            AppError::Validation(_)
        ));

        register(&state, registration("keys1")).await.unwrap();
        assert!(matches!(
            register(&state, registration("keys1")).await.unwrap_err(),
            AppError::Conflict(_)
        ));
    }
}
