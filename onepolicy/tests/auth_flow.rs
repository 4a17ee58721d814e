//! Integration tests for the authentication lifecycle.
//!
//! Tests registration, login, logout, refresh, password reset and profile
//! flows against the in-memory account store.

use async_trait::async_trait;
use onepolicy::auth::{
    Account, AccountId, AuthConfig, AuthConfigError, AuthError, AuthManager,
    FORGOT_PASSWORD_MESSAGE, LoginRequest, NewAccount, RegisterRequest, ResetPasswordRequest,
    UpdateProfileRequest, token_digest,
};
use onepolicy::db::{AccountStore, MemoryAccountStore, StoreError, StoreResult};
use std::sync::Arc;

const PASSWORD: &str = "Abcdef12!";

/// Helper to create test auth manager over a fresh store
fn setup_auth_manager() -> (AuthManager, Arc<MemoryAccountStore>) {
    let store = Arc::new(MemoryAccountStore::new());
    let config = AuthConfig::new("test_secret_key_for_jwt");
    let auth = AuthManager::new(store.clone(), &config).expect("manager should build");
    (auth, store)
}

fn manager_over(store: Arc<dyn AccountStore>) -> AuthManager {
    AuthManager::new(store, &AuthConfig::new("test_secret_key_for_jwt")).unwrap()
}

/// Memory store whose lookups yield before returning, so two `join!`ed
/// flows both read an account before either writes it back
struct YieldingStore(MemoryAccountStore);

impl YieldingStore {
    async fn after_yield<T>(found: T) -> T {
        tokio::task::yield_now().await;
        found
    }
}

#[async_trait]
impl AccountStore for YieldingStore {
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        Self::after_yield(self.0.find_by_id(id).await).await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        Self::after_yield(self.0.find_by_email(email).await).await
    }

    async fn find_by_access_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        Self::after_yield(self.0.find_by_access_token(digest).await).await
    }

    async fn find_by_refresh_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        Self::after_yield(self.0.find_by_refresh_token(digest).await).await
    }

    async fn find_by_reset_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        Self::after_yield(self.0.find_by_reset_token(digest).await).await
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        self.0.create(account).await
    }

    async fn save(&self, account: &Account) -> StoreResult<Account> {
        self.0.save(account).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.0.ping().await
    }
}

/// Memory store where every save loses its compare-and-swap
struct ConflictingStore(MemoryAccountStore);

#[async_trait]
impl AccountStore for ConflictingStore {
    async fn find_by_id(&self, id: AccountId) -> StoreResult<Option<Account>> {
        self.0.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        self.0.find_by_email(email).await
    }

    async fn find_by_access_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        self.0.find_by_access_token(digest).await
    }

    async fn find_by_refresh_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        self.0.find_by_refresh_token(digest).await
    }

    async fn find_by_reset_token(&self, digest: &str) -> StoreResult<Option<Account>> {
        self.0.find_by_reset_token(digest).await
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        self.0.create(account).await
    }

    async fn save(&self, _account: &Account) -> StoreResult<Account> {
        Err(StoreError::Conflict)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.0.ping().await
    }
}

fn register_request(email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: password.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
    }
}

fn login_request(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_register_login_logout_scenario() {
    let (auth, store) = setup_auth_manager();

    let profile = auth
        .register(register_request("a@x.com", PASSWORD))
        .await
        .expect("Registration should succeed");
    assert_eq!(profile.email, "a@x.com");

    let stored = store.find_by_email("a@x.com").await.unwrap().unwrap();
    assert_ne!(stored.password_hash, PASSWORD);
    assert!(!stored.is_logged_in());

    let outcome = auth
        .login(login_request("a@x.com", PASSWORD))
        .await
        .expect("Login should succeed");
    assert_eq!(outcome.profile.id, profile.id);

    let stored = store.find_by_id(profile.id).await.unwrap().unwrap();
    assert_eq!(
        stored.access_token_digest,
        Some(token_digest(&outcome.tokens.access_token))
    );
    assert_eq!(
        stored.refresh_token_digest,
        Some(token_digest(&outcome.tokens.refresh_token))
    );

    auth.logout(&outcome.tokens.access_token)
        .await
        .expect("Logout should succeed");

    let result = auth.profile(&outcome.tokens.access_token).await;
    assert!(matches!(result, Err(AuthError::InvalidToken)));

    let stored = store.find_by_id(profile.id).await.unwrap().unwrap();
    assert!(stored.access_token_digest.is_none());
    assert!(stored.refresh_token_digest.is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_case_insensitive() {
    let (auth, _) = setup_auth_manager();

    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .expect("First registration should succeed");

    let result = auth.register(register_request("  A@X.COM", PASSWORD)).await;
    assert!(matches!(result, Err(AuthError::EmailAlreadyRegistered)));
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let (auth, store) = setup_auth_manager();

    let short = auth.register(register_request("a@x.com", "short")).await;
    assert!(matches!(short, Err(AuthError::ValidationFailed(_))));

    let bad_email = auth.register(register_request("not-an-email", PASSWORD)).await;
    assert!(matches!(bad_email, Err(AuthError::ValidationFailed(_))));

    let mut no_name = register_request("b@x.com", PASSWORD);
    no_name.first_name = "  ".to_string();
    assert!(matches!(
        auth.register(no_name).await,
        Err(AuthError::ValidationFailed(_))
    ));

    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_password_min_length_is_configurable() {
    let store = Arc::new(MemoryAccountStore::new());
    let mut config = AuthConfig::new("test_secret_key_for_jwt");
    config.password_min_length = 12;
    let auth = AuthManager::new(store, &config).unwrap();

    let result = auth.register(register_request("a@x.com", PASSWORD)).await;
    assert!(matches!(result, Err(AuthError::ValidationFailed(_))));
    assert!(
        auth.register(register_request("a@x.com", "long enough pw"))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();

    let unknown = auth
        .login(login_request("nobody@x.com", PASSWORD))
        .await
        .unwrap_err();
    let wrong = auth
        .login(login_request("a@x.com", "WrongPass123!"))
        .await
        .unwrap_err();

    assert!(matches!(unknown, AuthError::InvalidCredentials));
    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert_eq!(unknown.to_string(), wrong.to_string());
    assert_eq!(unknown.client_message(), wrong.client_message());
}

#[tokio::test]
async fn test_login_with_differently_cased_email() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();

    assert!(auth.login(login_request("A@X.com", PASSWORD)).await.is_ok());
}

#[tokio::test]
async fn test_second_login_replaces_session() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();

    let first = auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();
    let second = auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();

    assert!(matches!(
        auth.profile(&first.tokens.access_token).await,
        Err(AuthError::InvalidToken)
    ));
    assert!(auth.profile(&second.tokens.access_token).await.is_ok());
}

#[tokio::test]
async fn test_refresh_rotates_pair() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();
    let login = auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();

    let refreshed = auth
        .refresh(&login.tokens.refresh_token)
        .await
        .expect("Refresh should succeed");
    assert_ne!(refreshed.access_token, login.tokens.access_token);
    assert_ne!(refreshed.refresh_token, login.tokens.refresh_token);

    // Old access token no longer authorizes, new one does.
    assert!(matches!(
        auth.profile(&login.tokens.access_token).await,
        Err(AuthError::InvalidToken)
    ));
    let profile = auth.profile(&refreshed.access_token).await.unwrap();
    assert_eq!(profile.email, "a@x.com");

    // Old refresh token is spent.
    assert!(matches!(
        auth.refresh(&login.tokens.refresh_token).await,
        Err(AuthError::InvalidRefreshToken)
    ));
}

#[tokio::test]
async fn test_refresh_rejects_access_token_and_garbage() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();
    let login = auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();

    assert!(matches!(
        auth.refresh(&login.tokens.access_token).await,
        Err(AuthError::InvalidRefreshToken)
    ));
    assert!(matches!(
        auth.refresh("garbage").await,
        Err(AuthError::InvalidRefreshToken)
    ));
}

#[tokio::test]
async fn test_refresh_after_logout_rejected() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();
    let login = auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();
    auth.logout(&login.tokens.access_token).await.unwrap();

    assert!(matches!(
        auth.refresh(&login.tokens.refresh_token).await,
        Err(AuthError::InvalidRefreshToken)
    ));
}

#[tokio::test]
async fn test_refresh_token_cannot_authorize_profile() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();
    let login = auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();

    assert!(matches!(
        auth.profile(&login.tokens.refresh_token).await,
        Err(AuthError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_token_from_other_secret_rejected() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();
    auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();

    let (other, _) = {
        let store = Arc::new(MemoryAccountStore::new());
        let config = AuthConfig::new("a_completely_different_secret");
        (AuthManager::new(store.clone(), &config).unwrap(), store)
    };
    let forged = other.issuer().issue_pair(1, "a@x.com").unwrap();

    assert!(matches!(
        auth.profile(&forged.access_token).await,
        Err(AuthError::TokenSignatureInvalid)
    ));
}

#[tokio::test]
async fn test_logout_twice_fails() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();
    let login = auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();

    auth.logout(&login.tokens.access_token).await.unwrap();
    assert!(matches!(
        auth.logout(&login.tokens.access_token).await,
        Err(AuthError::InvalidToken)
    ));
}

#[tokio::test]
async fn test_forgot_password_same_message_for_unknown_email() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();

    let known = auth.forgot_password("a@x.com").await.unwrap();
    let unknown = auth.forgot_password("nobody@x.com").await.unwrap();

    assert_eq!(known.message, unknown.message);
    assert_eq!(known.message, FORGOT_PASSWORD_MESSAGE);
    assert!(known.reset_token.is_some());
    assert!(unknown.reset_token.is_none());
}

#[tokio::test]
async fn test_reset_password_flow() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();
    let login = auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();

    let token = auth
        .forgot_password("a@x.com")
        .await
        .unwrap()
        .reset_token
        .expect("token for known email");

    auth.reset_password(ResetPasswordRequest {
        token: token.clone(),
        password: "NewPass456!".to_string(),
        confirm_password: "NewPass456!".to_string(),
    })
    .await
    .expect("Reset should succeed");

    // Old password gone, new one works.
    assert!(matches!(
        auth.login(login_request("a@x.com", PASSWORD)).await,
        Err(AuthError::InvalidCredentials)
    ));

    // Reset does not touch the session state.
    assert!(auth.profile(&login.tokens.access_token).await.is_ok());

    assert!(
        auth.login(login_request("a@x.com", "NewPass456!"))
            .await
            .is_ok()
    );

    // Token is single-use.
    let replay = auth
        .reset_password(ResetPasswordRequest {
            token,
            password: "Another789!".to_string(),
            confirm_password: "Another789!".to_string(),
        })
        .await;
    assert!(matches!(replay, Err(AuthError::InvalidOrExpiredToken)));
}

#[tokio::test]
async fn test_reset_password_input_errors() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();
    let token = auth
        .forgot_password("a@x.com")
        .await
        .unwrap()
        .reset_token
        .unwrap();

    let mismatch = auth
        .reset_password(ResetPasswordRequest {
            token: token.clone(),
            password: "NewPass456!".to_string(),
            confirm_password: "NewPass457!".to_string(),
        })
        .await;
    assert!(matches!(mismatch, Err(AuthError::PasswordMismatch)));

    let weak = auth
        .reset_password(ResetPasswordRequest {
            token: token.clone(),
            password: "short".to_string(),
            confirm_password: "short".to_string(),
        })
        .await;
    assert!(matches!(weak, Err(AuthError::ValidationFailed(_))));

    let unknown = auth
        .reset_password(ResetPasswordRequest {
            token: "not-a-real-token".to_string(),
            password: "NewPass456!".to_string(),
            confirm_password: "NewPass456!".to_string(),
        })
        .await;
    assert!(matches!(unknown, Err(AuthError::InvalidOrExpiredToken)));

    // Failed attempts did not burn the token.
    assert!(
        auth.reset_password(ResetPasswordRequest {
            token,
            password: "NewPass456!".to_string(),
            confirm_password: "NewPass456!".to_string(),
        })
        .await
        .is_ok()
    );
}

#[tokio::test]
async fn test_update_profile() {
    let (auth, _) = setup_auth_manager();
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();
    let login = auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();

    let updated = auth
        .update_profile(
            &login.tokens.access_token,
            UpdateProfileRequest {
                first_name: Some("Grace".to_string()),
                last_name: Some("  ".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.first_name, "Grace");
    assert_eq!(updated.last_name, "Lovelace");
    assert!(updated.updated_at >= updated.created_at);

    // Session survives a profile save.
    let profile = auth.profile(&login.tokens.access_token).await.unwrap();
    assert_eq!(profile.first_name, "Grace");
}

#[tokio::test]
async fn test_update_profile_requires_live_token() {
    let (auth, _) = setup_auth_manager();
    let result = auth
        .update_profile("garbage", UpdateProfileRequest::default())
        .await;
    assert!(matches!(result, Err(AuthError::TokenMalformed)));
}

#[tokio::test]
async fn test_out_of_range_lifetime_rejected_at_construction() {
    let mut config = AuthConfig::new("test_secret_key_for_jwt");
    config.refresh_token_ttl_days = 1_000_000_000;
    let result = AuthManager::new(Arc::new(MemoryAccountStore::new()), &config);
    assert!(matches!(
        result,
        Err(AuthError::Config(AuthConfigError::OutOfRange { .. }))
    ));

    let mut config = AuthConfig::new("test_secret_key_for_jwt");
    config.access_token_ttl_minutes = i64::MAX;
    let result = AuthManager::new(Arc::new(MemoryAccountStore::new()), &config);
    assert!(matches!(result, Err(AuthError::Config(_))));
}

#[tokio::test]
async fn test_concurrent_login_and_logout_leave_consistent_state() {
    let store = Arc::new(YieldingStore(MemoryAccountStore::new()));
    let auth = manager_over(store.clone());
    let profile = auth
        .register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();
    let login = auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();

    let (relogin, logout) = tokio::join!(
        auth.login(login_request("a@x.com", PASSWORD)),
        auth.logout(&login.tokens.access_token),
    );

    // Both read the same version, so exactly one save lands.
    assert_eq!(relogin.is_ok() as u8 + logout.is_ok() as u8, 1);

    let stored = store.find_by_id(profile.id).await.unwrap().unwrap();
    match (relogin, logout) {
        (Ok(new), Err(e)) => {
            assert!(matches!(e, AuthError::Conflict));
            assert_eq!(
                stored.access_token_digest,
                Some(token_digest(&new.tokens.access_token))
            );
        }
        (Err(e), Ok(())) => {
            assert!(matches!(e, AuthError::Conflict));
            assert!(!stored.is_logged_in());
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_concurrent_refresh_only_one_rotation_wins() {
    let store = Arc::new(YieldingStore(MemoryAccountStore::new()));
    let auth = manager_over(store.clone());
    let profile = auth
        .register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();
    let login = auth.login(login_request("a@x.com", PASSWORD)).await.unwrap();

    let (a, b) = tokio::join!(
        auth.refresh(&login.tokens.refresh_token),
        auth.refresh(&login.tokens.refresh_token),
    );

    let (winner, loser) = match (a, b) {
        (Ok(pair), Err(e)) | (Err(e), Ok(pair)) => (pair, e),
        (a, b) => panic!("expected exactly one rotation, got {a:?} and {b:?}"),
    };
    assert!(matches!(loser, AuthError::InvalidRefreshToken));

    let stored = store.find_by_id(profile.id).await.unwrap().unwrap();
    assert_eq!(
        stored.refresh_token_digest,
        Some(token_digest(&winner.refresh_token))
    );
}

#[tokio::test]
async fn test_forgot_password_lost_save_keeps_generic_outcome() {
    let auth = manager_over(Arc::new(ConflictingStore(MemoryAccountStore::new())));
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();

    let known = auth
        .forgot_password("a@x.com")
        .await
        .expect("a lost save must not surface");
    let unknown = auth.forgot_password("nobody@x.com").await.unwrap();

    assert_eq!(known.message, FORGOT_PASSWORD_MESSAGE);
    assert_eq!(known.message, unknown.message);
    assert!(known.reset_token.is_none());
}

#[tokio::test]
async fn test_forgot_password_racing_login_keeps_generic_outcome() {
    let store = Arc::new(YieldingStore(MemoryAccountStore::new()));
    let auth = manager_over(store);
    auth.register(register_request("a@x.com", PASSWORD))
        .await
        .unwrap();

    let (login, forgot) = tokio::join!(
        auth.login(login_request("a@x.com", PASSWORD)),
        auth.forgot_password("a@x.com"),
    );

    let forgot = forgot.expect("forgot-password never reports a conflict");
    assert_eq!(forgot.message, FORGOT_PASSWORD_MESSAGE);
    match login {
        Ok(_) => assert!(forgot.reset_token.is_none()),
        Err(e) => {
            assert!(matches!(e, AuthError::Conflict));
            assert!(forgot.reset_token.is_some());
        }
    }
}
