//! Signed access and refresh tokens.
//!
//! Tokens are HS256 JWTs. Validation pins the algorithm, so a token whose
//! header names anything else (HS512, RS256, `none`) is refused before the
//! claims are trusted. Expiry and not-before are checked with zero leeway.
//!
//! Only SHA-256 digests of issued tokens are persisted, see [`token_digest`].

use super::{
    config::AuthConfigError,
    errors::{AuthError, AuthResult},
    models::{AccountId, TokenClaims, TokenKind, TokenPair},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::{Error as JwtError, ErrorKind},
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Issues and validates token pairs with one shared secret
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl TokenIssuer {
    /// Create a new issuer
    ///
    /// # Arguments
    ///
    /// * `secret` - HMAC signing secret
    /// * `access_token_duration` - Access token lifetime
    /// * `refresh_token_duration` - Refresh token lifetime
    pub fn new(
        secret: &str,
        access_token_duration: Duration,
        refresh_token_duration: Duration,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_duration,
            refresh_token_duration,
        }
    }

    /// Issue a fresh access + refresh pair for an account
    pub fn issue_pair(&self, account_id: AccountId, email: &str) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue(
                account_id,
                email,
                TokenKind::Access,
                self.access_token_duration,
            )?,
            refresh_token: self.issue(
                account_id,
                email,
                TokenKind::Refresh,
                self.refresh_token_duration,
            )?,
        })
    }

    fn issue(
        &self,
        account_id: AccountId,
        email: &str,
        kind: TokenKind,
        lifetime: Duration,
    ) -> AuthResult<String> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or(AuthConfigError::ExpiryOverflow)?;
        let claims = TokenClaims {
            sub: account_id,
            email: email.to_string(),
            typ: kind,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|_| AuthError::TokenMalformed)
    }

    /// Verify signature, algorithm, `exp` and `nbf`, and return the claims
    ///
    /// # Errors
    ///
    /// * `AuthError::TokenExpired` - `exp` has passed
    /// * `AuthError::TokenNotYetValid` - `nbf` is in the future
    /// * `AuthError::TokenSignatureInvalid` - wrong secret or foreign algorithm
    /// * `AuthError::TokenMalformed` - anything that does not decode
    pub fn validate(&self, token: &str) -> AuthResult<TokenClaims> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf"]);

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }

    /// Validate and additionally require the token to be of `kind`
    pub fn validate_kind(&self, token: &str, kind: TokenKind) -> AuthResult<TokenClaims> {
        let claims = self.validate(token)?;
        if claims.typ != kind {
            return Err(match kind {
                TokenKind::Access => AuthError::InvalidToken,
                TokenKind::Refresh => AuthError::InvalidRefreshToken,
            });
        }
        Ok(claims)
    }
}

fn map_jwt_error(err: JwtError) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            AuthError::TokenSignatureInvalid
        }
        _ => AuthError::TokenMalformed,
    }
}

/// SHA-256 hex digest of a token, the form tokens are stored in
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_for_jwt";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, Duration::minutes(15), Duration::days(7))
    }

    fn sign(claims: &TokenClaims, alg: Algorithm, secret: &str) -> String {
        encode(
            &Header::new(alg),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims_with_window(nbf_offset: i64, exp_offset: i64) -> TokenClaims {
        let now = Utc::now().timestamp();
        TokenClaims {
            sub: 7,
            email: "a@x.com".to_string(),
            typ: TokenKind::Access,
            jti: "fixed".to_string(),
            iat: now,
            nbf: now + nbf_offset,
            exp: now + exp_offset,
        }
    }

    #[test]
    fn test_issue_then_validate_round_trip() {
        let issuer = issuer();
        let pair = issuer.issue_pair(42, "a@x.com").unwrap();

        let access = issuer.validate(&pair.access_token).unwrap();
        assert_eq!(access.sub, 42);
        assert_eq!(access.email, "a@x.com");
        assert_eq!(access.typ, TokenKind::Access);

        let refresh = issuer.validate(&pair.refresh_token).unwrap();
        assert_eq!(refresh.sub, 42);
        assert_eq!(refresh.typ, TokenKind::Refresh);
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn test_expiry_windows_follow_configuration() {
        let issuer = TokenIssuer::new(SECRET, Duration::minutes(5), Duration::days(30));
        let pair = issuer.issue_pair(1, "a@x.com").unwrap();
        let access = issuer.validate(&pair.access_token).unwrap();
        let refresh = issuer.validate(&pair.refresh_token).unwrap();
        assert_eq!(access.exp - access.iat, 5 * 60);
        assert_eq!(refresh.exp - refresh.iat, 30 * 24 * 60 * 60);
    }

    #[test]
    fn test_pairs_issued_back_to_back_differ() {
        let issuer = issuer();
        let first = issuer.issue_pair(1, "a@x.com").unwrap();
        let second = issuer.issue_pair(1, "a@x.com").unwrap();
        assert_ne!(first.access_token, second.access_token);
        assert_ne!(first.refresh_token, second.refresh_token);
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = sign(&claims_with_window(-7200, -3600), ALGORITHM, SECRET);
        assert!(matches!(
            issuer().validate(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_not_yet_valid_token_rejected() {
        let token = sign(&claims_with_window(3600, 7200), ALGORITHM, SECRET);
        assert!(matches!(
            issuer().validate(&token),
            Err(AuthError::TokenNotYetValid)
        ));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let other = TokenIssuer::new("another_secret", Duration::minutes(15), Duration::days(7));
        let pair = other.issue_pair(1, "a@x.com").unwrap();
        assert!(matches!(
            issuer().validate(&pair.access_token),
            Err(AuthError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn test_foreign_algorithm_rejected() {
        let token = sign(&claims_with_window(0, 600), Algorithm::HS512, SECRET);
        assert!(matches!(
            issuer().validate(&token),
            Err(AuthError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn test_unsigned_token_rejected() {
        // {"alg":"none","typ":"JWT"} . claims for account 1 . empty signature
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
            eyJzdWIiOjEsImVtYWlsIjoiYUB4LmNvbSIsInR5cCI6ImFjY2VzcyIsImp0aSI6ImZvcmdlZCIsImlhdCI6MCwibmJmIjowLCJleHAiOjQxMDI0NDQ4MDB9.";
        let result = issuer().validate(token);
        assert!(matches!(
            result,
            Err(AuthError::TokenMalformed | AuthError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let issuer = issuer();
        let pair = issuer.issue_pair(1, "a@x.com").unwrap();
        let forged_claims = sign(&claims_with_window(0, 600), ALGORITHM, "x");
        let mut parts: Vec<&str> = pair.access_token.split('.').collect();
        let forged: Vec<&str> = forged_claims.split('.').collect();
        parts[1] = forged[1];
        let tampered = parts.join(".");
        assert!(matches!(
            issuer.validate(&tampered),
            Err(AuthError::TokenSignatureInvalid)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            issuer().validate("not-a-token"),
            Err(AuthError::TokenMalformed)
        ));
        assert!(matches!(
            issuer().validate(""),
            Err(AuthError::TokenMalformed)
        ));
    }

    #[test]
    fn test_kind_is_enforced() {
        let issuer = issuer();
        let pair = issuer.issue_pair(1, "a@x.com").unwrap();
        assert!(matches!(
            issuer.validate_kind(&pair.refresh_token, TokenKind::Access),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            issuer.validate_kind(&pair.access_token, TokenKind::Refresh),
            Err(AuthError::InvalidRefreshToken)
        ));
        assert!(
            issuer
                .validate_kind(&pair.access_token, TokenKind::Access)
                .is_ok()
        );
    }

    #[test]
    fn test_overflowing_lifetime_is_an_error() {
        let issuer = TokenIssuer::new(SECRET, Duration::minutes(15), Duration::days(1_000_000_000));
        assert!(matches!(
            issuer.issue_pair(1, "a@x.com"),
            Err(AuthError::Config(AuthConfigError::ExpiryOverflow))
        ));
    }

    #[test]
    fn test_digest_is_stable_hex() {
        let digest = token_digest("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(token_digest("abd"), digest);
    }
}
