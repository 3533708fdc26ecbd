//! JWT token generation and verification.
//!
//! Access and refresh tokens are signed with separate asymmetric key pairs,
//! so a token of one kind never verifies as the other.

use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::AuthError;
use super::config::{AuthConfig, KeyPair};
use crate::models::auth::TokenClaims;

/// Kind of token, carried in the `token_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Issues and verifies signed tokens. Keys are parsed once at construction.
pub struct TokenCodec {
    algorithm: Algorithm,
    access: SigningKeys,
    refresh: SigningKeys,
    access_lifetime: i64,
    refresh_lifetime: i64,
}

impl TokenCodec {
    /// Parse the configured key material. Symmetric algorithms are rejected.
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;
        Ok(Self {
            algorithm: config.algorithm,
            access: signing_keys(config.algorithm, &config.access_keys, TokenKind::Access)?,
            refresh: signing_keys(config.algorithm, &config.refresh_keys, TokenKind::Refresh)?,
            access_lifetime: config.access_token_expires_secs,
            refresh_lifetime: config.refresh_token_expires_secs().ok_or_else(|| {
                AuthError::Config("refresh token lifetime overflows".into())
            })?,
        })
    }

    /// Lifetime in seconds of a token of the given kind.
    pub fn lifetime(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_lifetime,
            TokenKind::Refresh => self.refresh_lifetime,
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Sign a token for `subject` with `iat = now` and `exp = now + lifetime(kind)`.
    pub fn issue(&self, subject: &str, kind: TokenKind, now: i64) -> Result<String, AuthError> {
        let exp = now
            .checked_add(self.lifetime(kind))
            .ok_or_else(|| AuthError::Internal(format!("{kind} token expiry overflows")))?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now,
            exp,
            token_type: kind,
            jti: Uuid::new_v4().simple().to_string(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.keys(kind).encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify signature, algorithm, token kind and expiry at `now`.
    ///
    /// A token is valid while `now < exp`.
    pub fn decode(&self, token: &str, kind: TokenKind, now: i64) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        // Expiry is checked below against the injected clock, without leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<TokenClaims>(token, &self.keys(kind).decoding, &validation)
            .map_err(|e| {
                debug!(token_type = %kind, error = %e, "token rejected");
                AuthError::InvalidToken(e.to_string())
            })?
            .claims;

        if claims.token_type != kind {
            return Err(AuthError::InvalidToken(format!(
                "expected {kind} token, got {}",
                claims.token_type
            )));
        }
        if now >= claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }
}

fn signing_keys(
    algorithm: Algorithm,
    pair: &KeyPair,
    kind: TokenKind,
) -> Result<SigningKeys, AuthError> {
    let private = pair.private_pem.as_bytes();
    let public = pair.public_pem.as_bytes();
    let bad_key = |e: jsonwebtoken::errors::Error| AuthError::Config(format!("{kind} key: {e}"));

    let (encoding, decoding) = match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => (
            EncodingKey::from_rsa_pem(private).map_err(bad_key)?,
            DecodingKey::from_rsa_pem(public).map_err(bad_key)?,
        ),
        Algorithm::ES256 | Algorithm::ES384 => (
            EncodingKey::from_ec_pem(private).map_err(bad_key)?,
            DecodingKey::from_ec_pem(public).map_err(bad_key)?,
        ),
        Algorithm::EdDSA => (
            EncodingKey::from_ed_pem(private).map_err(bad_key)?,
            DecodingKey::from_ed_pem(public).map_err(bad_key)?,
        ),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            return Err(AuthError::Config(format!(
                "{algorithm:?} is symmetric; an asymmetric key pair is required"
            )));
        }
    };
    Ok(SigningKeys { encoding, decoding })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    const T0: i64 = 1_700_000_000;

    #[test]
    fn issue_then_decode_round_trips_claims() {
        let codec = codec();
        for kind in [TokenKind::Access, TokenKind::Refresh] {
            let token = codec.issue("etoo", kind, T0).unwrap();
            let claims = codec.decode(&token, kind, T0).unwrap();
            assert_eq!(claims.sub, "etoo");
            assert_eq!(claims.iat, T0);
            assert_eq!(claims.exp, T0 + codec.lifetime(kind));
            assert_eq!(claims.token_type, kind);
        }
    }

    #[test]
    fn lifetimes_follow_config() {
        let codec = codec();
        assert_eq!(codec.lifetime(TokenKind::Access), 15 * 60);
        assert_eq!(codec.lifetime(TokenKind::Refresh), 30 * 86_400);
    }

    #[test]
    fn token_is_valid_until_one_second_before_exp() {
        let codec = codec();
        let token = codec.issue("etoo", TokenKind::Access, T0).unwrap();
        let exp = T0 + codec.lifetime(TokenKind::Access);

        assert!(codec.decode(&token, TokenKind::Access, exp - 1).is_ok());
        assert!(matches!(
            codec.decode(&token, TokenKind::Access, exp),
            Err(AuthError::TokenExpired)
        ));
        assert!(matches!(
            codec.decode(&token, TokenKind::Access, exp + 3600),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn tokens_issued_in_the_same_second_differ() {
        let codec = codec();
        let a = codec.issue("etoo", TokenKind::Refresh, T0).unwrap();
        let b = codec.issue("etoo", TokenKind::Refresh, T0).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn refresh_token_does_not_verify_as_access() {
        let codec = codec();
        let refresh = codec.issue("etoo", TokenKind::Refresh, T0).unwrap();
        let err = codec.decode(&refresh, TokenKind::Access, T0).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));

        let access = codec.issue("etoo", TokenKind::Access, T0).unwrap();
        let err = codec.decode(&access, TokenKind::Refresh, T0).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn kind_mismatch_is_caught_even_with_shared_keys() {
        let mut config = config();
        config.refresh_keys = config.access_keys.clone();
        let codec = TokenCodec::new(&config).unwrap();

        let refresh = codec.issue("etoo", TokenKind::Refresh, T0).unwrap();
        let err = codec.decode(&refresh, TokenKind::Access, T0).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let forged = rogue_codec().issue("etoo", TokenKind::Refresh, T0).unwrap();
        let err = codec().decode(&forged, TokenKind::Refresh, T0).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn malformed_token_is_invalid() {
        let codec = codec();
        for junk in ["", "not-a-jwt", "a.b.c"] {
            let err = codec.decode(junk, TokenKind::Access, T0).unwrap_err();
            assert!(matches!(err, AuthError::InvalidToken(_)), "{junk:?}");
        }
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let codec = codec();
        let token = codec.issue("etoo", TokenKind::Access, T0).unwrap();
        let other = codec.issue("mallory", TokenKind::Access, T0).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        let err = codec.decode(&spliced, TokenKind::Access, T0).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn unknown_token_type_claim_is_invalid_not_a_panic() {
        let key = EncodingKey::from_ed_pem(ACCESS_PRIVATE.as_bytes()).unwrap();
        let claims = serde_json::json!({
            "sub": "etoo",
            "iat": T0,
            "exp": T0 + 60,
            "token_type": "FakeTokenType",
            "jti": "x",
        });
        let token = encode(&Header::new(Algorithm::EdDSA), &claims, &key).unwrap();
        let err = codec().decode(&token, TokenKind::Access, T0).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn expiry_past_the_end_of_time_is_an_error() {
        let err = codec()
            .issue("etoo", TokenKind::Refresh, i64::MAX - 60)
            .unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }

    #[test]
    fn oversized_refresh_lifetime_is_a_config_error() {
        let mut config = config();
        config.refresh_token_expires_days = i64::MAX / 86_400 + 1;
        assert!(matches!(TokenCodec::new(&config), Err(AuthError::Config(_))));
    }

    #[test]
    fn symmetric_algorithm_is_rejected() {
        let mut config = config();
        config.algorithm = Algorithm::HS256;
        assert!(matches!(TokenCodec::new(&config), Err(AuthError::Config(_))));
    }

    #[test]
    fn key_family_mismatch_is_rejected() {
        let mut config = config();
        config.algorithm = Algorithm::RS256;
        assert!(matches!(TokenCodec::new(&config), Err(AuthError::Config(_))));
    }
}
