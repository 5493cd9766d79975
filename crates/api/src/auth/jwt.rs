//! RS256 access-token signing/validation and refresh-token helpers.
//!
//! Access tokens are asymmetric JWTs: any holder of the public key can
//! verify them without calling back into this service. Refresh tokens are
//! opaque random strings; only their SHA-256 hash is stored server-side so a
//! database leak does not compromise active sessions.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use huddle_core::error::AuthError;
use huddle_core::types::{DbId, Timestamp};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::JwtConfig;

/// Number of random bytes in an opaque refresh token (256 bits).
const REFRESH_TOKEN_BYTES: usize = 32;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the user's internal database id, as a decimal string.
    pub sub: String,
    /// Issuer, matched against the configured value on validation.
    pub iss: String,
    /// Audience, matched against the configured value on validation.
    pub aud: String,
    /// Issued-at (UTC Unix timestamp).
    pub iat: i64,
    /// Not-before: issuance minus the clock skew (UTC Unix timestamp).
    pub nbf: i64,
    /// Expiration (UTC Unix timestamp).
    pub exp: i64,
}

/// Signs and validates access tokens with a fixed RS256 key pair.
///
/// Keys are parsed once at construction and immutable afterwards.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    clock_skew: Duration,
}

impl TokenSigner {
    /// Build a signer from PEM key material in the configuration.
    pub fn from_config(config: &JwtConfig) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(Self {
            encoding_key: EncodingKey::from_rsa_pem(config.private_key_pem.as_bytes())?,
            decoding_key: DecodingKey::from_rsa_pem(config.public_key_pem.as_bytes())?,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            access_ttl: Duration::seconds(config.access_ttl_secs),
            clock_skew: Duration::seconds(config.clock_skew_secs),
        })
    }

    /// Access-token lifetime in seconds, reported to clients as `expires_in`.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Sign an access token for the given user, issued now.
    pub fn sign_access_token(&self, user_id: DbId) -> Result<String, jsonwebtoken::errors::Error> {
        self.sign_access_token_at(user_id, Utc::now())
    }

    /// Sign an access token with an explicit issuance instant.
    ///
    /// `nbf` is backdated by the clock skew so a token minted here is
    /// immediately valid on a peer whose clock runs slightly behind.
    pub fn sign_access_token_at(
        &self,
        user_id: DbId,
        now: Timestamp,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            nbf: (now - self.clock_skew).timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
    }

    /// Validate a token and return its claims.
    ///
    /// Checks, in order: signature with the configured public key, the
    /// algorithm itself (substitution is rejected), issuer, audience, and
    /// the `[nbf - skew, exp + skew]` time window.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_nbf = true;
        validation.leeway = self.clock_skew.num_seconds().max(0) as u64;

        let data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(classify_jwt_error)?;
        Ok(data.claims)
    }

    /// Validate a token and parse its subject into a user id.
    pub fn user_id_from_token(&self, token: &str) -> Result<DbId, AuthError> {
        let claims = self.validate(token)?;
        claims.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Map jsonwebtoken failures onto the domain auth kinds.
fn classify_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => AuthError::TokenExpired,
        ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
        ErrorKind::InvalidAudience => AuthError::InvalidAudience,
        _ => AuthError::InvalidToken,
    }
}

/// Generate a cryptographically random refresh token.
///
/// Returns `(plaintext, sha256_hex_hash)`. The plaintext leaves the process
/// exactly once, to the client; only the hash is persisted.
pub fn generate_refresh_token() -> (String, String) {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let plaintext = URL_SAFE_NO_PAD.encode(bytes);
    let hash = hash_refresh_token(&plaintext);
    (plaintext, hash)
}

/// Compute the SHA-256 hex digest of a refresh token.
///
/// Use this to compare an incoming refresh token against the stored hash.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
