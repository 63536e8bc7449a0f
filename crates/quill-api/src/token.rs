//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying `sub` (the user id) and `exp`. Signing and
//! verification go through `josekit`; only the expiry check is ours, so it
//! can be evaluated against an explicit clock in tests.

use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};
use josekit::{
  JoseError,
  jws::{
    JwsHeader,
    alg::hmac::{HmacJwsAlgorithm, HmacJwsSigner, HmacJwsVerifier},
  },
  jwt::{self, JwtPayload},
};
use thiserror::Error;
use uuid::Uuid;

/// HS256 keys shorter than the digest are refused by the signer.
pub const MIN_KEY_BYTES: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
  #[error("token signing key must be at least {MIN_KEY_BYTES} bytes")]
  WeakKey,
  #[error("malformed token")]
  Malformed,
  #[error("bad token signature")]
  BadSignature,
  #[error("token expired")]
  Expired,
}

impl From<JoseError> for TokenError {
  fn from(e: JoseError) -> Self {
    match e {
      JoseError::InvalidSignature(_) => TokenError::BadSignature,
      _ => TokenError::Malformed,
    }
  }
}

/// A freshly minted token and its lifetime.
#[derive(Debug, Clone)]
pub struct IssuedToken {
  pub token:      String,
  pub expires_in: i64,
  pub expires_at: DateTime<Utc>,
}

/// Issues and verifies bearer tokens with one server-wide secret.
pub struct TokenIssuer {
  signer:   HmacJwsSigner,
  verifier: HmacJwsVerifier,
  ttl:      Duration,
}

impl TokenIssuer {
  pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Result<Self, TokenError> {
    let secret = secret.as_ref();
    if secret.len() < MIN_KEY_BYTES {
      return Err(TokenError::WeakKey);
    }
    let signer = HmacJwsAlgorithm::Hs256
      .signer_from_bytes(secret)
      .map_err(|_| TokenError::WeakKey)?;
    let verifier = HmacJwsAlgorithm::Hs256
      .verifier_from_bytes(secret)
      .map_err(|_| TokenError::WeakKey)?;
    Ok(Self { signer, verifier, ttl })
  }

  pub fn issue(&self, user_id: Uuid) -> Result<IssuedToken, TokenError> {
    self.issue_at(user_id, Utc::now())
  }

  pub fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
    let expires_at = now + self.ttl;

    let mut payload = JwtPayload::new();
    payload.set_subject(user_id.to_string());
    payload.set_issued_at(&SystemTime::from(now));
    payload.set_expires_at(&SystemTime::from(expires_at));

    let mut header = JwsHeader::new();
    header.set_token_type("JWT");

    let token = jwt::encode_with_signer(&payload, &header, &self.signer)?;
    Ok(IssuedToken { token, expires_in: self.ttl.num_seconds(), expires_at })
  }

  /// Return the user id the token was issued to, if it is authentic and not
  /// yet expired.
  pub fn verify(&self, token: &str) -> Result<Uuid, TokenError> {
    self.verify_at(token, Utc::now())
  }

  pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, TokenError> {
    let (payload, _header) = jwt::decode_with_verifier(token, &self.verifier)?;

    let expires_at: DateTime<Utc> = payload.expires_at().ok_or(TokenError::Malformed)?.into();
    if expires_at <= now {
      return Err(TokenError::Expired);
    }

    payload
      .subject()
      .and_then(|s| Uuid::parse_str(s).ok())
      .ok_or(TokenError::Malformed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &str = "test-secret-test-secret-test-secret";

  fn issuer() -> TokenIssuer { TokenIssuer::new(SECRET, Duration::minutes(30)).unwrap() }

  #[test]
  fn issued_token_verifies() {
    let id = Uuid::new_v4();
    let t = issuer().issue(id).unwrap();
    assert_eq!(t.expires_in, 30 * 60);
    assert_eq!(issuer().verify(&t.token), Ok(id));
  }

  #[test]
  fn issued_token_is_a_three_part_jwt() {
    let t = issuer().issue(Uuid::new_v4()).unwrap();
    assert_eq!(t.token.split('.').count(), 3);
  }

  #[test]
  fn expired_token_is_rejected() {
    let now = Utc::now();
    let t = issuer().issue_at(Uuid::new_v4(), now - Duration::minutes(31)).unwrap();
    assert_eq!(issuer().verify_at(&t.token, now), Err(TokenError::Expired));
  }

  #[test]
  fn token_from_another_key_is_rejected() {
    let other =
      TokenIssuer::new("another-secret-another-secret-another", Duration::minutes(30)).unwrap();
    let t = other.issue(Uuid::new_v4()).unwrap();
    assert_eq!(issuer().verify(&t.token), Err(TokenError::BadSignature));
  }

  #[test]
  fn tampered_claims_are_rejected() {
    let ours = issuer().issue(Uuid::new_v4()).unwrap();
    let other =
      TokenIssuer::new("another-secret-another-secret-another", Duration::minutes(30)).unwrap();
    let theirs = other.issue(Uuid::new_v4()).unwrap();

    // Someone else's claims under our signature.
    let parts: Vec<&str> = ours.token.split('.').collect();
    let foreign_claims = theirs.token.split('.').nth(1).unwrap();
    let forged = format!("{}.{}.{}", parts[0], foreign_claims, parts[2]);
    assert_eq!(issuer().verify(&forged), Err(TokenError::BadSignature));
  }

  #[test]
  fn garbage_is_malformed() {
    assert_eq!(issuer().verify("not-a-token"), Err(TokenError::Malformed));
    assert_eq!(issuer().verify("abc.!!!"), Err(TokenError::Malformed));
  }

  #[test]
  fn short_key_is_refused() {
    assert!(matches!(
      TokenIssuer::new("", Duration::minutes(1)),
      Err(TokenError::WeakKey)
    ));
    assert!(matches!(
      TokenIssuer::new("too-short", Duration::minutes(1)),
      Err(TokenError::WeakKey)
    ));
  }
}
