//! User accounts.
//!
//! The store only ever sees a password *hash*; hashing and verification live
//! with the HTTP layer, which owns the choice of algorithm.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Shortest password accepted at signup.
pub const MIN_PASSWORD_CHARS: usize = 6;

/// A registered account as stored. Not serialisable on purpose: the hash
/// must never reach a response body. Use [`UserProfile`] for that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
  pub user_id:       Uuid,
  pub email:         String,
  pub full_name:     Option<String>,
  /// PHC string, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
  pub is_active:     bool,
}

impl User {
  pub fn profile(&self) -> UserProfile {
    UserProfile {
      id:         self.user_id,
      email:      self.email.clone(),
      full_name:  self.full_name.clone(),
      created_at: self.created_at,
      is_active:  self.is_active,
    }
  }
}

/// The public view of a user returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub id:         Uuid,
  pub email:      String,
  pub full_name:  Option<String>,
  pub created_at: DateTime<Utc>,
  pub is_active:  bool,
}

/// Input to [`crate::store::UserStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  pub full_name:     Option<String>,
  pub password_hash: String,
}

/// Minimal shape check: one `@` with something on both sides and a dot in
/// the domain part.
pub fn validate_email(email: &str) -> Result<()> {
  let valid = match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
    }
    None => false,
  };
  if valid {
    Ok(())
  } else {
    Err(Error::Validation(format!("invalid email address: {email:?}")))
  }
}

pub fn validate_password(password: &str) -> Result<()> {
  if password.chars().count() < MIN_PASSWORD_CHARS {
    return Err(Error::Validation(format!(
      "password must be at least {MIN_PASSWORD_CHARS} characters"
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_shapes() {
    assert!(validate_email("alice@example.com").is_ok());
    assert!(validate_email("alice").is_err());
    assert!(validate_email("@example.com").is_err());
    assert!(validate_email("alice@localhost").is_err());
    assert!(validate_email("a b@example.com").is_err());
    assert!(validate_email("a@b@example.com").is_err());
  }

  #[test]
  fn password_minimum_length() {
    assert!(validate_password("12345").is_err());
    assert!(validate_password("123456").is_ok());
  }
}
