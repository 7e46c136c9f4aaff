//! Encryption helpers for secrets the clinic engine keeps at rest.
//!
//! The only secret stored today is the Google OAuth refresh token of each
//! connected user. It is sealed with AES-256-GCM under a key taken from
//! `GOOGLE_TOKEN_ENCRYPTION_KEY`:
//!
//! ```rust
//! use crypto::TokenCipher;
//!
//! let cipher = TokenCipher::from_key_source("0123456789abcdef0123456789abcdef").unwrap();
//! let sealed = cipher.encrypt("1//refresh-token").unwrap();
//! assert_eq!(cipher.decrypt(&sealed).unwrap(), "1//refresh-token");
//! ```

pub mod error;
pub mod token_cipher;

pub use error::*;
pub use token_cipher::TokenCipher;
