//! Google OAuth 2.0 support for the clinic engine
//!
//! This crate covers the client side of the authorization code flow used to
//! connect a clinician's Google Calendar:
//! - building the consent URL (offline access, forced consent)
//! - exchanging the authorization code for tokens
//! - refreshing access tokens
//! - signing and verifying the `state` parameter as a short-lived JWT
//!
//! # Example
//!
//! ```rust
//! use auth_oauth::{GoogleOAuthClient, GoogleOAuthConfig, StateCodec};
//! use uuid::Uuid;
//!
//! let config = GoogleOAuthConfig::new(
//!     "client-id",
//!     "client-secret",
//!     "http://localhost:4000/api/google/callback",
//! );
//! let client = GoogleOAuthClient::new(config).unwrap();
//! let codec = StateCodec::new("state-signing-secret");
//!
//! let state = codec.sign(Uuid::new_v4(), None).unwrap();
//! let url = client.authorize_url(&state);
//! assert!(url.contains("access_type=offline"));
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod state;

pub use client::GoogleOAuthClient;
pub use error::*;
pub use models::*;
pub use state::{StateClaims, StateCodec};
