//! # wallet-client
//!
//! `wallet-client` authenticates a user against a wallet backend and unlocks
//! the locally stored, encrypted keystore holding the user's credential key
//! material. Two independent methods are supported: password login, and
//! passwordless login with a platform authenticator ("passkey") whose
//! hardware-bound PRF extension output derives the keystore unlock key.
//!
//! ## Flows
//!
//! [`auth::AuthService`] drives four staged protocols against the backend:
//! password login, password signup, passkey login (begin → assert → finish →
//! unlock), and passkey signup (begin → create → PRF/init → finish). Each
//! stage maps its own failures to a stage-tagged error; retry is always the
//! caller's decision.
//!
//! ## Ports
//!
//! Platform capabilities are injectable so flows run without a browser or a
//! real authenticator: [`webauthn::AuthenticatorPort`] (ceremonies),
//! [`webauthn::RandomBytes`] (entropy), [`push::PushTokenPort`] (best-effort
//! push tokens), [`session::SessionStorage`] (persisted session attributes),
//! and [`keystore::KeystoreService`] (the encrypted keystore's unlock/init
//! contract).
//!
//! ## Security notes
//!
//! Passwords travel as [`secrecy::SecretString`] and PRF outputs as
//! [`keystore::PrfOutput`]; both are consumed by a single keystore call and
//! never logged. Authenticator credentials live for one attempt only and are
//! never persisted.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod keystore;
pub mod push;
pub mod session;
pub mod webauthn;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
