//! WebAuthn ceremony types and the platform-authenticator port.
//!
//! The option records mirror the backend's JSON wire shapes (camelCase,
//! base64url binary fields) so begin-responses deserialize straight into
//! ceremony inputs and credentials serialize straight into finish-requests.
//! The platform authenticator itself sits behind [`AuthenticatorPort`] so
//! tests and non-browser embeddings can supply their own ceremonies.

pub mod prf;

use async_trait::async_trait;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::api::types::Base64UrlBytes;

/// Options for a "create" (registration) ceremony.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCreationOptions {
    pub public_key: PublicKeyCredentialCreationOptions,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialCreationOptions {
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub challenge: Base64UrlBytes,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_credentials: Vec<CredentialDescriptor>,
    #[serde(default, skip_serializing_if = "ExtensionInputs::is_empty")]
    pub extensions: ExtensionInputs,
}

/// Options for a "get" (assertion) ceremony.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRequestOptions {
    pub public_key: PublicKeyCredentialRequestOptions,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptions {
    pub challenge: Base64UrlBytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_credentials: Vec<CredentialDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>,
    #[serde(default, skip_serializing_if = "ExtensionInputs::is_empty")]
    pub extensions: ExtensionInputs,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelyingParty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    pub id: Base64UrlBytes,
    pub name: String,
    pub display_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub ty: String,
    pub alg: i32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_resident_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub ty: String,
    pub id: Base64UrlBytes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

impl CredentialDescriptor {
    /// Descriptor for one public-key credential by raw id.
    #[must_use]
    pub fn public_key(id: Base64UrlBytes) -> Self {
        Self {
            ty: "public-key".to_string(),
            id,
            transports: Vec::new(),
        }
    }
}

/// Client extension inputs requested from a ceremony.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prf: Option<PrfInputs>,
}

impl ExtensionInputs {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prf.is_none()
    }
}

/// PRF evaluation request: one salt for the created credential, or a salt per
/// candidate credential id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrfInputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval: Option<PrfValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_by_credential: Option<BTreeMap<String, PrfValues>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrfValues {
    pub first: Base64UrlBytes,
}

/// Client extension outputs reported by a ceremony.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionOutputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prf: Option<PrfExtensionOutput>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrfExtensionOutput {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<PrfValues>,
}

/// Credential handle returned by a ceremony. Lives for the duration of one
/// authentication attempt; never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorCredential {
    /// Base64url form of the raw credential id.
    pub id: String,
    pub raw_id: Base64UrlBytes,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    pub response: AuthenticatorResponse,
    #[serde(default)]
    pub client_extension_results: ExtensionOutputs,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthenticatorResponse {
    Attestation(AttestationResponse),
    Assertion(AssertionResponse),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    pub attestation_object: Base64UrlBytes,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlBytes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResponse {
    pub authenticator_data: Base64UrlBytes,
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: Base64UrlBytes,
    pub signature: Base64UrlBytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<Base64UrlBytes>,
}

impl AuthenticatorCredential {
    /// PRF bytes from the ceremony's extension results, when the platform
    /// evaluated the extension synchronously.
    #[must_use]
    pub fn prf_result(&self) -> Option<&Base64UrlBytes> {
        self.client_extension_results
            .prf
            .as_ref()
            .and_then(|prf| prf.results.as_ref())
            .map(|values| &values.first)
    }

    /// Whether the extension reported PRF support without an immediate result.
    #[must_use]
    pub fn prf_enabled(&self) -> bool {
        self.client_extension_results
            .prf
            .as_ref()
            .is_some_and(|prf| prf.enabled)
    }

    /// Whether this credential carries an assertion response (and therefore a
    /// signature).
    #[must_use]
    pub fn is_assertion(&self) -> bool {
        matches!(self.response, AuthenticatorResponse::Assertion(_))
    }
}

/// How an authenticator ceremony failed.
#[derive(Debug, Error)]
pub enum CeremonyError {
    #[error("operation timed out or was cancelled")]
    Cancelled,
    #[error("no matching credential available")]
    NoCredential,
    #[error("this authenticator is already registered")]
    AlreadyRegistered,
    #[error("authenticator error: {0}")]
    Platform(String),
}

/// Platform authenticator capability. A rejection by the user or platform is
/// an ordinary [`CeremonyError`], not a separate cancellation channel.
#[async_trait]
pub trait AuthenticatorPort: Send + Sync {
    /// Run a "create" (registration) ceremony.
    ///
    /// # Errors
    /// Returns an error if the platform rejects the ceremony or the user
    /// cancels it.
    async fn create(
        &self,
        options: CredentialCreationOptions,
    ) -> Result<AuthenticatorCredential, CeremonyError>;

    /// Run a "get" (assertion) ceremony.
    ///
    /// # Errors
    /// Returns an error if the platform rejects the ceremony, the user
    /// cancels it, or no matching credential exists.
    async fn get(
        &self,
        options: CredentialRequestOptions,
    ) -> Result<AuthenticatorCredential, CeremonyError>;
}

/// Entropy port for PRF salts and ceremony challenges.
pub trait RandomBytes: Send + Sync {
    fn fill(&self, buf: &mut [u8]);

    #[must_use]
    fn bytes(&self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.fill(&mut buf);
        buf
    }
}

/// OS entropy via `rand`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRandom;

impl RandomBytes for SystemRandom {
    fn fill(&self, buf: &mut [u8]) {
        rand::rngs::OsRng.fill_bytes(buf);
    }
}
