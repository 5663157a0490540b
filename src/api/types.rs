//! Typed request/response records for the wallet backend endpoints, plus the
//! tagged-binary byte representation used uniformly in JSON bodies. Each
//! endpoint gets its own record type; binary fields are [`Base64UrlBytes`]
//! everywhere so the transform is applied consistently in both directions.

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::keystore::PublicData;
use crate::session::SessionAttributes;
use crate::webauthn::{AuthenticatorCredential, CredentialCreationOptions, CredentialRequestOptions};

/// Binary field in a JSON body, carried as an unpadded base64url string.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Base64UrlBytes(pub Vec<u8>);

impl Base64UrlBytes {
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wire form of the bytes.
    #[must_use]
    pub fn encode(&self) -> String {
        Base64UrlUnpadded::encode_string(&self.0)
    }

    /// Parse the wire form.
    ///
    /// # Errors
    /// Returns an error if the input is not valid unpadded base64url.
    pub fn decode(raw: &str) -> Result<Self, base64ct::Error> {
        Base64UrlUnpadded::decode_vec(raw).map(Self)
    }
}

impl From<Vec<u8>> for Base64UrlBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Base64UrlBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for Base64UrlBytes {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "Base64UrlBytes({})", self.encode())
    }
}

impl Serialize for Base64UrlBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Base64UrlBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::decode(&raw).map_err(de::Error::custom)
    }
}

/// Backend record returned by login and registration endpoints: the session
/// attributes plus the user's encrypted private-data blob and public key
/// material.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    #[serde(flatten)]
    pub session: SessionAttributes,
    /// Tagged-binary JSON string holding the encrypted private-data blob.
    #[serde(default)]
    pub private_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_data: Option<PublicData>,
}

/// Body of `POST /user/login`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /user/register`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub fcm_token: Option<String>,
    pub browser_fcm_token: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub keys: PublicData,
    #[serde(rename = "privateData")]
    pub private_data: String,
}

/// Response of `POST /user/login-webauthn-begin`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBeginResponse {
    pub challenge_id: String,
    pub get_options: CredentialRequestOptions,
}

/// Body of `POST /user/login-webauthn-finish`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginFinishRequest {
    pub challenge_id: String,
    pub credential: AuthenticatorCredential,
}

/// Response of `POST /user/register-webauthn-begin`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBeginResponse {
    pub challenge_id: String,
    pub create_options: CredentialCreationOptions,
}

/// Body of `POST /user/register-webauthn-finish`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterFinishRequest {
    #[serde(rename = "challengeId")]
    pub challenge_id: String,
    pub fcm_token: Option<String>,
    pub browser_fcm_token: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub keys: PublicData,
    #[serde(rename = "privateData")]
    pub private_data: String,
    pub credential: AuthenticatorCredential,
}

/// Read-only verifier reference data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Verifier {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Response of `GET /verifiers/all`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifiersResponse {
    pub verifiers: Vec<Verifier>,
}

/// One stored presentation from `GET /storage/vp`. The record is kept loose;
/// only the id is interpreted by this crate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredPresentation {
    pub id: i64,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Response of `GET /storage/vp`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PresentationsResponse {
    #[serde(default)]
    pub vp_list: Vec<StoredPresentation>,
}

/// Body of `POST /presentation/initiate`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitiatePresentationRequest {
    pub verifier_id: i64,
    pub scope_name: String,
}

/// Response of `POST /presentation/initiate`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InitiatePresentationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}
