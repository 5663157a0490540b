//! Contract with the local encrypted keystore.
//!
//! The keystore owns the encrypted private-data blob; this crate only drives
//! its unlock/init operations. The client reads two things out of the parsed
//! blob, the password key parameters and the registered PRF key entries, and
//! preserves everything else opaquely so the blob round-trips unchanged
//! through signup requests.

use secrecy::{SecretSlice, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::api::types::Base64UrlBytes;

/// PRF extension output consumed as key material. Zeroized on drop; each
/// value is passed into exactly one keystore call and not retained.
pub type PrfOutput = SecretSlice<u8>;

/// Key-derivation info for one registered passkey credential. Created at
/// passkey-signup time, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrfKeyInfo {
    pub credential_id: Base64UrlBytes,
    pub prf_salt: Base64UrlBytes,
}

/// Password-derived key parameters. Owned by the keystore; the client passes
/// them back into [`KeystoreService::unlock_password`] untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordKeyInfo(pub Value);

/// Public key material issued by the keystore at init time and registered
/// with the backend. Opaque to this crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicData(pub Value);

/// Parsed form of the encrypted private-data blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_key: Option<PasswordKeyInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prf_keys: Vec<PrfKeyInfo>,
    /// Keystore-owned ciphertext and key-wrapping data, preserved as-is.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl PrivateData {
    /// Parse the tagged-binary JSON string carried in backend responses.
    ///
    /// # Errors
    /// Returns an error if the blob is not valid JSON of the expected shape.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Serialize back to the wire form sent in registration requests.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_tagged_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The PRF key entry for a credential, looked up by the credential's
    /// base64url id.
    #[must_use]
    pub fn prf_key_for(&self, credential_id: &str) -> Option<&PrfKeyInfo> {
        self.prf_keys
            .iter()
            .find(|key_info| key_info.credential_id.encode() == credential_id)
    }
}

/// Fresh key material produced by a keystore init operation.
#[derive(Clone, Debug)]
pub struct KeystoreInit {
    pub public_data: PublicData,
    pub private_data: PrivateData,
}

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("failed to decrypt private data")]
    Decrypt,
    #[error("failed to initialize key material")]
    Init,
    #[error("keystore error: {0}")]
    Other(String),
}

/// Local encrypted keystore operations driven by the authentication flows.
///
/// `unlock_*` decrypts an existing blob in place inside the keystore;
/// `init_*` produces fresh `{public_data, private_data}` material for a new
/// account. Secret inputs are consumed by the call and must not be retained
/// by implementations beyond it.
pub trait KeystoreService: Send + Sync {
    /// Unlock an existing blob with a password.
    ///
    /// # Errors
    /// Returns an error if the derived key does not decrypt the blob.
    fn unlock_password(
        &self,
        private_data: &PrivateData,
        password: &SecretString,
        key_info: &PasswordKeyInfo,
    ) -> Result<(), KeystoreError>;

    /// Produce fresh key material protected by a password.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    fn init_password(&self, password: &SecretString) -> Result<KeystoreInit, KeystoreError>;

    /// Unlock an existing blob with a PRF-derived key.
    ///
    /// # Errors
    /// Returns an error if the PRF output does not decrypt the blob.
    fn unlock_prf(
        &self,
        private_data: &PrivateData,
        prf_output: PrfOutput,
        key_info: &PrfKeyInfo,
    ) -> Result<(), KeystoreError>;

    /// Produce fresh key material protected by a PRF-derived key bound to the
    /// given credential and salt.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    fn init_prf(
        &self,
        credential_id: &Base64UrlBytes,
        prf_salt: &Base64UrlBytes,
        prf_output: PrfOutput,
    ) -> Result<KeystoreInit, KeystoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_data_preserves_unknown_fields() {
        let raw = r#"{
            "passwordKey": {"algorithm": "PBKDF2"},
            "prfKeys": [{"credentialId": "Y3JlZDE", "prfSalt": "c2FsdDE"}],
            "jwe": "opaque-ciphertext",
            "did": "did:key:z1"
        }"#;
        let private_data = PrivateData::parse(raw).expect("should parse");

        assert!(private_data.password_key.is_some());
        assert_eq!(private_data.prf_keys.len(), 1);
        assert_eq!(
            private_data.rest.get("jwe").and_then(Value::as_str),
            Some("opaque-ciphertext")
        );

        let reserialized = private_data.to_tagged_json().expect("should serialize");
        let reparsed = PrivateData::parse(&reserialized).expect("should reparse");
        assert_eq!(
            reparsed.rest.get("did").and_then(Value::as_str),
            Some("did:key:z1")
        );
    }

    #[test]
    fn prf_key_lookup_matches_by_base64url_id() {
        let private_data = PrivateData {
            password_key: None,
            prf_keys: vec![
                PrfKeyInfo {
                    credential_id: Base64UrlBytes::from(b"cred1".as_slice()),
                    prf_salt: Base64UrlBytes::from(b"salt1".as_slice()),
                },
                PrfKeyInfo {
                    credential_id: Base64UrlBytes::from(b"cred2".as_slice()),
                    prf_salt: Base64UrlBytes::from(b"salt2".as_slice()),
                },
            ],
            rest: Map::new(),
        };

        let wanted = Base64UrlBytes::from(b"cred2".as_slice()).encode();
        let found = private_data.prf_key_for(&wanted).expect("should match");
        assert_eq!(found.prf_salt.as_slice(), b"salt2");
        assert!(private_data.prf_key_for("bWlzc2luZw").is_none());
    }
}
