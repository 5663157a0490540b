//! PRF key recovery, tolerating authenticators that defer extension
//! evaluation.
//!
//! Some platforms return the PRF result with the original ceremony; others
//! only report the extension as enabled and require a second, credential-
//! scoped "get" ceremony before they evaluate it. The resolver hides that
//! difference: callers hand it the credential from the original ceremony and
//! get back PRF bytes paired with the credential that produced them.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::api::types::Base64UrlBytes;
use crate::keystore::PrfOutput;
use crate::webauthn::{
    AuthenticatorCredential, AuthenticatorPort, CeremonyError, CredentialDescriptor,
    CredentialRequestOptions, ExtensionInputs, PrfInputs, PrfValues,
    PublicKeyCredentialRequestOptions, RandomBytes,
};

/// Challenge length for the extension-only second ceremony.
const PRF_CHALLENGE_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum PrfError {
    /// The authenticator cannot evaluate the PRF extension. Fatal for the
    /// current attempt; callers should fall back to the password flow.
    #[error("prf_not_supported")]
    NotSupported,
    /// The second ceremony itself failed.
    #[error(transparent)]
    Ceremony(#[from] CeremonyError),
}

/// What to evaluate: one salt for a just-created credential, or a salt per
/// registered credential id when the matching credential is not known in
/// advance.
#[derive(Clone, Debug)]
pub enum PrfEvalRequest {
    Single(Base64UrlBytes),
    ByCredential(BTreeMap<String, Base64UrlBytes>),
}

impl PrfEvalRequest {
    fn into_inputs(self) -> PrfInputs {
        match self {
            PrfEvalRequest::Single(salt) => PrfInputs {
                eval: Some(PrfValues { first: salt }),
                eval_by_credential: None,
            },
            PrfEvalRequest::ByCredential(salts) => PrfInputs {
                eval: None,
                eval_by_credential: Some(
                    salts
                        .into_iter()
                        .map(|(credential_id, salt)| (credential_id, PrfValues { first: salt }))
                        .collect(),
                ),
            },
        }
    }
}

/// Resolves PRF extension output for a credential obtained from a ceremony.
pub struct PrfKeyResolver<'a> {
    authenticator: &'a dyn AuthenticatorPort,
    random: &'a dyn RandomBytes,
}

impl<'a> PrfKeyResolver<'a> {
    #[must_use]
    pub fn new(authenticator: &'a dyn AuthenticatorPort, random: &'a dyn RandomBytes) -> Self {
        Self {
            authenticator,
            random,
        }
    }

    /// Obtain PRF bytes for `credential`, re-asserting once if the platform
    /// deferred extension evaluation.
    ///
    /// Returns the PRF output together with the credential that produced it
    /// (the original one, or the one from the second ceremony).
    ///
    /// # Errors
    /// Returns [`PrfError::NotSupported`] when no PRF result can be produced,
    /// or the underlying [`CeremonyError`] if the second ceremony fails.
    pub async fn resolve(
        &self,
        credential: AuthenticatorCredential,
        rp_id: Option<&str>,
        eval: PrfEvalRequest,
    ) -> Result<(PrfOutput, AuthenticatorCredential), PrfError> {
        if let Some(result) = credential.prf_result() {
            let output = PrfOutput::from(result.as_slice().to_vec());
            return Ok((output, credential));
        }

        // An assertion response means the ceremony variant defers extension
        // evaluation even without an explicit `enabled` report.
        if !credential.prf_enabled() && !credential.is_assertion() {
            return Err(PrfError::NotSupported);
        }

        debug!("no immediate PRF result, re-asserting for extension evaluation");

        // The challenge is not used for authentication, only to satisfy
        // extension evaluation; the ceremony is scoped to this credential.
        let options = CredentialRequestOptions {
            public_key: PublicKeyCredentialRequestOptions {
                challenge: Base64UrlBytes::from(self.random.bytes(PRF_CHALLENGE_LEN)),
                rp_id: rp_id.map(str::to_string),
                allow_credentials: vec![CredentialDescriptor::public_key(
                    credential.raw_id.clone(),
                )],
                timeout: None,
                user_verification: None,
                extensions: ExtensionInputs {
                    prf: Some(eval.into_inputs()),
                },
            },
        };

        let second = self.authenticator.get(options).await?;
        match second.prf_result() {
            Some(result) => {
                let output = PrfOutput::from(result.as_slice().to_vec());
                Ok((output, second))
            }
            None => Err(PrfError::NotSupported),
        }
    }
}
