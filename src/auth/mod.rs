//! The four authentication flows against the wallet backend.
//!
//! Each flow is an ordered pipeline of stages: backend round-trips,
//! authenticator ceremonies, and local keystore calls. A stage failure
//! short-circuits the pipeline and maps once to that stage's error tag, so
//! callers always receive exactly one discriminated reason per attempt and
//! can decide whether to retry. Nothing is retried here.
//!
//! Session rules: the backend is authoritative for "logged in". Password and
//! passkey login commit the session as soon as the backend accepts the
//! credentials, before the local keystore unlock; signup flows commit only
//! after the backend accepts the registration.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, error};

use crate::api::types::{
    Base64UrlBytes, LoginBeginResponse, LoginFinishRequest, LoginRequest, RegisterBeginResponse,
    RegisterFinishRequest, RegisterRequest, UserData,
};
use crate::api::BackendClient;
use crate::error::ApiError;
use crate::keystore::{KeystoreInit, KeystoreService, PrivateData};
use crate::push::{NoPushService, PushTokenPort};
use crate::session::SessionStore;
use crate::webauthn::prf::{PrfEvalRequest, PrfKeyResolver};
use crate::webauthn::{
    AuthenticatorCredential, AuthenticatorPort, ExtensionInputs, PrfInputs, PrfValues,
    RandomBytes, SystemRandom,
};

/// PRF salt length for new passkey credentials.
const PRF_SALT_LEN: usize = 32;

/// Password-login failure reasons.
#[derive(Debug, Error)]
pub enum PasswordLoginError {
    /// The backend rejected the credentials or was unreachable; no session
    /// was committed.
    #[error(transparent)]
    Backend(#[from] ApiError),
    /// The backend accepted the login and the session is committed, but the
    /// local keystore could not be unlocked. Callers that want a forced
    /// logout instead should call [`SessionStore::clear`].
    #[error("failed to unlock local keystore")]
    UnlockFailed,
}

/// Password-signup failure reasons.
#[derive(Debug, Error)]
pub enum SignupError {
    /// Local keystore initialization failed; no backend state was created.
    #[error("failed to initialize local keystore")]
    Keystore,
    /// The backend rejected the registration; the freshly generated keystore
    /// material is discarded, not reused.
    #[error(transparent)]
    Backend(#[from] ApiError),
}

/// Passkey-login failure reasons, one per stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PasskeyLoginError {
    /// The login-begin round-trip failed.
    #[error("passkey login failed: server error")]
    ServerError,
    /// The assertion ceremony was rejected; the user may retry.
    #[error("passkey login failed, try again")]
    TryAgain,
    /// The backend rejected the assertion.
    #[error("passkey assertion rejected by server")]
    Invalid,
    /// The session is committed but PRF resolution or the keystore unlock
    /// failed.
    #[error("failed to unlock local keystore")]
    KeystoreFailed,
}

/// Passkey-signup failure reasons, one per stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PasskeySignupError {
    /// The register-begin round-trip failed.
    #[error("passkey signup failed: could not start registration")]
    BeginFailed,
    /// The create ceremony was rejected; the user may retry.
    #[error("passkey signup failed, try again")]
    TryAgain,
    /// PRF resolution or local keystore initialization failed.
    #[error("failed to initialize local keystore")]
    KeystoreFailed,
    /// The register-finish round-trip failed.
    #[error("passkey signup failed: could not finish registration")]
    FinishFailed,
}

/// Orchestrates the authentication flows and commits the session store on
/// success. One instance serves all flows; callers must not run two flows
/// concurrently against the same session store.
pub struct AuthService {
    client: BackendClient,
    session: SessionStore,
    authenticator: Arc<dyn AuthenticatorPort>,
    push: Arc<dyn PushTokenPort>,
    random: Arc<dyn RandomBytes>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        client: BackendClient,
        session: SessionStore,
        authenticator: Arc<dyn AuthenticatorPort>,
    ) -> Self {
        Self {
            client,
            session,
            authenticator,
            push: Arc::new(NoPushService),
            random: Arc::new(SystemRandom),
        }
    }

    /// Replace the push-token source.
    #[must_use]
    pub fn with_push_service(mut self, push: Arc<dyn PushTokenPort>) -> Self {
        self.push = push;
        self
    }

    /// Replace the entropy source.
    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomBytes>) -> Self {
        self.random = random;
        self
    }

    /// Log in with username and password, then unlock the keystore with the
    /// same password.
    ///
    /// # Errors
    /// Returns the backend error when the login round-trip fails (nothing is
    /// committed), or [`PasswordLoginError::UnlockFailed`] when the backend
    /// accepted the login but the keystore could not be unlocked (the session
    /// stays committed).
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        keystore: &dyn KeystoreService,
    ) -> Result<(), PasswordLoginError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.expose_secret().to_string(),
        };
        let user_data: UserData = self
            .client
            .post("/user/login", &request)
            .await
            .inspect_err(|err| error!("Failed to log in: {err}"))?;

        self.session.commit(&user_data.session, None);

        match unlock_with_password(&user_data, password, keystore) {
            Ok(()) => Ok(()),
            Err(err) => {
                error!("Failed to unlock local keystore: {err}");
                Err(PasswordLoginError::UnlockFailed)
            }
        }
    }

    /// Register a new account with username and password.
    ///
    /// # Errors
    /// Returns [`SignupError::Keystore`] when local key material cannot be
    /// generated (no network call is made), or the backend error when the
    /// registration round-trip fails (nothing is committed).
    pub async fn signup(
        &self,
        username: &str,
        password: &SecretString,
        keystore: &dyn KeystoreService,
    ) -> Result<(), SignupError> {
        let push_token = self.push.request_token().await;

        let KeystoreInit {
            public_data,
            private_data,
        } = keystore.init_password(password).map_err(|err| {
            error!("Failed to initialize local keystore: {err}");
            SignupError::Keystore
        })?;
        let private_data_json = private_data.to_tagged_json().map_err(|err| {
            error!("Failed to serialize private data: {err}");
            SignupError::Keystore
        })?;

        let request = RegisterRequest {
            username: username.to_string(),
            password: password.expose_secret().to_string(),
            fcm_token: push_token.clone(),
            browser_fcm_token: push_token,
            display_name: username.to_string(),
            keys: public_data,
            private_data: private_data_json,
        };
        let user_data: UserData = self
            .client
            .post("/user/register", &request)
            .await
            .inspect_err(|err| error!("Signup failed: {err}"))?;

        self.session.commit(&user_data.session, None);
        Ok(())
    }

    /// Log in with a passkey, then unlock the keystore with the credential's
    /// PRF output.
    ///
    /// # Errors
    /// Returns exactly one stage tag: [`PasskeyLoginError::ServerError`]
    /// (begin), [`PasskeyLoginError::TryAgain`] (assertion),
    /// [`PasskeyLoginError::Invalid`] (finish), or
    /// [`PasskeyLoginError::KeystoreFailed`] (unlock; the session stays
    /// committed).
    pub async fn login_webauthn(
        &self,
        keystore: &dyn KeystoreService,
    ) -> Result<(), PasskeyLoginError> {
        let begin: LoginBeginResponse = self
            .client
            .post("/user/login-webauthn-begin", &serde_json::json!({}))
            .await
            .map_err(|err| {
                error!("Failed to begin passkey login: {err}");
                PasskeyLoginError::ServerError
            })?;

        let rp_id = begin.get_options.public_key.rp_id.clone();
        let credential = self
            .authenticator
            .get(begin.get_options)
            .await
            .map_err(|err| {
                debug!("Passkey assertion did not complete: {err}");
                PasskeyLoginError::TryAgain
            })?;

        let request = LoginFinishRequest {
            challenge_id: begin.challenge_id,
            credential: credential.clone(),
        };
        let user_data: UserData = self
            .client
            .post("/user/login-webauthn-finish", &request)
            .await
            .map_err(|err| {
                error!("Failed to finish passkey login: {err}");
                PasskeyLoginError::Invalid
            })?;

        self.session.commit(&user_data.session, Some(&credential.id));

        match self
            .unlock_with_prf(&user_data, credential, rp_id.as_deref(), keystore)
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => {
                error!("Failed to open keystore: {err}");
                Err(PasskeyLoginError::KeystoreFailed)
            }
        }
    }

    /// Register a new passkey-backed account.
    ///
    /// # Errors
    /// Returns exactly one stage tag: [`PasskeySignupError::BeginFailed`],
    /// [`PasskeySignupError::TryAgain`] (create ceremony),
    /// [`PasskeySignupError::KeystoreFailed`] (PRF resolution or local init),
    /// or [`PasskeySignupError::FinishFailed`]. The session is committed only
    /// when the finish round-trip succeeds.
    pub async fn signup_webauthn(
        &self,
        name: &str,
        keystore: &dyn KeystoreService,
    ) -> Result<(), PasskeySignupError> {
        let begin: RegisterBeginResponse = self
            .client
            .post("/user/register-webauthn-begin", &serde_json::json!({}))
            .await
            .map_err(|err| {
                error!("Failed to begin passkey signup: {err}");
                PasskeySignupError::BeginFailed
            })?;

        let prf_salt = Base64UrlBytes::from(self.random.bytes(PRF_SALT_LEN));
        let mut options = begin.create_options;
        options.public_key.user.name = name.to_string();
        options.public_key.user.display_name = name.to_string();
        options.public_key.extensions = ExtensionInputs {
            prf: Some(PrfInputs {
                eval: Some(PrfValues {
                    first: prf_salt.clone(),
                }),
                eval_by_credential: None,
            }),
        };
        let rp_id = options.public_key.rp.id.clone();

        let credential = self.authenticator.create(options).await.map_err(|err| {
            debug!("Passkey creation did not complete: {err}");
            PasskeySignupError::TryAgain
        })?;

        let init = self
            .init_with_prf(&credential, rp_id.as_deref(), &prf_salt, keystore)
            .await
            .map_err(|err| {
                error!("Failed to initialize local keystore: {err}");
                PasskeySignupError::KeystoreFailed
            })?;

        let push_token = self.push.request_token().await;
        let request = RegisterFinishRequest {
            challenge_id: begin.challenge_id,
            fcm_token: push_token.clone(),
            browser_fcm_token: push_token,
            display_name: name.to_string(),
            keys: init.public_data,
            private_data: init.private_data,
            credential: credential.clone(),
        };
        let user_data: UserData = self
            .client
            .post("/user/register-webauthn-finish", &request)
            .await
            .map_err(|err| {
                error!("Failed to finish passkey signup: {err}");
                PasskeySignupError::FinishFailed
            })?;

        self.session.commit(&user_data.session, Some(&credential.id));
        Ok(())
    }

    /// Unlock stage of passkey login: parse the blob, resolve PRF output over
    /// every registered credential, match the credential that was actually
    /// used, and unlock.
    async fn unlock_with_prf(
        &self,
        user_data: &UserData,
        credential: AuthenticatorCredential,
        rp_id: Option<&str>,
        keystore: &dyn KeystoreService,
    ) -> Result<(), UnlockFailure> {
        let private_data = PrivateData::parse(&user_data.private_data)?;

        // The backend does not say which credential id matched, so PRF
        // evaluation is requested for every registered entry at once.
        let salts = private_data
            .prf_keys
            .iter()
            .map(|key_info| (key_info.credential_id.encode(), key_info.prf_salt.clone()))
            .collect();

        let resolver = PrfKeyResolver::new(&*self.authenticator, &*self.random);
        let (prf_output, prf_credential) = resolver
            .resolve(credential, rp_id, PrfEvalRequest::ByCredential(salts))
            .await?;

        let key_info = private_data
            .prf_key_for(&prf_credential.id)
            .ok_or(UnlockFailure::UnknownCredential)?;
        keystore.unlock_prf(&private_data, prf_output, key_info)?;
        Ok(())
    }

    /// PRF + local-init stage of passkey signup; returns the material for the
    /// finish request with the private data already in wire form.
    async fn init_with_prf(
        &self,
        credential: &AuthenticatorCredential,
        rp_id: Option<&str>,
        prf_salt: &Base64UrlBytes,
        keystore: &dyn KeystoreService,
    ) -> Result<SignupMaterial, UnlockFailure> {
        let resolver = PrfKeyResolver::new(&*self.authenticator, &*self.random);
        let (prf_output, _) = resolver
            .resolve(
                credential.clone(),
                rp_id,
                PrfEvalRequest::Single(prf_salt.clone()),
            )
            .await?;

        let KeystoreInit {
            public_data,
            private_data,
        } = keystore.init_prf(&credential.raw_id, prf_salt, prf_output)?;

        Ok(SignupMaterial {
            public_data,
            private_data: private_data.to_tagged_json()?,
        })
    }
}

struct SignupMaterial {
    public_data: crate::keystore::PublicData,
    private_data: String,
}

/// Internal failure domain of the unlock/init stages; always mapped to the
/// stage's `KeystoreFailed`/`UnlockFailed` tag before reaching callers.
#[derive(Debug, Error)]
enum UnlockFailure {
    #[error("invalid private data: {0}")]
    PrivateData(#[from] serde_json::Error),
    #[error(transparent)]
    Prf(#[from] crate::webauthn::prf::PrfError),
    #[error("private data carries no password key")]
    MissingPasswordKey,
    #[error("no registered key matches the asserted credential")]
    UnknownCredential,
    #[error(transparent)]
    Keystore(#[from] crate::keystore::KeystoreError),
}

fn unlock_with_password(
    user_data: &UserData,
    password: &SecretString,
    keystore: &dyn KeystoreService,
) -> Result<(), UnlockFailure> {
    let private_data = PrivateData::parse(&user_data.private_data)?;
    let key_info = private_data
        .password_key
        .clone()
        .ok_or(UnlockFailure::MissingPasswordKey)?;
    keystore.unlock_password(&private_data, password, &key_info)?;
    Ok(())
}
