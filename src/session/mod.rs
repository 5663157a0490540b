//! Persisted session attributes shared by every authenticated request.
//!
//! The backend issues four named attributes on login/signup (username, display
//! name, bound passkey credential id, bearer token). They live in an
//! injectable [`SessionStorage`] port so a browser embedding can keep them in
//! cookies while tests and native embeddings use [`MemorySessionStorage`].
//! Writers go through [`SessionStore::commit`] and [`SessionStore::clear`]
//! only, so the four attributes change together; concurrent writers are not
//! serialized and the last commit wins.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Names of the persisted session attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionAttribute {
    Username,
    DisplayName,
    WebauthnCredentialId,
    BearerToken,
}

impl SessionAttribute {
    pub const ALL: [SessionAttribute; 4] = [
        SessionAttribute::Username,
        SessionAttribute::DisplayName,
        SessionAttribute::WebauthnCredentialId,
        SessionAttribute::BearerToken,
    ];

    /// Persisted name of the attribute, matching the backend's field names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionAttribute::Username => "username",
            SessionAttribute::DisplayName => "displayName",
            SessionAttribute::WebauthnCredentialId => "webauthnCredentialCredentialId",
            SessionAttribute::BearerToken => "appToken",
        }
    }
}

/// Storage port for named session attributes.
///
/// Implementations must be safe to share across flows; they are not expected
/// to serialize concurrent writers.
pub trait SessionStorage: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str);
    fn remove(&self, name: &str);
}

/// In-memory attribute storage for tests and non-browser embeddings.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    values: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, name: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn set(&self, name: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
    }

    fn remove(&self, name: &str) {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(name);
    }
}

/// Snapshot of the persisted session attributes; absent attributes are `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub webauthn_credential_id: Option<String>,
    pub bearer_token: Option<String>,
}

/// Session attributes issued by the backend on a successful login or signup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAttributes {
    pub username: String,
    pub display_name: String,
    #[serde(rename = "appToken")]
    pub bearer_token: String,
}

/// Reader/writer facade over the session attribute storage.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Store backed by [`MemorySessionStorage`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStorage::default()))
    }

    /// Read all four attributes; absent attributes map to `None`.
    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState {
            username: self.storage.get(SessionAttribute::Username.as_str()),
            display_name: self.storage.get(SessionAttribute::DisplayName.as_str()),
            webauthn_credential_id: self
                .storage
                .get(SessionAttribute::WebauthnCredentialId.as_str()),
            bearer_token: self.storage.get(SessionAttribute::BearerToken.as_str()),
        }
    }

    /// True iff the username attribute is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.storage
            .get(SessionAttribute::Username.as_str())
            .is_some()
    }

    /// Bearer token for `Authorization` headers, if a session is active.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.storage.get(SessionAttribute::BearerToken.as_str())
    }

    /// Commit all four attributes in one step. `credential_id` is set by the
    /// passkey flows and cleared by the password flows.
    ///
    /// The token is written before the username so a reader that observes
    /// `is_authenticated()` also observes a token from the same commit.
    pub fn commit(&self, attributes: &SessionAttributes, credential_id: Option<&str>) {
        self.storage
            .set(SessionAttribute::BearerToken.as_str(), &attributes.bearer_token);
        self.storage.set(
            SessionAttribute::DisplayName.as_str(),
            &attributes.display_name,
        );
        match credential_id {
            Some(id) => self
                .storage
                .set(SessionAttribute::WebauthnCredentialId.as_str(), id),
            None => self
                .storage
                .remove(SessionAttribute::WebauthnCredentialId.as_str()),
        }
        self.storage
            .set(SessionAttribute::Username.as_str(), &attributes.username);
    }

    /// Remove all four attributes; idempotent.
    pub fn clear(&self) {
        // Username first, so no reader sees an "authenticated" session whose
        // token is already gone.
        self.storage.remove(SessionAttribute::Username.as_str());
        self.storage.remove(SessionAttribute::DisplayName.as_str());
        self.storage
            .remove(SessionAttribute::WebauthnCredentialId.as_str());
        self.storage.remove(SessionAttribute::BearerToken.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes() -> SessionAttributes {
        SessionAttributes {
            username: "alice".to_string(),
            display_name: "Alice".to_string(),
            bearer_token: "tok1".to_string(),
        }
    }

    #[test]
    fn empty_store_is_unauthenticated() {
        let store = SessionStore::in_memory();
        assert!(!store.is_authenticated());
        assert_eq!(store.state(), SessionState::default());
        assert_eq!(store.bearer_token(), None);
    }

    #[test]
    fn commit_sets_all_attributes() {
        let store = SessionStore::in_memory();
        store.commit(&attributes(), Some("cred1"));

        assert!(store.is_authenticated());
        assert_eq!(
            store.state(),
            SessionState {
                username: Some("alice".to_string()),
                display_name: Some("Alice".to_string()),
                webauthn_credential_id: Some("cred1".to_string()),
                bearer_token: Some("tok1".to_string()),
            }
        );
    }

    #[test]
    fn commit_without_credential_clears_previous_binding() {
        let store = SessionStore::in_memory();
        store.commit(&attributes(), Some("cred1"));
        store.commit(&attributes(), None);
        assert_eq!(store.state().webauthn_credential_id, None);
    }

    #[test]
    fn last_commit_wins() {
        let store = SessionStore::in_memory();
        store.commit(&attributes(), None);
        store.commit(
            &SessionAttributes {
                username: "bob".to_string(),
                display_name: "Bob".to_string(),
                bearer_token: "tok2".to_string(),
            },
            Some("cred2"),
        );
        let state = store.state();
        assert_eq!(state.username.as_deref(), Some("bob"));
        assert_eq!(state.bearer_token.as_deref(), Some("tok2"));
        assert_eq!(state.webauthn_credential_id.as_deref(), Some("cred2"));
    }

    #[test]
    fn clear_is_idempotent() {
        let store = SessionStore::in_memory();
        store.commit(&attributes(), Some("cred1"));

        store.clear();
        let after_first = store.state();
        store.clear();
        let after_second = store.state();

        assert_eq!(after_first, SessionState::default());
        assert_eq!(after_first, after_second);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn session_attributes_deserialize_from_backend_names() {
        let attrs: SessionAttributes = serde_json::from_str(
            r#"{"username":"alice","displayName":"Alice","appToken":"tok1"}"#,
        )
        .expect("should deserialize");
        assert_eq!(attrs, attributes());
    }
}
