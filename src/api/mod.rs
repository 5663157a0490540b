//! HTTP client for the wallet backend.
//!
//! All JSON bodies go through the typed records in [`types`], so the
//! tagged-binary transform is applied uniformly in both directions. Every
//! authenticated call attaches `Authorization: Bearer <token>` with the token
//! read from the session store at request time; the client itself stores no
//! secrets. Timeout policy lives here, not in the flows.

pub mod types;

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info_span, Instrument};

use crate::api::types::{
    InitiatePresentationRequest, InitiatePresentationResponse, PresentationsResponse, Verifier,
    VerifiersResponse,
};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::session::SessionStore;
use crate::APP_USER_AGENT;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend REST client with session-aware authorization.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    session: SessionStore,
}

impl BackendClient {
    /// Build a client for the configured backend.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &AppConfig, session: SessionStore) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ApiError::Config(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.backend_url.clone(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET a JSON resource.
    ///
    /// # Errors
    /// Returns an error if the request fails, the backend answers with a
    /// non-success status, or the body cannot be decoded.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let span = info_span!("backend.get", url = %url);
        async {
            debug!("GET {url}");
            let response = self
                .authorize(self.http.get(&url))
                .send()
                .await
                .map_err(ApiError::from_reqwest)?;
            handle_json(response).await
        }
        .instrument(span)
        .await
    }

    /// POST a JSON body and decode a JSON response.
    ///
    /// # Errors
    /// Returns an error if the body cannot be encoded, the request fails, the
    /// backend answers with a non-success status, or the response cannot be
    /// decoded.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let span = info_span!("backend.post", url = %url);
        async {
            debug!("POST {url}");
            let response = self
                .authorize(self.http.post(&url))
                .json(body)
                .send()
                .await
                .map_err(ApiError::from_reqwest)?;
            handle_json(response).await
        }
        .instrument(span)
        .await
    }

    /// DELETE a resource, expecting an empty response.
    ///
    /// # Errors
    /// Returns an error if the request fails or the backend answers with a
    /// non-success status.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        let span = info_span!("backend.delete", url = %url);
        async {
            debug!("DELETE {url}");
            let response = self
                .authorize(self.http.delete(&url))
                .send()
                .await
                .map_err(ApiError::from_reqwest)?;
            handle_empty(response).await
        }
        .instrument(span)
        .await
    }

    /// Fetch the verifier list.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be
    /// decoded.
    pub async fn get_all_verifiers(&self) -> Result<Vec<Verifier>, ApiError> {
        let response: VerifiersResponse = self
            .get("/verifiers/all")
            .await
            .inspect_err(|err| error!("Failed to fetch all verifiers: {err}"))?;
        Ok(response.verifiers)
    }

    /// Fetch the stored presentations.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be
    /// decoded.
    pub async fn get_all_presentations(&self) -> Result<PresentationsResponse, ApiError> {
        self.get("/storage/vp")
            .await
            .inspect_err(|err| error!("Failed to fetch all presentations: {err}"))
    }

    /// Start a presentation exchange with a verifier.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response cannot be
    /// decoded.
    pub async fn initiate_presentation_exchange(
        &self,
        verifier_id: i64,
        scope_name: &str,
    ) -> Result<InitiatePresentationResponse, ApiError> {
        let request = InitiatePresentationRequest {
            verifier_id,
            scope_name: scope_name.to_string(),
        };
        self.post("/presentation/initiate", &request)
            .await
            .inspect_err(|err| error!("Failed to initiate presentation exchange: {err}"))
    }
}

/// Parse a JSON response, surfacing HTTP failures with sanitized bodies.
async fn handle_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| ApiError::Parse(err.to_string()))
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::http(status.as_u16(), body))
    }
}

async fn handle_empty(response: reqwest::Response) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::http(status.as_u16(), body))
    }
}
