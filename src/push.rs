//! Push-notification token retrieval port. Token fetch is best-effort by
//! contract: registration flows proceed without a token when none is
//! available, so implementations report failure as `None` rather than an
//! error.

use async_trait::async_trait;

/// Source of push-notification tokens sent along with registrations.
#[async_trait]
pub trait PushTokenPort: Send + Sync {
    /// Returns a push token, or `None` when unavailable.
    async fn request_token(&self) -> Option<String>;
}

/// No-op implementation for embeddings without push notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPushService;

#[async_trait]
impl PushTokenPort for NoPushService {
    async fn request_token(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_push_service_yields_no_token() {
        assert_eq!(NoPushService.request_token().await, None);
    }
}
