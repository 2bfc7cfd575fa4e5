//! One-time capability probe

use tokio::sync::OnceCell;

use super::{LanguageModel, ModelClient};

/// Whether the language model facility is usable.
///
/// The backend is probed at most once; the answer is cached for the life of
/// the value and consulted by every AI-dependent entry point.
pub struct Capability {
    client: Option<ModelClient>,
    probed: OnceCell<bool>,
}

impl Capability {
    pub fn new(client: Option<ModelClient>) -> Self {
        Self {
            client,
            probed: OnceCell::new(),
        }
    }

    /// No client configured; always unavailable
    pub fn unavailable() -> Self {
        Self::new(None)
    }

    pub async fn is_available(&self) -> bool {
        let Some(client) = &self.client else {
            return false;
        };

        *self
            .probed
            .get_or_init(|| async {
                let available = client.is_available().await;
                tracing::info!(
                    model = client.model(),
                    host = client.host(),
                    available,
                    "Probed language model"
                );
                available
            })
            .await
    }

    /// The client, if the probe succeeded
    pub async fn client(&self) -> Option<&ModelClient> {
        if self.is_available().await {
            self.client.as_ref()
        } else {
            None
        }
    }

    /// The configured client regardless of the probe
    pub fn configured(&self) -> Option<&ModelClient> {
        self.client.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;

    #[tokio::test]
    async fn test_no_client_is_unavailable() {
        let capability = Capability::unavailable();
        assert!(!capability.is_available().await);
        assert!(capability.client().await.is_none());
    }

    #[tokio::test]
    async fn test_probe_is_cached() {
        let mock = MockBackend::new();
        let capability = Capability::new(Some(ModelClient::Mock(mock.clone())));

        assert!(capability.is_available().await);
        assert!(capability.is_available().await);
        assert_eq!(mock.probes(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_backend() {
        let capability = Capability::new(Some(ModelClient::Mock(MockBackend::unavailable())));
        assert!(!capability.is_available().await);
        assert!(capability.configured().is_some());
    }
}
