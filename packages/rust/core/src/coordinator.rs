//! Background side: answers [`BackgroundRequest`]s from page sessions.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use fieldfill_provider::ProviderFactory;
use fieldfill_shared::FieldDescriptor;

use crate::orchestrator::{self, Orchestrator};
use crate::protocol::{BackgroundReceiver, BackgroundRequest, BackgroundResponse};

pub const MISSING_KEY_MESSAGE: &str = "API key not provided";
pub const NO_FIELDS_MESSAGE: &str = "No fields to process";
pub const CONNECTION_OK_MESSAGE: &str = "API connection successful";

/// Handles every request on its own task; all batches share one set of
/// concurrency slots.
pub struct Coordinator {
    factory: Arc<dyn ProviderFactory>,
    slots: Option<Arc<Semaphore>>,
}

impl Coordinator {
    pub fn new(factory: Arc<dyn ProviderFactory>, max_concurrency: usize) -> Self {
        Self {
            factory,
            slots: orchestrator::slots(max_concurrency),
        }
    }

    /// Start serving on the current runtime.
    pub fn spawn(self, rx: BackgroundReceiver) -> JoinHandle<()> {
        tokio::spawn(Arc::new(self).serve(rx))
    }

    /// Serve until every [`crate::protocol::BackgroundClient`] is dropped.
    pub async fn serve(self: Arc<Self>, mut rx: BackgroundReceiver) {
        while let Some(envelope) = rx.recv().await {
            let this = self.clone();
            tokio::spawn(async move {
                let (id, request, responder) = envelope.into_parts();
                let response = this.handle(request).await;
                if let Err(e) = responder.respond(response) {
                    warn!(%id, error = %e, "reply could not be delivered");
                }
            });
        }
        info!("background bus closed, coordinator stopping");
    }

    pub async fn handle(&self, request: BackgroundRequest) -> BackgroundResponse {
        match request {
            BackgroundRequest::ProcessFields {
                fields,
                system_prompt,
                api_key,
            } => {
                let Some(key) = usable_key(api_key.as_deref()) else {
                    return BackgroundResponse::error(MISSING_KEY_MESSAGE);
                };
                if fields.is_empty() {
                    return BackgroundResponse::error(NO_FIELDS_MESSAGE);
                }
                self.process_fields(&fields, &system_prompt, key).await
            }
            BackgroundRequest::TestConnection { api_key } => {
                let Some(key) = usable_key(api_key.as_deref()) else {
                    return BackgroundResponse::error(MISSING_KEY_MESSAGE);
                };
                self.test_connection(key).await
            }
        }
    }

    #[instrument(skip_all, fields(fields = fields.len()))]
    async fn process_fields(
        &self,
        fields: &[FieldDescriptor],
        system_prompt: &str,
        api_key: &str,
    ) -> BackgroundResponse {
        let provider = match self.factory.create(api_key) {
            Ok(provider) => provider,
            Err(e) => return BackgroundResponse::error(e.to_string()),
        };
        let orchestrator = Orchestrator::with_slots(provider, self.slots.clone());
        BackgroundResponse::results(orchestrator.process_batch(fields, system_prompt).await)
    }

    #[instrument(skip_all)]
    async fn test_connection(&self, api_key: &str) -> BackgroundResponse {
        let result = match self.factory.create(api_key) {
            Ok(provider) => provider.test_connection().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!("connection test passed");
                BackgroundResponse::message(CONNECTION_OK_MESSAGE)
            }
            Err(e) => {
                warn!(error = %e, "connection test failed");
                BackgroundResponse::error(e.to_string())
            }
        }
    }
}

fn usable_key(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fieldfill_provider::CompletionProvider;
    use fieldfill_shared::{FieldFillError, FieldId, FieldKind, Result};
    use std::sync::Mutex;

    struct Echo;

    #[async_trait]
    impl CompletionProvider for Echo {
        async fn complete(&self, field: &FieldDescriptor, _system_prompt: &str) -> Result<String> {
            Ok(format!("value for {}", field.label))
        }

        async fn test_connection(&self) -> Result<()> {
            Err(FieldFillError::Auth("HTTP 401: bad key".into()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    /// Records the keys it was asked to build providers for.
    #[derive(Default)]
    struct Recording {
        keys: Mutex<Vec<String>>,
    }

    impl ProviderFactory for Recording {
        fn create(&self, api_key: &str) -> Result<Arc<dyn CompletionProvider>> {
            self.keys.lock().unwrap().push(api_key.to_string());
            Ok(Arc::new(Echo))
        }
    }

    fn field(n: u64, label: &str) -> FieldDescriptor {
        FieldDescriptor {
            id: FieldId::from_index(n),
            kind: FieldKind::Text,
            tag_name: "input".into(),
            name: String::new(),
            placeholder: String::new(),
            required: false,
            max_length: None,
            label: label.into(),
            context: String::new(),
        }
    }

    #[tokio::test]
    async fn process_fields_uses_request_key() {
        let factory = Arc::new(Recording::default());
        let coordinator = Coordinator::new(factory.clone(), 4);

        let response = coordinator
            .handle(BackgroundRequest::ProcessFields {
                fields: vec![field(0, "Name"), field(1, "City")],
                system_prompt: "p".into(),
                api_key: Some("sk-ant-abc".into()),
            })
            .await;

        assert!(response.success);
        let results = response.results.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().any(|r| r.value == "value for City"));
        assert_eq!(*factory.keys.lock().unwrap(), ["sk-ant-abc"]);
    }

    #[tokio::test]
    async fn rejects_missing_key_and_empty_batch() {
        let coordinator = Coordinator::new(Arc::new(Recording::default()), 4);

        let response = coordinator
            .handle(BackgroundRequest::ProcessFields {
                fields: vec![field(0, "Name")],
                system_prompt: "p".into(),
                api_key: Some("  ".into()),
            })
            .await;
        assert_eq!(response, BackgroundResponse::error(MISSING_KEY_MESSAGE));

        let response = coordinator
            .handle(BackgroundRequest::ProcessFields {
                fields: vec![],
                system_prompt: "p".into(),
                api_key: Some("sk-ant-abc".into()),
            })
            .await;
        assert_eq!(response, BackgroundResponse::error(NO_FIELDS_MESSAGE));
    }

    #[tokio::test]
    async fn connection_test_reports_provider_error() {
        let coordinator = Coordinator::new(Arc::new(Recording::default()), 4);
        let response = coordinator
            .handle(BackgroundRequest::TestConnection {
                api_key: Some("sk-ant-abc".into()),
            })
            .await;
        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some("authentication failed: HTTP 401: bad key")
        );
    }

    #[tokio::test]
    async fn serves_over_the_bus() {
        let (client, rx) = crate::bus::channel(8);
        let handle = Coordinator::new(Arc::new(Recording::default()), 4).spawn(rx);

        let response = client
            .request(BackgroundRequest::TestConnection { api_key: None })
            .await
            .unwrap();
        assert_eq!(response.error.as_deref(), Some(MISSING_KEY_MESSAGE));

        drop(client);
        handle.await.unwrap();
    }
}
