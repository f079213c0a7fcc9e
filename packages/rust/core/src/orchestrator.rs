//! Fan-out/fan-in of one completion request per field.
//!
//! Every field gets its own spawned task; a semaphore bounds how many are in
//! flight. Results are collected in the order they settle, and every input
//! field yields exactly one result regardless of how its task ended.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, instrument, warn};

use fieldfill_provider::CompletionProvider;
use fieldfill_shared::{FieldDescriptor, FieldFillError, FillResult, Result};

/// Error carried by every result when the batch could not be dispatched.
pub const BATCH_FAILURE_MESSAGE: &str = "Parallel processing failed";

/// Error carried by a result whose task panicked or was aborted.
pub const ABORTED_MESSAGE: &str = "completion task aborted";

/// Semaphore sized for `max_concurrency`, or `None` when the bound is zero.
pub fn slots(max_concurrency: usize) -> Option<Arc<Semaphore>> {
    (max_concurrency > 0)
        .then(|| Arc::new(Semaphore::new(max_concurrency.min(Semaphore::MAX_PERMITS))))
}

pub struct Orchestrator {
    provider: Arc<dyn CompletionProvider>,
    slots: Option<Arc<Semaphore>>,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn CompletionProvider>, max_concurrency: usize) -> Self {
        Self::with_slots(provider, slots(max_concurrency))
    }

    /// Share concurrency slots with other orchestrators.
    pub fn with_slots(provider: Arc<dyn CompletionProvider>, slots: Option<Arc<Semaphore>>) -> Self {
        Self { provider, slots }
    }

    /// One result per field, in settle order.
    ///
    /// Per-field failures are isolated in their own result. If the fan-out
    /// cannot start, every field fails with [`BATCH_FAILURE_MESSAGE`].
    #[instrument(skip_all, fields(provider = self.provider.name(), fields = fields.len()))]
    pub async fn process_batch(&self, fields: &[FieldDescriptor], system_prompt: &str) -> Vec<FillResult> {
        match self.fan_out(fields, system_prompt).await {
            Ok(results) => {
                let failed = results.iter().filter(|r| !r.success).count();
                info!(total = results.len(), failed, "batch processed");
                results
            }
            Err(e) => {
                warn!(error = %e, "batch dispatch failed");
                fields
                    .iter()
                    .map(|f| FillResult::failed(f.id.clone(), BATCH_FAILURE_MESSAGE))
                    .collect()
            }
        }
    }

    async fn fan_out(&self, fields: &[FieldDescriptor], system_prompt: &str) -> Result<Vec<FillResult>> {
        let runtime = Handle::try_current()
            .map_err(|e| FieldFillError::BatchDispatch(e.to_string()))?;
        let slots = self
            .slots
            .clone()
            .ok_or_else(|| FieldFillError::BatchDispatch("concurrency bound is zero".into()))?;
        if slots.is_closed() {
            return Err(FieldFillError::BatchDispatch("concurrency slots are closed".into()));
        }

        let system_prompt: Arc<str> = Arc::from(system_prompt);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(fields.len());

        for field in fields {
            let field = field.clone();
            let id = field.id.clone();
            let provider = self.provider.clone();
            let slots = slots.clone();
            let system_prompt = system_prompt.clone();
            let tx = tx.clone();

            let handle = runtime.spawn(async move {
                let result = match slots.acquire_owned().await {
                    Ok(_permit) => match provider.complete(&field, &system_prompt).await {
                        Ok(value) => FillResult::filled(field.id, value),
                        Err(e) => {
                            debug!(field = %field.id, error = %e, "completion failed");
                            FillResult::failed(field.id, e.to_string())
                        }
                    },
                    Err(_) => FillResult::failed(field.id, BATCH_FAILURE_MESSAGE),
                };
                let _ = tx.send(result);
            });
            handles.push((id, handle));
        }
        drop(tx);

        let mut results = Vec::with_capacity(fields.len());
        while let Some(result) = rx.recv().await {
            results.push(result);
        }

        let settled: HashSet<_> = results.iter().map(|r| r.field_id.clone()).collect();
        for (id, handle) in handles {
            if let Err(e) = handle.await {
                warn!(field = %id, error = %e, "completion task did not finish");
            }
            if !settled.contains(&id) {
                results.push(FillResult::failed(id, ABORTED_MESSAGE));
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fieldfill_shared::{FieldId, FieldKind};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Provider answering by field name after a per-field delay.
    #[derive(Default)]
    struct Scripted {
        delays_ms: HashMap<String, u64>,
        fail: HashSet<String>,
        panic: HashSet<String>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl CompletionProvider for Scripted {
        async fn complete(&self, field: &FieldDescriptor, system_prompt: &str) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = self.delays_ms.get(&field.name).copied().unwrap_or(10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panic.contains(&field.name) {
                panic!("provider blew up");
            }
            if self.fail.contains(&field.name) {
                return Err(FieldFillError::Provider("HTTP error! status: 500".into()));
            }
            Ok(format!("{}:{system_prompt}", field.name))
        }

        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn fields(names: &[&str]) -> Vec<FieldDescriptor> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| FieldDescriptor {
                id: FieldId::from_index(i as u64),
                kind: FieldKind::Text,
                tag_name: "input".into(),
                name: name.to_string(),
                placeholder: String::new(),
                required: false,
                max_length: None,
                label: String::new(),
                context: String::new(),
            })
            .collect()
    }

    fn ids(results: &[FillResult]) -> Vec<&str> {
        results.iter().map(|r| r.field_id.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn results_arrive_in_settle_order() {
        let provider = Scripted {
            delays_ms: HashMap::from([("slow".into(), 300), ("fast".into(), 10)]),
            ..Scripted::default()
        };
        let orchestrator = Orchestrator::new(Arc::new(provider), 8);

        let results = orchestrator
            .process_batch(&fields(&["slow", "fast"]), "p")
            .await;
        assert_eq!(ids(&results), ["field_1", "field_0"]);
        assert_eq!(results[0].value, "fast:p");
        assert!(results.iter().all(|r| r.success));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_isolated_to_its_field() {
        let provider = Scripted {
            fail: HashSet::from(["b".to_string()]),
            ..Scripted::default()
        };
        let orchestrator = Orchestrator::new(Arc::new(provider), 8);

        let results = orchestrator.process_batch(&fields(&["a", "b", "c"]), "p").await;
        assert_eq!(results.len(), 3);
        let b = results.iter().find(|r| r.field_id.as_str() == "field_1").unwrap();
        assert!(!b.success);
        assert_eq!(b.value, "");
        assert_eq!(b.error.as_deref(), Some("HTTP error! status: 500"));
        assert_eq!(results.iter().filter(|r| r.success).count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded() {
        let provider = Arc::new(Scripted::default());
        let orchestrator = Orchestrator::new(provider.clone(), 2);

        let names: Vec<String> = (0..7).map(|i| format!("f{i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let results = orchestrator.process_batch(&fields(&names), "p").await;

        assert_eq!(results.len(), 7);
        assert_eq!(provider.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_task_still_yields_a_result() {
        let provider = Scripted {
            panic: HashSet::from(["boom".to_string()]),
            ..Scripted::default()
        };
        let orchestrator = Orchestrator::new(Arc::new(provider), 4);

        let results = orchestrator.process_batch(&fields(&["ok", "boom"]), "p").await;
        assert_eq!(results.len(), 2);
        let boom = results.iter().find(|r| r.field_id.as_str() == "field_1").unwrap();
        assert_eq!(boom.error.as_deref(), Some(ABORTED_MESSAGE));
    }

    #[tokio::test]
    async fn zero_bound_fails_whole_batch() {
        let orchestrator = Orchestrator::new(Arc::new(Scripted::default()), 0);
        let results = orchestrator.process_batch(&fields(&["a", "b"]), "p").await;
        assert_eq!(ids(&results), ["field_0", "field_1"]);
        assert!(results.iter().all(|r| {
            !r.success && r.value.is_empty() && r.error.as_deref() == Some(BATCH_FAILURE_MESSAGE)
        }));
    }

    #[tokio::test]
    async fn closed_slots_fail_whole_batch() {
        let provider = Arc::new(Scripted::default());
        let shared = slots(4).unwrap();
        shared.close();
        let orchestrator = Orchestrator::with_slots(provider.clone(), Some(shared));

        let results = orchestrator.process_batch(&fields(&["a", "b", "c"]), "p").await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.error.as_deref() == Some(BATCH_FAILURE_MESSAGE)));
        assert_eq!(provider.peak.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let orchestrator = Orchestrator::new(Arc::new(Scripted::default()), 8);
        assert!(orchestrator.process_batch(&[], "p").await.is_empty());
    }
}
