//! Page side: one session per loaded document.
//!
//! A [`PageSession`] scans its document, sends the batch to the background
//! coordinator, applies what comes back and keeps the user informed with
//! banners. At most one fill runs per session at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use fieldfill_scanner::ScanSession;
use fieldfill_shared::{FieldDescriptor, FieldFillError, FillSettings, FillSummary, Result};

use crate::SharedDocument;
use crate::banner::Notifier;
use crate::executor::FillExecutor;
use crate::protocol::{BackgroundClient, BackgroundRequest, PageReceiver, PageRequest, PageResponse};
use crate::state::{FieldState, FieldTracker};
use crate::timers::TimerSet;

pub const SETUP_REQUIRED_MESSAGE: &str = "Please set up your system prompt and API key first.";

/// How a fill session ended, short of an infrastructure failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// The scan found nothing; nothing was sent and no banner shown.
    NoFields,
    /// Prompt or key missing; the setup banner was shown.
    NotConfigured,
    /// The background refused the batch; the error banner was shown.
    Rejected(String),
    /// Results were applied.
    Filled(FillSummary),
}

/// Clears the single-flight flag when the fill ends, however it ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| FieldFillError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PageSession {
    document: SharedDocument,
    background: BackgroundClient,
    scan_session: Mutex<ScanSession>,
    timers: TimerSet,
    tracker: FieldTracker,
    notifier: Notifier,
    executor: FillExecutor,
    in_flight: AtomicBool,
}

impl PageSession {
    pub fn new(document: SharedDocument, background: BackgroundClient) -> Self {
        let timers = TimerSet::new();
        let tracker = FieldTracker::new();
        Self {
            notifier: Notifier::new(document.clone(), timers.clone()),
            executor: FillExecutor::new(document.clone(), timers.clone(), tracker.clone()),
            document,
            background,
            scan_session: Mutex::new(ScanSession::new()),
            timers,
            tracker,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn document(&self) -> &SharedDocument {
        &self.document
    }

    /// Pending visual resets and banner dismissals.
    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn tracker(&self) -> &FieldTracker {
        &self.tracker
    }

    /// Scan the document. Ids continue across scans of the same session.
    pub async fn scan(&self) -> Vec<FieldDescriptor> {
        let mut doc = self.document.lock().await;
        let fields = {
            let mut session = self
                .scan_session
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            fieldfill_scanner::scan(&mut doc, &mut session)
        };
        for field in &fields {
            self.tracker.discover(&field.id);
        }
        fields
    }

    /// Scan, dispatch and apply.
    ///
    /// Returns `Err` only for [`FieldFillError::Busy`] and bus failures;
    /// every other failure is reported through banners and tints.
    #[instrument(skip_all)]
    pub async fn fill_forms(&self, system_prompt: &str, api_key: Option<&str>) -> Result<FillOutcome> {
        let _flight = FlightGuard::acquire(&self.in_flight)?;

        let fields = self.scan().await;
        if fields.is_empty() {
            info!("no fillable fields found");
            return Ok(FillOutcome::NoFields);
        }

        info!(fields = fields.len(), "dispatching batch");
        self.notifier
            .show(&format!("Processing {} fields...", fields.len()))
            .await;
        for field in &fields {
            if let Err(e) = self.tracker.advance(&field.id, FieldState::Dispatched) {
                debug!(field = %field.id, error = %e, "untracked transition");
            }
        }

        let request = BackgroundRequest::ProcessFields {
            fields,
            system_prompt: system_prompt.to_string(),
            api_key: api_key.map(str::to_string),
        };
        let response = match self.background.request(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "background request failed");
                self.notifier.show(&format!("Error: {e}")).await;
                return Err(e);
            }
        };

        if response.success {
            let results = response.results.unwrap_or_default();
            let summary = self.executor.apply(&results).await;
            Ok(FillOutcome::Filled(summary))
        } else {
            let error = response.error.unwrap_or_else(|| "Unknown error".to_string());
            warn!(%error, "background rejected the batch");
            self.notifier.show(&format!("Error: {error}")).await;
            Ok(FillOutcome::Rejected(error))
        }
    }

    /// Describe the fillable fields without tagging them or drawing ids, so a
    /// fill in flight keeps its markers.
    pub async fn survey(&self) -> Vec<FieldDescriptor> {
        let doc = self.document.lock().await;
        let session = self
            .scan_session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        fieldfill_scanner::survey(&doc, &session)
    }

    /// Fill from stored settings, prompting for setup when incomplete.
    pub async fn fill_with_settings(&self, settings: &FillSettings) -> Result<FillOutcome> {
        match (&settings.system_prompt, &settings.api_key) {
            (Some(prompt), Some(key)) => self.fill_forms(prompt, Some(key)).await,
            _ => {
                info!("fill requested before setup");
                self.notifier.show(SETUP_REQUIRED_MESSAGE).await;
                Ok(FillOutcome::NotConfigured)
            }
        }
    }

    /// Answer one popup request.
    pub async fn handle(&self, request: PageRequest) -> PageResponse {
        match request {
            PageRequest::FillForms {
                system_prompt,
                api_key,
            } => match self.fill_forms(&system_prompt, api_key.as_deref()).await {
                Ok(FillOutcome::Rejected(error)) => PageResponse::Fill {
                    success: false,
                    error: Some(error),
                },
                Ok(_) => PageResponse::Fill {
                    success: true,
                    error: None,
                },
                Err(e) => PageResponse::Fill {
                    success: false,
                    error: Some(e.to_string()),
                },
            },
            PageRequest::GetFieldCount => {
                let fields = self.survey().await;
                debug!(count = fields.len(), "field count requested");
                PageResponse::FieldCount {
                    count: fields.len(),
                    fields,
                }
            }
        }
    }

    /// Start serving popup requests on the current runtime.
    pub fn spawn(self: Arc<Self>, rx: PageReceiver) -> JoinHandle<()> {
        tokio::spawn(self.serve(rx))
    }

    /// Serve until every [`crate::protocol::PageClient`] is dropped. Requests
    /// run concurrently so a count query is answered during a fill.
    pub async fn serve(self: Arc<Self>, mut rx: PageReceiver) {
        while let Some(envelope) = rx.recv().await {
            let this = self.clone();
            tokio::spawn(async move {
                let (id, request, responder) = envelope.into_parts();
                let response = this.handle(request).await;
                if let Err(e) = responder.respond(response) {
                    warn!(%id, error = %e, "popup went away before the reply");
                }
            });
        }
    }
}
