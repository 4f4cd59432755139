//! Background request dispatch.
//!
//! Every backend call runs in its own tokio task and reports back to the
//! main loop as an [`Event`]. The loop never awaits the backend directly,
//! so rendering and key handling stay responsive while requests are slow.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::future::Future;
use std::sync::Arc;

use mpm_core::{KillPlan, PollTicket};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::app::{DetailKind, DetailPayload};
use crate::client::Backend;
use crate::input::Event;

/// Spawns backend requests and tracks the cancellable detail fetch.
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    event_tx: mpsc::UnboundedSender<Event>,
    shutdown: CancellationToken,
    /// Request id and token of the running detail fetch.
    detail: Option<(u64, CancellationToken)>,
    next_request_id: u64,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn Backend>,
        event_tx: mpsc::UnboundedSender<Event>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            backend,
            event_tx,
            shutdown,
            detail: None,
            next_request_id: 0,
        }
    }

    /// Fetches a snapshot for `ticket`.
    pub fn poll(&self, ticket: PollTicket) {
        debug!(
            generation = ticket.generation,
            seq = ticket.seq,
            reason = ?ticket.reason,
            "Polling"
        );
        let backend = Arc::clone(&self.backend);
        self.spawn("poll", self.shutdown.clone(), async move {
            let result = backend.fetch_snapshot().await;
            Event::PollCompleted { ticket, result }
        });
    }

    /// Sends one kill request for the live ids of `plan`.
    pub fn kill(&self, plan: KillPlan) {
        debug!(
            live = plan.live.len(),
            gone = plan.gone.len(),
            "Dispatching kill"
        );
        let backend = Arc::clone(&self.backend);
        self.spawn("kill", self.shutdown.clone(), async move {
            let result = backend.kill(&plan.live).await;
            Event::KillCompleted {
                ids: plan.live,
                gone: plan.gone,
                result,
            }
        });
    }

    pub fn execute(&self, query: String, db: Option<String>) {
        debug!(db = db.as_deref().unwrap_or("<default>"), "Executing query");
        let backend = Arc::clone(&self.backend);
        self.spawn("execute", self.shutdown.clone(), async move {
            let result = backend.execute(&query, db.as_deref()).await;
            Event::ExecuteCompleted(result)
        });
    }

    pub fn load_databases(&self) {
        let backend = Arc::clone(&self.backend);
        self.spawn("databases", self.shutdown.clone(), async move {
            Event::DatabasesLoaded(backend.list_databases().await)
        });
    }

    /// Starts a detail fetch, cancelling any previous one.
    ///
    /// Returns the request id the result will carry.
    pub fn fetch_detail(&mut self, kind: DetailKind, query: String) -> u64 {
        self.cancel_detail();

        self.next_request_id = self.next_request_id.wrapping_add(1);
        let request_id = self.next_request_id;
        let token = self.shutdown.child_token();
        self.detail = Some((request_id, token.clone()));

        debug!(request_id, ?kind, "Fetching detail");
        let backend = Arc::clone(&self.backend);
        self.spawn("detail", token, async move {
            let result = match kind {
                DetailKind::Recommendations => backend
                    .recommend(&query)
                    .await
                    .map(DetailPayload::Recommendations),
                DetailKind::Explain => backend.explain(&query).await.map(DetailPayload::Explain),
            };
            Event::DetailLoaded { request_id, result }
        });
        request_id
    }

    /// Cancels the running detail fetch, if any.
    pub fn cancel_detail(&mut self) {
        if let Some((request_id, token)) = self.detail.take() {
            debug!(request_id, "Cancelling detail fetch");
            token.cancel();
        }
    }

    /// Marks a detail fetch as finished.
    pub fn detail_finished(&mut self, request_id: u64) {
        if self.active_detail() == Some(request_id) {
            self.detail = None;
        }
    }

    pub fn active_detail(&self) -> Option<u64> {
        self.detail.as_ref().map(|(id, _)| *id)
    }

    fn spawn<F>(&self, request: &'static str, token: CancellationToken, future: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(request, "Request cancelled");
                }
                event = future => {
                    if event_tx.send(event).is_err() {
                        debug!(request, "Event channel closed, dropping result");
                    }
                }
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, TuiError};
    use async_trait::async_trait;
    use chrono::Utc;
    use mpm_core::{Engine, Process, ProcessId, Snapshot};
    use mpm_protocol::{
        ExecuteResult, ExplainResponse, KillResponse, PingResponse, RecommendResponse,
    };
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Backend whose detail calls block until released.
    struct StubBackend {
        release: Notify,
    }

    impl StubBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                release: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl Backend for StubBackend {
        async fn fetch_snapshot(&self) -> Result<Snapshot> {
            let process = Process {
                id: ProcessId::new(4),
                user: "app".to_string(),
                ..Default::default()
            };
            Ok(Snapshot::new(vec![process], Utc::now())?)
        }

        async fn list_databases(&self) -> Result<Vec<String>> {
            Ok(vec!["shop".to_string()])
        }

        async fn ping(&self) -> Result<PingResponse> {
            Ok(PingResponse {
                db: "ok".to_string(),
            })
        }

        async fn kill(&self, ids: &[ProcessId]) -> Result<KillResponse> {
            if ids.is_empty() {
                return Err(TuiError::Transport("no ids".to_string()));
            }
            Ok(KillResponse::default())
        }

        async fn execute(&self, _query: &str, db: Option<&str>) -> Result<ExecuteResult> {
            Ok(ExecuteResult::Message {
                message: format!("ran on {}", db.unwrap_or("default")),
            })
        }

        async fn explain(&self, _query: &str) -> Result<ExplainResponse> {
            self.release.notified().await;
            Ok(ExplainResponse::default())
        }

        async fn recommend(&self, _query: &str) -> Result<RecommendResponse> {
            self.release.notified().await;
            Ok(RecommendResponse {
                recommendations: vec!["Add an index".to_string()],
            })
        }
    }

    fn dispatcher(
        backend: Arc<StubBackend>,
    ) -> (Dispatcher, mpsc::UnboundedReceiver<Event>, CancellationToken) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        (Dispatcher::new(backend, tx, shutdown.clone()), rx, shutdown)
    }

    #[tokio::test]
    async fn test_poll_reports_ticket() {
        let (dispatcher, mut rx, _shutdown) = dispatcher(StubBackend::new());
        let mut engine = Engine::default();
        let ticket = engine.request_refresh();
        dispatcher.poll(ticket);

        match rx.recv().await {
            Some(Event::PollCompleted { ticket: got, result }) => {
                assert_eq!(got, ticket);
                assert_eq!(result.unwrap().len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_kill_reports_live_and_gone() {
        let (dispatcher, mut rx, _shutdown) = dispatcher(StubBackend::new());
        dispatcher.kill(KillPlan {
            live: vec![ProcessId::new(2)],
            gone: vec![ProcessId::new(9)],
        });

        match rx.recv().await {
            Some(Event::KillCompleted { ids, gone, result }) => {
                assert_eq!(ids, vec![ProcessId::new(2)]);
                assert_eq!(gone, vec![ProcessId::new(9)]);
                assert!(result.is_ok());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_passes_database() {
        let (dispatcher, mut rx, _shutdown) = dispatcher(StubBackend::new());
        dispatcher.execute("SELECT 1".to_string(), Some("shop".to_string()));

        match rx.recv().await {
            Some(Event::ExecuteCompleted(Ok(ExecuteResult::Message { message }))) => {
                assert_eq!(message, "ran on shop");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_detail_never_reports() {
        let backend = StubBackend::new();
        let (mut dispatcher, mut rx, _shutdown) = dispatcher(Arc::clone(&backend));

        let first = dispatcher.fetch_detail(DetailKind::Recommendations, "SELECT 1".to_string());
        dispatcher.cancel_detail();
        assert_eq!(dispatcher.active_detail(), None);
        tokio::task::yield_now().await;
        backend.release.notify_waiters();

        let outcome = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(
            outcome.is_err(),
            "cancelled request {first} reported a result"
        );
    }

    #[tokio::test]
    async fn test_new_detail_supersedes_previous() {
        let backend = StubBackend::new();
        let (mut dispatcher, mut rx, _shutdown) = dispatcher(Arc::clone(&backend));

        let first = dispatcher.fetch_detail(DetailKind::Recommendations, "SELECT 1".to_string());
        let second = dispatcher.fetch_detail(DetailKind::Explain, "SELECT 1".to_string());
        assert_ne!(first, second);
        assert_eq!(dispatcher.active_detail(), Some(second));

        // Let the surviving task reach its await point before releasing it.
        tokio::time::sleep(Duration::from_millis(10)).await;
        backend.release.notify_waiters();

        match rx.recv().await {
            Some(Event::DetailLoaded { request_id, result }) => {
                assert_eq!(request_id, second);
                assert!(matches!(result, Ok(DetailPayload::Explain(_))));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        dispatcher.detail_finished(second);
        assert_eq!(dispatcher.active_detail(), None);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_requests() {
        let backend = StubBackend::new();
        let (mut dispatcher, mut rx, shutdown) = dispatcher(Arc::clone(&backend));
        dispatcher.fetch_detail(DetailKind::Explain, "SELECT 1".to_string());
        shutdown.cancel();
        tokio::task::yield_now().await;
        backend.release.notify_waiters();

        let outcome = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(outcome.is_err());
    }
}
