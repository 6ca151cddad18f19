//! Background request execution.
//!
//! The view-model never performs I/O.  It queues [`Request`]s; the main loop
//! hands each one to [`Worker::dispatch`], which runs it as its own tokio
//! task and sends the [`Outcome`] back over an unbounded channel that the
//! main loop drains every tick.
//!
//! ## For contributors
//!
//! Requests are independent: there is no queueing, ordering or cancellation
//! between them.  Anything that must not apply out of order (article reads)
//! carries a sequence number that the view-model checks.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::api::{
    ApiError, Article, ArticleQuery, Backend, CollectRunResult, FeedKind, Health, Source,
    SourceCollectResult, SourceDraft, SourcePatch, Tag,
};
use crate::probe::{ProbeError, ProbeReport};

/// Work queued by the view-model.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Health,
    Articles { seq: u64, query: ArticleQuery },
    Sources,
    Tags,
    CollectStatus,
    /// `form` identifies the form the save came from.
    CreateSource { form: u64, draft: SourceDraft },
    UpdateSource { form: u64, id: i64, patch: SourcePatch },
    DeleteSource(i64),
    CollectAll,
    CollectSource(i64),
    Probe { source_id: i64, kind: FeedKind, url: String },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Articles { .. } => "list_articles",
            Self::Sources => "list_sources",
            Self::Tags => "list_tags",
            Self::CollectStatus => "collect_status",
            Self::CreateSource { .. } => "create_source",
            Self::UpdateSource { .. } => "update_source",
            Self::DeleteSource(_) => "delete_source",
            Self::CollectAll => "collect_all",
            Self::CollectSource(_) => "collect_source",
            Self::Probe { .. } => "probe_feed",
        }
    }
}

/// Result of a [`Request`], sent back to the UI thread.
#[derive(Debug)]
pub enum Outcome {
    Health(Result<Health, ApiError>),
    Articles {
        seq: u64,
        result: Result<Vec<Article>, ApiError>,
    },
    Sources(Result<Vec<Source>, ApiError>),
    Tags(Result<Vec<Tag>, ApiError>),
    CollectStatus(Result<Option<CollectRunResult>, ApiError>),
    SourceSaved {
        form: u64,
        created: bool,
        result: Result<Source, ApiError>,
    },
    SourceDeleted {
        id: i64,
        result: Result<(), ApiError>,
    },
    CollectFinished(Result<CollectRunResult, ApiError>),
    SourceCollectFinished {
        id: i64,
        result: Result<SourceCollectResult, ApiError>,
    },
    Probed {
        source_id: i64,
        result: Result<ProbeReport, ProbeError>,
    },
}

/// Run one request to completion against `backend`.
pub async fn execute(backend: &dyn Backend, request: Request) -> Outcome {
    match request {
        Request::Health => Outcome::Health(backend.health().await),
        Request::Articles { seq, query } => Outcome::Articles {
            seq,
            result: backend.list_articles(&query).await,
        },
        Request::Sources => Outcome::Sources(backend.list_sources().await),
        Request::Tags => Outcome::Tags(backend.list_tags().await),
        Request::CollectStatus => Outcome::CollectStatus(backend.collect_status().await),
        Request::CreateSource { form, draft } => Outcome::SourceSaved {
            form,
            created: true,
            result: backend.create_source(&draft).await,
        },
        Request::UpdateSource { form, id, patch } => Outcome::SourceSaved {
            form,
            created: false,
            result: backend.update_source(id, &patch).await,
        },
        Request::DeleteSource(id) => Outcome::SourceDeleted {
            id,
            result: backend.delete_source(id).await,
        },
        Request::CollectAll => Outcome::CollectFinished(backend.collect_all().await),
        Request::CollectSource(id) => Outcome::SourceCollectFinished {
            id,
            result: backend.collect_source(id).await,
        },
        Request::Probe {
            source_id,
            kind,
            url,
        } => Outcome::Probed {
            source_id,
            result: backend.probe_feed(kind, &url).await,
        },
    }
}

impl Outcome {
    /// Error text, if this outcome is a failure.
    fn failure(&self) -> Option<String> {
        fn err<T, E: std::fmt::Display>(result: &Result<T, E>) -> Option<String> {
            result.as_ref().err().map(ToString::to_string)
        }
        match self {
            Self::Health(r) => err(r),
            Self::Articles { result, .. } => err(result),
            Self::Sources(r) => err(r),
            Self::Tags(r) => err(r),
            Self::CollectStatus(r) => err(r),
            Self::SourceSaved { result, .. } => err(result),
            Self::SourceDeleted { result, .. } => err(result),
            Self::CollectFinished(r) => err(r),
            Self::SourceCollectFinished { result, .. } => err(result),
            Self::Probed { result, .. } => err(result),
        }
    }
}

/// Spawns request tasks onto a tokio runtime.
pub struct Worker {
    runtime: Handle,
    backend: Arc<dyn Backend>,
    outcomes: mpsc::UnboundedSender<Outcome>,
}

impl Worker {
    /// Create a worker and the receiver its outcomes arrive on.
    pub fn new(
        runtime: Handle,
        backend: Arc<dyn Backend>,
    ) -> (Self, mpsc::UnboundedReceiver<Outcome>) {
        let (outcomes, rx) = mpsc::unbounded_channel();
        (
            Self {
                runtime,
                backend,
                outcomes,
            },
            rx,
        )
    }

    pub fn dispatch(&self, request: Request) {
        let name = request.name();
        tracing::debug!(request = name, "dispatching request");

        let backend = Arc::clone(&self.backend);
        let outcomes = self.outcomes.clone();
        self.runtime.spawn(async move {
            let outcome = execute(backend.as_ref(), request).await;
            if let Some(error) = outcome.failure() {
                tracing::warn!(request = name, %error, "request failed");
            }
            // If the receiver is gone the UI has exited; nothing to report to.
            let _ = outcomes.send(outcome);
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
