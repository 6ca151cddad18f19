//! Remote API abstraction layer.
//!
//! This module defines the [`Backend`] trait, the wire types exchanged with
//! the hot-article service, and the HTTP implementation ([`HttpBackend`]).
//!
//! ## For contributors: adding a new endpoint
//!
//! 1. Add the request/response shapes to [`models`].
//! 2. Add a method to [`Backend`] and implement it in [`client`].
//! 3. Add a `Request`/`Outcome` pair in [`crate::worker`] and handle the
//!    outcome in [`crate::app::App::apply`].

pub mod client;
pub mod error;
pub mod models;

pub use client::HttpBackend;
pub use error::ApiError;
pub use models::{
    Article, ArticleQuery, CollectRunResult, FeedKind, Health, Source, SourceCollectResult,
    SourceDraft, SourcePatch, Tag,
};

use async_trait::async_trait;

use crate::probe::{ProbeError, ProbeReport};

/// Everything the client reaches over the network.
///
/// The worker calls these from independent tokio tasks, so implementations
/// must be [`Send`] + [`Sync`].  Tests substitute an in-memory fake.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn health(&self) -> Result<Health, ApiError>;

    /// Articles in server order, narrowed by `query`.
    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>, ApiError>;

    async fn list_sources(&self) -> Result<Vec<Source>, ApiError>;

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError>;

    async fn create_source(&self, draft: &SourceDraft) -> Result<Source, ApiError>;

    async fn update_source(&self, id: i64, patch: &SourcePatch) -> Result<Source, ApiError>;

    async fn delete_source(&self, id: i64) -> Result<(), ApiError>;

    /// Run a collection over every source.
    ///
    /// A non-success status still yields `Ok` with whatever result the body
    /// carried; only transport failures are errors.
    async fn collect_all(&self) -> Result<CollectRunResult, ApiError>;

    /// Run a collection for one source, with the same error contract as
    /// [`collect_all`](Backend::collect_all).
    async fn collect_source(&self, id: i64) -> Result<SourceCollectResult, ApiError>;

    /// The most recent collection run recorded by the server, if any.
    async fn collect_status(&self) -> Result<Option<CollectRunResult>, ApiError>;

    /// Fetch and parse a feed URL locally.
    async fn probe_feed(&self, kind: FeedKind, url: &str) -> Result<ProbeReport, ProbeError>;
}
