//! Shared application state handed to every request handler and tool.

use std::sync::Arc;

use hivemind_db::KnowledgeStore;
use hivemind_embed::Embedder;
use hivemind_sanitize::Sanitizer;

use crate::auth::Authenticator;
use crate::config::ServerSettings;
use crate::notifier::Notifier;
use crate::services::{
    ApprovalService, IngestService, PrescreenService, RetrievalService, ReviewerService,
};
use crate::tools::ToolRegistry;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn Authenticator>,
    pub store: Arc<dyn KnowledgeStore>,
    pub embedder: Arc<dyn Embedder>,
    pub ingest: IngestService,
    pub retrieval: RetrievalService,
    pub approval: ApprovalService,
    pub prescreen: PrescreenService,
    pub reviewer: ReviewerService,
    pub notifier: Notifier,
    pub registry: Arc<ToolRegistry>,
    pub settings: Arc<ServerSettings>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        sanitizer: Arc<Sanitizer>,
        embedder: Arc<dyn Embedder>,
        auth: Arc<dyn Authenticator>,
        notifier: Notifier,
        settings: ServerSettings,
    ) -> Self {
        let ingest = IngestService::new(store.clone(), sanitizer, settings.max_content_len);
        let retrieval = RetrievalService::new(
            store.clone(),
            embedder.clone(),
            settings.search_limit_default,
            settings.search_limit_max,
        );
        let approval = ApprovalService::new(store.clone(), embedder.clone());
        let prescreen = PrescreenService::new(store.clone(), embedder.clone());
        let reviewer = ReviewerService::new(store.clone());

        Self {
            auth,
            store,
            embedder,
            ingest,
            retrieval,
            approval,
            prescreen,
            reviewer,
            notifier,
            registry: Arc::new(ToolRegistry::new()),
            settings: Arc::new(settings),
        }
    }
}
