use std::sync::Arc;
use std::time::Duration;

use crate::services::{
    credentials::CredentialStore, drive::SpreadsheetSource, jobs::JobStore,
    orchestrator::Orchestrator, resources::ResourceLister, search::SearchService,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialStore>,
    pub lister: ResourceLister,
    pub orchestrator: Arc<Orchestrator>,
    pub search: Arc<SearchService>,
    /// Pending age after which a job is reported as stale
    pub stale_job_after: Duration,
}

impl AppState {
    pub fn new(
        credentials: CredentialStore,
        source: Arc<dyn SpreadsheetSource>,
        search_max_spreadsheets: usize,
        stale_job_after: Duration,
    ) -> Self {
        let credentials = Arc::new(credentials);
        let lister = ResourceLister::new(credentials.clone(), source);
        let orchestrator = Orchestrator::new(lister.clone(), Arc::new(JobStore::new()));
        let search = SearchService::new(lister.clone(), search_max_spreadsheets);

        Self {
            credentials,
            lister,
            orchestrator: Arc::new(orchestrator),
            search: Arc::new(search),
            stale_job_after,
        }
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        self.orchestrator.jobs()
    }
}
