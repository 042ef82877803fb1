use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::store::Store;
use crate::services::ticket_workflow::TicketWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub workflow: Arc<TicketWorkflow>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, workflow: Arc<TicketWorkflow>, config: Arc<AppConfig>) -> Self {
        AppState {
            store,
            workflow,
            config,
        }
    }
}
