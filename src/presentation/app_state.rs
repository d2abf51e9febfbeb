// Application state for HTTP handlers
use crate::application::command_service::CommandService;
use crate::application::ingest_service::IngestService;
use crate::application::query_service::QueryService;

#[derive(Clone)]
pub struct AppState {
    pub ingest_service: IngestService,
    pub query_service: QueryService,
    pub command_service: CommandService,
}
