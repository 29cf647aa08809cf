// Application state for HTTP handlers
use crate::application::chart_service::ChartService;
use crate::application::custom_graph_service::CustomGraphService;

#[derive(Clone)]
pub struct AppState {
    pub chart_service: ChartService,
    pub custom_graph_service: CustomGraphService,
}
