use crate::services::{ai_provider::AiProvider, metrics::MetricsService, usage_meter::UsageMeter};
use std::sync::Arc;

pub mod chat;
pub mod docs;
pub mod health;
pub mod metrics;
pub mod usage;

#[derive(Clone)]
pub struct AppState {
    pub meter: UsageMeter,
    pub provider: Arc<dyn AiProvider>,
    pub metrics: Arc<MetricsService>,
}
