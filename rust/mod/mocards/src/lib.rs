pub mod api;
pub mod codes;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;
use mocards_core::Module;

use service::CardService;

/// MOCARDS module: dental perk cards, their clinics and registries.
pub struct MocardsModule {
    service: Arc<CardService>,
}

impl MocardsModule {
    pub fn new(service: CardService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

impl Module for MocardsModule {
    fn name(&self) -> &str {
        "mocards"
    }

    fn routes(&self) -> Router {
        api::router(self.service.clone())
    }
}
