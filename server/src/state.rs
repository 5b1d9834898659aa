use std::sync::Arc;

use crate::repository::EventStore;
use crate::services::onboarding::OnboardingRegistry;
use crate::services::payments::ConnectAccounts;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub events: Arc<dyn EventStore>,
    pub payments: Arc<dyn ConnectAccounts>,
    pub onboarding: Arc<OnboardingRegistry>,
}

impl AppState {
    pub fn new(events: Arc<dyn EventStore>, payments: Arc<dyn ConnectAccounts>) -> Self {
        Self {
            events,
            payments,
            onboarding: Arc::new(OnboardingRegistry::new()),
        }
    }
}
