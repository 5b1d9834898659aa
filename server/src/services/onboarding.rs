//! Payment-account onboarding flow.
//!
//! Each owning account moves through: nothing yet → account creation
//! pending → connected, with the embedded onboarding widget reporting when
//! the organizer leaves it. Only one creation request per owner may be in
//! flight; a second one is refused until the first resolves or fails.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;

use super::payments::{ConnectAccounts, ConnectedAccount, PaymentsError};

pub const HEADLINE_NOT_CONNECTED: &str = "Get ready for take off";
pub const HEADLINE_CONNECTED: &str = "Add information to start accepting money";
pub const ERROR_MESSAGE: &str = "Something went wrong!";
pub const CREATING_ACCOUNT: &str = "Creating a connected account...";
pub const ONBOARDING_EXITED: &str = "The Account Onboarding component has exited";

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("A connected account is already being created")]
    Busy,

    #[error("A connected account already exists: {0}")]
    AlreadyConnected(String),

    #[error("No connected account exists yet")]
    NotConnected,

    #[error("Connected account creation failed")]
    CreationFailed(#[source] PaymentsError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingState {
    pub account_create_pending: bool,
    pub connected_account_id: Option<String>,
    pub onboarding_exited: bool,
    pub error: bool,
}

/// What the onboarding screen should show for a given state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingView {
    pub headline: &'static str,
    pub sign_up_available: bool,
    /// Account the embedded onboarding widget should be opened for.
    pub onboarding_account_id: Option<String>,
    pub error_message: Option<&'static str>,
    pub callouts: Vec<String>,
}

impl OnboardingState {
    pub fn begin_account_creation(&mut self) -> Result<(), OnboardingError> {
        if self.account_create_pending {
            return Err(OnboardingError::Busy);
        }
        if let Some(id) = &self.connected_account_id {
            return Err(OnboardingError::AlreadyConnected(id.clone()));
        }
        self.account_create_pending = true;
        self.error = false;
        Ok(())
    }

    pub fn account_created(&mut self, account: ConnectedAccount) {
        self.account_create_pending = false;
        self.connected_account_id = Some(account.id);
    }

    pub fn account_creation_failed(&mut self) {
        self.account_create_pending = false;
        self.error = true;
    }

    /// The request went away before the platform answered.
    pub fn account_creation_abandoned(&mut self) {
        self.account_create_pending = false;
    }

    pub fn exit_onboarding(&mut self) -> Result<(), OnboardingError> {
        if self.connected_account_id.is_none() {
            return Err(OnboardingError::NotConnected);
        }
        self.onboarding_exited = true;
        Ok(())
    }

    pub fn view(&self) -> OnboardingView {
        let connected = self.connected_account_id.is_some();

        let mut callouts = Vec::new();
        if let Some(id) = &self.connected_account_id {
            callouts.push(format!("Your connected account ID is: {}", id));
        }
        if self.account_create_pending {
            callouts.push(CREATING_ACCOUNT.to_string());
        }
        if self.onboarding_exited {
            callouts.push(ONBOARDING_EXITED.to_string());
        }

        OnboardingView {
            headline: if connected {
                HEADLINE_CONNECTED
            } else {
                HEADLINE_NOT_CONNECTED
            },
            sign_up_available: !self.account_create_pending && !connected,
            onboarding_account_id: self.connected_account_id.clone(),
            error_message: self.error.then_some(ERROR_MESSAGE),
            callouts,
        }
    }
}

/// Onboarding state for every owning account seen by this process.
///
/// The map is only locked for short synchronous updates, never across the
/// outbound platform request.
#[derive(Default)]
pub struct OnboardingRegistry {
    states: Mutex<HashMap<String, OnboardingState>>,
}

/// Clears the busy flag if a creation request is dropped before the
/// platform answers.
struct PendingCreation<'a> {
    registry: &'a OnboardingRegistry,
    owner_account_id: &'a str,
    settled: bool,
}

impl Drop for PendingCreation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(
                owner_account_id = self.owner_account_id,
                "Connected account creation was abandoned"
            );
            self.registry
                .update(self.owner_account_id, OnboardingState::account_creation_abandoned);
        }
    }
}

impl OnboardingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<R>(&self, owner_account_id: &str, f: impl FnOnce(&mut OnboardingState) -> R) -> R {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        f(states.entry(owner_account_id.to_string()).or_default())
    }

    pub fn state(&self, owner_account_id: &str) -> OnboardingState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(owner_account_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Create the connected account for `owner_account_id`.
    pub async fn create_account(
        &self,
        payments: &dyn ConnectAccounts,
        owner_account_id: &str,
    ) -> Result<OnboardingState, OnboardingError> {
        self.update(owner_account_id, OnboardingState::begin_account_creation)?;
        let mut pending = PendingCreation {
            registry: self,
            owner_account_id,
            settled: false,
        };

        let result = payments.create_account(owner_account_id).await;
        pending.settled = true;

        match result {
            Ok(account) => Ok(self.update(owner_account_id, |state| {
                state.account_created(account);
                state.clone()
            })),
            Err(e) => {
                tracing::error!(error = %e, owner_account_id, "Connected account creation failed");
                self.update(owner_account_id, OnboardingState::account_creation_failed);
                Err(OnboardingError::CreationFailed(e))
            }
        }
    }

    pub fn exit_onboarding(
        &self,
        owner_account_id: &str,
    ) -> Result<OnboardingState, OnboardingError> {
        self.update(owner_account_id, |state| -> Result<_, OnboardingError> {
            state.exit_onboarding()?;
            Ok(state.clone())
        })
    }
}
