//! Connected-account creation on the payments platform.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PaymentsConfig;

/// Account issued by the payments platform for an organizer's payouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    pub id: String,
}

#[derive(Debug, Error)]
pub enum PaymentsError {
    #[error("Payments platform is not configured")]
    NotConfigured,

    #[error("Payments platform request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Payments platform rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[async_trait]
pub trait ConnectAccounts: Send + Sync {
    async fn create_account(&self, owner_account_id: &str)
        -> Result<ConnectedAccount, PaymentsError>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// REST client for the payments platform's accounts endpoint.
#[derive(Clone)]
pub struct StripeConnectClient {
    http: Client,
    api_base: String,
    secret_key: Option<String>,
}

impl StripeConnectClient {
    pub fn new(config: &PaymentsConfig) -> Self {
        Self {
            http: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }

    fn accounts_url(&self) -> String {
        format!("{}/v1/accounts", self.api_base)
    }
}

#[async_trait]
impl ConnectAccounts for StripeConnectClient {
    async fn create_account(
        &self,
        owner_account_id: &str,
    ) -> Result<ConnectedAccount, PaymentsError> {
        let secret_key = self.secret_key.as_deref().ok_or(PaymentsError::NotConfigured)?;

        let params = [
            ("controller[stripe_dashboard][type]", "none"),
            ("controller[fees][payer]", "application"),
            ("controller[losses][payments]", "application"),
            ("controller[requirement_collection]", "application"),
            ("capabilities[transfers][requested]", "true"),
            ("metadata[owner_account_id]", owner_account_id),
        ];

        let response = self
            .http
            .post(self.accounts_url())
            .bearer_auth(secret_key)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorEnvelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| "no error message".to_string());
            tracing::warn!(status = status.as_u16(), %message, "Connected account creation rejected");
            return Err(PaymentsError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let account = response.json::<ConnectedAccount>().await?;
        tracing::info!(account_id = %account.id, owner_account_id, "Connected account created");
        Ok(account)
    }
}
