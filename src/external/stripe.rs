use crate::config::StripeConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use stripe::{
    CheckoutSession, CheckoutSessionId, CheckoutSessionMode, CheckoutSessionPaymentStatus, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionPaymentMethodTypes,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub price_id: String,
    pub quantity: u64,
}

#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: String,
    pub metadata: HashMap<String, String>,
}

/// A hosted checkout session the user is redirected to.
#[derive(Debug, Clone)]
pub struct CheckoutSessionHandle {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionStatus {
    pub paid: bool,
    pub payment_intent_id: Option<String>,
}

/// Payment provider seam used by checkout. Implementations must not retry
/// internally beyond what their HTTP client does.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(&self, request: CreateSessionRequest)
    -> AppResult<CheckoutSessionHandle>;

    async fn retrieve_session(&self, session_id: &str) -> AppResult<CheckoutSessionStatus>;
}

#[derive(Clone)]
pub struct StripeService {
    client: Client,
}

impl StripeService {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(config.secret_key),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeService {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> AppResult<CheckoutSessionHandle> {
        let line_items = request
            .line_items
            .iter()
            .map(|item| CreateCheckoutSessionLineItems {
                price: Some(item.price_id.clone()),
                quantity: Some(item.quantity),
                ..Default::default()
            })
            .collect();

        let mut params = CreateCheckoutSession::new();
        params.mode = Some(CheckoutSessionMode::Payment);
        params.payment_method_types = Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]);
        params.line_items = Some(line_items);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.customer_email = Some(&request.customer_email);
        params.metadata = Some(request.metadata.clone());

        let session = CheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create checkout session: {e}"))
            })?;

        Ok(CheckoutSessionHandle {
            id: session.id.to_string(),
            url: session.url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> AppResult<CheckoutSessionStatus> {
        let id: CheckoutSessionId = session_id
            .parse()
            .map_err(|_| AppError::ValidationError("Invalid checkout session id".to_string()))?;

        let session = CheckoutSession::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to retrieve checkout session: {e}"))
            })?;

        Ok(CheckoutSessionStatus {
            paid: session.payment_status == CheckoutSessionPaymentStatus::Paid,
            payment_intent_id: session.payment_intent.map(|pi| pi.id().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stripe_service_creation() {
        let config = StripeConfig {
            secret_key: "sk_test_123".to_string(),
            success_url: "https://example.org/ok".to_string(),
            cancel_url: "https://example.org/cancel".to_string(),
        };
        let service = StripeService::new(config);
        let _gateway: &dyn PaymentGateway = &service;
    }
}
