//! Payment rail integration
//!
//! Disbursement hands the approved principal to an external funds-transfer
//! service. [`HttpPaymentRail`] talks to a real rail over HTTP;
//! [`SimulatedPaymentRail`] is used when no rail is configured and returns a
//! synthetic reference.

use std::time::Duration;

use axum::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Payment rail errors
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment rail request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Payment rail rejected transfer ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Transfer amount must be positive")]
    InvalidAmount,
}

/// Funds transfer request sent on disbursement
#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    /// Idempotency reference, stable per loan
    pub reference: String,
    pub loan_id: Uuid,
    pub amount: i64,
    /// Client or group receiving the funds
    pub recipient: Uuid,
}

impl TransferRequest {
    pub fn for_loan(loan_id: Uuid, recipient: Uuid, amount: i64) -> Self {
        Self {
            reference: format!("disb-{}", loan_id.simple()),
            loan_id,
            amount,
            recipient,
        }
    }
}

/// Receipt returned by the rail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: String,
    pub status: String,
}

#[async_trait]
pub trait PaymentRail: Send + Sync {
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PaymentError>;

    fn name(&self) -> &'static str;
}

/// HTTP payment rail client
pub struct HttpPaymentRail {
    base_url: String,
    client: Client,
}

impl HttpPaymentRail {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PaymentError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Deserialize)]
struct RailErrorBody {
    message: Option<String>,
}

#[async_trait]
impl PaymentRail for HttpPaymentRail {
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PaymentError> {
        if request.amount <= 0 {
            return Err(PaymentError::InvalidAmount);
        }

        let response = self
            .client
            .post(format!("{}/transfers", self.base_url))
            .header("Idempotency-Key", &request.reference)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<RailErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<TransferReceipt>().await?)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Stand-in rail for development and tests
#[derive(Default)]
pub struct SimulatedPaymentRail;

#[async_trait]
impl PaymentRail for SimulatedPaymentRail {
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, PaymentError> {
        if request.amount <= 0 {
            return Err(PaymentError::InvalidAmount);
        }

        let suffix: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
        tracing::warn!(
            loan_id = %request.loan_id,
            amount = request.amount,
            "Using simulated payment rail - no funds were moved"
        );

        Ok(TransferReceipt {
            transfer_id: format!("sim_{}_{}", request.reference, suffix),
            status: "completed".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
