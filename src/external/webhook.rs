use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;

use crate::entities::ReservationDraft;
use crate::error::{upstream_error, Error};
use crate::external::{ReservationSink, SubmissionReceipt};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Acknowledgement {
    success: bool,
    reservation_id: Option<String>,
    notification_results: Option<serde_json::Value>,
}

/// Hands the composed reservation to the operator's notification relay. The
/// relay owns e-mail and messaging delivery; this side only needs the
/// acknowledgement.
#[derive(Debug, Default)]
pub struct BookingWebhook;

impl BookingWebhook {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReservationSink for BookingWebhook {
    #[tracing::instrument(skip_all)]
    async fn submit(&self, draft: &ReservationDraft) -> Result<SubmissionReceipt, Error> {
        let url = env::var("BOOKING_WEBHOOK_URL")?;

        let res = reqwest::Client::new().post(url).json(draft).send().await?;

        if !res.status().is_success() {
            return Err(upstream_error());
        }

        let ack: Acknowledgement = res.json().await?;

        if !ack.success {
            return Err(upstream_error());
        }

        Ok(SubmissionReceipt {
            reservation_id: ack.reservation_id.ok_or_else(upstream_error)?,
            notification_results: ack.notification_results,
        })
    }
}
