//! The receipt ingestion pipeline.
//!
//! The channel supplies no correlation id for "which payment is this image
//! for", so the target obligation is reconstructed purely from a
//! time/status-windowed lookup: the newest payment request for the sender
//! that is either fresh-and-unreceipted or recently failed. The pipeline is
//! the only part of the service that writes anywhere (asset upload + record
//! patch), and it is not idempotent — a platform redelivery while the
//! request is still unreceipted uploads a duplicate asset.

use crate::config::ReceiptsConfig;
use crate::errors::ClasslineResult;
use crate::event::ConversationalEvent;
use crate::lms::{LmsClient, PaymentRequest};
use crate::media::{MediaClient, derive_filename};
use crate::reply::ReplyPayload;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ReceiptIngestor {
    lms: Arc<LmsClient>,
    media: MediaClient,
    receipts: ReceiptsConfig,
}

impl ReceiptIngestor {
    pub fn new(lms: Arc<LmsClient>, media: MediaClient, receipts: ReceiptsConfig) -> Self {
        Self {
            lms,
            media,
            receipts,
        }
    }

    /// Handle an inbound Image/Document event. Like the router, this never
    /// errors to the caller: no eligible request is a prompt to start a
    /// payment, and everything else degrades to the generic failure payload
    /// with the detail kept in the logs.
    pub async fn ingest(&self, event: &ConversationalEvent) -> ReplyPayload {
        let request = match self
            .lms
            .latest_eligible_payment_request(&event.sender, Utc::now(), &self.receipts)
            .await
        {
            Ok(request) => request,
            Err(e) => {
                warn!("payment request lookup failed for {}: {}", event.sender, e);
                return ReplyPayload::failure();
            }
        };

        // A receipt with no open obligation is a legitimate "paid before
        // initiating" case, not an error.
        let Some(request) = request else {
            info!("no eligible payment request for {}", event.sender);
            return ReplyPayload::start_payment_prompt();
        };

        match self.attach(event, &request).await {
            Ok(asset_id) => ReplyPayload::text_with_home(format!(
                "✅ Receipt received!\nFile {} attached to payment request {}.",
                asset_id, request.id
            )),
            Err(e) => {
                warn!(
                    "receipt ingestion failed for {} (request {}): {}",
                    event.sender, request.id, e
                );
                ReplyPayload::failure()
            }
        }
    }

    /// Download the attachment, store it as an asset, and patch the payment
    /// request. Strictly sequential: the binary fetch needs the resolved
    /// URL, the patch needs the uploaded asset id.
    async fn attach(
        &self,
        event: &ConversationalEvent,
        request: &PaymentRequest,
    ) -> ClasslineResult<String> {
        let media = event.media.as_ref().ok_or_else(|| {
            crate::errors::ClasslineError::Media {
                stage: "inbound",
                message: "media event without a media reference".to_string(),
            }
        })?;

        if request.receipt.is_some() {
            // Only reachable through the failed-status window; the patch
            // below replaces the previous receipt reference.
            warn!(
                "payment request {} already has a receipt, re-attaching",
                request.id
            );
        }

        let download = self.media.download(media).await?;
        let filename = derive_filename(media, &download.mime_type);
        let asset_id = self
            .lms
            .upload_asset(&filename, &download.mime_type, download.bytes)
            .await?;
        self.lms.attach_receipt(&request.id, &asset_id).await?;

        info!(
            "attached receipt {} ({}) to payment request {}",
            asset_id, filename, request.id
        );
        Ok(asset_id)
    }
}
