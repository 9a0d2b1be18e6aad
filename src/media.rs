//! Client for the WhatsApp Cloud API media endpoints.
//!
//! Fetching an attachment is a two-step dance: resolve the media id into a
//! short-lived download URL, then fetch the binary from that URL. Both calls
//! carry the WhatsApp bearer token, which is distinct from the LMS token.

use crate::config::WhatsAppConfig;
use crate::errors::{ClasslineError, ClasslineResult};
use crate::event::MediaRef;
use crate::utils::http::{bounded_body, default_http_client};
use crate::utils::safe_filename;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct MediaMetadata {
    url: Option<String>,
    mime_type: Option<String>,
}

/// A downloaded attachment binary plus the MIME type the platform reported
/// for it (which wins over the type declared in the webhook).
#[derive(Debug)]
pub struct MediaDownload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

pub struct MediaClient {
    graph_url: String,
    token: String,
    max_bytes: usize,
    client: reqwest::Client,
}

impl MediaClient {
    pub fn new(config: &WhatsAppConfig, max_bytes: usize) -> Self {
        Self {
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            max_bytes,
            client: default_http_client(),
        }
    }

    /// Resolve and download a media attachment.
    pub async fn download(&self, media: &MediaRef) -> ClasslineResult<MediaDownload> {
        let metadata = self.resolve(&media.id).await?;
        let url = metadata.url.ok_or(ClasslineError::Media {
            stage: "resolve",
            message: format!("no download url for media {}", media.id),
        })?;

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClasslineError::Media {
                stage: "download",
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(ClasslineError::Media {
                stage: "download",
                message: format!("status {}", response.status()),
            });
        }

        let bytes = bounded_body(response, self.max_bytes)
            .await
            .map_err(|e| ClasslineError::Media {
                stage: "download",
                message: e.to_string(),
            })?;
        debug!("downloaded media {} ({} bytes)", media.id, bytes.len());

        Ok(MediaDownload {
            bytes,
            mime_type: metadata
                .mime_type
                .unwrap_or_else(|| media.mime_type.clone()),
        })
    }

    /// `GET {graph}/{media_id}` — media metadata with a short-lived `url`.
    async fn resolve(&self, media_id: &str) -> ClasslineResult<MediaMetadata> {
        let url = format!("{}/{}", self.graph_url, urlencoding::encode(media_id));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ClasslineError::Media {
                stage: "resolve",
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(ClasslineError::Media {
                stage: "resolve",
                message: format!("status {}", response.status()),
            });
        }
        response.json().await.map_err(|e| ClasslineError::Media {
            stage: "resolve",
            message: format!("malformed metadata: {}", e),
        })
    }
}

/// The filename to store a receipt under: the channel-supplied one when
/// present, otherwise derived from the media id and MIME type.
pub fn derive_filename(media: &MediaRef, mime_type: &str) -> String {
    if let Some(name) = &media.filename {
        return safe_filename(name);
    }
    format!(
        "receipt_{}.{}",
        safe_filename(&media.id),
        extension_for_mime(mime_type)
    )
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/jpeg" | "image/jpg" => "jpg",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}
