//! Client for the school's LMS — a Directus-style items API that is the
//! system of record for students, accounts, meetings and payment requests,
//! plus the asset store receipts are uploaded into.
//!
//! Nothing here is cached: every lookup hits the store fresh, and the only
//! writes in the whole service (asset upload, receipt patch) live here.

use crate::config::{LmsConfig, ReceiptsConfig};
use crate::errors::{ClasslineError, ClasslineResult};
use crate::utils::http::default_http_client;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tracing::debug;

/// Generic `{ "data": ... }` envelope every LMS response is wrapped in.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// A billing entity grouping one or more students.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Account {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
}

/// A student record. Not owned by this system — fetched on demand, never
/// cached. `payment_token` is the one-time token the LMS issues for building
/// a payment-portal URL; records without one can't start a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct Student {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub payment_token: Option<String>,
    pub account: Account,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Meeting {
    pub class_name: String,
    pub link: String,
}

/// An external record representing money owed, awaiting proof of payment.
/// This service only ever reads it and patches its `receipt` field.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub status: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub receipt: Option<String>,
    pub date_created: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AssetRef {
    #[serde(deserialize_with = "de_id")]
    id: String,
}

pub struct LmsClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl LmsClient {
    pub fn new(config: &LmsConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            client: default_http_client(),
        }
    }

    /// All students registered under `phone`, optionally narrowed to one
    /// account. Order is whatever the store returns; callers rely on it
    /// being stable across a single request only.
    pub async fn students(
        &self,
        phone: &str,
        account_id: Option<&str>,
    ) -> ClasslineResult<Vec<Student>> {
        let mut clauses = vec![json!({ "phone": { "_eq": phone } })];
        if let Some(account_id) = account_id {
            clauses.push(json!({ "account": { "_eq": account_id } }));
        }
        let filter = json!({ "_and": clauses });
        self.get_items(
            "students",
            &[
                ("fields", "*,account.*".to_string()),
                ("filter", filter.to_string()),
            ],
        )
        .await
    }

    /// The single student scoped to `(phone, account, student)`, or `None`.
    pub async fn student(
        &self,
        phone: &str,
        account_id: &str,
        student_id: &str,
    ) -> ClasslineResult<Option<Student>> {
        let filter = json!({ "_and": [
            { "phone": { "_eq": phone } },
            { "account": { "_eq": account_id } },
            { "id": { "_eq": student_id } },
        ]});
        let mut students: Vec<Student> = self
            .get_items(
                "students",
                &[
                    ("fields", "*,account.*".to_string()),
                    ("filter", filter.to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(students.drain(..).next())
    }

    /// Scheduled class links for `phone`.
    pub async fn meetings(&self, phone: &str) -> ClasslineResult<Vec<Meeting>> {
        let filter = json!({ "phone": { "_eq": phone } });
        self.get_items("meetings", &[("filter", filter.to_string())])
            .await
    }

    /// The most recent payment request for `phone` still eligible to receive
    /// a receipt, per the two-window rule (see [`payment_window_filter`]).
    /// The store does the windowing; we just take the newest match.
    pub async fn latest_eligible_payment_request(
        &self,
        phone: &str,
        now: DateTime<Utc>,
        receipts: &ReceiptsConfig,
    ) -> ClasslineResult<Option<PaymentRequest>> {
        let filter = payment_window_filter(phone, now, receipts);
        let mut requests: Vec<PaymentRequest> = self
            .get_items(
                "payment_requests",
                &[
                    ("filter", filter.to_string()),
                    ("sort", "-date_created".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(requests.drain(..).next())
    }

    /// Upload a receipt binary into the asset store; returns the new asset id.
    pub async fn upload_asset(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> ClasslineResult<String> {
        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|e| ClasslineError::Lms {
                message: format!("invalid mime type '{}': {}", mime_type, e),
                status: None,
            })?;
        let form = multipart::Form::new().part("file", part);

        let url = format!("{}/files", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, "asset upload").await?;

        let envelope: Envelope<AssetRef> =
            response.json().await.map_err(|e| ClasslineError::Lms {
                message: format!("malformed asset-upload response: {}", e),
                status: None,
            })?;
        debug!("uploaded asset {}", envelope.data.id);
        Ok(envelope.data.id)
    }

    /// Patch a payment request's `receipt` field with an uploaded asset id.
    pub async fn attach_receipt(&self, request_id: &str, asset_id: &str) -> ClasslineResult<()> {
        let url = format!(
            "{}/items/payment_requests/{}",
            self.base_url,
            urlencoding::encode(request_id)
        );
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "receipt": asset_id }))
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response, "receipt patch").await?;
        debug!("attached asset {} to payment request {}", asset_id, request_id);
        Ok(())
    }

    async fn get_items<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &[(&str, String)],
    ) -> ClasslineResult<Vec<T>> {
        let url = format!("{}/items/{}", self.base_url, collection);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response, collection).await?;

        let envelope: Envelope<Vec<T>> =
            response.json().await.map_err(|e| ClasslineError::Lms {
                message: format!("malformed {} response: {}", collection, e),
                status: None,
            })?;
        Ok(envelope.data)
    }
}

/// The two-window eligibility filter for receipt attachment, as a Directus
/// filter object:
///
/// - window (a): created within the fresh window, no receipt yet, not paid;
/// - window (b): created within the failed-grace window and marked `failed`.
///
/// An open-but-unreceipted request older than the fresh window is deliberately
/// *not* eligible — only `failed` status earns the longer grace period.
pub fn payment_window_filter(phone: &str, now: DateTime<Utc>, receipts: &ReceiptsConfig) -> Value {
    let fresh_cutoff = now - Duration::minutes(receipts.fresh_window_mins);
    let failed_cutoff = now - Duration::days(receipts.failed_window_days);
    json!({ "_and": [
        { "phone": { "_eq": phone } },
        { "_or": [
            { "_and": [
                { "date_created": { "_gte": fresh_cutoff.to_rfc3339_opts(SecondsFormat::Secs, true) } },
                { "receipt": { "_null": true } },
                { "status": { "_neq": "paid" } },
            ]},
            { "_and": [
                { "date_created": { "_gte": failed_cutoff.to_rfc3339_opts(SecondsFormat::Secs, true) } },
                { "status": { "_eq": "failed" } },
            ]},
        ]},
    ]})
}

fn transport_error(e: reqwest::Error) -> ClasslineError {
    ClasslineError::Lms {
        message: format!("request failed: {}", e),
        status: None,
    }
}

async fn check_status(
    response: reqwest::Response,
    context: &str,
) -> ClasslineResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown".to_string());
    let snippet: String = body.chars().take(200).collect();
    Err(ClasslineError::Lms {
        message: format!("{}: {}", context, snippet),
        status: Some(status.as_u16()),
    })
}

/// Directus ids arrive as numbers or strings depending on the collection's
/// key type; normalize both to `String`.
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Str(String),
        Num(i64),
    }
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Str(s) => s,
        IdRepr::Num(n) => n.to_string(),
    })
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Str(String),
        Num(i64),
    }
    Ok(Option::<IdRepr>::deserialize(deserializer)?.map(|id| match id {
        IdRepr::Str(s) => s,
        IdRepr::Num(n) => n.to_string(),
    }))
}
