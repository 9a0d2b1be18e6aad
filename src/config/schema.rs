use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub lms: LmsConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub receipts: ReceiptsConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Static bearer token the messaging platform sends on every webhook call.
    #[serde(default, rename = "bearerToken")]
    pub bearer_token: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: String::new(),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bearer_token", &"***")
            .finish()
    }
}

/// The school's LMS: a Directus-style items API holding students, accounts,
/// meetings and payment requests, plus the asset store for receipt files.
#[derive(Clone, Serialize, Deserialize)]
pub struct LmsConfig {
    #[serde(default, rename = "baseUrl")]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
}

impl Default for LmsConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
        }
    }
}

impl std::fmt::Debug for LmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmsConfig")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .finish()
    }
}

/// WhatsApp Cloud API media endpoints. The token here is distinct from both
/// the webhook bearer token and the LMS token.
#[derive(Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_graph_url", rename = "graphUrl")]
    pub graph_url: String,
    #[serde(default)]
    pub token: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            graph_url: default_graph_url(),
            token: String::new(),
        }
    }
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("graph_url", &self.graph_url)
            .field("token", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Host of the payment portal used to build per-student pay links.
    #[serde(default, rename = "baseUrl")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptsConfig {
    /// How long a fresh, unreceipted payment request stays eligible for an
    /// inbound receipt image.
    #[serde(default = "default_fresh_window_mins", rename = "freshWindowMins")]
    pub fresh_window_mins: i64,
    /// Grace period during which a request the backend marked `failed` may
    /// still accept a re-submitted receipt.
    #[serde(default = "default_failed_window_days", rename = "failedWindowDays")]
    pub failed_window_days: i64,
    #[serde(default = "default_max_download_bytes", rename = "maxDownloadBytes")]
    pub max_download_bytes: usize,
}

impl Default for ReceiptsConfig {
    fn default() -> Self {
        Self {
            fresh_window_mins: default_fresh_window_mins(),
            failed_window_days: default_failed_window_days(),
            max_download_bytes: default_max_download_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_graph_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}

fn default_fresh_window_mins() -> i64 {
    60
}

fn default_failed_window_days() -> i64 {
    7
}

fn default_max_download_bytes() -> usize {
    10 * 1024 * 1024
}
