pub mod loader;
pub mod schema;

pub use loader::{get_classline_home, get_config_path, load_config};
pub use schema::{Config, LmsConfig, PortalConfig, ReceiptsConfig, ServerConfig, WhatsAppConfig};
