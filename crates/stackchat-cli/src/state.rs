//! Application Context

use std::sync::Arc;

use stackchat_core::{MockPlatform, PlatformClient, Result, SetupConfig};
use stackchat_runtime::LlamaStackClient;

/// Everything setup and the chat loop share, built once at startup
pub struct AppContext {
    /// Platform facade (Llama Stack, or the mock when offline)
    pub client: Arc<dyn PlatformClient>,

    pub setup: SetupConfig,
}

impl AppContext {
    pub fn from_env() -> Result<Self> {
        let setup = SetupConfig::from_env()?;
        let offline = std::env::var("STACKCHAT_OFFLINE").is_ok_and(|v| is_truthy(&v));

        let client: Arc<dyn PlatformClient> = if offline {
            let mut mock = MockPlatform::new();
            if let Some(document) = &setup.document {
                mock = mock.with_file(document.clone());
            }
            Arc::new(mock)
        } else {
            Arc::new(LlamaStackClient::from_env()?)
        };
        tracing::info!(platform = client.name(), "Platform client ready");

        Ok(Self { client, setup })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
