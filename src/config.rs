use serde::Deserialize;
use tokio::fs;

use crate::errors::AppResult;

pub async fn load_config(path: &str) -> AppResult<Config> {
    let contents = fs::read_to_string(path).await?;
    let parsed = toml::from_str(&contents)?;
    Ok(parsed)
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub bind_address: String,
    /// Host (and optional port) used when building public links,
    /// e.g. `paste.example.com`.
    pub base_url: String,
    pub storage_dir: String,
    /// `hash` names uploads after their content digest, `random` uses a
    /// timestamp-seeded token instead.
    #[serde(default)]
    pub naming: NamingMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    #[default]
    Hash,
    Random,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    /// Shared secret for `X-Auth` uploads; doubles as the JWT signing key.
    pub upload_key: String,
    /// When false, form pastes skip the basic-auth gate. Uploads through
    /// `X-Auth` are always checked.
    #[serde(default = "default_require_auth")]
    pub require_auth: bool,
}

fn default_require_auth() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentationConfig {
    pub directives: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub auth: AuthConfig,
    pub instrumentation: InstrumentationConfig,
}
