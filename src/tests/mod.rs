mod identity;
mod sweeper;

use tempfile::TempDir;

use crate::{
    config::{AuthConfig, Config, GeneralConfig, InstrumentationConfig, NamingMode},
    AppContext,
};

pub(crate) const TEST_UPLOAD_KEY: &str = "test-upload-key";
pub(crate) const TEST_USERNAME: &str = "admin";
pub(crate) const TEST_PASSWORD: &str = "hunter2";

/// Fresh application context backed by a throwaway storage dir. The
/// TempDir must stay alive for as long as the context is used.
pub(crate) fn test_context() -> (AppContext, TempDir) {
    let dir = tempfile::tempdir().expect("create temp storage dir");
    let config = Config {
        general: GeneralConfig {
            bind_address: "127.0.0.1:0".into(),
            base_url: "paste.test".into(),
            storage_dir: dir.path().to_string_lossy().into_owned(),
            naming: NamingMode::Hash,
        },
        auth: AuthConfig {
            username: TEST_USERNAME.into(),
            password: TEST_PASSWORD.into(),
            upload_key: TEST_UPLOAD_KEY.into(),
            require_auth: true,
        },
        instrumentation: InstrumentationConfig { directives: vec![] },
    };
    (AppContext::new(config), dir)
}
