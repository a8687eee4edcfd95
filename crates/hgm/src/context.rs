use anyhow::{Context as _, Result};
use hgm_api::{default_home_dir, ApiClient, Config, KvStore, NotificationLog, Session};
use std::sync::Arc;

/// Everything a command needs: config, a client with the persisted session
/// restored, and the local store.
pub struct Context {
    pub config: Config,
    pub client: Arc<ApiClient>,
    pub store: KvStore,
}

impl Context {
    pub fn load() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        let home = default_home_dir()?;
        let store = KvStore::open(&home)
            .with_context(|| format!("Failed to open local store in {}", home.display()))?;

        let client = ApiClient::new(config.client_config())
            .context("Failed to create HTTP client")?
            .with_store(store.clone());
        client
            .restore_session()
            .context("Failed to read saved session")?;

        log::debug!("Using API at {}", client.base_url());
        Ok(Self {
            config,
            client: Arc::new(client),
            store,
        })
    }

    pub fn notification_log(&self) -> NotificationLog {
        NotificationLog::new(self.store.clone())
    }

    /// The current session, or an error telling the user to log in.
    pub fn require_session(&self) -> Result<Session> {
        self.client
            .session()
            .context("Not logged in. Run `hgm auth login` first.")
    }
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
