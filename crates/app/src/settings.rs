use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "bandconnect";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "BANDCONNECT_";
pub const DEFAULT_LOGIN_EMAIL: &str = "john@example.com";
pub const DEFAULT_LOG_FILTER: &str = "info,bandconnect=debug,bandconnect_messaging=debug";
/// Users active within this window count as online.
pub const DEFAULT_ONLINE_WINDOW_SECONDS: u64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Email of the account signed in at startup. Blank means nobody is signed in.
    #[serde(default = "default_login_email")]
    pub login_email: String,
    #[serde(default = "default_online_window_seconds")]
    pub online_window_seconds: u64,
    #[serde(default = "default_seed_sample_data")]
    pub seed_sample_data: bool,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            login_email: default_login_email(),
            online_window_seconds: default_online_window_seconds(),
            seed_sample_data: default_seed_sample_data(),
            log_filter: default_log_filter(),
        }
    }
}

impl AppSettings {
    pub fn online_window(&self) -> Duration {
        Duration::from_secs(self.online_window_seconds)
    }

    pub fn normalized(mut self) -> Self {
        self.login_email = self.login_email.trim().to_string();
        self.log_filter = if self.log_filter.trim().is_empty() {
            default_log_filter()
        } else {
            self.log_filter.trim().to_string()
        };
        if self.online_window_seconds == 0 {
            self.online_window_seconds = default_online_window_seconds();
        }
        self
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<AppSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".bandconnect"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<AppSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: AppSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    /// Writes the effective settings when no settings file exists yet.
    /// Returns whether a file was written.
    pub fn write_if_missing(&self) -> Result<bool, SettingsError> {
        if self.config_path.exists() {
            return Ok(false);
        }
        self.update(self.settings().as_ref().clone())?;
        tracing::info!(path = ?self.config_path, "wrote initial settings file");
        Ok(true)
    }

    fn load_from_disk(path: &Path) -> AppSettings {
        let mut figment = Figment::from(Serialized::defaults(AppSettings::default()));
        if path.exists() {
            figment = figment.merge(Json::file(path));
        } else {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }
        figment = figment.merge(Env::prefixed(SETTINGS_ENV_PREFIX));

        match figment.extract::<AppSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                AppSettings::default()
            }
        }
    }

    fn persist(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        let directory = self
            .config_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty());
        if let Some(directory) = directory {
            std::fs::create_dir_all(directory).context(PrepareDirectorySnafu {
                stage: "prepare-settings-directory",
                directory: directory.to_path_buf(),
            })?;
        }

        let encoded = serde_json::to_vec_pretty(settings).context(EncodeSnafu {
            stage: "encode-settings",
        })?;

        let staged = self.config_path.with_extension("json.partial");
        std::fs::write(&staged, encoded).context(CommitSnafu {
            stage: "stage-settings-file",
            path: staged.clone(),
        })?;
        std::fs::rename(&staged, &self.config_path).context(CommitSnafu {
            stage: "commit-settings-file",
            path: self.config_path.clone(),
        })?;

        tracing::debug!(path = ?self.config_path, "settings written");
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("cannot prepare {directory:?} on `{stage}`: {source}"))]
    PrepareDirectory {
        stage: &'static str,
        directory: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot encode settings on `{stage}`: {source}"))]
    Encode {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("cannot write {path:?} on `{stage}`: {source}"))]
    Commit {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

fn default_login_email() -> String {
    DEFAULT_LOGIN_EMAIL.to_string()
}

fn default_online_window_seconds() -> u64 {
    DEFAULT_ONLINE_WINDOW_SECONDS
}

fn default_seed_sample_data() -> bool {
    true
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
