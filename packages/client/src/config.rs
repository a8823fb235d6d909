use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use weblounge_common::User;
use weblounge_editor::SessionOptions;

use crate::endpoints::Endpoints;

pub const DEFAULT_CONFIG_NAME: &str = "weblounge.config.json";

/// Client configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Scheme, host and port of the repository
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the REST API below `base_url`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Editing language
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserConfig>,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_endpoint() -> String {
    "/system/weblounge".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

impl ClientConfig {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: ClientConfig = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(ClientConfig::default())
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.base_url, &self.endpoint)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The configured editing user
    pub fn user(&self) -> Option<User> {
        self.user.as_ref().map(|u| User {
            id: u.id.clone(),
            name: u.name.clone(),
            realm: u.realm.clone(),
        })
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            language: self.language.clone(),
            ..SessionOptions::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            language: default_language(),
            user: None,
        }
    }
}
