//! Configuration for appforge.
//!
//! Settings are read from `.appforge/appforge.toml` (or an explicit path),
//! then overridden by environment variables (a `.env` file is honoured),
//! then by CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [backend]
//! local_origin = "http://localhost:5002"
//! default_port = "3000"
//! production_origin = "https://backend.magictasks.uk"
//! default_tenant = "default-app"
//! page_url = "http://localhost:3000"
//! # referrer = "https://acme.example.com"
//! # request_timeout_secs = 600
//!
//! [build]
//! default_model = "default-model"
//! model_api = "openrouter"
//! models = ["default-model"]
//!
//! [firebase]
//! environment = "development"
//! project_id = "demo-project"
//! api_key = "fake-api-key"
//! bucket = "demo-project.appspot.com"
//! host = "localhost"
//! auth_port = 9099
//! firestore_port = 8080
//! storage_port = 9199
//! functions_port = 5001
//! ```

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api_config::BackendEndpoints;
use crate::backend::MODEL_API;
use crate::validate::is_valid_app_name;

pub const CONFIG_DIR: &str = ".appforge";
pub const CONFIG_FILE: &str = "appforge.toml";

/// Where builds are sent and how the embedding page is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSection {
    #[serde(default = "default_local_origin")]
    pub local_origin: String,
    #[serde(default = "default_port")]
    pub default_port: String,
    #[serde(default = "default_production_origin")]
    pub production_origin: String,
    #[serde(default = "default_tenant")]
    pub default_tenant: String,
    /// Stand-in for the current page URL when no referrer is usable.
    #[serde(default = "default_page_url")]
    pub page_url: String,
    /// Referrer of the embedding page, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// Overall build request timeout. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_local_origin() -> String {
    BackendEndpoints::default().local_origin
}

fn default_port() -> String {
    BackendEndpoints::default().default_port
}

fn default_production_origin() -> String {
    BackendEndpoints::default().production_origin
}

fn default_tenant() -> String {
    BackendEndpoints::default().default_tenant
}

fn default_page_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            local_origin: default_local_origin(),
            default_port: default_port(),
            production_origin: default_production_origin(),
            default_tenant: default_tenant(),
            page_url: default_page_url(),
            referrer: None,
            request_timeout_secs: None,
        }
    }
}

impl BackendSection {
    pub fn endpoints(&self) -> BackendEndpoints {
        BackendEndpoints {
            local_origin: self.local_origin.clone(),
            default_port: self.default_port.clone(),
            production_origin: self.production_origin.clone(),
            default_tenant: self.default_tenant.clone(),
        }
    }

    pub fn page_url(&self) -> Result<Url> {
        Url::parse(&self.page_url)
            .with_context(|| format!("Invalid page_url '{}'", self.page_url))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Build request defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_model_api")]
    pub model_api: String,
    /// Models offered for selection. Empty means any id is accepted.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

fn default_model() -> String {
    "default-model".to_string()
}

fn default_model_api() -> String {
    MODEL_API.to_string()
}

fn default_models() -> Vec<String> {
    vec![default_model()]
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            model_api: default_model_api(),
            models: default_models(),
        }
    }
}

/// Emulators on localhost, or hosted endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirebaseEnvironment {
    #[default]
    Development,
    Production,
}

impl std::fmt::Display for FirebaseEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FirebaseEnvironment::Development => write!(f, "development"),
            FirebaseEnvironment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for FirebaseEnvironment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(FirebaseEnvironment::Development),
            "production" | "prod" => Ok(FirebaseEnvironment::Production),
            _ => anyhow::bail!(
                "Invalid Firebase environment '{}'. Valid values: development, production",
                s
            ),
        }
    }
}

/// Firebase probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseSection {
    #[serde(default)]
    pub environment: FirebaseEnvironment,
    #[serde(default = "default_project_id")]
    pub project_id: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Callable invoked by the functions probe.
    #[serde(default = "default_function")]
    pub function: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_auth_port")]
    pub auth_port: u16,
    #[serde(default = "default_firestore_port")]
    pub firestore_port: u16,
    #[serde(default = "default_storage_port")]
    pub storage_port: u16,
    #[serde(default = "default_functions_port")]
    pub functions_port: u16,
    // Production endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firestore_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions_url: Option<String>,
}

fn default_project_id() -> String {
    "demo-project".to_string()
}

fn default_api_key() -> String {
    "fake-api-key".to_string()
}

fn default_bucket() -> String {
    "demo-project.appspot.com".to_string()
}

fn default_region() -> String {
    "us-central1".to_string()
}

fn default_function() -> String {
    "helloWorld".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_auth_port() -> u16 {
    9099
}

fn default_firestore_port() -> u16 {
    8080
}

fn default_storage_port() -> u16 {
    9199
}

fn default_functions_port() -> u16 {
    5001
}

impl Default for FirebaseSection {
    fn default() -> Self {
        Self {
            environment: FirebaseEnvironment::default(),
            project_id: default_project_id(),
            api_key: default_api_key(),
            bucket: default_bucket(),
            region: default_region(),
            function: default_function(),
            host: default_host(),
            auth_port: default_auth_port(),
            firestore_port: default_firestore_port(),
            storage_port: default_storage_port(),
            functions_port: default_functions_port(),
            auth_url: None,
            firestore_url: None,
            storage_url: None,
            functions_url: None,
        }
    }
}

/// Root of `appforge.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppForgeToml {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub build: BuildSection,
    #[serde(default)]
    pub firebase: FirebaseSection,
}

impl AppForgeToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid TOML")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(referrer) = lookup("APPFORGE_REFERRER") {
            self.backend.referrer = Some(referrer);
        }
        if let Some(model) = lookup("APPFORGE_DEFAULT_MODEL") {
            self.build.default_model = model;
        }
        if let Some(env) = lookup("FIREBASE_ENVIRONMENT") {
            self.firebase.environment = env.parse()?;
        }
        let ports = [
            ("FIREBASE_AUTH_PORT", &mut self.firebase.auth_port),
            ("FIREBASE_FIRESTORE_PORT", &mut self.firebase.firestore_port),
            ("FIREBASE_STORAGE_PORT", &mut self.firebase.storage_port),
            ("FIREBASE_FUNCTIONS_PORT", &mut self.firebase.functions_port),
        ];
        for (key, slot) in ports {
            if let Some(raw) = lookup(key) {
                *slot = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a port number, got '{}'", key, raw))?;
            }
        }
        Ok(())
    }

    /// Non-fatal problems worth telling the user about.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if Url::parse(&self.backend.page_url).is_err() {
            warnings.push(format!(
                "backend.page_url '{}' is not an absolute URL",
                self.backend.page_url
            ));
        }
        for (key, origin) in [
            ("backend.local_origin", &self.backend.local_origin),
            ("backend.production_origin", &self.backend.production_origin),
        ] {
            if Url::parse(origin).is_err() {
                warnings.push(format!("{} '{}' is not an absolute URL", key, origin));
            }
        }
        if !self.backend.production_origin.starts_with("https://") {
            warnings.push("backend.production_origin does not use https".to_string());
        }
        if self.backend.default_port.parse::<u16>().is_err() {
            warnings.push(format!(
                "backend.default_port '{}' is not a port number",
                self.backend.default_port
            ));
        }
        if !is_valid_app_name(&self.backend.default_tenant) {
            warnings.push(format!(
                "backend.default_tenant '{}' is not a valid slug",
                self.backend.default_tenant
            ));
        }
        if let Some(referrer) = &self.backend.referrer {
            if Url::parse(referrer).is_err() {
                warnings.push(format!(
                    "backend.referrer '{}' is not a URL; page_url will be used",
                    referrer
                ));
            }
        }
        if self.backend.request_timeout_secs == Some(0) {
            warnings.push("backend.request_timeout_secs is 0; every build will time out".into());
        }
        if !self.build.models.is_empty() && !self.build.models.contains(&self.build.default_model)
        {
            warnings.push(format!(
                "build.default_model '{}' is not in build.models",
                self.build.default_model
            ));
        }
        if self.firebase.environment == FirebaseEnvironment::Production {
            let missing: Vec<&str> = [
                ("auth_url", &self.firebase.auth_url),
                ("firestore_url", &self.firebase.firestore_url),
                ("storage_url", &self.firebase.storage_url),
                ("functions_url", &self.firebase.functions_url),
            ]
            .into_iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k)
            .collect();
            if !missing.is_empty() {
                warnings.push(format!(
                    "firebase.environment is production but these are unset: {}",
                    missing.join(", ")
                ));
            }
        }

        warnings
    }
}

/// Resolved configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct Config {
    pub toml: AppForgeToml,
    /// File the settings were read from, if any.
    pub source: Option<PathBuf>,
}

impl Config {
    /// Load configuration with file → environment layering.
    ///
    /// `explicit` must exist when given. Otherwise the project file and then
    /// the user config directory are tried; if neither exists defaults apply.
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(warning) = dotenv_warning(dotenvy::dotenv()) {
            tracing::warn!("{}", warning);
        }

        let source = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::discover(project_dir),
        };

        let mut toml = match &source {
            Some(path) => AppForgeToml::load(path)?,
            None => AppForgeToml::default(),
        };
        toml.apply_env_overrides(|key| std::env::var(key).ok())?;

        tracing::debug!(source = ?source, "configuration loaded");
        Ok(Self { toml, source })
    }

    /// Default location of the project config file.
    pub fn project_path(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// The config file `load` would read without `--config`: the project
    /// file, else the user config directory's `appforge/appforge.toml`.
    pub fn discover(project_dir: &Path) -> Option<PathBuf> {
        let project = Self::project_path(project_dir);
        if project.exists() {
            return Some(project);
        }
        dirs::config_dir()
            .map(|dir| dir.join("appforge").join(CONFIG_FILE))
            .filter(|path| path.exists())
    }
}

/// A missing `.env` is normal; anything else is worth a warning.
fn dotenv_warning(result: dotenvy::Result<PathBuf>) -> Option<String> {
    match result {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded .env");
            None
        }
        Err(e) if e.not_found() => None,
        Err(e) => Some(format!("Ignoring .env file: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_backend_contract() {
        let toml = AppForgeToml::default();
        assert_eq!(toml.backend.local_origin, "http://localhost:5002");
        assert_eq!(toml.backend.production_origin, "https://backend.magictasks.uk");
        assert_eq!(toml.backend.default_tenant, "default-app");
        assert_eq!(toml.build.model_api, "openrouter");
        assert_eq!(toml.firebase.environment, FirebaseEnvironment::Development);
        assert!(toml.validate().is_empty());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let toml = AppForgeToml::parse(
            r#"
            [backend]
            local_origin = "http://127.0.0.1:7000"

            [firebase]
            environment = "production"
            auth_url = "https://auth.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(toml.backend.local_origin, "http://127.0.0.1:7000");
        assert_eq!(toml.backend.default_port, "3000");
        assert_eq!(toml.build.default_model, "default-model");
        assert_eq!(toml.firebase.environment, FirebaseEnvironment::Production);
        assert_eq!(toml.firebase.auth_port, 9099);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut toml = AppForgeToml::default();
        toml.backend.referrer = Some("https://acme.example.com".into());
        toml.save(&path).unwrap();

        let loaded = AppForgeToml::load(&path).unwrap();
        assert_eq!(
            loaded.backend.referrer.as_deref(),
            Some("https://acme.example.com")
        );
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[backend\nbroken").unwrap();
        let err = AppForgeToml::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut toml = AppForgeToml::default();
        toml.apply_env_overrides(env(&[
            ("APPFORGE_REFERRER", "https://shop.example.com"),
            ("APPFORGE_DEFAULT_MODEL", "fast-model"),
            ("FIREBASE_ENVIRONMENT", "production"),
            ("FIREBASE_STORAGE_PORT", "9300"),
        ]))
        .unwrap();
        assert_eq!(
            toml.backend.referrer.as_deref(),
            Some("https://shop.example.com")
        );
        assert_eq!(toml.build.default_model, "fast-model");
        assert_eq!(toml.firebase.environment, FirebaseEnvironment::Production);
        assert_eq!(toml.firebase.storage_port, 9300);
        assert_eq!(toml.firebase.auth_port, 9099);
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut toml = AppForgeToml::default();
        let err = toml
            .apply_env_overrides(env(&[("FIREBASE_AUTH_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(err.to_string().contains("FIREBASE_AUTH_PORT"));
    }

    #[test]
    fn validate_flags_problems() {
        let mut toml = AppForgeToml::default();
        toml.backend.page_url = "nope".into();
        toml.backend.default_tenant = "Bad Tenant".into();
        toml.build.default_model = "other".into();
        toml.firebase.environment = FirebaseEnvironment::Production;
        let warnings = toml.validate();
        assert!(warnings.iter().any(|w| w.contains("page_url")));
        assert!(warnings.iter().any(|w| w.contains("default_tenant")));
        assert!(warnings.iter().any(|w| w.contains("build.models")));
        assert!(warnings.iter().any(|w| w.contains("storage_url")));
    }

    #[test]
    fn endpoints_from_section() {
        let section = BackendSection {
            default_tenant: "fallback".into(),
            ..Default::default()
        };
        let endpoints = section.endpoints();
        assert_eq!(endpoints.default_tenant, "fallback");
        assert_eq!(endpoints.local_origin, "http://localhost:5002");
        assert_eq!(section.page_url().unwrap().port(), Some(3000));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(dir.path(), Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn project_file_is_discovered() {
        let dir = tempdir().unwrap();
        let path = Config::project_path(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[build]\nmodels = []\n").unwrap();

        let config = Config::load(dir.path(), None).unwrap();
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
        assert!(config.toml.build.models.is_empty());
    }

    #[test]
    fn missing_dotenv_is_silent() {
        let dir = tempdir().unwrap();
        let result = dotenvy::from_path(dir.path().join(".env")).map(|_| PathBuf::new());
        assert!(dotenv_warning(result).is_none());
    }

    #[test]
    fn malformed_dotenv_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "this is not dotenv\n").unwrap();

        let result = dotenvy::from_path(&path).map(|_| path.clone());
        let warning = dotenv_warning(result).unwrap();
        assert!(warning.starts_with("Ignoring .env file"));
    }

    #[test]
    fn environment_parses_aliases() {
        assert_eq!(
            "PROD".parse::<FirebaseEnvironment>().unwrap(),
            FirebaseEnvironment::Production
        );
        assert!("staging".parse::<FirebaseEnvironment>().is_err());
    }
}
