//! Backend endpoint resolution from the embedding page.
//!
//! The referring origin decides where a build goes: `localhost` referrers talk
//! to a local backend and forward their port, anything else goes to the
//! production backend and forwards a tenant identifier taken from the
//! subdomain.

use std::collections::BTreeMap;

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Fixed origins and fallbacks used by [`resolve_api_config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEndpoints {
    pub local_origin: String,
    pub default_port: String,
    pub production_origin: String,
    pub default_tenant: String,
}

impl Default for BackendEndpoints {
    fn default() -> Self {
        Self {
            local_origin: "http://localhost:5002".to_string(),
            default_port: "3000".to_string(),
            production_origin: "https://backend.magictasks.uk".to_string(),
            default_tenant: "default-app".to_string(),
        }
    }
}

/// Where to send a build and what to add to its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub extra_body: BTreeMap<String, String>,
}

impl ApiConfig {
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Resolve the backend for one build attempt.
///
/// `referrer` wins when present and parseable; otherwise `page_url` is used.
/// A malformed referrer is logged, never returned as an error.
pub fn resolve_api_config(
    referrer: Option<&str>,
    page_url: &Url,
    endpoints: &BackendEndpoints,
) -> ApiConfig {
    let parent = match referrer.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => match Url::parse(raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(referrer = raw, error = %e, "Invalid referrer URL, using page URL");
                page_url.clone()
            }
        },
        None => page_url.clone(),
    };

    let hostname = parent.host_str().unwrap_or_default();
    let mut extra_body = BTreeMap::new();

    if hostname == "localhost" {
        let port = parent
            .port()
            .map(|p| p.to_string())
            .unwrap_or_else(|| endpoints.default_port.clone());
        extra_body.insert("port".to_string(), port);
        return ApiConfig {
            base_url: endpoints.local_origin.clone(),
            extra_body,
        };
    }

    let labels: Vec<&str> = hostname.split('.').collect();
    let tenant = if labels.len() > 2 {
        labels[0].to_string()
    } else {
        endpoints.default_tenant.clone()
    };
    extra_body.insert("app_name".to_string(), tenant);

    ApiConfig {
        base_url: endpoints.production_origin.clone(),
        extra_body,
    }
}
