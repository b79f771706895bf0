//! Firebase feature probes.
//!
//! Each probe makes one round trip against a Firebase service (emulator or
//! hosted) and reports a single display line. No retries, no recovery.

pub mod client;

use std::fmt;

use crate::config::{FirebaseEnvironment, FirebaseSection};
use crate::ui::icons::{CHECK, CROSS};

pub use client::FirebaseProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Auth,
    Firestore,
    Storage,
    Functions,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 4] = [
        ProbeKind::Auth,
        ProbeKind::Firestore,
        ProbeKind::Storage,
        ProbeKind::Functions,
    ];

    pub fn service(&self) -> &'static str {
        match self {
            ProbeKind::Auth => "Auth",
            ProbeKind::Firestore => "Firestore",
            ProbeKind::Storage => "Storage",
            ProbeKind::Functions => "Functions",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.service().to_lowercase())
    }
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub kind: ProbeKind,
    pub outcome: Result<String, String>,
}

impl ProbeReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(detail) => write!(f, "{}{}: {}", CHECK, self.kind.service(), detail),
            Err(message) => write!(f, "{}{} error: {}", CROSS, self.kind.service(), message),
        }
    }
}

/// Base URLs and identifiers the probes talk to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseEndpoints {
    pub auth: Option<String>,
    pub firestore: Option<String>,
    pub storage: Option<String>,
    pub functions: Option<String>,
    pub project_id: String,
    pub api_key: String,
    pub bucket: String,
    pub region: String,
    pub function: String,
    /// Emulators accept the `owner` bearer token and bypass security rules.
    pub emulator: bool,
}

impl FirebaseEndpoints {
    pub fn from_config(section: &FirebaseSection) -> Self {
        let (auth, firestore, storage, functions, emulator) = match section.environment {
            FirebaseEnvironment::Development => {
                let local = |port: u16| format!("http://{}:{}", section.host, port);
                (
                    Some(format!(
                        "{}/identitytoolkit.googleapis.com",
                        local(section.auth_port)
                    )),
                    Some(local(section.firestore_port)),
                    Some(local(section.storage_port)),
                    Some(local(section.functions_port)),
                    true,
                )
            }
            FirebaseEnvironment::Production => (
                section.auth_url.clone(),
                section.firestore_url.clone(),
                section.storage_url.clone(),
                section.functions_url.clone(),
                false,
            ),
        };
        let trim = |url: Option<String>| url.map(|u| u.trim_end_matches('/').to_string());

        Self {
            auth: trim(auth),
            firestore: trim(firestore),
            storage: trim(storage),
            functions: trim(functions),
            project_id: section.project_id.clone(),
            api_key: section.api_key.clone(),
            bucket: section.bucket.clone(),
            region: section.region.clone(),
            function: section.function.clone(),
            emulator,
        }
    }
}
