use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read member directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("member directory is not a JSON object of e-mail to name: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read-only e-mail → display-name lookup, built once at startup and shared
/// behind an `Arc`. Keys are stored trimmed and lowercased.
#[derive(Debug, Default, Clone)]
pub struct Directory {
    names: HashMap<String, String>,
}

impl Directory {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let names = pairs.into_iter().map(|(email, name)| (normalize_email(email.as_ref()), name.into())).collect();
        Self { names }
    }

    pub fn from_json(raw: &str) -> Result<Self, DirectoryError> {
        let pairs: HashMap<String, String> = serde_json::from_str(raw)?;
        Ok(Self::from_pairs(pairs))
    }

    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// A missing or broken file leaves the portal usable with e-mail based names.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(directory) => {
                info!(path = %path.display(), members = directory.len(), "member directory loaded");
                directory
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "member directory unavailable; falling back to e-mail names");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name_for(&self, email: &str) -> Option<&str> {
        self.names.get(&normalize_email(email)).map(String::as_str)
    }

    /// Directory name, else the e-mail's local part, else `"User"`.
    pub fn display_name(&self, email: Option<&str>) -> String {
        let Some(email) = email.map(str::trim).filter(|email| !email.is_empty()) else {
            return "User".to_string();
        };

        match self.name_for(email) {
            Some(name) => name.to_string(),
            None => local_part(email).unwrap_or("User").to_string(),
        }
    }

    pub fn trainer_name(&self, email: Option<&str>) -> String {
        let Some(email) = email.map(str::trim).filter(|email| !email.is_empty()) else {
            return "Not Assigned".to_string();
        };

        match self.name_for(email) {
            Some(name) => capitalize_trainer_name(name),
            None => capitalize_trainer_name(local_part(email).unwrap_or(email)),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn local_part(email: &str) -> Option<&str> {
    email.split('@').next().filter(|part| !part.is_empty())
}

/// Upper-cases every word except the `CTPr` credential.
pub fn capitalize_trainer_name(name: &str) -> String {
    name.split(' ')
        .map(|word| if word.eq_ignore_ascii_case("ctpr") { "CTPr".to_string() } else { word.to_uppercase() })
        .collect::<Vec<_>>()
        .join(" ")
}
