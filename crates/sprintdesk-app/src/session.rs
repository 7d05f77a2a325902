use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sprintdesk_controller::ScopeContext;
use sprintdesk_domain::AuthTokens;
use std::collections::BTreeMap;
use std::path::Path;

/// State carried between invocations: the scope context and the last tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub context: ScopeContext,
    pub tokens: Option<AuthTokens>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    context: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tokens: Option<AuthTokens>,
}

impl SessionState {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default())
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read session file '{}'", path.display()))
            }
        };

        let file: SessionFile = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse session file '{}'", path.display()))?;
        Ok(Self {
            context: ScopeContext::from_pairs(
                file.context
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            ),
            tokens: file.tokens,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create session directory '{}'", parent.display())
                })?;
            }
        }

        let file = SessionFile {
            context: self
                .context
                .to_pairs()
                .into_iter()
                .map(|(key, value)| (key.to_owned(), value))
                .collect(),
            tokens: self.tokens.clone(),
        };
        let rendered =
            serde_json::to_string_pretty(&file).context("failed to serialize session state")?;
        std::fs::write(path, rendered.as_bytes())
            .with_context(|| format!("failed to write session file '{}'", path.display()))
    }
}
