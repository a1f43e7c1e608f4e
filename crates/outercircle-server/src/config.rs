use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use outercircle_api::codes::{CodeFormat, DEFAULT_ALPHABET, DEFAULT_CODE_LENGTH};
use outercircle_db::StoreConfig;

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "change-me-to-a-random-string"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub store: StoreConfig,
    pub code_format: CodeFormat,
    pub admin_password: Option<String>,
    pub session_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup so parsing can be tested without touching
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("OUTERCIRCLE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("OUTERCIRCLE_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("OUTERCIRCLE_PORT is not a valid port")?;

        let store = match var("OUTERCIRCLE_STORE").as_deref().unwrap_or("sqlite") {
            "sqlite" => StoreConfig::Sqlite {
                path: var("OUTERCIRCLE_DB_PATH")
                    .unwrap_or_else(|| "outercircle.db".into())
                    .into(),
            },
            "document" => StoreConfig::Document {
                path: PathBuf::from(
                    var("OUTERCIRCLE_DOC_PATH").unwrap_or_else(|| "messages.json".into()),
                ),
                recover_corrupt: parse_bool(var("OUTERCIRCLE_DOC_RECOVER").as_deref())
                    .context("OUTERCIRCLE_DOC_RECOVER must be true or false")?,
            },
            other => bail!("OUTERCIRCLE_STORE must be 'sqlite' or 'document', got '{}'", other),
        };

        let length: usize = match var("OUTERCIRCLE_CODE_LENGTH") {
            Some(v) => v.parse().context("OUTERCIRCLE_CODE_LENGTH is not a number")?,
            None => DEFAULT_CODE_LENGTH,
        };
        let alphabet = var("OUTERCIRCLE_CODE_ALPHABET").unwrap_or_else(|| DEFAULT_ALPHABET.into());
        let code_format = CodeFormat::new(&alphabet, length).context("invalid code format")?;

        let admin_password = var("OUTERCIRCLE_ADMIN_PASSWORD");
        let session_secret = var("OUTERCIRCLE_SESSION_SECRET");
        for secret in [&admin_password, &session_secret].into_iter().flatten() {
            if PLACEHOLDER_SECRETS.contains(&secret.as_str()) {
                bail!("a configured secret is still a placeholder value");
            }
        }

        Ok(Self {
            host,
            port,
            store,
            code_format,
            admin_password,
            session_secret,
        })
    }

    /// Key for admin session tokens. Without a configured secret a fresh one
    /// is drawn, so sessions do not outlive the process.
    pub fn session_key(&self) -> Vec<u8> {
        match &self.session_secret {
            Some(secret) => secret.as_bytes().to_vec(),
            None => rand::random::<[u8; 32]>().to_vec(),
        }
    }
}

fn parse_bool(value: Option<&str>) -> Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes") => Ok(true),
        Some("0" | "false" | "no") => Ok(false),
        Some(other) => bail!("unrecognised boolean '{}'", other),
    }
}
