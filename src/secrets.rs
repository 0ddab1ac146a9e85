use anyhow::{anyhow, bail, Context, Result};
use jsonc_parser::{parse_to_serde_value, ParseOptions};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Git-ignored credentials file expected next to the files being served.
pub const SECRETS_FILE: &str = "local_secrets.jsonc";

#[derive(Debug, Clone, Deserialize)]
pub struct Secrets {
    pub api_key: String,
}

/// Loads the secrets file from `dir`. Absence is a startup error; the message
/// tells the user how to create the file.
pub fn load_from(dir: &Path) -> Result<Secrets> {
    let path = dir.join(SECRETS_FILE);
    let content = fs::read_to_string(&path).with_context(|| {
        format!(
            "{SECRETS_FILE} not found in {:?}.\n\
             Create it with your Hugging Face token:\n\
             {{ \"api_key\": \"your-token-here\" }}",
            dir
        )
    })?;

    let value = parse_to_serde_value(&content, &ParseOptions::default())
        .with_context(|| format!("Failed to parse {SECRETS_FILE} as JSONC"))?
        .ok_or_else(|| anyhow!("{SECRETS_FILE} did not contain a JSON value"))?;
    let secrets: Secrets = serde_json::from_value(value)
        .with_context(|| format!("Failed to deserialize {SECRETS_FILE}"))?;

    if secrets.api_key.trim().is_empty() {
        bail!("api_key in {SECRETS_FILE} is empty");
    }

    Ok(secrets)
}
