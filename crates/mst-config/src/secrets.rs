//! Secret resolution.
//!
//! Config YAML stores only **environment variable names**
//! (e.g. `"MST_LLM_API_KEY"`), never values. At startup, callers invoke
//! [`resolve_secrets`] once and pass the result into constructors instead of
//! scattering `std::env::var` calls through the codebase. `Debug` on
//! [`ResolvedSecrets`] redacts every field.

use anyhow::{bail, Result};
use serde_json::Value;

#[derive(Clone)]
pub struct ResolvedSecrets {
    pub llm_api_key: Option<String>,
    pub news_api_key: Option<String>,
    pub broker_api_key: Option<String>,
    pub broker_api_secret: Option<String>,
    pub smtp_password: Option<String>,
    pub sms_api_key: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = |o: &Option<String>| o.as_ref().map(|_| "<REDACTED>");
        f.debug_struct("ResolvedSecrets")
            .field("llm_api_key", &r(&self.llm_api_key))
            .field("news_api_key", &r(&self.news_api_key))
            .field("broker_api_key", &r(&self.broker_api_key))
            .field("broker_api_secret", &r(&self.broker_api_secret))
            .field("smtp_password", &r(&self.smtp_password))
            .field("sms_api_key", &r(&self.sms_api_key))
            .finish()
    }
}

fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// `mode` is case-insensitive: `"LIVE"` requires brokerage + LLM + news
/// credentials; `"PAPER"` requires brokerage credentials only (for the
/// paper-trading sandbox endpoint, which still authenticates);
/// `"BACKTEST"` requires nothing — backtests never touch the network.
pub fn resolve_secrets(config_json: &Value, mode: &str) -> Result<ResolvedSecrets> {
    let llm_api_key_var =
        read_str_at(config_json, "/llm/api_key_env").unwrap_or_else(|| "MST_LLM_API_KEY".into());
    let news_api_key_var = read_str_at(config_json, "/news/api_key_env")
        .unwrap_or_else(|| "MST_NEWS_API_KEY".into());
    let broker_api_key_var = read_str_at(config_json, "/broker/api_key_env")
        .unwrap_or_else(|| "MST_BROKER_API_KEY".into());
    let broker_api_secret_var = read_str_at(config_json, "/broker/api_secret_env")
        .unwrap_or_else(|| "MST_BROKER_API_SECRET".into());
    let smtp_password_var = read_str_at(config_json, "/alerts/smtp/password_env")
        .unwrap_or_else(|| "MST_SMTP_PASSWORD".into());
    let sms_api_key_var = read_str_at(config_json, "/alerts/sms/api_key_env")
        .unwrap_or_else(|| "MST_SMS_API_KEY".into());

    let resolved = ResolvedSecrets {
        llm_api_key: resolve_env(&llm_api_key_var),
        news_api_key: resolve_env(&news_api_key_var),
        broker_api_key: resolve_env(&broker_api_key_var),
        broker_api_secret: resolve_env(&broker_api_secret_var),
        smtp_password: resolve_env(&smtp_password_var),
        sms_api_key: resolve_env(&sms_api_key_var),
    };

    let mode_upper = mode.trim().to_ascii_uppercase();
    match mode_upper.as_str() {
        "LIVE" => {
            if resolved.broker_api_key.is_none() {
                bail!("SECRETS_MISSING mode=LIVE: required env var '{broker_api_key_var}' (broker api key) is not set");
            }
            if resolved.broker_api_secret.is_none() {
                bail!("SECRETS_MISSING mode=LIVE: required env var '{broker_api_secret_var}' (broker api secret) is not set");
            }
            if resolved.llm_api_key.is_none() {
                bail!("SECRETS_MISSING mode=LIVE: required env var '{llm_api_key_var}' (LLM api key) is not set");
            }
        }
        "PAPER" => {
            if resolved.broker_api_key.is_none() {
                bail!("SECRETS_MISSING mode=PAPER: required env var '{broker_api_key_var}' (broker api key) is not set");
            }
        }
        "BACKTEST" => {}
        other => bail!("SECRETS_UNKNOWN_MODE: unrecognised mode '{other}'; expected LIVE | PAPER | BACKTEST"),
    }

    Ok(resolved)
}
