use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::ai::CompletionConfig;
use crate::billing::BillingConfig;
use crate::exercises::ExerciseConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "bodypilot")]
#[command(about = "BodyPilot - AI fitness coaching backend")]
pub struct Config {
    #[arg(long, env = "BODYPILOT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "BODYPILOT_PORT", default_value = "8787")]
    pub port: u16,

    /// Directory holding the row store file
    #[arg(long, env = "BODYPILOT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// HS256 secret shared with the identity provider
    #[arg(long, env = "BODYPILOT_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Base URL of the web app, used for default checkout redirects
    #[arg(long, env = "BODYPILOT_APP_URL", default_value = "http://localhost:5173")]
    pub app_url: String,

    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    #[arg(long, env = "LLM_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub llm_base_url: String,

    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    #[arg(long, env = "BILLING_API_KEY", hide_env_values = true)]
    pub billing_api_key: Option<String>,

    #[arg(
        long,
        env = "BILLING_BASE_URL",
        default_value = "https://api.billing.example/v1"
    )]
    pub billing_base_url: String,

    #[arg(long, env = "BILLING_WEBHOOK_SECRET", hide_env_values = true)]
    pub billing_webhook_secret: Option<String>,

    #[arg(long, env = "BILLING_PRICE_MONTHLY")]
    pub billing_price_monthly: Option<String>,

    #[arg(long, env = "BILLING_PRICE_YEARLY")]
    pub billing_price_yearly: Option<String>,

    #[arg(long, env = "EXERCISE_API_KEY", hide_env_values = true)]
    pub exercise_api_key: Option<String>,

    #[arg(
        long,
        env = "EXERCISE_BASE_URL",
        default_value = "https://exercisedb.p.rapidapi.com"
    )]
    pub exercise_base_url: String,

    /// Timeout for outbound provider calls
    #[arg(long, env = "BODYPILOT_HTTP_TIMEOUT_SECS", default_value = "60")]
    pub http_timeout_secs: u64,
}

/// Empty strings from `.env` files count as unset
fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

impl Config {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("bodypilot")
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn jwt_secret(&self) -> Option<String> {
        present(&self.jwt_secret)
    }

    pub fn webhook_secret(&self) -> Option<String> {
        present(&self.billing_webhook_secret)
    }

    pub fn completion(&self) -> Option<CompletionConfig> {
        Some(CompletionConfig {
            api_key: present(&self.llm_api_key)?,
            model: self.llm_model.clone(),
            base_url: self.llm_base_url.clone(),
            timeout: self.http_timeout(),
        })
    }

    pub fn billing(&self) -> Option<BillingConfig> {
        Some(BillingConfig {
            api_key: present(&self.billing_api_key)?,
            base_url: self.billing_base_url.clone(),
            price_monthly: present(&self.billing_price_monthly),
            price_yearly: present(&self.billing_price_yearly),
            timeout: self.http_timeout(),
        })
    }

    pub fn exercises(&self) -> Option<ExerciseConfig> {
        Some(ExerciseConfig {
            api_key: present(&self.exercise_api_key)?,
            base_url: self.exercise_base_url.clone(),
            timeout: self.http_timeout(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["bodypilot"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--data-dir", "/tmp/bp"]);
        assert_eq!(config.port, 8787);
        assert_eq!(config.llm_model, "gpt-4o-mini");
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/bp"));
        assert_eq!(config.http_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_provider_configs_need_keys() {
        let config = parse(&["--llm-api-key", "  ", "--billing-api-key", "sk_1"]);
        assert!(config.completion().is_none());

        let billing = config.billing().unwrap();
        assert_eq!(billing.api_key, "sk_1");
        assert!(billing.price_monthly.is_none());
    }

    #[test]
    fn test_completion_config() {
        let config = parse(&["--llm-api-key", "key", "--llm-model", "gpt-test"]);
        let completion = config.completion().unwrap();
        assert_eq!(completion.model, "gpt-test");
        assert_eq!(completion.base_url, "https://api.openai.com/v1");
    }
}
