use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

/// First non-empty value among the given environment variables.
fn env_any(vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|var| env::var(var).ok())
        .find(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub llm: Option<LlmConfig>,
    pub fallback_llm: Option<LlmConfig>,
    pub ephemeris: EphemerisConfig,
    pub auth: AuthConfig,
    pub balance: BalanceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Longest accepted question, in characters.
    pub max_question_chars: usize,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: usize,
    /// Read the durable per-user cache on an in-memory miss.
    pub durable_enabled: bool,
    /// Join identical concurrent live resolutions onto one provider call.
    pub coalesce_inflight: bool,
    pub purge_interval_secs: u64,
}

/// LLM configuration for chat/completion models
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EphemerisConfig {
    /// Remote source returning `{ "<body>": <degrees> }`. Built-in source when unset.
    pub url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// `user=key` pairs or bare keys.
    pub api_keys: Vec<String>,
    pub jwt_secret: Option<String>,
    pub jwt_leeway_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceConfig {
    pub url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            capacity: 10_000,
            durable_enabled: true,
            coalesce_inflight: true,
            purge_interval_secs: 60,
        }
    }
}

impl Default for EphemerisConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let primary_model = env::var("LLM_MODEL").unwrap_or_else(|_| "openai/gpt-4o".to_string());
        let primary_key = env_any(&["LLM_API_KEY", "OPENAI_API_KEY"]);

        let fallback_key = env_any(&["FALLBACK_LLM_API_KEY", "GEMINI_API_KEY"]);
        let fallback_model = env::var("FALLBACK_LLM_MODEL").ok();

        Self {
            server: ServerConfig {
                host: env::var("ORACULO_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("ORACULO_PORT", 5000),
                max_question_chars: parse_env_or("MAX_QUESTION_CHARS", 2000),
                max_body_bytes: parse_env_or("MAX_BODY_BYTES", 64 * 1024),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:oraculo.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            cache: CacheConfig {
                ttl_secs: parse_env_or("CACHE_TTL_SECS", 300),
                capacity: parse_env_or("CACHE_CAPACITY", 10_000),
                durable_enabled: parse_env_or("CACHE_DURABLE_ENABLED", true),
                coalesce_inflight: parse_env_or("COALESCE_INFLIGHT", true),
                purge_interval_secs: parse_env_or("CACHE_PURGE_INTERVAL_SECS", 60),
            },
            llm: Some(LlmConfig {
                model: primary_model,
                api_key: primary_key,
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("PROVIDER_TIMEOUT_SECS", 30),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 2),
            }),
            fallback_llm: if fallback_key.is_some() || fallback_model.is_some() {
                Some(LlmConfig {
                    model: fallback_model.unwrap_or_else(|| "gemini/gemini-1.5-flash".to_string()),
                    api_key: fallback_key,
                    base_url: env::var("FALLBACK_LLM_BASE_URL").ok(),
                    timeout_secs: parse_env_or("PROVIDER_TIMEOUT_SECS", 30),
                    max_retries: parse_env_or("FALLBACK_LLM_MAX_RETRIES", 1),
                })
            } else {
                None
            },
            ephemeris: EphemerisConfig {
                url: env::var("EPHEMERIS_URL").ok().filter(|url| !url.is_empty()),
                timeout_secs: parse_env_or("EPHEMERIS_TIMEOUT_SECS", 5),
            },
            auth: AuthConfig {
                api_keys: env::var("ORACULO_API_KEYS")
                    .map(|keys| {
                        keys.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
                jwt_leeway_secs: parse_env_opt("JWT_LEEWAY_SECS").unwrap_or(60),
            },
            balance: BalanceConfig {
                url: env::var("BALANCE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1/usage".to_string()),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio", "gemini"];

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_cache_config_defaults() {
        std::env::remove_var("CACHE_TTL_SECS");
        std::env::remove_var("CACHE_CAPACITY");
        std::env::remove_var("CACHE_DURABLE_ENABLED");

        let config = Config::default();
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.cache.capacity, 10_000);
        assert!(config.cache.durable_enabled);
        assert!(config.cache.coalesce_inflight);
    }

    #[test]
    #[serial]
    fn test_cache_config_from_env() {
        std::env::set_var("CACHE_TTL_SECS", "60");
        std::env::set_var("CACHE_DURABLE_ENABLED", "false");

        let config = Config::default();
        assert_eq!(config.cache.ttl_secs, 60);
        assert!(!config.cache.durable_enabled);

        std::env::remove_var("CACHE_TTL_SECS");
        std::env::remove_var("CACHE_DURABLE_ENABLED");
    }

    #[test]
    #[serial]
    fn test_invalid_value_falls_back_to_default() {
        std::env::set_var("CACHE_TTL_SECS", "five minutes");
        let config = Config::default();
        assert_eq!(config.cache.ttl_secs, 300);
        std::env::remove_var("CACHE_TTL_SECS");
    }

    #[test]
    #[serial]
    fn test_primary_llm_uses_openai_key_alias() {
        std::env::remove_var("LLM_API_KEY");
        std::env::remove_var("LLM_MODEL");
        std::env::set_var("OPENAI_API_KEY", "sk-test");

        let config = Config::default();
        let llm = config.llm.expect("primary llm config");
        assert_eq!(llm.model, "openai/gpt-4o");
        assert_eq!(llm.api_key.as_deref(), Some("sk-test"));

        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    #[serial]
    fn test_fallback_llm_enabled_by_gemini_key() {
        std::env::remove_var("FALLBACK_LLM_API_KEY");
        std::env::remove_var("FALLBACK_LLM_MODEL");
        std::env::remove_var("GEMINI_API_KEY");

        assert!(Config::default().fallback_llm.is_none());

        std::env::set_var("GEMINI_API_KEY", "gm-test");
        let fallback = Config::default().fallback_llm.expect("fallback config");
        assert_eq!(fallback.model, "gemini/gemini-1.5-flash");
        assert_eq!(fallback.api_key.as_deref(), Some("gm-test"));

        std::env::remove_var("GEMINI_API_KEY");
    }

    #[test]
    #[serial]
    fn test_api_keys_are_trimmed_and_split() {
        std::env::set_var("ORACULO_API_KEYS", " alice=k1 , k2,, ");
        let config = Config::default();
        assert_eq!(config.auth.api_keys, vec!["alice=k1", "k2"]);
        std::env::remove_var("ORACULO_API_KEYS");
    }

    #[test]
    fn test_parse_llm_provider_model() {
        assert_eq!(parse_llm_provider_model("openai/gpt-4o"), ("openai", "gpt-4o"));
        assert_eq!(
            parse_llm_provider_model("gemini/gemini-1.5-flash"),
            ("gemini", "gemini-1.5-flash")
        );
        assert_eq!(parse_llm_provider_model("llama3"), ("local", "llama3"));
    }

    #[test]
    #[serial]
    fn test_parse_env_or_valid_value() {
        std::env::set_var("__TEST_PARSE_PORT", "8080");
        let result: u16 = parse_env_or("__TEST_PARSE_PORT", 3000);
        assert_eq!(result, 8080);
        std::env::remove_var("__TEST_PARSE_PORT");
    }
}
