use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::parser::MatchMode;
use crate::policy::OverrideRule;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/relayhook.conf";
const DEFAULT_AUDIT_PATH: &str = "dhcp_hook_log.txt";
const DEFAULT_MATCH_TOKEN: &str = "OLT_TEST";
const DEFAULT_REPLACEMENT_ADDRESS: Ipv4Addr = Ipv4Addr::new(192, 168, 50, 100);
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Where audit records are appended.
    pub audit_path: PathBuf,
    /// Ordered override rules; the first one comes from
    /// `match_token`/`replacement_address`.
    pub rules: Vec<OverrideRule>,
    pub match_mode: MatchMode,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audit_path: PathBuf::from(DEFAULT_AUDIT_PATH),
            rules: vec![OverrideRule::new(
                DEFAULT_MATCH_TOKEN,
                DEFAULT_REPLACEMENT_ADDRESS,
            )],
            match_mode: MatchMode::default(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Load from `path` if it exists, then apply `RELAYHOOK_*` environment
    /// overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            String::new()
        };

        let mut config = Self::parse(&content)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse `key = value` lines. Blank lines and `#` comments are skipped,
    /// unknown keys are ignored.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        let mut extra_rules = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "audit_path" => config.audit_path = PathBuf::from(value),
                "match_token" => config.rules[0].match_token = value.to_string(),
                "replacement_address" => {
                    config.rules[0].replacement_address = parse_addr("replacement_address", value)?
                }
                "match_mode" => config.match_mode = value.parse()?,
                "log_level" => config.log_level = value.to_string(),
                "rule" => extra_rules.push(parse_rule(value)?),
                _ => {}
            }
        }

        config.rules.extend(extra_rules);
        Ok(config)
    }

    fn apply_env<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = var("RELAYHOOK_AUDIT_PATH") {
            self.audit_path = PathBuf::from(val);
        }
        if let Some(val) = var("RELAYHOOK_MATCH_TOKEN") {
            self.rules[0].match_token = val;
        }
        if let Some(val) = var("RELAYHOOK_REPLACEMENT_ADDRESS") {
            self.rules[0].replacement_address = parse_addr("RELAYHOOK_REPLACEMENT_ADDRESS", &val)?;
        }
        if let Some(val) = var("RELAYHOOK_MATCH_MODE") {
            self.match_mode = val.parse()?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.is_empty() {
            return Err(ConfigError::NoRules);
        }
        if self.rules.iter().any(|rule| rule.match_token.is_empty()) {
            return Err(ConfigError::EmptyToken);
        }
        Ok(())
    }

    /// Filter directive for `tracing_subscriber`'s `EnvFilter`.
    pub fn tracing_filter(&self) -> String {
        format!("relayhook={}", self.log_level)
    }
}

fn parse_addr(key: &str, value: &str) -> Result<Ipv4Addr, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// `TOKEN ADDRESS`
fn parse_rule(value: &str) -> Result<OverrideRule, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key: "rule".to_string(),
        value: value.to_string(),
    };
    let mut parts = value.split_whitespace();
    let token = parts.next().ok_or_else(invalid)?;
    let addr = parts.next().ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok(OverrideRule::new(token, parse_addr("rule", addr)?))
}
