use std::{env, fs, path::Path, time::Duration};

use crate::{domain::ChatId, errors::Error, Result};

/// Typed configuration for the bot.
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,
    /// Chat receiving one line per ban; `None` disables the journal.
    pub log_group_id: Option<ChatId>,

    pub poll: PollConfig,
}

/// Long-poll and retry knobs for the poll loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Server-side long-poll window.
    pub poll_timeout: Duration,
    /// Overall deadline of one fetch; must exceed `poll_timeout`.
    pub request_timeout: Duration,
    /// Consecutive fetch failures tolerated before giving up.
    pub retry_limit: u32,
    /// Backoff after the n-th consecutive failure is `n * backoff_step`.
    pub backoff_step: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(4 * 60),
            request_timeout: Duration::from_secs(5 * 60),
            retry_limit: 10,
            backoff_step: Duration::from_secs(1),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let telegram_bot_token = lookup("TELEGRAM_BOTAPI_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOTAPI_TOKEN environment variable is required".to_string(),
            ));
        }

        // 0 and garbage both mean "no journal".
        let log_group_id = lookup("LOG_GROUP_ID")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|id| *id != 0)
            .map(ChatId);

        let defaults = PollConfig::default();
        let poll = PollConfig {
            poll_timeout: parse_u64(&lookup, "POLL_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_timeout),
            request_timeout: parse_u64(&lookup, "REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            retry_limit: parse_u64(&lookup, "RETRY_LIMIT")?
                .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
                .unwrap_or(defaults.retry_limit),
            backoff_step: parse_u64(&lookup, "RETRY_BACKOFF_STEP_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff_step),
        };
        poll.validate()?;

        Ok(Self {
            telegram_bot_token,
            log_group_id,
            poll,
        })
    }
}

impl PollConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_timeout.is_zero() {
            return Err(Error::Config("POLL_TIMEOUT_SECS must be positive".to_string()));
        }
        if self.request_timeout <= self.poll_timeout {
            return Err(Error::Config(format!(
                "REQUEST_TIMEOUT_SECS ({}s) must be greater than POLL_TIMEOUT_SECS ({}s)",
                self.request_timeout.as_secs(),
                self.poll_timeout.as_secs()
            )));
        }
        if self.retry_limit == 0 {
            return Err(Error::Config("RETRY_LIMIT must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::Config(format!("{key}={raw:?} is not a valid number: {e}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}
