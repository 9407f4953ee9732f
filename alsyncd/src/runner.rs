use std::sync::Arc;

use alsync_core::AlistClient;
use anyhow::Context;
use regex::Regex;

use crate::sync::engine::{DeleteAction, SyncPair, SyncPolicy, TreeReconciler};
use crate::sync::filter::ExclusionFilter;
use crate::sync::observer::{StderrObserver, SyncObserver};

const DIR_PAIR_OVERFLOW_SLOTS: usize = 50;
const DEFAULT_UTC_ASSUME_OFFSET_HOURS: i64 = 8;

#[derive(Clone, Debug)]
pub struct RunnerConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pairs: Vec<SyncPair>,
    pub delete_action: DeleteAction,
    pub move_source: bool,
    pub exclude: Vec<String>,
    pub allow_patterns: Vec<Regex>,
    pub utc_assume_offset_hours: i64,
}

impl RunnerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url =
            read_env("ALSYNC_BASE_URL").context("ALSYNC_BASE_URL must point at the service")?;
        let token = read_env("ALSYNC_TOKEN");
        let username = read_env("ALSYNC_USERNAME");
        let password = read_env("ALSYNC_PASSWORD");
        if token.is_none() && (username.is_none() || password.is_none()) {
            anyhow::bail!(
                "set ALSYNC_TOKEN, or both ALSYNC_USERNAME and ALSYNC_PASSWORD"
            );
        }

        let mut raw_pairs = Vec::new();
        if let Some(value) = read_env("ALSYNC_DIR_PAIRS") {
            raw_pairs.push(value);
        }
        for slot in 1..=DIR_PAIR_OVERFLOW_SLOTS {
            if let Some(value) = read_env(&format!("ALSYNC_DIR_PAIRS{slot}")) {
                raw_pairs.push(value);
            }
        }
        let mut pairs = Vec::new();
        for raw in &raw_pairs {
            pairs.extend(parse_pairs(raw)?);
        }

        let delete_action = match read_env("ALSYNC_DELETE_ACTION") {
            Some(value) => parse_delete_action(&value)?,
            None => DeleteAction::None,
        };
        let move_source = read_env("ALSYNC_MOVE_FILE")
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let exclude = read_env("ALSYNC_EXCLUDE_DIRS")
            .map(|value| value.split(',').map(|entry| entry.trim().to_string()).collect())
            .unwrap_or_default();
        let allow_patterns = match read_env("ALSYNC_REGEX_PATTERNS") {
            Some(value) => parse_allow_patterns(&value)?,
            None => Vec::new(),
        };

        let utc_assume_offset_hours = match read_env("ALSYNC_UTC_ASSUME_OFFSET_HOURS") {
            Some(value) => value
                .parse()
                .context("ALSYNC_UTC_ASSUME_OFFSET_HOURS must be an integer")?,
            None => DEFAULT_UTC_ASSUME_OFFSET_HOURS,
        };

        Ok(Self {
            base_url,
            token,
            username,
            password,
            pairs,
            delete_action,
            move_source,
            exclude,
            allow_patterns,
            utc_assume_offset_hours,
        })
    }
}

/// Reads one environment variable, trimming padding and treating a
/// blank value the same as an unset one.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses one semicolon-separated `source:destination` list.
pub fn parse_pairs(raw: &str) -> anyhow::Result<Vec<SyncPair>> {
    let mut pairs = Vec::new();
    for fragment in raw.split(';') {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        let (source, destination) = fragment
            .split_once(':')
            .with_context(|| format!("malformed sync pair (expected source:destination): {fragment}"))?;
        let source = source.trim();
        let destination = destination.trim();
        if source.is_empty() || destination.is_empty() {
            anyhow::bail!("malformed sync pair (empty side): {fragment}");
        }
        pairs.push(SyncPair {
            source: source.to_string(),
            destination: destination.to_string(),
        });
    }
    Ok(pairs)
}

pub fn parse_delete_action(value: &str) -> anyhow::Result<DeleteAction> {
    match value.to_ascii_lowercase().as_str() {
        "none" => Ok(DeleteAction::None),
        "delete" => Ok(DeleteAction::Delete),
        "move" => Ok(DeleteAction::MoveToTrash),
        other => anyhow::bail!("unknown delete action (expected none|delete|move): {other}"),
    }
}

/// Whitespace-separated allow regexes; invalid patterns are rejected at
/// startup instead of silently dropped mid-run.
pub fn parse_allow_patterns(raw: &str) -> anyhow::Result<Vec<Regex>> {
    raw.split_whitespace()
        .map(|pattern| {
            Regex::new(pattern).with_context(|| format!("invalid allow pattern: {pattern}"))
        })
        .collect()
}

/// One-shot run over the configured pairs; the client connection is dropped
/// with the runner whether the pass succeeded or not.
pub struct Runner {
    config: RunnerConfig,
    client: AlistClient,
    observer: Arc<dyn SyncObserver>,
}

impl Runner {
    pub async fn bootstrap(config: RunnerConfig) -> anyhow::Result<Self> {
        Self::bootstrap_with_observer(config, Arc::new(StderrObserver)).await
    }

    pub async fn bootstrap_with_observer(
        config: RunnerConfig,
        observer: Arc<dyn SyncObserver>,
    ) -> anyhow::Result<Self> {
        let token = resolve_token(&config, observer.as_ref()).await?;
        let client = AlistClient::with_base_url(&config.base_url, token)?;
        Ok(Self {
            config,
            client,
            observer,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        self.observer.info(&format!(
            "starting: base_url={}, pairs={}, delete_action={:?}, move_source={}",
            self.config.base_url,
            self.config.pairs.len(),
            self.config.delete_action,
            self.config.move_source,
        ));
        for (index, pair) in self.config.pairs.iter().enumerate() {
            self.observer.info(&format!(
                "pair {:02}: {} -> {}",
                index + 1,
                pair.source,
                pair.destination
            ));
        }

        let filter = ExclusionFilter::new(self.config.exclude.clone(), self.config.allow_patterns.clone());
        let policy = SyncPolicy::new(self.config.delete_action, self.config.move_source, filter)
            .with_utc_assume_offset(self.config.utc_assume_offset_hours);
        let mut reconciler = TreeReconciler::new(self.client, policy, self.observer.clone());

        for pair in &self.config.pairs {
            // A failed pair is logged; later pairs still run.
            if let Err(err) = reconciler.synchronize(pair).await {
                self.observer.error(&format!(
                    "pair {} -> {} failed: {err}",
                    pair.source, pair.destination
                ));
            }
        }

        self.observer.info("all sync pairs processed");
        Ok(())
    }
}

async fn resolve_token(
    config: &RunnerConfig,
    observer: &dyn SyncObserver,
) -> anyhow::Result<String> {
    if let Some(token) = &config.token {
        let probe = AlistClient::with_base_url(&config.base_url, token.clone())?;
        if probe
            .validate_token()
            .await
            .context("token validation request failed")?
        {
            return Ok(token.clone());
        }
        observer.warn("pre-issued token was rejected, falling back to login");
    }

    let (Some(username), Some(password)) = (&config.username, &config.password) else {
        anyhow::bail!("token rejected and no credentials available for login");
    };
    let token = AlistClient::login(&config.base_url, username, password)
        .await
        .context("login failed")?;
    observer.info("login succeeded");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_env_trims_and_drops_blank_values() {
        // Unique names so parallel tests never observe these variables.
        unsafe {
            std::env::set_var("ALSYNC_READ_ENV_PADDED", "  /src  ");
            std::env::set_var("ALSYNC_READ_ENV_BLANK", "   ");
        }
        assert_eq!(read_env("ALSYNC_READ_ENV_PADDED").as_deref(), Some("/src"));
        assert_eq!(read_env("ALSYNC_READ_ENV_BLANK"), None);
        assert_eq!(read_env("ALSYNC_READ_ENV_UNSET"), None);
    }

    #[test]
    fn parses_semicolon_separated_pairs_with_padding() {
        let pairs = parse_pairs(" /src : /dst ; /a:/b ;").unwrap();
        assert_eq!(
            pairs,
            vec![
                SyncPair {
                    source: "/src".to_string(),
                    destination: "/dst".to_string()
                },
                SyncPair {
                    source: "/a".to_string(),
                    destination: "/b".to_string()
                },
            ]
        );
    }

    #[test]
    fn rejects_pairs_without_separator() {
        assert!(parse_pairs("/src-only").is_err());
        assert!(parse_pairs("/src:").is_err());
    }

    #[test]
    fn parses_delete_actions_case_insensitively() {
        assert_eq!(parse_delete_action("none").unwrap(), DeleteAction::None);
        assert_eq!(parse_delete_action("Delete").unwrap(), DeleteAction::Delete);
        assert_eq!(
            parse_delete_action("MOVE").unwrap(),
            DeleteAction::MoveToTrash
        );
        assert!(parse_delete_action("purge").is_err());
    }

    #[test]
    fn rejects_invalid_allow_patterns() {
        assert_eq!(parse_allow_patterns(r"\.jpg$ \.png$").unwrap().len(), 2);
        assert!(parse_allow_patterns(r"(unclosed").is_err());
    }
}
