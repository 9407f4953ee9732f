use alsyncd::runner::{Runner, RunnerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    Run,
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::Run;
    for arg in args.into_iter().skip(1) {
        match arg.as_str() {
            "--help" | "-h" => mode = CliMode::Help,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(mode)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    match parse_cli_mode(std::env::args())? {
        CliMode::Help => {
            println!("Usage: alsyncd");
            println!("  Runs one reconciliation pass over the configured sync pairs.");
            println!();
            println!("Environment:");
            println!("  ALSYNC_BASE_URL                 service endpoint (required)");
            println!("  ALSYNC_TOKEN                    pre-issued API token");
            println!("  ALSYNC_USERNAME / ALSYNC_PASSWORD  login credentials");
            println!("  ALSYNC_DIR_PAIRS[1..50]         src:dst;src:dst pair lists");
            println!("  ALSYNC_DELETE_ACTION            none | delete | move");
            println!("  ALSYNC_MOVE_FILE                true to drain the source");
            println!("  ALSYNC_EXCLUDE_DIRS             comma-separated path prefixes");
            println!("  ALSYNC_REGEX_PATTERNS           whitespace-separated allow regexes");
            println!("  ALSYNC_UTC_ASSUME_OFFSET_HOURS  offset applied to Z timestamps");
            return Ok(());
        }
        CliMode::Run => {}
    }
    let config = RunnerConfig::from_env()?;
    let runner = Runner::bootstrap(config).await?;
    runner.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cli_mode_defaults_to_run() {
        let mode = parse_cli_mode(vec!["alsyncd".to_string()]).unwrap();
        assert_eq!(mode, CliMode::Run);
    }

    #[test]
    fn parse_cli_mode_supports_help() {
        let mode = parse_cli_mode(vec!["alsyncd".to_string(), "--help".to_string()]).unwrap();
        assert_eq!(mode, CliMode::Help);
    }

    #[test]
    fn parse_cli_mode_rejects_unknown_arguments() {
        assert!(parse_cli_mode(vec!["alsyncd".to_string(), "--verbose".to_string()]).is_err());
    }
}
