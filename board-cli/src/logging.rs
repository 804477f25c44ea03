use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

/// Логи идут в stderr, чтобы не смешиваться с выводом команд.
pub(crate) fn init_logging(level: &str, verbose: bool) -> Result<()> {
    let directives = filter_directives(level, verbose);
    let filter = EnvFilter::try_new(&directives)
        .map_err(|e| anyhow!("invalid log filter {directives:?}: {e}"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .without_time()
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}

/// `--verbose` поднимает до `debug` только крейты доски, не трогая остальные.
fn filter_directives(level: &str, verbose: bool) -> String {
    let level = match level.trim() {
        "" => "warn",
        level => level,
    };
    if verbose {
        format!("{level},board_client=debug,board_cli=debug")
    } else {
        level.to_string()
    }
}
