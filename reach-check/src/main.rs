//! Reach Check CLI Application
//!
//! A command-line interface that reads a blocklist/allowlist file and reports
//! which of its domains are reachable from the local network. This CLI is a
//! thin layer over the reach-check-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use reach_check_lib::{extract_domains, is_list_file, load_env_config, parse_duration};
use reach_check_lib::{CheckConfig, ConfigManager, DomainProber, EnvConfig, FileConfig};
use reach_check_lib::{Domain, ReachCheckError};
use std::path::Path;
use std::process;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use ui::{OutputMode, ResultPrinter};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for reach-check
#[derive(Parser, Debug)]
#[command(name = "reach-check")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check which domains of a blocklist/allowlist file are reachable")]
#[command(
    long_about = "Check which domains of a blocklist/allowlist file are reachable from this network.\n\nEach domain gets a HEAD request over HTTPS with a single HTTP fallback; any response counts as reachable. Press Ctrl-C to stop a run and print the partial summary."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Domain list file to check (*.list)
    #[arg(value_name = "FILE", help_heading = "Input")]
    pub file: String,

    /// Accept files without a .list extension
    #[arg(long = "any-file", help_heading = "Input")]
    pub any_file: bool,

    /// Print the extracted domains without probing them
    #[arg(long = "dry-run", help_heading = "Input")]
    pub dry_run: bool,

    /// Max concurrent probes (default: 50, max: 100)
    #[arg(short = 'c', long = "concurrency", value_name = "N", help_heading = "Probing")]
    pub concurrency: Option<usize>,

    /// Per-attempt timeout, e.g. 2000ms or 2s (default: 2000ms)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Probing")]
    pub timeout: Option<String>,

    /// Pause between chunks, e.g. 50ms (default: 50ms)
    #[arg(long = "chunk-delay", value_name = "DURATION", help_heading = "Probing")]
    pub chunk_delay: Option<String>,

    /// Only count 2xx responses as reachable
    #[arg(long = "strict", help_heading = "Probing")]
    pub strict: bool,

    /// Path requested on each domain (default: /favicon.ico)
    #[arg(long = "path", value_name = "PATH", help_heading = "Probing")]
    pub path: Option<String>,

    /// Output newline-delimited JSON events followed by a summary
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Colored output with progress counters
    #[arg(short = 'p', long = "pretty", help_heading = "Output Format")]
    pub pretty: bool,

    /// Only print blocked domains
    #[arg(long = "blocked-only", help_heading = "Output Format")]
    pub blocked_only: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Show debug logging for every probe attempt
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(&args);

    if let Err(e) = run_reach_check(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.json && args.pretty {
        return Err("Cannot specify both --json and --pretty".to_string());
    }

    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > 100 {
            return Err("Concurrency must be between 1 and 100".to_string());
        }
    }

    for (flag, value) in [("--timeout", &args.timeout), ("--chunk-delay", &args.chunk_delay)] {
        if let Some(value) = value {
            if parse_duration(value).is_none() {
                return Err(format!(
                    "Invalid {} '{}'. Use a format like '2000ms' or '2s'",
                    flag, value
                ));
            }
        }
    }

    if let Some(path) = &args.path {
        if !path.starts_with('/') {
            return Err(format!("Probe path '{}' must start with '/'", path));
        }
    }

    Ok(())
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the flags.
fn init_logging(args: &Args) {
    let level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main orchestration function
async fn run_reach_check(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let file_config = load_file_config(&args, &env_config)?;
    let config = build_config(&args, &file_config, &env_config);
    let mode = resolve_output_mode(&args, &file_config, &env_config);

    let domains = read_domains_from_file(&args.file, args.any_file)?;

    if args.dry_run {
        ui::print_domains(&domains);
        eprintln!("{} domains would be checked", domains.len());
        return Ok(());
    }

    info!(
        file = %args.file,
        domains = domains.len(),
        concurrency = config.concurrency,
        timeout_ms = config.timeout.as_millis() as u64,
        strict = config.strict_status,
        "starting reach check"
    );

    if mode == OutputMode::Pretty {
        ui::print_header(&args.file, domains.len(), config.concurrency, config.strict_status);
    }

    let prober = DomainProber::with_config(config)?;

    // Ctrl-C turns into a cooperative cancel; the run then returns its
    // partial summary.
    let canceller = prober.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() && !canceller.cancel() {
            debug!("interrupt received with no active run");
        }
    });

    let mut printer = ResultPrinter::new(mode, args.blocked_only);
    let outcome = prober.start(&domains, &mut printer).await;
    signal_task.abort();

    let summary = outcome?;
    printer.finish(&summary);

    Ok(())
}

/// Load the explicit config file (`--config`, then `RC_CONFIG`) or fall back to
/// automatic discovery.
fn load_file_config(
    args: &Args,
    env_config: &EnvConfig,
) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let config_manager = ConfigManager::new(args.verbose);

    let explicit = args.config.as_ref().or(env_config.config.as_ref());
    if let Some(path) = explicit {
        info!(path = %path, "using explicit config file");
        let file_config = config_manager
            .load_file(path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?;
        return Ok(file_config);
    }

    Ok(config_manager.discover_and_load()?)
}

/// Layer configuration sources: defaults, then file, then environment, then
/// CLI arguments.
fn build_config(args: &Args, file_config: &FileConfig, env_config: &EnvConfig) -> CheckConfig {
    let config = file_config.apply_to(CheckConfig::default());
    let config = env_config.apply_to(config);
    apply_cli_args_to_config(config, args)
}

/// Apply CLI arguments to config (highest precedence).
///
/// Values were checked by `validate_args`, so unparsable ones cannot reach here.
fn apply_cli_args_to_config(mut config: CheckConfig, args: &Args) -> CheckConfig {
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(timeout) = args.timeout.as_deref().and_then(parse_duration) {
        config.timeout = timeout;
    }
    if let Some(delay) = args.chunk_delay.as_deref().and_then(parse_duration) {
        config.chunk_delay = delay;
    }
    // Only override when the flag is passed; the default (false) must not
    // overwrite config or env values.
    if args.strict {
        config.strict_status = true;
    }
    if let Some(path) = &args.path {
        config.probe_path = path.clone();
    }
    config
}

/// Pick the output mode. CLI flags win, then `RC_JSON`/`RC_PRETTY`, then the
/// `[output]` section; JSON wins when lower layers ask for both.
fn resolve_output_mode(args: &Args, file_config: &FileConfig, env_config: &EnvConfig) -> OutputMode {
    if args.json {
        return OutputMode::Json;
    }
    if args.pretty {
        return OutputMode::Pretty;
    }

    let output = file_config.output.as_ref();
    let json = env_config
        .json
        .or_else(|| output.and_then(|o| o.json))
        .unwrap_or(false);
    let pretty = env_config
        .pretty
        .or_else(|| output.and_then(|o| o.pretty))
        .unwrap_or(false);

    if json {
        OutputMode::Json
    } else if pretty {
        OutputMode::Pretty
    } else {
        OutputMode::Plain
    }
}

/// Read a list file and extract its domains.
fn read_domains_from_file(file_path: &str, any_file: bool) -> Result<Vec<Domain>, ReachCheckError> {
    let path = Path::new(file_path);

    if !path.exists() {
        return Err(ReachCheckError::file_error(file_path, "File not found"));
    }

    if !any_file && !is_list_file(file_path) {
        return Err(ReachCheckError::file_error(
            file_path,
            "Not a list file (expected a .list extension, use --any-file to override)",
        ));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ReachCheckError::file_error(file_path, format!("Cannot read file: {}", e)))?;

    let domains = extract_domains(&content);
    if domains.is_empty() {
        return Err(ReachCheckError::extraction_empty(file_path));
    }

    debug!(count = domains.len(), file = %file_path, "extracted domains");
    Ok(domains)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reach_check_lib::{load_env_config_from, OutputConfig, ProbeFileConfig};
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::{Builder, NamedTempFile};

    fn create_test_args() -> Args {
        Args {
            file: "ads.list".to_string(),
            any_file: false,
            dry_run: false,
            concurrency: None,
            timeout: None,
            chunk_delay: None,
            strict: false,
            path: None,
            json: false,
            pretty: false,
            blocked_only: false,
            config: None,
            debug: false,
            verbose: false,
        }
    }

    fn env_from(pairs: &[(&str, &str)]) -> EnvConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_env_config_from(|key| vars.get(key).cloned())
    }

    fn list_file(content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(".list").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_validate_args_default_ok() {
        assert!(validate_args(&create_test_args()).is_ok());
    }

    #[test]
    fn test_validate_args_json_and_pretty_conflict() {
        let mut args = create_test_args();
        args.json = true;
        args.pretty = true;
        let err = validate_args(&args).unwrap_err();
        assert!(err.contains("--json and --pretty"));
    }

    #[test]
    fn test_validate_args_concurrency_bounds() {
        let mut args = create_test_args();
        args.concurrency = Some(0);
        assert!(validate_args(&args).is_err());
        args.concurrency = Some(101);
        assert!(validate_args(&args).is_err());
        args.concurrency = Some(100);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_rejects_bad_duration() {
        let mut args = create_test_args();
        args.timeout = Some("soon".to_string());
        let err = validate_args(&args).unwrap_err();
        assert!(err.contains("--timeout"));
    }

    #[test]
    fn test_validate_args_rejects_relative_path() {
        let mut args = create_test_args();
        args.path = Some("favicon.ico".to_string());
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(&create_test_args(), &FileConfig::default(), &EnvConfig::default());
        assert_eq!(config.concurrency, 50);
        assert_eq!(config.timeout, Duration::from_millis(2000));
        assert_eq!(config.chunk_delay, Duration::from_millis(50));
        assert!(!config.strict_status);
        assert_eq!(config.probe_path, "/favicon.ico");
    }

    #[test]
    fn test_build_config_precedence() {
        let file_config = FileConfig {
            probe: Some(ProbeFileConfig {
                concurrency: Some(10),
                timeout: Some("5s".to_string()),
                chunk_delay: Some("200ms".to_string()),
                path: Some("/robots.txt".to_string()),
                ..Default::default()
            }),
            output: None,
        };
        let env_config = env_from(&[("RC_CONCURRENCY", "20"), ("RC_TIMEOUT", "3s")]);
        let mut args = create_test_args();
        args.concurrency = Some(30);

        let config = build_config(&args, &file_config, &env_config);

        // CLI beats env, env beats file, file beats defaults.
        assert_eq!(config.concurrency, 30);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.chunk_delay, Duration::from_millis(200));
        assert_eq!(config.probe_path, "/robots.txt");
    }

    #[test]
    fn test_strict_flag_only_enables() {
        let env_config = env_from(&[("RC_STRICT", "true")]);
        let config = build_config(&create_test_args(), &FileConfig::default(), &env_config);
        assert!(config.strict_status);

        let mut args = create_test_args();
        args.strict = true;
        let config = build_config(&args, &FileConfig::default(), &EnvConfig::default());
        assert!(config.strict_status);
    }

    #[test]
    fn test_resolve_output_mode() {
        let file_config = FileConfig {
            probe: None,
            output: Some(OutputConfig {
                pretty: Some(true),
                json: None,
            }),
        };

        let args = create_test_args();
        assert_eq!(
            resolve_output_mode(&args, &FileConfig::default(), &EnvConfig::default()),
            OutputMode::Plain
        );
        assert_eq!(
            resolve_output_mode(&args, &file_config, &EnvConfig::default()),
            OutputMode::Pretty
        );
        assert_eq!(
            resolve_output_mode(&args, &file_config, &env_from(&[("RC_JSON", "1")])),
            OutputMode::Json
        );

        let mut args = create_test_args();
        args.pretty = true;
        assert_eq!(
            resolve_output_mode(&args, &FileConfig::default(), &env_from(&[("RC_JSON", "1")])),
            OutputMode::Pretty
        );
    }

    #[test]
    fn test_read_domains_from_list_file() {
        let file = list_file("# ads\nexample.com\nhttps://www.Example.org/x\nexample.com\n");
        let domains = read_domains_from_file(file.path().to_str().unwrap(), false).unwrap();
        let names: Vec<&str> = domains.iter().map(Domain::as_str).collect();
        assert_eq!(names, vec!["example.com", "example.org"]);
    }

    #[test]
    fn test_read_domains_rejects_non_list_file() {
        let mut file = Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"example.com\n").unwrap();
        let path = file.path().to_str().unwrap();

        let err = read_domains_from_file(path, false).unwrap_err();
        assert!(matches!(err, ReachCheckError::FileError { .. }));
        assert!(read_domains_from_file(path, true).is_ok());
    }

    #[test]
    fn test_read_domains_empty_list() {
        let file = list_file("# nothing here\n\n!!!\n");
        let err = read_domains_from_file(file.path().to_str().unwrap(), false).unwrap_err();
        assert!(matches!(err, ReachCheckError::ExtractionEmpty { .. }));
    }

    #[test]
    fn test_read_domains_missing_file() {
        let err = read_domains_from_file("/definitely/not/here.list", false).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
