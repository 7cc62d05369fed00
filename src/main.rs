use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use orgpulse::api::{AnalysisKind, AnalysisRequest, ApiClient};
use orgpulse::config::{self, Config};
use orgpulse::logging::{self, LogTarget};
use orgpulse::reconcile::{reconcile, NormalizedResult};
use orgpulse::session::{FileStore, SessionContext};
use orgpulse::{app, validate};

#[derive(Parser, Debug)]
#[command(
    name = "orgpulse",
    about = "Terminal console for organizations, projects and social analytics",
    version
)]
struct Args {
    /// Backend base URL (overrides the config file)
    #[arg(long, env = config::ENV_API_URL)]
    api_url: Option<String>,

    /// Organization id to open (becomes the current organization)
    #[arg(long)]
    org: Option<String>,

    /// Store the API URL and token, then exit
    #[arg(long)]
    setup: bool,

    /// Run one analyzer without the TUI and print the result
    #[arg(long, num_args = 2, value_names = ["KIND", "TARGET"])]
    analyze: Option<Vec<String>>,

    /// Log level when ORGPULSE_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.setup {
        logging::init(LogTarget::Stderr, &args.log_level)?;
        config::setup_interactive().map_err(|e| anyhow!(e))?;
        return Ok(());
    }

    let mut config = Config::load();
    if let Some(url) = args.api_url {
        config.api_url = Some(url);
    }

    if let Some(parts) = args.analyze {
        logging::init(LogTarget::Stderr, &args.log_level)?;
        return run_headless(&config, &parts, args.org).await;
    }

    let target = if config.log_to_file {
        LogTarget::File
    } else {
        LogTarget::Off
    };
    let log_path = logging::init(target, &args.log_level)?;

    let client = ApiClient::from_config(&config).map_err(|e| {
        anyhow!(
            "{}\nRun `orgpulse --setup` or set {}.",
            e.user_message(),
            config::ENV_API_URL
        )
    })?;
    tracing::info!(
        api = %client.base_url(),
        log = ?log_path,
        "starting orgpulse {}",
        env!("CARGO_PKG_VERSION")
    );

    app::run_tui(config, client, args.org).await
}

/// `--analyze KIND TARGET`: reconcile one analyzer response and print it.
/// Structured results print as JSON; unrecoverable ones print their raw text.
async fn run_headless(config: &Config, parts: &[String], org: Option<String>) -> Result<()> {
    let [kind, target] = parts else {
        bail!("--analyze takes exactly two values: KIND TARGET");
    };
    let kind = AnalysisKind::parse(kind).ok_or_else(|| {
        anyhow!(
            "Unknown analyzer '{}': use instagram, mobile, x or strategy",
            kind
        )
    })?;
    let target = validate::analysis_target(kind, target)?;

    let mut session = FileStore::in_config_dir()
        .map(|store| SessionContext::restore(&store))
        .unwrap_or_default();
    if let Some(org) = org.as_deref() {
        session.switch_organization(org);
    }

    let client = ApiClient::from_config(config)?;
    let request = AnalysisRequest {
        target,
        project_id: session.project_id.clone(),
        context: session
            .organization_id
            .as_ref()
            .map(|id| serde_json::json!({ "organization_id": id })),
    };
    tracing::info!(analyzer = kind.label(), "running headless analysis");
    let body = client
        .analyze(kind, &request)
        .await
        .with_context(|| format!("{} analysis failed", kind.label()))?;

    let result = reconcile(body, kind.shape());
    if result.is_fallback() {
        eprintln!(
            "warning: response could not be structured{}",
            result
                .error()
                .map(|e| format!(" ({})", e))
                .unwrap_or_default()
        );
    }
    println!("{}", headless_output(&result)?);
    Ok(())
}

/// Structured results as pretty JSON; fallbacks as their raw text, or the
/// whole response when it carried none.
fn headless_output(result: &NormalizedResult) -> serde_json::Result<String> {
    match result.raw_text().filter(|t| !t.trim().is_empty()) {
        Some(text) => Ok(text.to_string()),
        None => serde_json::to_string_pretty(result.value()),
    }
}
