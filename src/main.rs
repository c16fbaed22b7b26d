use anyhow::{bail, Context, Result};
use clap::Parser;
use regfit::archive::analyze_dir;
use regfit::cli::{Cli, OutputFormat};
use regfit::config::FitConfig;
use regfit::report::{build_report, render_text, ReportOptions};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Load the fit configuration, applying command-line overrides
fn load_config(args: &Cli) -> Result<FitConfig> {
    let mut config = match &args.config {
        Some(path) => FitConfig::from_file(path)?,
        None => FitConfig::default(),
    };

    if let Some(p) = args.primary_percentile {
        config.primary_percentile = p;
    }
    if let Some(p) = args.fallback_percentile {
        config.fallback_percentile = p;
    }

    config.validate().context("Invalid fit configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = load_config(&args)?;

    let analysis = analyze_dir(&args.root)
        .with_context(|| format!("Failed to analyze {}", args.root.display()))?;

    if analysis.is_empty() {
        eprintln!("No valid data found in {}.", args.root.display());
        return Ok(());
    }

    if let Some(bl) = &args.base_latency {
        if !analysis.latencies.contains_key(bl) {
            let available: Vec<&str> = analysis.latencies.keys().map(String::as_str).collect();
            bail!(
                "Base latency {} not found in {} (available: {})",
                bl,
                args.root.display(),
                available.join(", ")
            );
        }
    }

    let options = ReportOptions {
        base_latency: args.base_latency.clone(),
        class: args.class,
        search: args.search.clone(),
        lookup_frequency: args.at,
        curve_points: args.curve_points,
    };
    let report = build_report(&analysis, &config, &options);

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&report, &config, args.code_only)),
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
            println!("{}", json);
        }
    }

    Ok(())
}
