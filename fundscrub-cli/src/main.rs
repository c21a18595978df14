use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// Import from fundscrub-core
use fundscrub_core::rules::NoiseRuleSet;
use fundscrub_core::{
    ChunkCleaner, CleanReport, CleanerConfig, DocumentAssembler, InstructionSet, LineClassifier,
    LocalRewriter, Rewriter, ServiceConfig,
};

// Import CLI utilities
use fundscrub_cli::{ConfigLocator, ConfigSource};

#[derive(Parser)]
#[command(name = "fundscrub")]
#[command(about = "Clean OCR text from fund app screenshots into a parse-ready record")]
struct Args {
    /// OCR document to clean (chunks separated by `>>>`)
    #[arg(required_unless_present = "print_instructions")]
    input: Option<PathBuf>,

    /// Where to write the cleaned document (default: overwrite INPUT)
    output: Option<PathBuf>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Clean with the local rules only; no service call, no API key needed
    #[arg(long)]
    offline: bool,

    /// Model name sent to the rewriting service
    #[arg(long)]
    model: Option<String>,

    /// Base URL of the OpenAI-compatible service
    #[arg(long)]
    base_url: Option<String>,

    /// Maximum number of chunks cleaned at the same time
    #[arg(long)]
    concurrency: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the instruction text sent with every chunk and exit
    #[arg(long)]
    print_instructions: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Load config: --config, then the user config dir, then defaults
    let source = match ConfigLocator::new() {
        Ok(locator) => locator.resolve(args.config.as_deref()),
        Err(e) => {
            tracing::warn!(error = %e, "no user config directory");
            args.config
                .clone()
                .map(ConfigSource::Explicit)
                .unwrap_or(ConfigSource::Defaults)
        }
    };
    let mut config = source.load().unwrap_or_else(|e| fail(&format!("{e:#}")));
    apply_overrides(&mut config, &args);
    if let Err(e) = config.validate() {
        fail(&e.to_string());
    }

    let rules = NoiseRuleSet::with_extra_patterns(&config.cleaning.extra_noise_patterns)
        .unwrap_or_else(|e| fail(&e.to_string()));
    let classifier = LineClassifier::with_rules(rules)?;
    let instructions = InstructionSet::from_rules(classifier.rules());

    if args.print_instructions {
        print!("{}", instructions.preamble());
        return Ok(());
    }

    println!("🦀 Fundscrub OCR Cleaner");
    println!("📋 Using {}", source.describe());

    let input = args
        .input
        .clone()
        .ok_or_else(|| anyhow!("An input document is required"))?;
    if !input.exists() {
        fail(&format!("Input not found at: {}", input.display()));
    }

    // Credential check happens before the document is touched
    let rewriter: Box<dyn Rewriter + '_> = if args.offline {
        println!("🔌 Offline mode: local rules only");
        Box::new(LocalRewriter::new(&classifier))
    } else {
        create_client(&config.service)?
    };

    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    println!("📄 Processing: {}", input.display());

    let progress = |index: usize, total: usize| println!("🧹 Cleaning chunk {index}/{total}...");
    let cleaner = ChunkCleaner::new(rewriter.as_ref(), &classifier, &instructions);
    let assembler = DocumentAssembler::new(cleaner, &config.document)
        .with_concurrency(config.cleaning.max_concurrent_chunks)
        .with_progress(&progress);

    let cleaned = assembler.clean_document_with_report(&raw);

    let output = args.output.clone().unwrap_or_else(|| input.clone());
    std::fs::write(&output, &cleaned.text)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if let Some(report_path) = &args.report {
        save_report(&cleaned.report, report_path)?;
    }

    print_summary(&cleaned.report, &input, &output);
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn apply_overrides(config: &mut CleanerConfig, args: &Args) {
    if let Some(model) = &args.model {
        config.service.model = model.clone();
    }
    if let Some(base_url) = &args.base_url {
        config.service.base_url = base_url.clone();
    }
    if let Some(timeout) = args.timeout {
        config.service.timeout_secs = timeout;
    }
    if let Some(concurrency) = args.concurrency {
        config.cleaning.max_concurrent_chunks = concurrency;
    }
}

/// Create the chat completions client; exits when the API key is missing
#[cfg(feature = "http-client")]
fn create_client(service: &ServiceConfig) -> Result<Box<dyn Rewriter>> {
    match fundscrub_core::ChatCompletionsClient::from_config(service) {
        Ok(client) => {
            println!("🚀 Using {} at {}", service.model, client.endpoint());
            Ok(Box::new(client))
        }
        Err(e) => fail(&e.to_string()),
    }
}

/// Fallback when no service client is compiled in
#[cfg(not(feature = "http-client"))]
fn create_client(_service: &ServiceConfig) -> Result<Box<dyn Rewriter>> {
    Err(anyhow!(
        "No rewriting service client compiled in!\n\
         Use --offline or compile with: --features http-client"
    ))
}

fn save_report(report: &CleanReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    println!("📊 Report saved to: {}", path.display());
    Ok(())
}

fn print_summary(report: &CleanReport, input: &Path, output: &Path) {
    println!("✅ Cleaning complete");
    println!(
        "   Original: {} chars → cleaned: {} chars (removed {:.1}%)",
        report.original_chars,
        report.cleaned_chars,
        report.reduction_percent()
    );

    let failed = report.failed_chunks();
    if failed > 0 {
        println!(
            "⚠️  {failed} of {} chunks failed and were replaced by a marker",
            report.chunks.len()
        );
    }
    if output != input {
        println!("💾 Saved to: {}", output.display());
    }
}

fn fail(message: &str) -> ! {
    eprintln!("❌ {message}");
    std::process::exit(1);
}
