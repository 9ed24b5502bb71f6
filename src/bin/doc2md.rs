//! CLI binary for edgequake-doc2md.
//!
//! `doc2md serve` runs the HTTP service; `doc2md convert` runs the same
//! pipeline over local files.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_doc2md::config::DEFAULT_MAX_FILE_SIZE;
use edgequake_doc2md::enrichment::{resolve_enrichment, ProviderSettings};
use edgequake_doc2md::server::{create_router, print_routes, AppState};
use edgequake_doc2md::{ConversionConfig, Converter, FileOutcome, UploadedFile};
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the service on the default address (0.0.0.0:5000)
  doc2md serve

  # Upload a file
  curl -F file=@report.pdf http://localhost:5000/convert

  # Upload several files at once
  curl -F a=@memo.docx -F b=@deck.pptx http://localhost:5000/api/convert

  # Convert local files to stdout / JSON / a directory
  doc2md convert report.pdf
  doc2md convert --json memo.docx deck.pptx
  doc2md convert -o out/ *.docx

IMAGE CAPTIONS:
  Set LLM_API_KEY to caption through an OpenAI-compatible endpoint
  (LLM_BASE_URL, default Gemini's; LLM_API_MODEL, default gemini-1.5-flash).
  Or set DOC2MD_LLM_PROVIDER (openai, anthropic, gemini, azure, ollama, …)
  and that provider's key variable (model default gpt-4.1-nano).
  Without either, images report their size only.
"#;

/// Convert uploaded documents to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "doc2md",
    version,
    about = "Convert documents (PDF, Office, HTML, EPUB, images, archives) to Markdown",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOC2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOC2MD_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "DOC2MD_BIND", default_value = "0.0.0.0:5000")]
        bind: String,

        /// Reject any uploaded file larger than this while it streams in.
        #[arg(long, env = "MAX_CONTENT_LENGTH")]
        max_content_length: Option<u64>,

        #[command(flatten)]
        convert: ConvertArgs,
    },
    /// Convert local files.
    Convert {
        /// Files to convert.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print a JSON array with one record per file.
        #[arg(long)]
        json: bool,

        /// Write `<name>.md` files into this directory instead of stdout.
        /// Inputs sharing a name keep their extension (`a.pdf.md`).
        #[arg(short, long, conflicts_with = "json")]
        output: Option<PathBuf>,

        #[command(flatten)]
        convert: ConvertArgs,
    },
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Largest accepted document in bytes.
    #[arg(long, env = "MARKITDOWN_MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    max_file_size: u64,

    /// Directory for staged uploads (default: OS temp dir).
    #[arg(long, env = "DOC2MD_STAGING_DIR")]
    staging_dir: Option<PathBuf>,

    /// Files converted at once by the multi-file paths.
    #[arg(short, long, env = "DOC2MD_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// LLM provider used for image captions.
    #[arg(long, env = "DOC2MD_LLM_PROVIDER")]
    provider: Option<String>,

    /// Vision model used for image captions.
    #[arg(long, env = "LLM_API_MODEL")]
    model: Option<String>,

    /// API key for an OpenAI-compatible caption endpoint.
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible caption endpoint.
    #[arg(long, env = "LLM_BASE_URL")]
    base_url: Option<String>,
}

impl ConvertArgs {
    fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            provider: self.provider.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            bind,
            max_content_length,
            convert,
        } => serve(&bind, max_content_length, build_converter(&convert)?).await,
        Command::Convert {
            files,
            json,
            output,
            convert,
        } => {
            let converter = build_converter(&convert)?;
            convert_files(&converter, files, json, output.as_deref(), cli.quiet).await
        }
    }
}

/// Map CLI args to a `Converter`.
fn build_converter(args: &ConvertArgs) -> Result<Converter> {
    let mut builder = ConversionConfig::builder()
        .max_file_size(args.max_file_size)
        .concurrency(args.concurrency)
        .maybe_enrichment(resolve_enrichment(&args.provider_settings()));
    if let Some(ref dir) = args.staging_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create staging directory {}", dir.display()))?;
        builder = builder.staging_dir(dir);
    }
    let config = builder.build().context("Invalid configuration")?;
    Ok(Converter::new(config))
}

async fn serve(bind: &str, max_upload_bytes: Option<u64>, converter: Converter) -> Result<()> {
    let state = AppState::new(converter).with_max_upload_bytes(max_upload_bytes);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!(address = %bind, "doc2md listening");
    print_routes();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Ctrl-C received, draining connections");
}

async fn convert_files(
    converter: &Converter,
    files: Vec<PathBuf>,
    json: bool,
    output_dir: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let mut failed = 0usize;

    if let Some(dir) = output_dir {
        let names = output_names(&files)?;
        for (input, name) in files.iter().zip(names) {
            let target = dir.join(name);
            match converter.convert_to_file(input, &target).await {
                Ok(_) => {
                    if !quiet {
                        eprintln!("{} {}  →  {}", green("✔"), input.display(), bold(&target.display().to_string()));
                    }
                }
                Err(e) => {
                    failed += 1;
                    eprintln!("{} {}  {}", red("✗"), input.display(), red(&e.to_string()));
                }
            }
        }
    } else {
        let mut uploads = Vec::with_capacity(files.len());
        for input in &files {
            uploads.push(
                UploadedFile::from_path(input)
                    .await
                    .with_context(|| format!("Failed to read {}", input.display()))?,
            );
        }
        let outcomes = converter.convert_many(uploads).await;
        failed = outcomes.iter().filter(|o| !o.is_converted()).count();

        if json {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcomes).context("Failed to serialise output")?
            );
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for outcome in &outcomes {
                match outcome {
                    FileOutcome::Converted(result) => handle
                        .write_all(result.markdown.as_bytes())
                        .context("Failed to write to stdout")?,
                    FileOutcome::Failed(failure) => eprintln!(
                        "{} {}  {}",
                        red("✗"),
                        failure.filename,
                        red(&failure.error)
                    ),
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} files failed to convert", files.len());
    }
    Ok(())
}

/// `report.pdf` → `report.md`.
fn markdown_name(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "output".into());
    let mut name = PathBuf::from(stem);
    name.set_extension("md");
    name
}

/// `a.pdf` → `a.pdf.md`.
fn full_markdown_name(input: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| "output".into());
    name.push(".md");
    PathBuf::from(name)
}

/// Output names for `-o`: [`markdown_name`], or [`full_markdown_name`] for
/// inputs whose stems collide. Fails if two inputs still map to one file.
fn output_names(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let short: Vec<PathBuf> = inputs.iter().map(|p| markdown_name(p)).collect();
    let mut uses: HashMap<&PathBuf, usize> = HashMap::new();
    for name in &short {
        *uses.entry(name).or_default() += 1;
    }

    let names: Vec<PathBuf> = inputs
        .iter()
        .zip(&short)
        .map(|(input, name)| {
            if uses[name] > 1 {
                full_markdown_name(input)
            } else {
                name.clone()
            }
        })
        .collect();

    let mut seen = HashSet::new();
    for (input, name) in inputs.iter().zip(&names) {
        if !seen.insert(name) {
            anyhow::bail!(
                "{} would overwrite another output file ({})",
                input.display(),
                name.display()
            );
        }
    }
    Ok(names)
}
