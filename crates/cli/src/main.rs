use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use paperchat_core::{
    discover_pdfs, AppConfig, ChatError, ChatSession, GenerativeModel, ModelCatalog, ModelInfo,
    RemoteFile, SourcesStyle, StoreBuilder, StoreDirectory, StoreLoader, UploadEvent,
    DEFAULT_CONFIG,
};
use paperchat_llm::GeminiClient;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const EXIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

#[derive(Parser, Debug)]
#[command(name = "paperchat", version = VERSION, about = "Chat with a folder of research papers through Gemini")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding `<store id>.json` documents.
    #[arg(long = "store-dir", global = true)]
    store_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload every PDF in FOLDER and persist a store document.
    CreateStore {
        folder: Option<PathBuf>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "delay-ms")]
        delay_ms: Option<u64>,
    },
    /// Interactive question loop against a persisted store.
    Chat {
        store_id: String,
        /// Candidate model, may be repeated; the first available one wins.
        #[arg(long = "model", action = ArgAction::Append)]
        models: Vec<String>,
        #[arg(long)]
        window: Option<usize>,
    },
    /// List generation-capable models by rough pricing tier.
    Models,
    /// List persisted stores.
    Stores,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.clone(), env::var_os("PAPERCHAT_CONFIG"));
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let store_dir = resolve_store_dir(
        cli.store_dir.clone(),
        env::var_os("PAPERCHAT_STORE_DIR"),
        &config,
    );
    let stores = StoreDirectory::new(store_dir);

    match cli.command {
        Commands::CreateStore {
            folder,
            name,
            delay_ms,
        } => {
            let folder = folder.unwrap_or_else(|| config.upload.folder.clone());
            let name = name.unwrap_or_else(|| config.store.name.clone());
            let delay = delay_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.upload.delay());
            create_store(&stores, &folder, &name, delay)?;
        }
        Commands::Chat {
            store_id,
            models,
            window,
        } => {
            let candidates = if models.is_empty() {
                config.chat.models.clone()
            } else {
                models
            };
            let window = window.unwrap_or(config.chat.window);
            let session = ChatSession::new(config.chat.system_instruction.clone(), window);
            chat(&stores, &store_id, &candidates, session)?;
        }
        Commands::Models => list_models()?,
        Commands::Stores => list_stores(&stores)?,
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn resolve_config_path(flag: Option<PathBuf>, env_value: Option<std::ffi::OsString>) -> PathBuf {
    flag.or_else(|| env_value.map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
}

fn resolve_store_dir(
    flag: Option<PathBuf>,
    env_value: Option<std::ffi::OsString>,
    config: &AppConfig,
) -> PathBuf {
    flag.or_else(|| env_value.map(PathBuf::from))
        .unwrap_or_else(|| config.store.dir.clone())
}

fn create_store(stores: &StoreDirectory, folder: &Path, name: &str, delay: Duration) -> Result<()> {
    let client = GeminiClient::from_env()?;
    println!("[paperchat] Connected to Gemini");
    let pdfs = discover_pdfs(folder)?;
    println!("[paperchat] Found {} PDF file(s) to process", pdfs.len());
    let report = StoreBuilder::new(&client, stores)
        .delay(delay)
        .build(name, &pdfs, print_upload_event)?;
    println!(
        "\n[paperchat] Uploaded {}/{} PDF files",
        report.uploaded(),
        report.attempted
    );
    println!("[paperchat] Store ID (pass this to `paperchat chat`): {}", report.record.id);
    println!("[paperchat] Store saved to: {}", report.path.display());
    Ok(())
}

fn print_upload_event(event: &UploadEvent) {
    match event {
        UploadEvent::Started { index, total, path } => {
            println!("  [{}/{}] Uploading: {}", index + 1, total, path.display())
        }
        UploadEvent::Uploaded { remote_name, .. } => println!("    uploaded as {remote_name}"),
        UploadEvent::Failed { path, reason } => {
            println!("    failed to upload {}: {reason}", path.display())
        }
    }
}

fn chat(
    stores: &StoreDirectory,
    store_id: &str,
    candidates: &[String],
    mut session: ChatSession,
) -> Result<()> {
    let client = GeminiClient::from_env()?;
    let loaded = StoreLoader::new(&client, stores).load(store_id)?;
    println!("[paperchat] Loaded store: {}", loaded.record.name);
    println!("[paperchat] Store ID:     {}", loaded.record.id);
    for failure in &loaded.failures {
        println!("  warning: could not load file {}: {}", failure.name, failure.reason);
    }
    println!("[paperchat] Loaded {} document(s)", loaded.files.len());

    let model = match client.select_model(candidates) {
        Ok(model) => model,
        Err(err @ ChatError::ModelUnavailable { .. }) => {
            let hint = match client.list_models() {
                Ok(models) => format!(
                    "available models: {}",
                    ModelCatalog::classify(models).generation_model_names().join(", ")
                ),
                Err(list_err) => format!("listing models failed: {list_err:#}"),
            };
            return Err(anyhow!("{err}; {hint}"));
        }
        Err(err) => return Err(err.into()),
    };
    let client = client.with_model(model);
    println!("[paperchat] Using model:  {}", client.model());

    println!("\n{}", "=".repeat(50));
    println!("Ask questions about your papers. Type 'quit' to exit.");
    println!("{}", "=".repeat(50));
    let stdin = io::stdin();
    let stdout = io::stdout();
    chat_loop(
        &mut session,
        &client,
        &loaded.files,
        stdin.lock(),
        stdout.lock(),
    )?;
    Ok(())
}

/// Reads questions line by line until an exit word or end of input.
/// Returns the number of questions asked.
fn chat_loop<M, I, O>(
    session: &mut ChatSession,
    model: &M,
    files: &[RemoteFile],
    input: I,
    mut output: O,
) -> Result<usize>
where
    M: GenerativeModel + ?Sized,
    I: BufRead,
    O: Write,
{
    let mut asked = 0;
    let mut lines = input.lines();
    loop {
        write!(output, "\nQuestion: ")?;
        output.flush()?;
        let Some(line) = lines.next() else {
            writeln!(output)?;
            break;
        };
        let line = line?;
        let question = line.trim();
        if is_exit_command(question) {
            writeln!(output, "Goodbye!")?;
            break;
        }
        if question.is_empty() {
            continue;
        }
        writeln!(output, "Thinking...")?;
        let reply = session.ask(model, files, question);
        asked += 1;
        writeln!(output, "\nAnswer: {}", reply.render(SourcesStyle::Line))?;
    }
    Ok(asked)
}

fn is_exit_command(input: &str) -> bool {
    let lowered = input.trim().to_lowercase();
    EXIT_WORDS.contains(&lowered.as_str())
}

fn list_models() -> Result<()> {
    let client = GeminiClient::from_env()?;
    let catalog = ModelCatalog::classify(client.list_models()?);
    print!("{}", render_catalog(&catalog));
    Ok(())
}

fn render_catalog(catalog: &ModelCatalog) -> String {
    let mut out = String::new();
    let section = |out: &mut String, title: &str, models: &[ModelInfo]| {
        if models.is_empty() {
            return;
        }
        out.push_str(&format!("\n{title}\n{}\n", "-".repeat(30)));
        for model in models {
            out.push_str(&format!("{}\n", model.short_name()));
            out.push_str(&format!(
                "   Methods: {}\n",
                model.supported_generation_methods.join(", ")
            ));
            out.push_str(&format!(
                "   Description: {}\n\n",
                model
                    .description
                    .as_deref()
                    .unwrap_or("No description available")
            ));
        }
    };
    section(&mut out, "FREE MODELS:", &catalog.free);
    section(&mut out, "PAID MODELS:", &catalog.paid);
    out.push_str("\nSummary:\n");
    out.push_str(&format!("   Free models: {}\n", catalog.free.len()));
    out.push_str(&format!("   Paid models: {}\n", catalog.paid.len()));
    out.push_str(&format!("   Total models: {}\n", catalog.total()));
    if !catalog.free.is_empty() {
        let names: Vec<&str> = catalog.free.iter().map(ModelInfo::short_name).collect();
        out.push_str(&format!("\nRecommended free models: {}\n", names.join(", ")));
    }
    out
}

fn list_stores(stores: &StoreDirectory) -> Result<()> {
    let records = stores.list()?;
    if records.is_empty() {
        println!("no stores in {}", stores.root().display());
        return Ok(());
    }
    for record in records {
        println!("{}  {} ({} files)", record.id, record.name, record.files.len());
    }
    Ok(())
}
