use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use tokio::sync::mpsc;
use vertiprompt_core::catalog::{curated_models, selectable_models};
use vertiprompt_core::export::{
    MAX_IMPORT_BYTES, SessionSnapshot, format_cost, import_document, render_copy_text,
    render_markdown,
};
use vertiprompt_core::store::SessionStore;
use vertiprompt_core::{
    AbortHandle, GenerateRequest, GenerationEvent, GenerationSettings, Generator,
    ImportFormatError, PriceTable, ResponseContract, RunContext,
};
use vertiprompt_harness::ChatTransport;
use vertiprompt_harness::vendors::openrouter::OpenRouterTransport;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Product description (at least 50 characters)
    #[arg(
        short,
        long,
        value_name = "TEXT",
        conflicts_with = "description_file",
        required_unless_present = "description_file"
    )]
    pub description: Option<String>,

    /// Read the product description from a file
    #[arg(long, value_name = "FILE")]
    pub description_file: Option<PathBuf>,

    /// Model id (defaults to VERTIPROMPT_DEFAULT_MODEL or openai/o3-pro)
    #[arg(short, long, value_name = "ID")]
    pub model: Option<String>,

    /// Number of sequential generation rounds
    #[arg(short = 'n', long, default_value_t = 1)]
    pub iterations: u32,

    /// Ask for the older fenced-text reply format instead of JSON
    #[arg(long)]
    pub legacy: bool,

    /// Also write a JSON export of the result
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Also write the slices as markdown
    #[arg(long, value_name = "FILE")]
    pub markdown: Option<PathBuf>,

    /// OpenRouter API key
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl GenerateArgs {
    fn resolve_description(&self) -> Result<String> {
        match (&self.description, &self.description_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => fs::read_to_string(path)
                .with_context(|| format!("reading description from {}", path.display())),
            (None, None) => bail!("a description is required (--description or --description-file)"),
        }
    }
}

pub async fn generate(args: GenerateArgs, store: &SessionStore) -> Result<()> {
    generate_with(args, store, || {
        Ok(Arc::new(OpenRouterTransport::from_env()?) as Arc<dyn ChatTransport>)
    })
    .await
}

/// Validates the request before `connect` builds the transport, so bad input
/// never waits on the gateway.
async fn generate_with(
    args: GenerateArgs,
    store: &SessionStore,
    connect: impl FnOnce() -> Result<Arc<dyn ChatTransport>>,
) -> Result<()> {
    let description = args.resolve_description()?;
    let mut settings = GenerationSettings::from_env()?;
    if args.legacy {
        settings.contract = ResponseContract::LegacyText;
    }
    let model = args
        .model
        .clone()
        .unwrap_or_else(|| settings.default_model.clone());
    let request = GenerateRequest::new(args.api_key.clone().unwrap_or_default(), description.as_str())
        .model(model.as_str())
        .iterations(args.iterations);
    request.validate(&settings)?;

    let transport = connect()?;
    let mut prices = PriceTable::curated();
    prices.extend_missing(&transport.list_models().await);
    let generator = Generator::new(transport, settings).with_prices(prices);

    let (handle, signal) = AbortHandle::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current step...");
            handle.abort();
        }
    });
    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx));

    let outcome = generator
        .generate(request, RunContext::default().with_events(tx).with_abort(signal))
        .await?;
    join_printer(printer).await?;

    if !outcome.slices.is_empty() {
        println!("{}\n", render_markdown(&outcome.slices));
        println!("{}", format_cost(outcome.total_cost));

        let snapshot = SessionSnapshot::from_outcome(description, model, &outcome);
        store
            .save(&snapshot)
            .with_context(|| format!("saving session to {}", store.path().display()))?;
        if let Some(path) = &args.export {
            write_export(&snapshot, path)?;
        }
        if let Some(path) = &args.markdown {
            write_markdown(&snapshot, path)?;
        }
    }

    match outcome.failure {
        None => Ok(()),
        Some(failure) if outcome.slices.is_empty() => Err(anyhow!(
            "generation failed at iteration {}: {}",
            failure.iteration,
            failure.error
        )),
        Some(failure) => {
            eprintln!(
                "Run stopped at iteration {} ({}); kept {} slice(s) from earlier iterations.",
                failure.iteration,
                failure.error,
                outcome.slices.len()
            );
            Ok(())
        }
    }
}

async fn join_printer(printer: tokio::task::JoinHandle<()>) -> Result<()> {
    printer.await.context("progress printer failed")
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<GenerationEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            GenerationEvent::IterationStarted { iteration, total } => {
                eprintln!("Generating iteration {iteration}/{total}...");
            }
            GenerationEvent::RetryScheduled {
                model, delay, code, ..
            } => {
                eprintln!(
                    "  {model} failed ({code}), retrying in {:.1}s",
                    delay.as_secs_f64()
                );
            }
            GenerationEvent::FallbackEngaged { from, to, code, .. } => {
                eprintln!("  {from} gave up ({code}), switching to {to}");
            }
            GenerationEvent::IterationCompleted {
                iteration,
                slices,
                cost,
                total_cost,
            } => {
                eprintln!(
                    "  iteration {iteration}: {slices} slice(s), ${cost:.6} (total ${total_cost:.6})"
                );
            }
            GenerationEvent::RunHalted { iteration, message } => {
                eprintln!("  iteration {iteration} failed: {message}");
            }
        }
    }
}

pub async fn models() -> Result<()> {
    let settings = GenerationSettings::from_env()?;
    let transport = OpenRouterTransport::from_env()?;
    let mut listed = transport.list_models().await;
    if listed.is_empty() {
        eprintln!("Model listing unavailable; showing the curated list.");
        listed = curated_models();
    }
    for model in selectable_models(listed, &settings.default_model, &settings.fallback_model) {
        println!(
            "{:<44} ${:>7.2} / ${:>7.2} per 1M tokens  {}",
            model.id, model.pricing.prompt, model.pricing.completion, model.name
        );
    }
    Ok(())
}

fn saved_session(store: &SessionStore) -> Result<SessionSnapshot> {
    match store.load()? {
        Some(snapshot) if !snapshot.slices.is_empty() => Ok(snapshot),
        _ => bail!("no saved slices in {}", store.path().display()),
    }
}

fn write_export(snapshot: &SessionSnapshot, path: &Path) -> Result<()> {
    let json = snapshot.to_export(chrono::Utc::now()).to_json_pretty()?;
    fs::write(path, json).with_context(|| format!("writing export to {}", path.display()))
}

fn write_markdown(snapshot: &SessionSnapshot, path: &Path) -> Result<()> {
    fs::write(path, render_markdown(&snapshot.slices))
        .with_context(|| format!("writing markdown to {}", path.display()))
}

pub fn export(store: &SessionStore, out: &Path) -> Result<()> {
    write_export(&saved_session(store)?, out)?;
    println!("Exported to {}", out.display());
    Ok(())
}

pub fn markdown(store: &SessionStore, out: &Path) -> Result<()> {
    write_markdown(&saved_session(store)?, out)?;
    println!("Wrote {}", out.display());
    Ok(())
}

pub fn import(store: &SessionStore, path: &Path) -> Result<()> {
    let size = fs::metadata(path)
        .with_context(|| format!("reading {}", path.display()))?
        .len();
    if size > MAX_IMPORT_BYTES as u64 {
        return Err(ImportFormatError::TooLarge {
            size: usize::try_from(size).unwrap_or(usize::MAX),
            limit: MAX_IMPORT_BYTES,
        }
        .into());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let settings = GenerationSettings::from_env()?;
    let snapshot = import_document(&raw, &settings.default_model)
        .with_context(|| format!("import failed for {}", path.display()))?;
    store.save(&snapshot)?;
    println!("Imported {} slice(s).", snapshot.slices.len());
    Ok(())
}

pub fn show(store: &SessionStore, copy_format: bool) -> Result<()> {
    let Some(snapshot) = store.load()? else {
        println!("No saved session.");
        return Ok(());
    };
    println!("Run date:    {}", snapshot.run_date.to_rfc3339());
    println!("Model:       {}", snapshot.model);
    println!("Description: {}\n", snapshot.description);
    let body = if copy_format {
        render_copy_text(&snapshot.slices)
    } else {
        render_markdown(&snapshot.slices)
    };
    println!("{body}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vertiprompt_core::{GenerateError, Slice};

    fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::new(dir.path().join("last-run.json"))
    }

    #[test]
    fn description_is_read_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("desc.txt");
        fs::write(&path, "from a file").expect("write");
        let args = GenerateArgs {
            description: None,
            description_file: Some(path),
            model: None,
            iterations: 1,
            legacy: false,
            export: None,
            markdown: None,
            api_key: None,
        };
        assert_eq!(args.resolve_description().expect("read"), "from a file");
    }

    fn args_with(description: &str) -> GenerateArgs {
        GenerateArgs {
            description: Some(description.to_string()),
            description_file: None,
            model: None,
            iterations: 1,
            legacy: false,
            export: None,
            markdown: None,
            api_key: Some("sk-or-test".into()),
        }
    }

    #[tokio::test]
    async fn short_description_is_rejected_before_connecting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        let mut connected = false;
        let err = generate_with(args_with(&"x".repeat(49)), &store, || {
            connected = true;
            bail!("transport must not be built")
        })
        .await
        .expect_err("too short");

        assert!(!connected);
        assert!(matches!(
            err.downcast_ref::<GenerateError>(),
            Some(GenerateError::Validation(msg)) if msg.contains("50")
        ));
        assert_eq!(store.load().expect("load"), None);
    }

    #[tokio::test]
    async fn zero_iterations_and_missing_key_are_rejected_before_connecting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        let description = "A habit tracker that nudges people through calendar invites.";

        let mut zero = args_with(description);
        zero.iterations = 0;
        let mut no_key = args_with(description);
        no_key.api_key = None;

        for args in [zero, no_key] {
            let mut connected = false;
            let result = generate_with(args, &store, || {
                connected = true;
                bail!("transport must not be built")
            })
            .await;
            assert!(result.is_err());
            assert!(!connected);
        }
    }

    #[tokio::test]
    async fn printer_panic_is_reported() {
        let printer: tokio::task::JoinHandle<()> = tokio::spawn(async { panic!("stderr closed") });
        let err = join_printer(printer).await.expect_err("panic surfaces");
        assert!(err.to_string().contains("progress printer failed"));

        let (tx, rx) = mpsc::unbounded_channel();
        drop(tx);
        join_printer(tokio::spawn(print_events(rx)))
            .await
            .expect("printer ends when the run drops its sender");
    }

    #[test]
    fn export_then_import_through_the_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        let snapshot = SessionSnapshot::new(
            "An expense tracker that reads receipts from email.",
            "deepseek/deepseek-r1-0528",
            vec![Slice::new("Create debug log", "# Goal")],
        );
        store.save(&snapshot).expect("save");

        let out = dir.path().join("export.json");
        export(&store, &out).expect("export");

        let other = SessionStore::new(dir.path().join("other.json"));
        import(&other, &out).expect("import");
        let loaded = other.load().expect("load").expect("present");
        assert_eq!(loaded.slices, snapshot.slices);
        assert_eq!(loaded.model, snapshot.model);
        assert_eq!(loaded.description, snapshot.description);
    }

    #[test]
    fn rejected_import_leaves_session_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        let snapshot = SessionSnapshot::new("d", "openai/o3-pro", vec![Slice::new("a", "b")]);
        store.save(&snapshot).expect("save");

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{"schemaVersion":"0.9","slices":[]}"#).expect("write");
        assert!(import(&store, &bad).is_err());
        assert_eq!(store.load().expect("load"), Some(snapshot));
    }

    #[test]
    fn export_requires_saved_slices() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        assert!(export(&store, &dir.path().join("x.json")).is_err());
        assert!(markdown(&store, &dir.path().join("x.md")).is_err());
    }

    #[test]
    fn markdown_is_written_from_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        store
            .save(&SessionSnapshot::new("d", "m", vec![Slice::new("T", "P")]))
            .expect("save");
        let out = dir.path().join("slices.md");
        markdown(&store, &out).expect("markdown");
        assert_eq!(
            fs::read_to_string(out).expect("read"),
            "## Slice 1 — T\n\n```prompt\nP\n```"
        );
    }
}
