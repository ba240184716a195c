//! CLI definition and command dispatch for IRRA.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (e.g., `--store`, `--device`)
//! 2. Environment variables (`IRRA_CONFIG`, `IRRA_STORE`, `IRRA_DEVICE`, ...)
//! 3. Config file (`~/.irra/config.yaml` or path from `--config`/`IRRA_CONFIG`)
//! 4. Built-in defaults

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::debug;

use crate::ui::{format, table, ColorMode, MessageType, Progress, ProgressMode, Style};

use irra_core::config::DevicePreference;
use irra_core::{
    parse_chunks_jsonl, AnswerResult, GlobalConfig, IrraEngine, IrraError, MetadataFilter,
};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Iterative Reflective Retrieval Assistant – answers questions from course material
#[derive(Parser, Debug)]
#[command(name = "irra")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "IRRA_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress and informational messages
    #[arg(short, long, global = true, env = "IRRA_QUIET")]
    pub quiet: bool,

    /// Path to configuration file (default: ~/.irra/config.yaml)
    #[arg(long, global = true, env = "IRRA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Device preference for the local reranker (auto/gpu/cpu)
    #[arg(long, global = true, env = "IRRA_DEVICE")]
    pub device: Option<String>,

    /// Color output mode: always, never, or auto (default: auto)
    #[arg(long, global = true, env = "IRRA_COLOR", default_value = "auto")]
    pub color: String,

    /// Chunk store directory (overrides `storePath` from the config file)
    #[arg(long, global = true, env = "IRRA_STORE")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add chunks from a JSONL file to the store
    #[command(after_help = r#"EXAMPLES:
    # Each line is {"content": "...", "metadata": {"source_file": "...", ...}}
    irra index chunks/week3.jsonl
"#)]
    Index {
        /// JSONL file with one chunk per line
        file: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Remove every chunk of a source document
    #[command(after_help = r#"EXAMPLES:
    irra remove week3_osmosis.pdf
    irra remove week3_osmosis.pdf --notebook bio101
"#)]
    Remove {
        /// Source file name as stored in chunk metadata
        source: String,

        /// Only remove chunks belonging to this notebook
        #[arg(long)]
        notebook: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Retrieve the most relevant chunks for a query
    #[command(after_help = r#"EXAMPLES:
    irra retrieve "What is osmosis?"
    irra retrieve "What is osmosis?" -k 3 --filter week=3
    irra retrieve "How does osmosis relate to diffusion?" --multi-hop --json
"#)]
    Retrieve {
        /// Query text
        query: String,

        /// Number of chunks to return (default: retrieval.finalK)
        #[arg(short, long)]
        k: Option<usize>,

        /// Metadata filter as key=value (repeatable; values parse as JSON when possible)
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Skip the cross-encoder reranker
        #[arg(long)]
        no_rerank: bool,

        /// Force query decomposition
        #[arg(long)]
        multi_hop: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Answer a question with reflection and citations
    #[command(after_help = r#"EXAMPLES:
    irra ask "What is osmosis?"
    irra ask "Compare mitosis and meiosis" --max-iterations 3 --threshold 0.7
    irra ask "And in plants?" --context-file history.txt
"#)]
    Ask {
        /// Question text
        query: String,

        /// File with prior conversation to include in the prompt
        #[arg(long, value_name = "PATH")]
        context_file: Option<PathBuf>,

        /// Answer/reflect cycles (default: reflection.maxIterations)
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Confidence needed to accept an answer (default: reflection.confidenceThreshold)
        #[arg(long)]
        threshold: Option<f32>,

        /// Force query decomposition
        #[arg(long)]
        multi_hop: bool,

        /// Metadata filter as key=value (repeatable)
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show store and index status
    Status {
        /// Restrict counts to one notebook
        #[arg(long)]
        notebook: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List indexed source documents
    Sources {
        /// Restrict to one notebook
        #[arg(long)]
        notebook: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file
    #[command(after_help = r#"EXAMPLES:
    irra config check
    irra config check --config ./irra.yaml --json
"#)]
    Check {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved configuration
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Entry point
// ============================================================================

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always, debug output only with --verbose. Logs go to stderr so
    // --json output stays clean.
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!(
        "irra_core={0},irra_cli={0},irra_model={0},irra_db={0}",
        log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let color_mode = cli.color.parse::<ColorMode>().unwrap_or_default();
    let style = Style::new(color_mode);

    // `config check` reports problems itself instead of failing to load
    if let Command::Config {
        action: ConfigAction::Check { json },
    } = &cli.command
    {
        return finish(&style, handle_config_check(&style, &cli, *json));
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to load configuration",
                    Some(&format!("{:#}", e)),
                    Some(&config_hint(cli.config.as_deref())),
                )
            );
            return ExitCode::FAILURE;
        }
    };
    debug!("Using store at {}", config.resolved_store_path().display());

    // `config show` works without opening the store
    if let Command::Config {
        action: ConfigAction::Show { json },
    } = &cli.command
    {
        return finish(&style, handle_config_show(&style, &config, *json));
    }

    let engine = match IrraEngine::from_global_config(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to initialize IRRA engine",
                    Some(&e.to_string()),
                    Some(&config_hint(cli.config.as_deref())),
                )
            );
            return ExitCode::FAILURE;
        }
    };

    let quiet = cli.quiet;
    let result = match cli.command {
        Command::Index { file, json } => handle_index(&style, &engine, &file, quiet, json),
        Command::Remove {
            source,
            notebook,
            json,
        } => handle_remove(&style, &engine, &source, notebook.as_deref(), json),
        Command::Retrieve {
            query,
            k,
            filters,
            no_rerank,
            multi_hop,
            json,
        } => handle_retrieve(
            &style, &engine, &query, k, &filters, no_rerank, multi_hop, quiet, json,
        ),
        Command::Ask {
            query,
            context_file,
            max_iterations,
            threshold,
            multi_hop,
            filters,
            json,
        } => handle_ask(
            &style,
            &engine,
            AskArgs {
                query,
                context_file,
                max_iterations,
                threshold,
                multi_hop,
                filters,
            },
            quiet,
            json,
        ),
        Command::Status { notebook, json } => {
            handle_status(&style, &engine, notebook.as_deref(), json)
        }
        Command::Sources { notebook, json } => {
            handle_sources(&style, &engine, notebook.as_deref(), json)
        }
        Command::Config { .. } => Ok(()),
    };

    finish(&style, result)
}

fn finish(style: &Style, result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("{:#}", e);
            let hint = e.downcast_ref::<IrraError>().and_then(|err| match err {
                IrraError::InvalidConfiguration { hint, .. } => Some(hint.clone()),
                _ => None,
            });
            match hint {
                Some(hint) => {
                    eprintln!("{}", style.error_with_context(&message, None, Some(&hint)))
                }
                None => eprintln!("{}", style.message(MessageType::Err, &message)),
            }
            ExitCode::FAILURE
        }
    }
}

fn config_hint(path: Option<&Path>) -> String {
    match path {
        Some(path) => format!("Check your config at {}", path.display()),
        None => "Check your global config at ~/.irra/config.yaml".to_string(),
    }
}

/// Load the config file and apply `--device` / `--store` overrides.
fn load_config(cli: &Cli) -> anyhow::Result<GlobalConfig> {
    let mut config = match &cli.config {
        Some(path) => GlobalConfig::from_path(path)?,
        None => GlobalConfig::load_default()?,
    };

    if let Some(device) = &cli.device {
        config.device = device
            .parse::<DevicePreference>()
            .map_err(|e| anyhow!(e))?;
    }
    if let Some(store) = &cli.store {
        config.store_path = Some(store.clone());
    }

    Ok(config)
}

/// Parse repeated `key=value` flags. Values that parse as JSON keep their
/// type (`week=3` is a number), anything else is a string.
fn parse_filters(filters: &[String]) -> anyhow::Result<Option<MetadataFilter>> {
    let mut filter = MetadataFilter::new();
    for raw in filters {
        let (key, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid filter '{}': expected KEY=VALUE", raw))?;
        let key = key.trim();
        if key.is_empty() {
            bail!("Invalid filter '{}': empty key", raw);
        }
        let value = value.trim();
        let parsed =
            serde_json::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()));
        filter.insert(key, parsed);
    }
    Ok((!filter.is_empty()).then_some(filter))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Command handlers
// ============================================================================

fn handle_index(
    style: &Style,
    engine: &IrraEngine,
    file: &Path,
    quiet: bool,
    json: bool,
) -> anyhow::Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let chunks =
        parse_chunks_jsonl(&text).with_context(|| format!("Invalid chunk file {}", file.display()))?;

    if chunks.is_empty() {
        if json {
            return print_json(&json!({ "added": 0, "totalChunks": engine.status(None)?.chunk_count }));
        }
        println!(
            "{}",
            style.message(MessageType::Info, &format!("No chunks found in {}", file.display()))
        );
        return Ok(());
    }

    let progress = Progress::spinner(
        &format!("Embedding {} chunks...", chunks.len()),
        ProgressMode::detect(quiet, json),
    );
    let report = engine.index_chunks(&chunks)?;

    if json {
        progress.finish_clear();
        return print_json(&report);
    }
    progress.finish_with_message(&style.message(
        MessageType::Ok,
        &format!("Indexed {} chunks from {}", report.added, file.display()),
    ));
    println!(
        "{}",
        style.message_detail("Store total", &report.total_chunks.to_string())
    );
    Ok(())
}

fn handle_remove(
    style: &Style,
    engine: &IrraEngine,
    source: &str,
    notebook: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let report = engine.remove_source(source, notebook)?;

    if json {
        return print_json(&report);
    }
    if report.removed == 0 {
        println!(
            "{}",
            style.message(MessageType::Skip, &format!("No chunks found for {}", source))
        );
    } else {
        println!(
            "{}",
            style.message(
                MessageType::Ok,
                &format!(
                    "Removed {} chunks from {}",
                    report.removed,
                    style.file_path(source)
                )
            )
        );
        println!(
            "{}",
            style.message_detail("Store total", &report.total_chunks.to_string())
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_retrieve(
    style: &Style,
    engine: &IrraEngine,
    query: &str,
    k: Option<usize>,
    filters: &[String],
    no_rerank: bool,
    multi_hop: bool,
    quiet: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut request = engine.retrieve_request(query);
    if let Some(k) = k {
        request = request.with_k(k);
    }
    if let Some(filter) = parse_filters(filters)? {
        request = request.with_filter(filter);
    }
    if no_rerank {
        request = request.with_reranker(false);
    }
    if multi_hop {
        request = request.with_multi_hop(true);
    }

    let progress = Progress::spinner("Searching...", ProgressMode::detect(quiet, json));
    let outcome = engine.retrieve_detailed(&request);
    progress.finish_clear();
    let outcome = outcome?;

    if json {
        return print_json(&outcome);
    }

    println!("{}", style.section("QUERY"));
    println!();
    println!("  {}", style.key_value("Query", query));
    if outcome.queries.len() > 1 {
        for sub_query in &outcome.queries[..outcome.queries.len() - 1] {
            println!("  {}", style.key_value("Sub-query", sub_query));
        }
    }
    println!(
        "  {}",
        style.key_value(
            "Candidates",
            &format!(
                "{} dense, {} keyword",
                outcome.dense_candidates, outcome.keyword_candidates
            )
        )
    );
    if let Some(status) = &outcome.rerank_status {
        println!("  {}", style.key_value("Rerank", &status.to_string()));
    }
    println!();

    if outcome.chunks.is_empty() {
        println!("{}", style.message(MessageType::Info, "No relevant chunks found."));
        return Ok(());
    }

    println!("{}", style.section("RESULTS"));
    println!();
    println!("{}", table::render_chunks_table(&outcome.chunks));
    Ok(())
}

struct AskArgs {
    query: String,
    context_file: Option<PathBuf>,
    max_iterations: Option<usize>,
    threshold: Option<f32>,
    multi_hop: bool,
    filters: Vec<String>,
}

fn handle_ask(
    style: &Style,
    engine: &IrraEngine,
    args: AskArgs,
    quiet: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut request = engine.answer_request(&args.query);
    if let Some(path) = &args.context_file {
        let context = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        request = request.with_prior_context(context);
    }
    if let Some(max_iterations) = args.max_iterations {
        request = request.with_max_iterations(max_iterations);
    }
    if let Some(threshold) = args.threshold {
        request = request.with_threshold(threshold);
    }
    if args.multi_hop {
        request = request.with_multi_hop(true);
    }
    if let Some(filter) = parse_filters(&args.filters)? {
        request = request.with_filter(filter);
    }

    let progress = Progress::spinner("Thinking...", ProgressMode::detect(quiet, json));
    let result = engine.answer(&request);
    progress.finish_clear();
    let result = result?;

    if json {
        return print_json(&result);
    }

    println!("{}", result.answer.trim_end());
    println!();

    if result.chunks_used == 0 {
        if !quiet {
            println!(
                "{}",
                style.message(MessageType::Hint, "Index course material first: irra index <FILE.jsonl>")
            );
        }
        return Ok(());
    }

    if !result.citations.is_empty() {
        println!("{}", style.section("SOURCES"));
        for citation in &result.citations {
            println!("{}", style.citation(citation));
        }
        println!();
    }

    if !quiet {
        let summary = format!(
            "Confidence {} after {} iteration(s), {} chunks used",
            style.score(result.confidence),
            result.iterations,
            result.chunks_used
        );
        let kind = if result.accepted {
            MessageType::Info
        } else {
            MessageType::Warn
        };
        println!("{}", style.message(kind, &summary));
        if !result.accepted {
            println!(
                "{}",
                style.message_detail(
                    "Note",
                    &unaccepted_note(&result, request.confidence_threshold)
                )
            );
        }
    }
    Ok(())
}

/// Why an answer was returned without being accepted.
fn unaccepted_note(result: &AnswerResult, threshold: f32) -> String {
    if result.chunks_used == 0 {
        "no course material matched the question".to_string()
    } else {
        format!(
            "below the {:.2} threshold after {} cycles; returned the final attempt",
            threshold, result.iterations
        )
    }
}

fn handle_status(
    style: &Style,
    engine: &IrraEngine,
    notebook: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let status = engine.status(notebook)?;

    if json {
        return print_json(&status);
    }

    println!("{}", style.section("STORE"));
    println!();
    println!(
        "  {}",
        style.key_value("Path", &style.file_path(&status.store_path.display().to_string()))
    );
    if let Some(notebook) = &status.notebook_id {
        println!("  {}", style.key_value("Notebook", notebook));
    }
    println!("  {}", style.key_value("Chunks", &status.chunk_count.to_string()));
    println!("  {}", style.key_value("Sources", &status.source_count.to_string()));
    if !status.facets.weeks.is_empty() {
        let weeks: Vec<String> = status.facets.weeks.iter().map(u32::to_string).collect();
        println!("  {}", style.key_value("Weeks", &weeks.join(", ")));
    }
    if !status.facets.topics.is_empty() {
        println!("  {}", style.key_value("Topics", &status.facets.topics.join(", ")));
    }
    println!();

    println!("{}", style.section("MODELS"));
    println!();
    println!("  {}", style.key_value("Embedding", &status.embedding_model));
    println!("  {}", style.key_value("Completion", &status.completion_model));
    let reranker = if status.reranker_enabled {
        status.reranker_model.clone()
    } else {
        "disabled".to_string()
    };
    println!("  {}", style.key_value("Reranker", &reranker));
    println!();

    println!("{}", style.section("KEYWORD INDEX"));
    println!();
    match &status.keyword_index {
        Some(stats) => {
            println!("  {}", style.key_value("Documents", &stats.num_documents.to_string()));
            println!("  {}", style.key_value("Vocabulary", &stats.vocabulary_size.to_string()));
            println!(
                "  {}",
                style.key_value("Built", &format::format_relative_time(stats.built_at))
            );
        }
        None => println!("  {}", style.key_value("State", "not built (builds on first query)")),
    }
    Ok(())
}

fn handle_sources(
    style: &Style,
    engine: &IrraEngine,
    notebook: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let sources = engine.sources(notebook)?;

    if json {
        return print_json(&sources);
    }

    if sources.is_empty() {
        println!("{}", style.message(MessageType::Info, "No sources indexed."));
        return Ok(());
    }

    println!("{}", table::render_sources_table(&sources));
    println!();
    println!(
        "{}",
        style.message(MessageType::Info, &format!("{} source(s)", sources.len()))
    );
    Ok(())
}

/// Validate the configuration file and report errors/warnings.
fn handle_config_check(style: &Style, cli: &Cli, json: bool) -> anyhow::Result<()> {
    let path = cli.config.clone().or_else(GlobalConfig::default_path);
    let exists = path.as_deref().is_some_and(Path::exists);

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let config = match (&path, exists) {
        (Some(path), true) => fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))
            .and_then(|text| GlobalConfig::from_yaml(&text).map_err(Into::into)),
        _ => Ok(GlobalConfig::default()),
    };

    match config {
        Ok(config) => match config.validate() {
            Ok(found) => warnings.extend(found),
            Err(e) => errors.push(e.to_string()),
        },
        Err(e) => errors.push(format!("{:#}", e)),
    }

    if json {
        print_json(&json!({
            "path": path,
            "exists": exists,
            "valid": errors.is_empty(),
            "warnings": warnings,
            "errors": errors,
        }))?;
    } else {
        match (&path, exists) {
            (Some(path), true) => println!(
                "{}",
                style.message(MessageType::Info, &format!("Checked {}", path.display()))
            ),
            _ => println!(
                "{}",
                style.message(MessageType::Info, "No config file found, checked built-in defaults")
            ),
        }

        if !warnings.is_empty() {
            println!(
                "{}",
                style.message(MessageType::Warn, &format!("{} warning(s):", warnings.len()))
            );
            for warning in &warnings {
                println!("  • {}", warning);
            }
        }
        if !errors.is_empty() {
            println!(
                "{}",
                style.message(MessageType::Err, &format!("{} error(s):", errors.len()))
            );
            for error in &errors {
                println!("  • {}", error);
            }
        }

        if errors.is_empty() && warnings.is_empty() {
            println!("{}", style.message(MessageType::Ok, "Configuration is valid"));
        } else if errors.is_empty() {
            println!(
                "{}",
                style.message(MessageType::Ok, "Configuration is valid with warnings")
            );
        }
    }

    if !errors.is_empty() {
        return Err(IrraError::invalid_configuration(
            format!("{} configuration error(s) found", errors.len()),
            "Fix the reported fields and run `irra config check` again",
        )
        .into());
    }
    Ok(())
}

/// Show the resolved configuration (file plus CLI overrides).
fn handle_config_show(style: &Style, config: &GlobalConfig, json: bool) -> anyhow::Result<()> {
    let mut resolved = serde_json::to_value(config)?;
    if let Value::Object(map) = &mut resolved {
        map.insert(
            "resolvedStorePath".to_string(),
            json!(config.resolved_store_path()),
        );
    }

    if json {
        return print_json(&resolved);
    }

    println!(
        "{}",
        style.message(MessageType::Info, "Resolved configuration:")
    );
    println!();
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filters_typed_values() {
        let filter = parse_filters(&[
            "week=3".to_string(),
            "topic=Biology".to_string(),
            "notebook_id=\"42\"".to_string(),
        ])
        .unwrap()
        .unwrap();

        let expected = MetadataFilter::new()
            .with("week", 3)
            .with("topic", "Biology")
            .with("notebook_id", "42");
        assert_eq!(filter, expected);
    }

    #[test]
    fn test_parse_filters_empty_and_invalid() {
        assert!(parse_filters(&[]).unwrap().is_none());
        assert!(parse_filters(&["week".to_string()]).is_err());
        assert!(parse_filters(&["=3".to_string()]).is_err());
    }

    #[test]
    fn test_unaccepted_note_describes_outcome() {
        let mut result = AnswerResult {
            answer: "second answer".to_string(),
            citations: Vec::new(),
            citation_chunks: Vec::new(),
            confidence: 0.4,
            chunks_used: 3,
            iterations: 2,
            accepted: false,
        };
        assert_eq!(
            unaccepted_note(&result, 0.6),
            "below the 0.60 threshold after 2 cycles; returned the final attempt"
        );

        result.chunks_used = 0;
        assert_eq!(
            unaccepted_note(&result, 0.6),
            "no course material matched the question"
        );
    }

    #[test]
    fn test_cli_parses_retrieve() {
        let cli = Cli::try_parse_from([
            "irra", "--store", "/tmp/s", "retrieve", "osmosis", "-k", "3", "--filter", "week=3",
            "--no-rerank",
        ])
        .unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/s")));
        match cli.command {
            Command::Retrieve {
                query,
                k,
                filters,
                no_rerank,
                ..
            } => {
                assert_eq!(query, "osmosis");
                assert_eq!(k, Some(3));
                assert_eq!(filters, vec!["week=3"]);
                assert!(no_rerank);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
