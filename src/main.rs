// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::io::Write;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand, Args};
use clap_complete::{generate, Shell};
use indicatif::MultiProgress;

use dataset_translator::app_config::{self, Config, FailurePolicy, TranslationProvider};
use dataset_translator::database::{DatabaseConnection, Repository};
use dataset_translator::dataset_io::{DatasetExporter, DatasetImporter};
use dataset_translator::errors::DatasetError;
use dataset_translator::language_utils;
use dataset_translator::translation::{
    test_translator_connection, wait_all, RunOptions, TaskRunner, TranslationRequest,
};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for FailurePolicy to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliFailurePolicy {
    Abort,
    MarkInvalid,
}

impl From<CliFailurePolicy> for FailurePolicy {
    fn from(cli_policy: CliFailurePolicy) -> Self {
        match cli_policy {
            CliFailurePolicy::Abort => FailurePolicy::Abort,
            CliFailurePolicy::MarkInvalid => FailurePolicy::MarkInvalid,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage languages
    #[command(subcommand)]
    Language(LanguageCommands),

    /// Manage datasets and their languages
    #[command(subcommand)]
    Dataset(DatasetCommands),

    /// Manage translators
    #[command(subcommand)]
    Translator(TranslatorCommands),

    /// List the key registry
    Keys,

    /// Attach a JSON file (or every {dataset}_{code}.json file of a directory)
    Attach(AttachArgs),

    /// Import attached files that have not been imported yet
    Import(ImportArgs),

    /// Export one dataset language to JSON
    Export(ExportArgs),

    /// Translate a dataset into one or more languages
    Translate(TranslateArgs),

    /// Inspect or delete records
    #[command(subcommand)]
    Records(RecordCommands),

    /// Show database statistics
    Stats,

    /// Generate shell completions for dataset-translator
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum LanguageCommands {
    /// Register a language
    Add {
        /// Language code (e.g., 'en', 'fr', 'pt-BR')
        code: String,
        /// Display name used in prompts; derived from the ISO code when omitted
        #[arg(short, long)]
        name: Option<String>,
    },
    /// List languages
    List,
}

#[derive(Subcommand, Debug)]
enum DatasetCommands {
    /// Register a dataset
    Add {
        /// Dataset name
        name: String,
    },
    /// List datasets
    List,
    /// List dataset languages and whether they have been imported
    Languages {
        /// Only show this dataset
        #[arg(short, long)]
        dataset: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TranslatorCommands {
    /// Register a translator (its name selects the provider)
    Add {
        /// Translator name, e.g. 'openai' or 'anthropic'
        name: String,
    },
    /// List translators
    List,
    /// Send a minimal request through the translator's provider
    Test {
        /// Translator name
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum RecordCommands {
    /// Show the records of a dataset language
    Show {
        /// Dataset name
        #[arg(short, long)]
        dataset: String,
        /// Language code
        #[arg(short, long)]
        language: String,
        /// Maximum number of records to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete a record and its fields
    Delete {
        /// Record id
        id: i64,
    },
}

#[derive(Args, Debug)]
struct AttachArgs {
    /// JSON file, or a directory of {dataset}_{code}.json files
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// Dataset name (required for a single file)
    #[arg(short, long)]
    dataset: Option<String>,

    /// Language code (required for a single file)
    #[arg(short, long)]
    language: Option<String>,
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Only import this dataset
    #[arg(short, long)]
    dataset: Option<String>,

    /// Only import this language
    #[arg(short, long)]
    language: Option<String>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Dataset name
    #[arg(short, long)]
    dataset: String,

    /// Language code; may be omitted when the dataset has a single language
    #[arg(short, long)]
    language: Option<String>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Dataset name
    #[arg(short, long)]
    dataset: String,

    /// Source language code
    #[arg(short, long)]
    source: String,

    /// Target language code; repeat to translate into several languages at once
    #[arg(short, long, required = true)]
    target: Vec<String>,

    /// Translator name (selects the provider)
    #[arg(long)]
    translator: String,

    /// Key whose values are copied untranslated; may be repeated
    #[arg(long = "skip-key")]
    skip_keys: Vec<String>,

    /// Behavior when a field cannot be translated (defaults to the config value)
    #[arg(long, value_enum)]
    failure_policy: Option<CliFailurePolicy>,

    /// Do not display progress bars
    #[arg(long)]
    no_progress: bool,
}

/// dataset-translator - translate JSON datasets with AI providers
///
/// Imports JSON datasets, translates their text fields into other languages
/// using OpenAI or Anthropic, and exports the results back to JSON.
#[derive(Parser, Debug)]
#[command(name = "dataset-translator")]
#[command(version)]
#[command(about = "AI-powered JSON dataset translation tool")]
#[command(long_about = "dataset-translator imports JSON datasets, translates their fields with AI providers and exports the results.

EXAMPLES:
    dataset-translator language add en
    dataset-translator language add fr
    dataset-translator translator add openai
    dataset-translator translator test openai
    dataset-translator attach -d reviews -l en reviews_en.json
    dataset-translator import
    dataset-translator translate -d reviews -s en -t fr -t de --translator openai --skip-key id
    dataset-translator export -d reviews -l fr -o out/
    dataset-translator completions bash > dataset-translator.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. API keys may also come from OPENAI_API_KEY and
    ANTHROPIC_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Database file (overrides the config file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    openai_api_key: Option<String>,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true, global = true)]
    anthropic_api_key: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with trace level; the effective level is set below
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "dataset-translator", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    let database_path = config.resolve_database_path()?;
    let repo = Repository::new(DatabaseConnection::new(&database_path)?);

    match cli.command {
        Commands::Language(command) => run_language(&repo, command).await,
        Commands::Dataset(command) => run_dataset(&repo, command).await,
        Commands::Translator(command) => run_translator(&repo, &config, command).await,
        Commands::Keys => {
            for key in repo.list_keys().await? {
                println!("{}\t{}", key.id, key.name);
            }
            Ok(())
        }
        Commands::Attach(args) => run_attach(&repo, &config, args).await,
        Commands::Import(args) => run_import(&repo, &config, args).await,
        Commands::Export(args) => run_export(&repo, args).await,
        Commands::Translate(args) => run_translate(&repo, &config, args).await,
        Commands::Records(command) => run_records(&repo, command).await,
        Commands::Stats => {
            println!("Database: {:?}", database_path);
            println!("{}", repo.stats()?);
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load or create the configuration, then apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    if let Some(database) = &cli.database {
        config.database_path = database.to_string_lossy().to_string();
    }

    if let Some(api_key) = &cli.openai_api_key {
        config.translation.set_api_key(&TranslationProvider::OpenAI, api_key.clone());
    }

    if let Some(api_key) = &cli.anthropic_api_key {
        config.translation.set_api_key(&TranslationProvider::Anthropic, api_key.clone());
    }

    // Validate the configuration after loading and overriding
    config.validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

async fn run_language(repo: &Repository, command: LanguageCommands) -> Result<()> {
    match command {
        LanguageCommands::Add { code, name } => {
            let name = match name {
                Some(name) => name,
                None => language_utils::get_language_name(&code)
                    .with_context(|| format!("No ISO name known for '{}', pass --name", code))?,
            };
            let language = repo.create_language(&code, &name).await?;
            info!("Added language {}", language);
        }
        LanguageCommands::List => {
            for language in repo.list_languages().await? {
                println!("{}\t{}", language.code, language.name);
            }
        }
    }
    Ok(())
}

async fn run_dataset(repo: &Repository, command: DatasetCommands) -> Result<()> {
    match command {
        DatasetCommands::Add { name } => {
            let dataset = repo.create_dataset(&name).await?;
            info!("Added dataset {}", dataset.name);
        }
        DatasetCommands::List => {
            for dataset in repo.list_datasets().await? {
                println!("{}", dataset.name);
            }
        }
        DatasetCommands::Languages { dataset } => {
            for dataset_language in repo.list_dataset_languages(dataset.as_deref(), None).await? {
                let records = repo.count_records(dataset_language.id).await?;
                println!(
                    "{}\t{}\t{}\timported: {}\trecords: {}",
                    dataset_language.id,
                    dataset_language.dataset_name,
                    dataset_language.language_code,
                    dataset_language.imported,
                    records
                );
            }
        }
    }
    Ok(())
}

async fn run_translator(repo: &Repository, config: &Config, command: TranslatorCommands) -> Result<()> {
    match command {
        TranslatorCommands::Add { name } => {
            if let Err(e) = TranslationProvider::from_translator_name(&name) {
                warn!("{}; runs using this translator will fail", e);
            }
            let translator = repo.create_translator(&name).await?;
            info!("Added translator {}", translator.name);
        }
        TranslatorCommands::List => {
            for translator in repo.list_translators().await? {
                println!("{}", translator.name);
            }
        }
        TranslatorCommands::Test { name } => {
            if repo.get_translator_by_name(&name).await?.is_none() {
                return Err(DatasetError::not_found("Translator", &name).into());
            }
            let provider = test_translator_connection(&name, &config.translation).await?;
            println!("Connection to {} for translator {} succeeded", provider.display_name(), name);
        }
    }
    Ok(())
}

async fn run_attach(repo: &Repository, config: &Config, args: AttachArgs) -> Result<()> {
    let importer = DatasetImporter::new(repo.clone(), &config.storage_dir);

    if args.path.is_dir() {
        let outcomes = importer.attach_directory(&args.path).await?;
        let failures = outcomes.iter().filter(|(_, result)| result.is_err()).count();

        for (path, result) in &outcomes {
            match result {
                Ok(dataset_language) => info!("{:?} -> {}", path, dataset_language),
                Err(e) => error!("{:?}: {}", path, e),
            }
        }

        if failures > 0 {
            return Err(anyhow!("{} of {} files could not be attached", failures, outcomes.len()));
        }
        return Ok(());
    }

    let (Some(dataset), Some(language)) = (&args.dataset, &args.language) else {
        return Err(anyhow!("--dataset and --language are required when attaching a single file"));
    };

    let dataset_language = importer.attach(dataset, language, &args.path).await?;
    info!("Attached {:?} to {}", args.path, dataset_language);
    Ok(())
}

async fn run_import(repo: &Repository, config: &Config, args: ImportArgs) -> Result<()> {
    let selection = repo
        .list_dataset_languages(args.dataset.as_deref(), args.language.as_deref())
        .await?;

    // An explicitly named pair is imported as-is so refusals are reported
    let explicit = args.dataset.is_some() && args.language.is_some();
    let pending: Vec<_> = selection
        .into_iter()
        .filter(|dl| explicit || (!dl.imported && dl.file_path.is_some()))
        .collect();

    if pending.is_empty() {
        info!("Nothing to import");
        return Ok(());
    }

    let importer = DatasetImporter::new(repo.clone(), &config.storage_dir);
    let outcomes = importer.import_many(&pending).await;

    let mut failures = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(count) => info!("{}: {} records imported", outcome.dataset_language, count),
            Err(e) => {
                failures += 1;
                error!("{}: {}", outcome.dataset_language, e);
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} imports failed", failures, outcomes.len()));
    }
    Ok(())
}

async fn run_export(repo: &Repository, args: ExportArgs) -> Result<()> {
    if repo.get_dataset_by_name(&args.dataset).await?.is_none() {
        return Err(DatasetError::not_found("Dataset", &args.dataset).into());
    }

    let selection = repo
        .list_dataset_languages(Some(&args.dataset), args.language.as_deref())
        .await?;

    let document = DatasetExporter::new(repo.clone())
        .export_selection(&selection)
        .await?;
    let path = document.write_to(&args.output)?;

    info!("Exported {} to {:?}", document.file_name, path);
    Ok(())
}

async fn run_translate(repo: &Repository, config: &Config, args: TranslateArgs) -> Result<()> {
    let failure_policy = args
        .failure_policy
        .map(FailurePolicy::from)
        .unwrap_or(config.translation.common.failure_policy);

    let mut options = RunOptions::from_config(&config.translation.common).with_failure_policy(failure_policy);
    if !args.no_progress {
        options = options.with_progress(MultiProgress::new());
    }

    let base_request = TranslationRequest::new(&args.dataset, &args.source, "", &args.translator)
        .with_skip_keys(args.skip_keys.iter().cloned());

    let mut seen = HashSet::new();
    let targets: Vec<_> = args.target.iter().filter(|target| seen.insert(target.as_str())).collect();
    let requests: Vec<_> = targets.iter().map(|target| base_request.for_target(target.as_str())).collect();

    let runner = TaskRunner::new(repo.clone(), config.translation.clone(), options);
    let handles = runner.submit_all(requests);
    for handle in &handles {
        info!("Submitted task {} for {}", handle.id(), handle.request().run_key());
    }

    let mut failures = 0;
    for (request, result) in wait_all(handles).await {
        match result {
            Ok(summary) => println!("{}", summary),
            Err(e) => {
                failures += 1;
                let hint = if e.is_retryable() { " (retryable, run again to resume)" } else { "" };
                println!("Error: {} -> {}: {}{}", request.source_language, request.target_language, e, hint);
            }
        }
    }

    if failures > 0 {
        return Err(anyhow!("{} of {} translation runs failed", failures, targets.len()));
    }
    Ok(())
}

async fn run_records(repo: &Repository, command: RecordCommands) -> Result<()> {
    match command {
        RecordCommands::Show { dataset, language, limit } => {
            let dataset_record = repo
                .get_dataset_by_name(&dataset)
                .await?
                .ok_or_else(|| DatasetError::not_found("Dataset", &dataset))?;
            let language_record = repo
                .get_language_by_code(&language)
                .await?
                .ok_or_else(|| DatasetError::not_found("Language", &language))?;
            let dataset_language = repo
                .get_dataset_language(dataset_record.id, language_record.id)
                .await?
                .ok_or_else(|| DatasetError::not_found("Dataset language", format!("{} - {}", dataset, language)))?;

            let translators: HashMap<i64, String> = repo
                .list_translators()
                .await?
                .into_iter()
                .map(|translator| (translator.id, translator.name))
                .collect();

            let records = repo.list_records_with_fields(dataset_language.id).await?;
            for entry in records.iter().take(limit.unwrap_or(usize::MAX)) {
                println!("Record {} ({})", entry.record.id, entry.record.created_at);
                for field in &entry.fields {
                    let translator = field
                        .translator_id
                        .and_then(|id| translators.get(&id))
                        .map(String::as_str)
                        .unwrap_or("-");
                    let failed = if field.is_failed_translation() { ", translation failed" } else { "" };
                    println!(
                        "    {} = {:?}  [translator: {}, valid: {}{}]",
                        field.key_name, field.value, translator, field.valid, failed
                    );
                }
            }
        }
        RecordCommands::Delete { id } => {
            if repo.delete_record(id).await? {
                info!("Deleted record {}", id);
            } else {
                return Err(anyhow!("Record not found: {}", id));
            }
        }
    }
    Ok(())
}
