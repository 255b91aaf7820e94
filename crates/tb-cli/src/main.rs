use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tb_cli::bootstrap::{self, RuntimeConfig};
use tb_cli::config::AppConfig;
use tb_cli::evaluation::save_results;
use tb_cli::logging;
use tb_cli::runner::{RunRequest, RunSettings, TokioSleeper, TuningRunner};
use tb_core::core::{JobId, JobPoller, TuningService};

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(name = "tb", about = "Prepare chat datasets and fine-tune Gemini models")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the configuration file. Defaults to `config.toml` when present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Validate configuration and exit.
    Validate,
    /// Convert a chat JSONL file into tuning examples.
    Prepare {
        #[arg(long, visible_alias = "data_file")]
        data_file: PathBuf,
        /// Write the converted examples as JSONL.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List base models and whether they can be tuned.
    Models,
    /// List tuned models owned by the caller.
    TunedModels,
    /// Submit a tuning job and, by default, wait for it to finish.
    Tune {
        #[arg(long, visible_alias = "data_file")]
        data_file: PathBuf,
        /// Id of the tuned model to create, e.g. `support-bot-v1`.
        #[arg(long, visible_alias = "output_model")]
        output_model: String,
        /// Chat JSONL file used to evaluate the tuned model.
        #[arg(long, visible_alias = "test_file", conflicts_with = "no_wait")]
        test_file: Option<PathBuf>,
        /// Write the run report as JSON.
        #[arg(long, visible_alias = "output_results")]
        output_results: Option<PathBuf>,
        /// Return right after submission.
        #[arg(long)]
        no_wait: bool,
    },
    /// Check a tuning job once.
    Status { job: String },
    /// Poll a tuning job until it finishes.
    Wait { job: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), anyhow::Error> {
    let config = load_config(cli.config.as_deref())?;
    let runtime = bootstrap::into_runtime(config).context("config invalid")?;
    logging::init(&runtime.log_level, runtime.log_format);

    match cli.command {
        Command::Validate => {
            println!("{}", "Config valid".green());
            Ok(())
        }
        Command::Prepare { data_file, output } => run_prepare(&data_file, output.as_deref()),
        Command::Models => run_models(&runtime).await,
        Command::TunedModels => run_tuned_models(&runtime).await,
        Command::Tune {
            data_file,
            output_model,
            test_file,
            output_results,
            no_wait,
        } => {
            bootstrap::check_tuned_model_id(&output_model)?;
            let request = RunRequest {
                data_file,
                tuned_model_id: output_model,
                test_file,
                wait: !no_wait,
            };
            run_tune(&runtime, &request, output_results.as_deref()).await
        }
        Command::Status { job } => run_status(&runtime, &JobId::new(job)).await,
        Command::Wait { job } => run_wait(&runtime, &JobId::new(job)).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig, anyhow::Error> {
    match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => AppConfig::from_file(Path::new(DEFAULT_CONFIG))
            .with_context(|| format!("failed to read config {DEFAULT_CONFIG}")),
        None => Ok(AppConfig::default()),
    }
}

fn run_prepare(data_file: &Path, output: Option<&Path>) -> Result<(), anyhow::Error> {
    let examples = tb_dataset::load(data_file)?;
    let stats = tb_dataset::dataset_stats(&examples);

    for (index, example) in stats.examples.iter().enumerate() {
        println!(
            "{:>5}  input words: {:>5}  output words: {:>5}",
            index + 1,
            example.input_words,
            example.output_words
        );
    }
    println!(
        "{} {} examples ({} input words, {} output words)",
        "prepared".green(),
        examples.len(),
        stats.total_input_words(),
        stats.total_output_words()
    );

    if let Some(output) = output {
        let file = std::fs::File::create(output)
            .with_context(|| format!("failed to create {}", output.display()))?;
        tb_dataset::write_jsonl(&examples, std::io::BufWriter::new(file))?;
        println!("wrote {}", output.display());
    }
    Ok(())
}

async fn run_models(runtime: &RuntimeConfig) -> Result<(), anyhow::Error> {
    let client = runtime.gemini_client()?;
    let models = client.list_models().await?;

    for model in &models {
        let marker = if model.is_tunable() {
            "tunable".green()
        } else {
            "-".dimmed()
        };
        match &model.display_name {
            Some(display) => println!("{:<50} {marker}  {display}", model.name.as_str()),
            None => println!("{:<50} {marker}", model.name.as_str()),
        }
    }
    Ok(())
}

async fn run_tuned_models(runtime: &RuntimeConfig) -> Result<(), anyhow::Error> {
    let client = runtime.gemini_client()?;
    let models = client.list_tuned_models().await?;
    if models.is_empty() {
        println!("no tuned models");
        return Ok(());
    }

    for model in &models {
        let state = if model.state.is_terminal() {
            model.state.as_str().bold()
        } else {
            model.state.as_str().yellow()
        };
        println!(
            "{:<50} {state}  {}",
            model.name.as_str(),
            model.base_model.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn run_tune(
    runtime: &RuntimeConfig,
    request: &RunRequest,
    output_results: Option<&Path>,
) -> Result<(), anyhow::Error> {
    let client = runtime.gemini_client()?;
    let settings = RunSettings {
        base_model: runtime.base_model.clone(),
        display_name: runtime.display_name.clone(),
        hyperparameters: runtime.hyperparameters.clone(),
        poll_policy: runtime.poll_policy.clone(),
    };
    let runner = TuningRunner::new(&client, &client, &TokioSleeper, settings);
    let report = runner.run(request).await?;

    println!("{} {}", "submitted".green(), report.job);
    println!("base model: {}", report.base_model);
    println!("training examples: {}", report.training_examples);
    if let Some(model) = &report.tuned_model {
        println!("{} {} ({})", "tuned model ready:".green().bold(), model.name, model.state);
    }
    if let Some(evaluation) = &report.evaluation {
        println!(
            "evaluation: {}/{} exact matches ({:.1}%)",
            evaluation.exact_matches,
            evaluation.total,
            evaluation.exact_match_rate * 100.0
        );
    }

    if let Some(path) = output_results {
        save_results(&report, path)?;
        println!("results saved to {}", path.display());
    }
    Ok(())
}

async fn run_status(runtime: &RuntimeConfig, job: &JobId) -> Result<(), anyhow::Error> {
    let client = runtime.gemini_client()?;
    let status = client.status(job).await?;
    let label = if status.is_terminal() {
        status.as_str().bold()
    } else {
        status.as_str().yellow()
    };
    println!("{job}: {label}");
    Ok(())
}

async fn run_wait(runtime: &RuntimeConfig, job: &JobId) -> Result<(), anyhow::Error> {
    let client = runtime.gemini_client()?;
    let poller = JobPoller::new(&client, &TokioSleeper, runtime.poll_policy.clone());
    let model = poller.poll(job).await?;
    println!("{} {}", "tuned model ready:".green().bold(), model.name);
    if let Some(base) = &model.base_model {
        println!("base model: {base}");
    }
    Ok(())
}
