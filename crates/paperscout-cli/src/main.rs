use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use paperscout_agent::{ResearchAgent, TaskOutcome};
use paperscout_core::{Config, config_file};
use paperscout_pdf_mupdf::MupdfBackend;

mod output;

use output::ColorMode;

/// Paper scout - search arXiv, read papers and extract their citations
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log filter, e.g. `debug` or `paperscout_arxiv=trace` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Maximum number of search results
    #[arg(long, global = true)]
    max_results: Option<usize>,

    /// Only return papers published within this many days
    #[arg(long, global = true)]
    days_back: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a free-text task and print the JSON outcome
    Run {
        /// e.g. "search papers about dark matter"
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,
    },

    /// Search arXiv for recent papers on a topic
    Search {
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,
    },

    /// Download a paper and show its key sections
    Read {
        url: String,

        /// Print the full extracted text instead of the outline
        #[arg(long)]
        full: bool,
    },

    /// Extract citations from a text file (`-` reads stdin)
    Cite {
        path: PathBuf,

        /// Print the extraction report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search a topic, then read and analyze the top papers
    Research {
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,

        /// Number of papers to read
        #[arg(long, default_value_t = 1)]
        papers: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let file = config_file::load_config();
    let config = resolve_config(&cli.global, &file)?;
    let file_level = file.logging.as_ref().and_then(|l| l.level.clone());
    let _guard = init_logging(cli.global.log_level.as_deref(), file_level, config.log_dir.as_ref())?;

    let color = ColorMode(!cli.global.no_color);
    let agent = ResearchAgent::from_config(&config, Arc::new(MupdfBackend::new()));

    match cli.command {
        Command::Run { task } => return run(&agent, &task.join(" ")).await,
        Command::Search { topic } => search(&agent, &topic.join(" "), color).await?,
        Command::Read { url, full } => read(&agent, &url, full, color).await?,
        Command::Cite { path, json } => cite(&agent, path, json, color)?,
        Command::Research { topic, papers } => {
            research(&agent, &topic.join(" "), papers, color).await?
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Resolve configuration: CLI flags > env vars > config file > defaults.
fn resolve_config(args: &GlobalArgs, file: &config_file::ConfigFile) -> anyhow::Result<Config> {
    let mut config = Config::default()
        .apply_file(file)
        .context("invalid config file")?;

    if let Some(n) = env_parse::<usize>("PAPERSCOUT_MAX_RESULTS")? {
        config.max_search_results = n;
    }
    if let Some(secs) = env_parse::<f64>("PAPERSCOUT_RATE_LIMIT_DELAY")? {
        config.rate_limit_delay = Duration::try_from_secs_f64(secs)
            .context("PAPERSCOUT_RATE_LIMIT_DELAY must be a non-negative number")?;
    }
    if let Some(days) = env_parse::<u32>("PAPERSCOUT_DAYS_BACK")? {
        config.days_back = days;
    }
    if let Some(secs) = env_parse::<u64>("PAPERSCOUT_PDF_TIMEOUT")? {
        config.pdf_timeout = Duration::from_secs(secs);
    }
    if let Ok(dir) = std::env::var("PAPERSCOUT_LOG_DIR") {
        config.log_dir = Some(PathBuf::from(dir));
    }

    if let Some(n) = args.max_results {
        config.max_search_results = n;
    }
    if let Some(days) = args.days_back {
        config.days_back = days;
    }

    if config.max_search_results == 0 {
        anyhow::bail!("max results must be greater than zero");
    }
    Ok(config)
}

fn env_parse<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {name}: {value:?}")),
        Err(_) => Ok(None),
    }
}

/// Stderr logging, plus daily-rotated files when a log directory is set.
///
/// The returned guard flushes the file writer on drop and must outlive `main`'s work.
fn init_logging(
    cli_level: Option<&str>,
    file_level: Option<String>,
    log_dir: Option<&PathBuf>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(file_level.as_deref().unwrap_or("info"))),
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = rolling::Builder::new()
                .rotation(Rotation::DAILY)
                .filename_prefix("paperscout")
                .filename_suffix("log")
                .max_log_files(5)
                .build(dir)
                .with_context(|| format!("cannot log to {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn spinner(msg: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap());
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

async fn run(agent: &ResearchAgent, task: &str) -> anyhow::Result<ExitCode> {
    let outcome = agent.run(task, None).await;

    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &outcome)?;
    writeln!(out)?;
    out.flush()?;

    Ok(exit_code(&outcome))
}

/// Failure when the outcome carries an error, so scripts can branch on `run`.
fn exit_code(outcome: &TaskOutcome) -> ExitCode {
    match outcome.error() {
        Some(error) => {
            tracing::error!(error, "task failed");
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    }
}

async fn search(agent: &ResearchAgent, topic: &str, color: ColorMode) -> anyhow::Result<()> {
    let pb = spinner(format!("Searching arXiv for \"{topic}\"..."));
    let outcome = agent.search_papers(topic, None).await;
    pb.finish_and_clear();

    if let Some(error) = &outcome.error {
        tracing::error!(query = topic, error = %error, "search failed");
        anyhow::bail!("search failed: {error}");
    }

    let mut out = std::io::stdout().lock();
    output::print_banner(&mut out, &format!("Papers on \"{topic}\""), color)?;
    output::print_papers(&mut out, &outcome.results, color)?;
    Ok(())
}

async fn read(agent: &ResearchAgent, url: &str, full: bool, color: ColorMode) -> anyhow::Result<()> {
    let pb = spinner(format!("Downloading {url}..."));
    let outcome = agent.process_paper(url).await;
    pb.finish_and_clear();

    let Some(text) = outcome.text else {
        let error = outcome.error.unwrap_or_default();
        tracing::error!(url, error = %error, "could not read paper");
        anyhow::bail!("{error}");
    };

    let mut out = std::io::stdout().lock();
    if full {
        writeln!(out, "{text}")?;
    } else {
        output::print_outline(&mut out, &paperscout_reader::outline(&text), color)?;
    }
    Ok(())
}

fn cite(agent: &ResearchAgent, path: PathBuf, json: bool, color: ColorMode) -> anyhow::Result<()> {
    let text = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else {
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?
    };

    let report = agent.extract_citations(&text);
    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        writeln!(out, "Found {} unique citations", report.citations.len())?;
        output::print_citations(&mut out, &report, color)?;
    }
    Ok(())
}

async fn research(
    agent: &ResearchAgent,
    topic: &str,
    papers: usize,
    color: ColorMode,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    // Set up Ctrl+C handler
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let pb = spinner(format!("Searching arXiv for \"{topic}\"..."));
    let outcome = agent.search_papers(topic, None).await;
    pb.finish_and_clear();
    if let Some(error) = &outcome.error {
        tracing::error!(query = topic, error = %error, "search failed");
        anyhow::bail!("search failed: {error}");
    }

    let mut out = std::io::stdout().lock();
    output::print_banner(&mut out, &format!("Papers on \"{topic}\""), color)?;
    output::print_papers(&mut out, &outcome.results, color)?;

    for (i, paper) in outcome.results.iter().take(papers).enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        output::print_banner(&mut out, &format!("Paper {}: {}", i + 1, paper.title), color)?;

        let pb = spinner(format!("Reading {}...", paper.pdf_url));
        let fetched = tokio::select! {
            fetched = agent.process_paper(&paper.pdf_url) => Some(fetched),
            _ = cancel.cancelled() => None,
        };
        pb.finish_and_clear();

        let Some(fetched) = fetched else {
            break;
        };
        match &fetched.text {
            Some(text) => {
                output::print_outline(&mut out, &paperscout_reader::outline(text), color)?;
                output::print_citations(&mut out, &agent.extract_citations(text), color)?;
            }
            None => {
                let error = fetched.error.as_deref().unwrap_or("unknown error");
                tracing::warn!(url = %paper.pdf_url, error, "skipping unreadable paper");
                output::print_error(&mut out, error, color)?;
            }
        }
        out.flush()?;
    }

    if cancel.is_cancelled() {
        writeln!(out)?;
        writeln!(out, "Interrupted.")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscout_agent::TaskFailure;
    use paperscout_core::ExtractionReport;

    #[test]
    fn failed_task_exits_nonzero() {
        let failed = TaskOutcome::Failed(TaskFailure {
            success: false,
            error: "Unknown task type: bake a cake".into(),
        });
        assert_eq!(exit_code(&failed), ExitCode::FAILURE);

        let report = TaskOutcome::Citations(ExtractionReport::failed("Empty text provided"));
        assert_eq!(exit_code(&report), ExitCode::FAILURE);
    }

    #[test]
    fn successful_task_exits_zero() {
        let outcome = TaskOutcome::Citations(ExtractionReport::succeeded(Vec::new()));
        assert_eq!(exit_code(&outcome), ExitCode::SUCCESS);
    }
}
