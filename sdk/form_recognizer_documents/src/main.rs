use clap::Parser;
use form_recognizer_core::client::PollPolicy;
use form_recognizer_core::config::{Settings, DEFAULT_ENV_FILE};
use form_recognizer_documents::runner::{self, RunFailure, Stage};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "form_recognizer_core=warn,form_recognizer_documents=warn";

#[derive(Parser, Debug)]
#[command(name = "analyze-document")]
#[command(about = "Submit a document to Form Recognizer, wait for the analysis, and print the result")]
struct Args {
    /// Settings file with ENDPOINT, MODEL_ID, API_VERSION, SUBSCRIPTION_KEY and DOCUMENT_URL
    #[arg(long, short = 'e', default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Maximum number of polls (0 = no limit)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Wait after the first poll, in seconds
    #[arg(long)]
    poll_interval_secs: Option<u64>,

    /// Upper bound for a single wait, in seconds
    #[arg(long)]
    max_interval_secs: Option<u64>,

    /// Give up after this many seconds of polling
    #[arg(long)]
    max_duration_secs: Option<u64>,

    /// Growth factor applied to the wait after every poll (>= 1)
    #[arg(long, value_parser = parse_multiplier)]
    backoff_multiplier: Option<f64>,

    /// Random spread applied to every wait, as a fraction in [0, 1)
    #[arg(long, value_parser = parse_jitter)]
    jitter: Option<f64>,

    /// Poll every --poll-interval-secs (default 5) without backoff or jitter; combine with --max-attempts 0 to poll forever
    #[arg(long, conflicts_with_all = ["max_interval_secs", "backoff_multiplier", "jitter"])]
    fixed_interval: bool,
}

impl Args {
    fn apply(&self, policy: &mut PollPolicy) {
        if self.fixed_interval {
            let interval = self
                .poll_interval_secs
                .map_or(policy.initial_interval, Duration::from_secs);
            *policy = PollPolicy {
                max_attempts: self.max_attempts.unwrap_or(policy.max_attempts),
                max_duration: self.max_duration_secs.map(Duration::from_secs).or(policy.max_duration),
                ..PollPolicy::fixed(interval)
            };
            return;
        }

        if let Some(attempts) = self.max_attempts {
            policy.max_attempts = attempts;
        }
        if let Some(secs) = self.poll_interval_secs {
            policy.initial_interval = Duration::from_secs(secs);
            policy.max_interval = policy.max_interval.max(policy.initial_interval);
        }
        if let Some(secs) = self.max_interval_secs {
            policy.max_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.max_duration_secs {
            policy.max_duration = Some(Duration::from_secs(secs));
        }
        if let Some(multiplier) = self.backoff_multiplier {
            policy.multiplier = multiplier;
        }
        if let Some(jitter) = self.jitter {
            policy.jitter = jitter;
        }
    }
}

fn parse_multiplier(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value >= 1.0 {
        Ok(value)
    } else {
        Err(format!("must be a finite number >= 1, got {value}"))
    }
}

fn parse_jitter(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if (0.0..1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("must be in [0, 1), got {value}"))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut settings = match Settings::load(&args.env_file) {
        Ok(settings) => settings,
        Err(err) => {
            let failure = RunFailure::new(Stage::LoadingSettings, err);
            println!("{failure}");
            return ExitCode::from(failure.exit_code());
        }
    };
    args.apply(&mut settings.poll_policy);
    tracing::debug!(policy = ?settings.poll_policy, "poll policy");

    let mut stdout = std::io::stdout();
    match runner::run(&settings, &mut stdout).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(failure) => {
            println!("{failure}");
            ExitCode::from(failure.exit_code())
        }
    }
}
