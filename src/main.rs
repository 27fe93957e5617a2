use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use topup_reconciler::application::poller::Reconciler;
use topup_reconciler::application::session::ReconciliationSession;
use topup_reconciler::config::{self, PollConfig};
use topup_reconciler::domain::callback::CallbackParams;
use topup_reconciler::domain::money::Balance;
use topup_reconciler::domain::ports::BalanceSourceBox;
use topup_reconciler::domain::reconciliation::Phase;
use topup_reconciler::infrastructure::http::HttpBalanceSource;
use topup_reconciler::infrastructure::in_memory::InMemoryWallet;
use topup_reconciler::interfaces::report::{OutcomeWriter, ReportFormat};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Text,
}

impl From<Format> for ReportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => ReportFormat::Json,
            Format::Text => ReportFormat::Text,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Redirect URL (or bare query string) the payment gateway sent the user to
    callback: String,

    /// Wallet balance endpoint. Without it an in-memory demo wallet is used.
    #[arg(long, env = "RECONCILER_BALANCE_URL")]
    balance_url: Option<Url>,

    /// Bearer token for the balance endpoint
    #[arg(long, env = "RECONCILER_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Milliseconds between polling ticks
    #[arg(long, default_value_t = config::DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    interval_ms: u64,

    /// Polling ticks before giving up
    #[arg(long, default_value_t = config::DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Fraction of the expected amount that must appear in the balance
    #[arg(long, default_value_t = config::DEFAULT_CREDIT_RATIO)]
    credit_ratio: Decimal,

    /// Per-request timeout for the balance endpoint, in milliseconds
    #[arg(long, default_value_t = config::DEFAULT_REQUEST_TIMEOUT.as_millis() as u64)]
    request_timeout_ms: u64,

    /// Milliseconds to wait after success before signalling navigation
    #[arg(long, default_value_t = config::DEFAULT_REDIRECT_DELAY.as_millis() as u64)]
    redirect_delay_ms: u64,

    /// Wait for the navigation signal before exiting
    #[arg(long)]
    wait_for_redirect: bool,

    /// Starting balance of the demo wallet
    #[arg(long, default_value_t = Decimal::ZERO)]
    demo_initial: Decimal,

    /// Polling tick at which the demo wallet shows the top-up (0 = already credited)
    #[arg(long)]
    demo_credit_after: Option<usize>,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let params: CallbackParams = cli.callback.parse().into_diagnostic()?;
    let config = PollConfig {
        interval: Duration::from_millis(cli.interval_ms),
        max_attempts: cli.max_attempts,
        credit_ratio: cli.credit_ratio,
        redirect_delay: Duration::from_millis(cli.redirect_delay_ms),
    };
    config.validate().into_diagnostic()?;

    let source: BalanceSourceBox = if let Some(url) = cli.balance_url {
        let timeout = Duration::from_millis(cli.request_timeout_ms);
        let source = HttpBalanceSource::new(url, cli.token, timeout).into_diagnostic()?;
        info!(endpoint = %source.endpoint(), "Reading balances over HTTP");
        Box::new(source)
    } else {
        warn!("No balance endpoint configured. Falling back to an in-memory demo wallet.");
        let wallet = InMemoryWallet::new(Balance::new(cli.demo_initial));
        if let (Some(tick), Some(amount)) = (cli.demo_credit_after, params.amount()) {
            // One fetch for the baseline, then the visibility check or tick.
            wallet.schedule_credit(tick + 1, amount).await;
        }
        Box::new(wallet)
    };

    let reconciler = Arc::new(Reconciler::new(source, config));
    let mut session = ReconciliationSession::spawn(reconciler, params);

    let mut state = session.state();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let snapshot = state.borrow_and_update().clone();
            if snapshot.phase() == &Phase::Processing && snapshot.poll_count() > 0 {
                info!(
                    poll_count = snapshot.poll_count(),
                    "Waiting for top-up to appear"
                );
            }
        }
    });

    let outcome = match session.outcome().await {
        Some(result) => result.into_diagnostic()?,
        None => miette::bail!("Reconciliation task ended without an outcome"),
    };

    {
        let stdout = io::stdout();
        let mut writer = OutcomeWriter::new(stdout.lock(), cli.format.into());
        writer.write_outcome(&outcome).into_diagnostic()?;
    }

    if outcome.is_success() && cli.wait_for_redirect && session.navigation().await {
        info!("Navigating back to wallet");
    }

    Ok(match outcome.phase {
        Phase::Success => ExitCode::SUCCESS,
        Phase::Timeout => ExitCode::from(3),
        _ => ExitCode::from(2),
    })
}
