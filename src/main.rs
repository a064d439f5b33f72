use std::process::ExitCode;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payment_reconciler::config::{ConfigError, ReconcilerConfig};
use payment_reconciler::deeplink::{DeepLinkFeed, DeepLinkSource};
use payment_reconciler::gateway::{HttpOrderGateway, SharedToken};
use payment_reconciler::host::{HostCommand, parse_host_command};
use payment_reconciler::lifecycle::{AppState, LifecycleFeed, LifecycleSource};
use payment_reconciler::persistence::{FileSlot, begin_checkout};
use payment_reconciler::reconciler::{Effect, PaymentReconciler, ReconcilerHandle};

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("reconciler task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "payment_reconciler=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "payment-reconciler stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ReconcilerConfig::from_env()?;
    let gateway = Arc::new(HttpOrderGateway::new(
        config.require_api_base_url()?,
        config.http_timeout,
    )?);
    let slot = Arc::new(FileSlot::new(&config.state_dir));
    let tokens = Arc::new(match config.auth_token.clone() {
        Some(token) => SharedToken::with_token(token),
        None => SharedToken::new(),
    });

    let (effects_tx, effects_rx) = mpsc::channel(config.effect_buffer);
    let (handle, inbox) = ReconcilerHandle::channel(config.event_buffer);
    let shutdown = CancellationToken::new();

    // The URI this process was launched with, if any.
    let cold_start = std::env::args().nth(1);
    let (links, link_feed) =
        DeepLinkSource::new(cold_start, config.deep_links.markers(), config.event_buffer);
    let (lifecycle, lifecycle_feed) = LifecycleSource::new(AppState::Active, config.event_buffer);

    let reconciler = PaymentReconciler::new(
        Arc::clone(&slot),
        gateway,
        Arc::clone(&tokens),
        effects_tx,
    );
    let reconciler_task = tokio::spawn(reconciler.run(inbox, shutdown.clone()));
    tokio::spawn(links.forward_to(handle.clone()));
    tokio::spawn(lifecycle.forward_to(handle));
    let printer = tokio::spawn(print_effects(effects_rx));

    info!(
        state_dir = %config.state_dir.display(),
        logged_in = config.auth_token.is_some(),
        "payment-reconciler ready"
    );

    let host = Host {
        links: link_feed,
        lifecycle: lifecycle_feed,
        slot,
        tokens,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                shutdown.cancel();
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            info!("End of input");
            break;
        };

        match parse_host_command(&line) {
            Ok(None) => {}
            Ok(Some(command)) => match host.apply(command).await {
                Step::Continue => {}
                Step::Quit => break,
                Step::ReconcilerGone => {
                    warn!("Reconciler is gone, exiting");
                    break;
                }
            },
            Err(e) => warn!(error = %e, "Ignoring input line"),
        }
    }

    // Dropping the feeds ends both sources, which closes the reconciler's
    // inbox once any in-flight check has finished.
    drop(host);
    let stats = reconciler_task.await?;
    printer.await??;
    info!(stats = ?stats, "payment-reconciler stopped");
    Ok(())
}

/// What the input loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Quit,
    ReconcilerGone,
}

impl Step {
    fn delivered<E>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Step::Continue,
            Err(_) => Step::ReconcilerGone,
        }
    }
}

/// The host side of every hook the reconciler listens to.
struct Host {
    links: DeepLinkFeed,
    lifecycle: LifecycleFeed,
    slot: Arc<FileSlot>,
    tokens: Arc<SharedToken>,
}

impl Host {
    async fn apply(&self, command: HostCommand) -> Step {
        match command {
            HostCommand::Link(uri) => Step::delivered(self.links.deliver(uri).await),
            HostCommand::State(state) => Step::delivered(self.lifecycle.report(state).await),
            HostCommand::Checkout(order_id) => {
                if let Err(e) = begin_checkout(self.slot.as_ref(), &order_id).await {
                    error!(order_id = %order_id, error = %e, "Failed to record checkout");
                }
                Step::Continue
            }
            HostCommand::Login(token) => {
                self.tokens.set(token);
                info!("Logged in");
                Step::Continue
            }
            HostCommand::Logout => {
                self.tokens.clear();
                info!("Logged out");
                Step::Continue
            }
            HostCommand::Quit => Step::Quit,
        }
    }
}

/// Writes each effect to stdout as one JSON line.
async fn print_effects(mut effects: mpsc::Receiver<Effect>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(effect) = effects.recv().await {
        let mut line = match serde_json::to_vec(&effect) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, effect = ?effect, "Failed to encode effect");
                continue;
            }
        };
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(())
}
