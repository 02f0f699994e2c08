//! qfcache: quizfetch demo and diagnostics CLI
//!
//! Drives bindings against a simulated, latency-injected provider so cache
//! behaviour (coalescing, expiry, timeouts, forced refresh) can be observed
//! from the terminal. Set `RUST_LOG=quizfetch=debug` to see every decision.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use clap::{Parser, Subcommand};
use quizfetch::{
    Binding, BindingConfig, BoxError, CacheKey, CacheSettings, DataProvider, FetchCache, Phase,
};
use serde_json::{Value, json};

/// quizfetch demo CLI
#[derive(Parser)]
#[command(name = "qfcache")]
#[command(version)]
#[command(about = "Exercise the quizfetch data cache against a simulated backend")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "QUIZFETCH_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Resource identifier to bind to.
    #[arg(short, long, default_value = "analytics.dashboard")]
    resource: String,

    /// Simulated provider latency in milliseconds.
    #[arg(short, long, default_value_t = 50)]
    latency_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Activate several bindings on one key at once
    Coalesce {
        /// Number of bindings
        #[arg(short, long, default_value_t = 5)]
        bindings: usize,
    },

    /// Load, wait past the TTL, load again
    Expiry {
        /// Time to wait between loads
        #[arg(short, long, default_value_t = 150)]
        wait_ms: u64,
    },

    /// Load with a timeout shorter than the provider latency
    Timeout,

    /// Load, then force a refresh while the entry is still fresh
    Force,

    /// Print the effective binding configuration for the resource
    Config,
}

/// Provider that sleeps, counts its calls, and returns a small JSON payload.
struct SimulatedBackend {
    latency: Duration,
    calls: AtomicU32,
}

#[async_trait::async_trait]
impl DataProvider<Value> for SimulatedBackend {
    async fn fetch(&self) -> Result<Value, BoxError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.latency).await;
        Ok(json!({ "call": call, "count": 3 }))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let settings = CacheSettings::load(args.config.as_deref())?;
    let config = settings.binding_config(&args.resource);

    let backend = Arc::new(SimulatedBackend {
        latency: Duration::from_millis(args.latency_ms),
        calls: AtomicU32::new(0),
    });
    let cache = FetchCache::<Value>::new();
    let key = CacheKey::new(&args.resource);

    match args.command {
        Command::Coalesce { bindings } => {
            let bindings: Vec<_> = (0..bindings)
                .map(|_| Binding::new(&cache, key.clone(), backend.clone(), config.clone()))
                .collect();
            futures_util::future::join_all(bindings.iter().map(|b| b.activate())).await;
            for (i, b) in bindings.iter().enumerate() {
                report(&format!("binding {i}"), b);
            }
        }
        Command::Expiry { wait_ms } => {
            let binding = Binding::new(&cache, key, backend.clone(), config.clone());
            binding.activate().await;
            report("first load", &binding);
            tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            binding.refetch(false).await;
            report("after wait", &binding);
            println!("ttl: {}ms, waited: {wait_ms}ms", config.ttl.as_millis());
        }
        Command::Timeout => {
            let short = config
                .clone()
                .timeout(Duration::from_millis(args.latency_ms / 2 + 1));
            let binding = Binding::new(&cache, key.clone(), backend.clone(), short);
            binding.activate().await;
            report("timed load", &binding);
            println!("stored: {}", cache.peek(&key, config.ttl).is_some());
        }
        Command::Force => {
            let binding = Binding::new(&cache, key, backend.clone(), config.clone());
            binding.activate().await;
            report("cached load", &binding);
            binding.refetch_default().await;
            report("forced load", &binding);
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            return Ok(());
        }
    }

    println!("provider calls: {}", backend.calls.load(Ordering::SeqCst));
    Ok(())
}

fn report(label: &str, binding: &Binding<Value>) {
    let state = binding.state();
    match state.phase() {
        Phase::Ready => println!("{label}: ready {}", state.data.unwrap_or(Value::Null)),
        Phase::Errored => println!(
            "{label}: error ({}) {}",
            state.error.as_ref().map(|e| e.kind().as_str()).unwrap_or("?"),
            state.error.map(|e| e.to_string()).unwrap_or_default()
        ),
        phase => println!("{label}: {phase:?}"),
    }
}
