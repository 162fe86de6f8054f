//! Service binary for the recipe nutrition workflow.
//!
//! Boots the Kafka controller and runs it until an OS interrupt, then
//! drains the workers cooperatively and releases their handles.

mod logging;

use anyhow::Context;
use clap::Parser;
use recipeline_core::config::{Config, KafkaConfig, NutritionConfig};
use recipeline_core::topics;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "nutrition-srv", about = "Recipe nutrition aggregation service")]
struct Args {
  /// Comma-separated Kafka broker list
  #[arg(long, env = "KAFKA_BROKERS", default_value = "localhost:9092")]
  kafka_brokers: String,

  /// Application log level
  #[arg(long, env = "LOG_LEVEL", default_value = "info")]
  log_level: String,

  /// Overall budget in seconds for resolving one recipe's ingredients
  #[arg(long, env = "RECIPE_TIMEOUT_SECS", default_value_t = 30)]
  recipe_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let args = Args::parse();
  logging::init(&args.log_level);

  let config = Config {
    kafka: KafkaConfig::new(args.kafka_brokers),
    nutrition: NutritionConfig {
      recipe_timeout: Duration::from_secs(args.recipe_timeout_secs),
      ..NutritionConfig::default()
    },
  };
  info!(brokers = %config.kafka.brokers, "starting nutrition-srv");

  if let Err(e) = messaging::kafka::ensure_topics(&config.kafka.brokers, topics::NUTRITION_WORKFLOW).await {
    warn!(error = %e, "could not ensure topics, continuing anyway");
  }

  let mut controller = nutrition::kafka::controller(&config).context("failed to build kafka controller")?;
  info!(workers = controller.worker_count(), "controller ready");

  let (shutdown, _) = broadcast::channel(1);
  let signal_tx = shutdown.clone();
  tokio::spawn(async move {
    wait_for_signal().await;
    info!("received shutdown signal, draining workers");
    let _ = signal_tx.send(());
  });

  let run_result = controller.run(&shutdown).await;
  if let Err(e) = controller.stop() {
    warn!(error = %e, "failed to release worker handles");
  }

  match run_result {
    Ok(()) => {
      info!("shutdown complete");
      Ok(())
    }
    Err(e) => {
      error!(error = %e, "controller failed");
      Err(e.into())
    }
  }
}

#[cfg(unix)]
async fn wait_for_signal() {
  use tokio::signal::unix::{SignalKind, signal};

  match signal(SignalKind::terminate()) {
    Ok(mut sigterm) => {
      tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
      }
    }
    Err(e) => {
      warn!(error = %e, "could not install SIGTERM handler");
      let _ = tokio::signal::ctrl_c().await;
    }
  }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
  let _ = tokio::signal::ctrl_c().await;
}
