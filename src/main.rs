//! Tenant Autoscaler
//!
//! ## Usage
//!
//! ```bash
//! # Serve the webhook and run the off-hours optimizer periodically
//! tenant-autoscaler --config config.toml serve --bind 0.0.0.0:8080
//!
//! # One optimizer pass (CronJob mode)
//! tenant-autoscaler --config config.toml optimize
//!
//! # Validate the configuration
//! RUST_LOG=debug tenant-autoscaler --config config.toml check-config
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use kube::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tenant_autoscaler::webhook::build_router;
use tenant_autoscaler::{
    AutoscalerConfig, ClusterOrchestrator, KubeOrchestrator, OffHoursOptimizer, TriggerDispatcher,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Policy-driven autoscaler for multi-tenant deployments
#[derive(Parser, Debug)]
#[command(name = "tenant-autoscaler")]
#[command(version, about = "Policy-driven autoscaler for multi-tenant deployments")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "/etc/tenant-autoscaler/config.toml")]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the trigger webhook and run the off-hours optimizer periodically
    Serve {
        /// Webhook bind address
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
    },
    /// Run the off-hours optimizer once and print the report
    Optimize,
    /// Validate the configuration and print the loaded policies
    CheckConfig,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    // Invalid policies are fatal: nothing starts with a bad policy set.
    let config = AutoscalerConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let policies = Arc::new(config.policy_store()?);
    let local_offset = config.optimizer.local_offset()?;

    if let Command::CheckConfig = args.command {
        for (tenant, policy) in policies.iter() {
            println!(
                "{}: replicas {}..={}, +{} per scale-up, window {}",
                tenant,
                policy.min_replicas,
                policy.max_replicas,
                policy.scale_up_increment,
                policy
                    .business_hours
                    .map(|h| format!("{:02}:00-{:02}:00", h.start_hour, h.end_hour))
                    .unwrap_or_else(|| "none".to_string()),
            );
        }
        println!("{} policies OK", policies.len());
        return Ok(());
    }

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");
    let orchestrator: Arc<dyn ClusterOrchestrator> = Arc::new(KubeOrchestrator::new(client));

    let dispatcher = TriggerDispatcher::new(Arc::clone(&policies), orchestrator)
        .with_timeouts(&config.timeouts)
        .with_dispatcher_config(&config.dispatcher);
    let optimizer = Arc::new(OffHoursOptimizer::new(dispatcher.clone(), local_offset));

    match args.command {
        Command::Optimize => {
            let report = optimizer.run_once().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.failures() > 0 {
                anyhow::bail!("{} tenant(s) failed optimization", report.failures());
            }
            Ok(())
        }
        Command::Serve { bind } => serve(&bind, dispatcher, optimizer, &config).await,
        Command::CheckConfig => Ok(()),
    }
}

async fn serve(
    bind: &str,
    dispatcher: TriggerDispatcher,
    optimizer: Arc<OffHoursOptimizer>,
    config: &AutoscalerConfig,
) -> anyhow::Result<()> {
    info!(
        bind = %bind,
        policies = dispatcher.policies().len(),
        serialize_per_workload = config.dispatcher.serialize_per_workload,
        "Starting tenant autoscaler"
    );

    // Periodic optimizer (no-op future when disabled)
    let interval = config.optimizer.interval();
    let optimizer_handle = if config.optimizer.enabled {
        info!(interval_seconds = config.optimizer.interval_seconds, "Off-hours optimizer enabled");
        tokio::spawn(optimizer.run(interval))
    } else {
        info!("Off-hours optimizer disabled");
        tokio::spawn(std::future::pending::<()>())
    };

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {}", bind))?;
    let router = build_router(dispatcher);
    let server = async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Received shutdown signal");
            })
            .await
    };

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Webhook server error: {}", e);
            }
        }
        result = optimizer_handle => {
            if let Err(e) = result {
                error!("Optimizer task failed: {}", e);
            }
        }
    }

    info!("Tenant autoscaler shutting down");
    Ok(())
}
