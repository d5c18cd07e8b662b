//! Subcommand handlers.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cutover_core::types::Quorum;
use cutover_core::{
    CancelToken, CutoverOrchestrator, CutoverPlan, ExecuteOptions, OrchestratorSettings,
    RollbackOptions,
};
use cutover_provider::{create_provider, get_all_provider_metadata};
use serde::Serialize;

use crate::cli::{ProviderArgs, RunArgs};

#[derive(Debug, Serialize)]
struct ValidationReport<'a> {
    plan_id: &'a str,
    valid: bool,
    errors: Vec<String>,
}

pub async fn validate(plan_path: &Path) -> Result<ExitCode> {
    let plan = load_plan(plan_path).await?;
    let errors = plan.validate();
    for error in &errors {
        tracing::warn!("{error}");
    }
    let report = ValidationReport {
        plan_id: &plan.id,
        valid: errors.is_empty(),
        errors,
    };
    print_json(&report)?;
    Ok(exit_code(report.valid))
}

/// Settings for `execute`, taken from flags.
pub struct ExecuteArgs {
    pub dry_run: bool,
    pub manual: bool,
    pub skip_pre_check: bool,
    pub timeout: Option<u64>,
    pub post_check_interval: u64,
    pub quorum: Option<usize>,
    pub verbose: bool,
}

pub async fn execute(
    run: &RunArgs,
    provider: &ProviderArgs,
    args: &ExecuteArgs,
) -> Result<ExitCode> {
    let mut plan = load_plan(&run.plan).await?;

    let settings = OrchestratorSettings {
        post_check_interval: Duration::from_secs(args.post_check_interval),
        propagation_quorum: args.quorum.map_or(Quorum::All, Quorum::AtLeast),
        ..OrchestratorSettings::default()
    };
    let orchestrator = orchestrator_for(provider, settings).await?;

    let options = ExecuteOptions {
        dry_run: args.dry_run,
        dns_provider: provider.name().to_string(),
        manual: args.manual,
        timeout: args.timeout.map(Duration::from_secs),
        verbose: args.verbose,
        skip_pre_check: args.skip_pre_check,
        on_progress: Some(Arc::new(|done, total, message: &str| {
            tracing::info!("[{done}/{total}] {message}");
        })),
        ..ExecuteOptions::default()
    };

    let cancel = CancelToken::new();
    watch_ctrl_c(&cancel);

    let result = orchestrator.execute(&mut plan, &options, &cancel).await;
    for line in &result.manual_instructions {
        tracing::info!("{line}");
    }
    print_json(&result)?;
    save_plan(&plan, run.output.as_deref()).await?;
    Ok(exit_code(result.success))
}

pub async fn rollback(
    run: &RunArgs,
    provider: &ProviderArgs,
    dry_run: bool,
    verbose: bool,
) -> Result<ExitCode> {
    let mut plan = load_plan(&run.plan).await?;
    let orchestrator = orchestrator_for(provider, OrchestratorSettings::default()).await?;

    let options = RollbackOptions {
        dns_provider: provider.name().to_string(),
        dry_run,
        verbose,
    };
    let result = orchestrator.rollback(&mut plan, &options).await?;
    print_json(&result)?;
    save_plan(&plan, run.output.as_deref()).await?;
    Ok(exit_code(result.success))
}

pub fn providers() -> Result<ExitCode> {
    print_json(&get_all_provider_metadata())?;
    Ok(ExitCode::SUCCESS)
}

async fn orchestrator_for(
    provider: &ProviderArgs,
    settings: OrchestratorSettings,
) -> Result<CutoverOrchestrator> {
    let orchestrator = CutoverOrchestrator::with_settings(settings).await;
    let dns_provider = create_provider(provider.credentials()?)?;
    orchestrator
        .register_provider(provider.name(), dns_provider)
        .await;
    Ok(orchestrator)
}

fn watch_ctrl_c(cancel: &CancelToken) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling the cutover");
            cancel.cancel();
        }
    });
}

async fn load_plan(path: &Path) -> Result<CutoverPlan> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read plan {}", path.display()))?;
    CutoverPlan::from_json(&json).with_context(|| format!("Invalid plan {}", path.display()))
}

async fn save_plan(plan: &CutoverPlan, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    tokio::fs::write(path, plan.to_json_pretty()?)
        .await
        .with_context(|| format!("Failed to write plan {}", path.display()))?;
    tracing::info!("Plan written to {}", path.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
