//! # CLI Command Implementations

use crate::api::{self, AppState};
use crate::config::{Backend, Config};
use crate::controller::Controller;
use featgauge_core::{
    FeatureName, GaugeError, MemoryReportStore, NodeName, PrometheusRegistry, ReconcileContext,
    Reconciler, RedbReportStore, Report, ReportStore,
};
use std::sync::Arc;

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Run the API server and the controller until Ctrl+C.
pub async fn cmd_serve(config: &Config) -> Result<(), GaugeError> {
    let store = open_store(config)?;
    let registry = Arc::new(PrometheusRegistry::new(&config.metrics.gauge_name)?);
    let ctx = ReconcileContext::new();

    let (controller, handle) = Controller::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        &config.controller,
        ctx.clone(),
    )?;
    let controller_task = tokio::spawn(controller.run());

    println!("featgauge Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.bind_address());
    println!("  Backend:  {:?}", config.store.backend);
    println!("  Database: {:?}", config.store.path);
    println!("  Gauge:    {}", config.metrics.gauge_name);
    println!();
    println!("Endpoints:");
    println!("  PUT    /reports/{{node}} - Publish a node report");
    println!("  DELETE /reports/{{node}} - Delete a node report");
    println!("  GET    /reports         - List reports");
    println!("  GET    /status          - Controller status");
    println!("  GET    /metrics         - Prometheus exposition");
    println!("  GET    /health          - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(store, registry, handle);
    let served = api::run_server(
        &config.bind_address(),
        state,
        config.security.rate_limit,
        ctx.clone(),
    )
    .await;

    // Stops the controller even if a handle outlived the router.
    ctx.cancel();
    if let Err(e) = controller_task.await {
        tracing::error!("Controller task failed: {}", e);
    }
    served
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create an empty report database.
pub fn cmd_init(config: &Config, force: bool) -> Result<(), GaugeError> {
    let path = &config.store.path;

    match config.store.backend {
        Backend::Redb => {
            if path.exists() {
                if !force {
                    return Err(GaugeError::IoError(format!(
                        "Database {:?} already exists. Use --force to overwrite.",
                        path
                    )));
                }
                std::fs::remove_file(path)
                    .map_err(|e| GaugeError::IoError(format!("Remove {:?}: {}", path, e)))?;
            }
            RedbReportStore::open(path)?;
            println!("Initialized new redb database at {:?}", path);
        }
        Backend::Memory => {
            println!("Memory backend keeps no database, nothing to initialize");
        }
    }

    Ok(())
}

// =============================================================================
// REPORT COMMANDS
// =============================================================================

/// List stored reports.
pub fn cmd_reports(config: &Config, json_mode: bool) -> Result<(), GaugeError> {
    let store = open_offline_store(config)?;
    let reports = store.list_reports()?;

    if json_mode {
        let output: Vec<serde_json::Value> = reports.iter().map(report_json).collect();
        print_json(&serde_json::json!({ "reports": output }))?;
        return Ok(());
    }

    println!("Reports ({})", reports.len());
    println!("===========");
    for report in &reports {
        let features: Vec<&str> = report.features.iter().map(FeatureName::as_str).collect();
        println!("{:<32} {}", report.node.as_str(), features.join(", "));
    }

    Ok(())
}

/// Store the report of a node.
///
/// Writes the database directly, so the server must be stopped; its startup
/// reconcile publishes the change. Against a running server use
/// `PUT /reports/{node}` instead.
pub fn cmd_submit(
    config: &Config,
    json_mode: bool,
    node: String,
    features: Vec<String>,
) -> Result<(), GaugeError> {
    let store = open_offline_store(config)?;
    let report = Report::new(
        NodeName::new(node),
        features.into_iter().map(FeatureName::new).collect(),
    );
    let previous = store.upsert_report(report.clone())?;
    let action = if previous.is_some() { "updated" } else { "created" };

    if json_mode {
        print_json(&serde_json::json!({
            "action": action,
            "report": report_json(&report),
        }))?;
    } else {
        println!("Report for {} {}", report.node, action);
    }
    Ok(())
}

/// Delete the report of a node.
///
/// Same constraint as `cmd_submit`: against a running server use
/// `DELETE /reports/{node}`.
pub fn cmd_remove(config: &Config, json_mode: bool, node: String) -> Result<(), GaugeError> {
    let store = open_offline_store(config)?;
    let node = NodeName::new(node);

    let Some(removed) = store.remove_report(&node)? else {
        return Err(GaugeError::ReportNotFound(node.to_string()));
    };

    if json_mode {
        print_json(&serde_json::json!({
            "action": "deleted",
            "report": report_json(&removed),
        }))?;
    } else {
        println!("Report for {} deleted", removed.node);
    }
    Ok(())
}

// =============================================================================
// RECONCILE COMMAND
// =============================================================================

/// Reconcile the stored reports into a fresh registry and print it.
///
/// Nothing is remembered between runs, so nothing is ever removed here; the
/// output shows what a freshly started server would publish.
pub fn cmd_reconcile(config: &Config, json_mode: bool) -> Result<(), GaugeError> {
    let store = open_offline_store(config)?;
    let registry = PrometheusRegistry::new(&config.metrics.gauge_name)?;
    let mut reconciler = Reconciler::new();

    let report = reconciler.reconcile(&ReconcileContext::new(), store.as_ref(), &registry)?;

    if json_mode {
        let output = serde_json::to_value(&report)
            .map_err(|e| GaugeError::SerializationError(e.to_string()))?;
        print_json(&output)?;
    } else {
        print!("{}", registry.encode_text()?);
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured report store.
pub fn open_store(config: &Config) -> Result<Arc<dyn ReportStore>, GaugeError> {
    match config.store.backend {
        Backend::Redb => Ok(Arc::new(RedbReportStore::open(&config.store.path)?)),
        Backend::Memory => {
            tracing::debug!("Using volatile in-memory report store");
            Ok(Arc::new(MemoryReportStore::new()))
        }
    }
}

/// Open the store for a command that runs without the server.
///
/// A running `serve` holds the redb file exclusively; say so instead of
/// surfacing the raw lock error.
fn open_offline_store(config: &Config) -> Result<Arc<dyn ReportStore>, GaugeError> {
    open_store(config).inspect_err(|e| {
        if let GaugeError::StoreLocked(path) = e {
            tracing::error!(
                path = %path,
                "Database is in use, stop the server or send the change through its HTTP API"
            );
        }
    })
}

fn report_json(report: &Report) -> serde_json::Value {
    serde_json::json!({
        "node": report.node.as_str(),
        "features": report.features.iter().map(FeatureName::as_str).collect::<Vec<_>>(),
    })
}

fn print_json(value: &serde_json::Value) -> Result<(), GaugeError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| GaugeError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}
