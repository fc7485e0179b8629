use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "navalha_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "navalha_query_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "navalha_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "navalha_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "navalha_connections_rejected_total";

/// Gauge: number of active tenants (loaded engines).
pub const TENANTS_ACTIVE: &str = "navalha_tenants_active";

/// Counter: recurring expenses materialized by the scheduler.
pub const EXPENSES_MATERIALIZED_TOTAL: &str = "navalha_expenses_materialized_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "navalha_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "navalha_wal_flush_batch_size";

/// Install the Prometheus metrics exporter on the given port. No-op if
/// port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertClient { .. } => "insert_client",
        Command::UpdateClient { .. } => "update_client",
        Command::DeleteClient { .. } => "delete_client",
        Command::InsertService { .. } => "insert_service",
        Command::UpdateService { .. } => "update_service",
        Command::DeleteService { .. } => "delete_service",
        Command::InsertAppointment { .. } => "insert_appointment",
        Command::UpdateAppointment { .. } => "update_appointment",
        Command::InsertExpense { .. } => "insert_expense",
        Command::UpdateExpense { .. } => "update_expense",
        Command::DeleteExpense { .. } => "delete_expense",
        Command::InsertTransfer { .. } => "insert_transfer",
        Command::UpsertSetting { .. } => "upsert_setting",
        Command::SelectClients => "select_clients",
        Command::SelectServices => "select_services",
        Command::SelectAppointments { .. } => "select_appointments",
        Command::SelectExpenses => "select_expenses",
        Command::SelectTransfers => "select_transfers",
        Command::SelectSettings => "select_settings",
        Command::SelectSlots { .. } => "select_slots",
        Command::SelectForecast { .. } => "select_forecast",
        Command::SelectAlerts { .. } => "select_alerts",
        Command::SelectOverdue => "select_overdue",
        Command::SelectLedger { .. } => "select_ledger",
        Command::SelectBalances => "select_balances",
        Command::SelectSummary { .. } => "select_summary",
        Command::SelectRevenue { .. } => "select_revenue",
        Command::SelectTopServices { .. } => "select_top_services",
        Command::Listen { .. } => "listen",
    }
}
