use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{self, now_ms};
use super::{forecast, ledger, Engine, EngineError};

fn validate_window(from: Ms, to: Ms) -> Result<(), EngineError> {
    if from > to {
        return Err(EngineError::Validation("window start after end"));
    }
    if to - from > MAX_QUERY_WINDOW_MS {
        return Err(EngineError::LimitExceeded("query window too wide"));
    }
    Ok(())
}

impl Engine {
    pub async fn list_clients(&self) -> Vec<Client> {
        let store = self.store.read().await;
        let mut rows: Vec<Client> = store.clients.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        rows
    }

    pub async fn list_services(&self) -> Vec<Service> {
        let store = self.store.read().await;
        let mut rows: Vec<Service> = store.services.values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        rows
    }

    /// Appointments starting within `[from, to]`, soonest first.
    pub async fn list_appointments(&self, from: Ms, to: Ms) -> Result<Vec<Appointment>, EngineError> {
        validate_window(from, to)?;
        let store = self.store.read().await;
        let mut rows: Vec<Appointment> = store
            .appointments
            .values()
            .filter(|a| a.span.start >= from && a.span.start <= to)
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.span.start, a.id));
        Ok(rows)
    }

    pub async fn list_expenses(&self) -> Vec<Expense> {
        let store = self.store.read().await;
        let mut rows: Vec<Expense> = store.expenses.values().cloned().collect();
        rows.sort_by_key(|e| (e.day, e.id));
        rows
    }

    pub async fn list_transfers(&self) -> Vec<Transfer> {
        let store = self.store.read().await;
        let mut rows: Vec<Transfer> = store.transfers.values().cloned().collect();
        rows.sort_by_key(|t| (t.day, t.id));
        rows
    }

    pub async fn list_settings(&self) -> Vec<Setting> {
        let store = self.store.read().await;
        store
            .settings
            .iter()
            .map(|(key, value)| Setting { key: key.clone(), value: value.clone() })
            .collect()
    }

    /// Working-day ticks of `day` with occupancy flags. `exclude` hides the
    /// appointment being edited, mirroring the conflict check.
    pub async fn day_slots(
        &self,
        day: Ms,
        step_min: Option<i64>,
        work_start_min: Option<i64>,
        work_end_min: Option<i64>,
        exclude: Option<Ulid>,
    ) -> Result<Vec<Slot>, EngineError> {
        let step = step_min.unwrap_or(conflict::DEFAULT_SLOT_STEP_MIN);
        let start = work_start_min.unwrap_or(conflict::WORK_START_MIN);
        let end = work_end_min.unwrap_or(conflict::WORK_END_MIN);
        if step < MIN_SLOT_STEP_MIN {
            return Err(EngineError::Validation("slot step too small"));
        }
        if !(0..=24 * 60).contains(&start) || !(0..=24 * 60).contains(&end) || start > end {
            return Err(EngineError::Validation("bad work window"));
        }
        if ((end - start) / step) as usize > MAX_SLOTS_PER_DAY {
            return Err(EngineError::LimitExceeded("too many slots"));
        }

        let store = self.store.read().await;
        Ok(conflict::generate_slots(day, start, end, step, store.appointments.values(), exclude))
    }

    /// Recurrence forecast over the next `horizon` days (default 30). The
    /// alert threshold defaults to the `alert_days` setting.
    pub async fn forecast(
        &self,
        horizon_days: Option<i64>,
        alert_threshold_days: Option<i64>,
    ) -> Result<Forecast, EngineError> {
        let horizon = horizon_days.unwrap_or(30);
        if !(0..=MAX_HORIZON_DAYS).contains(&horizon) {
            return Err(EngineError::LimitExceeded("horizon too wide"));
        }
        let store = self.store.read().await;
        let threshold = alert_threshold_days.unwrap_or_else(|| store.alert_days());
        let clients: Vec<Client> = store.clients.values().cloned().collect();
        let services: Vec<Service> = store.services.values().cloned().collect();
        let appointments: Vec<Appointment> = store.appointments.values().cloned().collect();
        Ok(forecast::compute_forecast(&clients, &services, &appointments, now_ms(), threshold, horizon))
    }

    /// Cash journal entries within `[from, to]`, newest first.
    pub async fn ledger(&self, from: Ms, to: Ms) -> Result<Vec<LedgerEntry>, EngineError> {
        validate_window(from, to)?;
        let store = self.store.read().await;
        let appointments: Vec<Appointment> = store.appointments.values().cloned().collect();
        let expenses: Vec<Expense> = store.expenses.values().cloned().collect();
        let transfers: Vec<Transfer> = store.transfers.values().cloned().collect();
        let journal = ledger::entries(&appointments, &expenses, &transfers);
        Ok(ledger::statement(&journal, from, to))
    }

    /// All-time balances: account, drawer, pending advances, available.
    pub async fn balances(&self) -> Balances {
        let store = self.store.read().await;
        let appointments: Vec<Appointment> = store.appointments.values().cloned().collect();
        let expenses: Vec<Expense> = store.expenses.values().cloned().collect();
        let transfers: Vec<Transfer> = store.transfers.values().cloned().collect();
        let journal = ledger::entries(&appointments, &expenses, &transfers);
        ledger::balances(&journal, &appointments)
    }

    /// Income/outflow/net within `[from, to]`.
    pub async fn summary(&self, from: Ms, to: Ms) -> Result<CashSummary, EngineError> {
        Ok(ledger::summarize(&self.ledger(from, to).await?))
    }

    /// Realized vs projected revenue per day of `[from, to]`.
    pub async fn daily_revenue(&self, from: Ms, to: Ms) -> Result<Vec<DailyRevenue>, EngineError> {
        validate_window(from, to)?;
        let store = self.store.read().await;
        let appointments: Vec<Appointment> = store.appointments.values().cloned().collect();
        Ok(ledger::daily_revenue(&appointments, from, to))
    }

    /// Completed-service popularity within `[from, to]`.
    pub async fn top_services(&self, from: Ms, to: Ms) -> Result<Vec<ServiceCount>, EngineError> {
        validate_window(from, to)?;
        let store = self.store.read().await;
        let appointments: Vec<Appointment> = store.appointments.values().cloned().collect();
        Ok(ledger::top_services(&appointments, from, to))
    }
}
