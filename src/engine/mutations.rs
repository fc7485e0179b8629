use chrono::{Datelike, TimeZone, Utc};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::conflict::{has_conflict, now_ms, validate_span};
use super::{Engine, EngineError};

impl Engine {
    // ── Clients ──────────────────────────────────────────────

    pub async fn create_client(&self, row: Client) -> Result<(), EngineError> {
        validate_client(&row)?;
        let mut store = self.store.write().await;
        if store.clients.len() >= MAX_ROWS_PER_COLLECTION {
            return Err(EngineError::LimitExceeded("too many clients"));
        }
        if store.clients.contains_key(&row.id) {
            return Err(EngineError::AlreadyExists(row.id));
        }
        self.persist_and_apply(&mut store, &Event::ClientCreated { row }).await
    }

    pub async fn update_client(&self, id: Ulid, patch: ClientPatch) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        let mut row = store.clients.get(&id).ok_or(EngineError::NotFound(id))?.clone();
        if let Some(v) = patch.name {
            row.name = v;
        }
        if let Some(v) = patch.phone {
            row.phone = Some(v);
        }
        if let Some(v) = patch.email {
            row.email = Some(v);
        }
        if let Some(v) = patch.notes {
            row.notes = Some(v);
        }
        if let Some(v) = patch.alerts_enabled {
            row.alerts_enabled = v;
        }
        validate_client(&row)?;
        self.persist_and_apply(&mut store, &Event::ClientUpdated { row }).await
    }

    /// Deleting a client unlinks its appointments (they keep the free-text
    /// name) rather than deleting them.
    pub async fn delete_client(&self, id: Ulid) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        if !store.clients.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        self.persist_and_apply(&mut store, &Event::ClientDeleted { id }).await
    }

    // ── Services ─────────────────────────────────────────────

    pub async fn create_service(&self, row: Service) -> Result<(), EngineError> {
        validate_service(&row)?;
        let mut store = self.store.write().await;
        if store.services.len() >= MAX_ROWS_PER_COLLECTION {
            return Err(EngineError::LimitExceeded("too many services"));
        }
        if store.services.contains_key(&row.id) {
            return Err(EngineError::AlreadyExists(row.id));
        }
        self.persist_and_apply(&mut store, &Event::ServiceCreated { row }).await
    }

    pub async fn update_service(&self, id: Ulid, patch: ServicePatch) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        let mut row = store.services.get(&id).ok_or(EngineError::NotFound(id))?.clone();
        if let Some(v) = patch.name {
            row.name = v;
        }
        if let Some(v) = patch.price {
            row.price = v;
        }
        if let Some(v) = patch.duration_min {
            row.duration_min = v;
        }
        if let Some(v) = patch.description {
            row.description = Some(v);
        }
        if let Some(v) = patch.recurrence_days {
            row.recurrence_days = v;
        }
        validate_service(&row)?;
        self.persist_and_apply(&mut store, &Event::ServiceUpdated { row }).await
    }

    /// Appointment snapshots are frozen copies, so catalog deletion never
    /// rewrites history.
    pub async fn delete_service(&self, id: Ulid) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        if !store.services.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        self.persist_and_apply(&mut store, &Event::ServiceDeleted { id }).await
    }

    // ── Appointments ─────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub async fn book_appointment(
        &self,
        id: Ulid,
        client_id: Option<Ulid>,
        client_name: String,
        span: Span,
        services: Vec<ServiceItem>,
        advance: Money,
        notes: Option<String>,
    ) -> Result<(), EngineError> {
        let row = Appointment {
            id,
            client_id,
            client_name,
            span,
            services,
            status: AppointmentStatus::Scheduled,
            advance,
            advance_confirmed: false,
            advance_method: None,
            paid: None,
            payment_method: None,
            notes,
            booked_at: now_ms(),
        };
        validate_appointment(&row)?;

        let mut store = self.store.write().await;
        if store.appointments.len() >= MAX_ROWS_PER_COLLECTION {
            return Err(EngineError::LimitExceeded("too many appointments"));
        }
        if store.appointments.contains_key(&row.id) {
            return Err(EngineError::AlreadyExists(row.id));
        }
        if let Some(cid) = row.client_id
            && !store.clients.contains_key(&cid) {
                return Err(EngineError::NotFound(cid));
            }
        if let Some(hit) = has_conflict(store.appointments.values(), row.span, None) {
            return Err(EngineError::Conflict { id: hit.id, client_name: hit.client_name.clone() });
        }
        self.persist_and_apply(&mut store, &Event::AppointmentBooked { row }).await
    }

    /// Patch an appointment. Status and advance transitions are exclusive
    /// commands; everything else is a revision of a scheduled appointment,
    /// which replaces the snapshot wholesale and re-runs the conflict check
    /// excluding the appointment itself.
    pub async fn update_appointment(&self, id: Ulid, patch: AppointmentPatch) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        let current = store.appointments.get(&id).ok_or(EngineError::NotFound(id))?.clone();

        if !patch.is_revision() && has_revision_fields(&patch) {
            return Err(EngineError::Validation("status change cannot edit booking fields"));
        }

        if let Some(confirmed) = patch.advance_confirmed {
            if !confirmed {
                return Err(EngineError::InvalidTransition("advance confirmation cannot be revoked"));
            }
            if patch.status.is_some() {
                return Err(EngineError::Validation("combined status and advance transition"));
            }
            if current.status != AppointmentStatus::Scheduled {
                return Err(EngineError::InvalidTransition("advance on a non-scheduled appointment"));
            }
            if current.advance <= 0 {
                return Err(EngineError::Validation("no advance to confirm"));
            }
            if current.advance_confirmed {
                return Err(EngineError::InvalidTransition("advance already confirmed"));
            }
            let method = patch
                .advance_method
                .ok_or(EngineError::Validation("payment method required"))?;
            return self.persist_and_apply(&mut store, &Event::AdvanceConfirmed { id, method }).await;
        }

        if let Some(status) = patch.status {
            let event = match (current.status, status) {
                (AppointmentStatus::Scheduled, AppointmentStatus::Cancelled) => {
                    Event::AppointmentCancelled { id }
                }
                (AppointmentStatus::Cancelled, AppointmentStatus::Scheduled) => {
                    Event::AppointmentReinstated { id }
                }
                (AppointmentStatus::Scheduled, AppointmentStatus::Completed) => {
                    let paid = patch.paid.ok_or(EngineError::Validation("final amount required"))?;
                    if paid < 0 {
                        return Err(EngineError::Validation("negative payment"));
                    }
                    let method = patch
                        .payment_method
                        .ok_or(EngineError::Validation("payment method required"))?;
                    Event::AppointmentCompleted { id, paid, method }
                }
                _ => return Err(EngineError::InvalidTransition("unsupported status change")),
            };
            return self.persist_and_apply(&mut store, &event).await;
        }

        if current.status != AppointmentStatus::Scheduled {
            return Err(EngineError::InvalidTransition("only scheduled appointments can be edited"));
        }
        let mut row = current;
        if let Some(v) = patch.client_id {
            row.client_id = Some(v);
        }
        if let Some(v) = patch.client_name {
            row.client_name = v;
        }
        if let Some(v) = patch.start {
            row.span.start = v;
        }
        if let Some(v) = patch.end {
            row.span.end = v;
        }
        if let Some(v) = patch.services {
            row.services = v;
        }
        if let Some(v) = patch.advance {
            row.advance = v;
        }
        if let Some(v) = patch.notes {
            row.notes = Some(v);
        }
        validate_appointment(&row)?;
        if let Some(cid) = row.client_id
            && !store.clients.contains_key(&cid) {
                return Err(EngineError::NotFound(cid));
            }
        if let Some(hit) = has_conflict(store.appointments.values(), row.span, Some(id)) {
            return Err(EngineError::Conflict { id: hit.id, client_name: hit.client_name.clone() });
        }
        self.persist_and_apply(&mut store, &Event::AppointmentUpdated { row }).await
    }

    // ── Expenses ─────────────────────────────────────────────

    pub async fn add_expense(
        &self,
        id: Ulid,
        day: Ms,
        description: String,
        amount: Money,
        recurring: bool,
    ) -> Result<(), EngineError> {
        let row = Expense {
            id,
            day: day_start(day),
            description,
            amount,
            paid: false,
            method: None,
            recurring,
        };
        validate_expense(&row)?;
        let mut store = self.store.write().await;
        if store.expenses.len() >= MAX_ROWS_PER_COLLECTION {
            return Err(EngineError::LimitExceeded("too many expenses"));
        }
        if store.expenses.contains_key(&row.id) {
            return Err(EngineError::AlreadyExists(row.id));
        }
        self.persist_and_apply(&mut store, &Event::ExpenseAdded { row }).await
    }

    pub async fn update_expense(&self, id: Ulid, patch: ExpensePatch) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        let current = store.expenses.get(&id).ok_or(EngineError::NotFound(id))?.clone();

        if let Some(paid) = patch.paid {
            if !paid {
                return Err(EngineError::InvalidTransition("expense payment cannot be revoked"));
            }
            if current.paid {
                return Err(EngineError::InvalidTransition("expense already paid"));
            }
            let method = patch
                .method
                .ok_or(EngineError::Validation("payment method required"))?;
            return self.persist_and_apply(&mut store, &Event::ExpensePaid { id, method }).await;
        }

        let mut row = current;
        if let Some(v) = patch.day {
            row.day = day_start(v);
        }
        if let Some(v) = patch.description {
            row.description = v;
        }
        if let Some(v) = patch.amount {
            row.amount = v;
        }
        if let Some(v) = patch.recurring {
            row.recurring = v;
        }
        validate_expense(&row)?;
        self.persist_and_apply(&mut store, &Event::ExpenseUpdated { row }).await
    }

    pub async fn delete_expense(&self, id: Ulid) -> Result<(), EngineError> {
        let mut store = self.store.write().await;
        if !store.expenses.contains_key(&id) {
            return Err(EngineError::NotFound(id));
        }
        self.persist_and_apply(&mut store, &Event::ExpenseDeleted { id }).await
    }

    /// Each recurring template older than the current month spawns one
    /// unpaid copy in it, on the same day-of-month (clamped to month
    /// length), unless an expense with the same description already exists
    /// this month. Returns how many were inserted; safe to re-run.
    pub async fn materialize_recurring_expenses(&self, now: Ms) -> Result<usize, EngineError> {
        let mut store = self.store.write().await;

        let now_dt = Utc
            .timestamp_millis_opt(now)
            .single()
            .ok_or(EngineError::Validation("timestamp out of range"))?;
        let month_start = match Utc.with_ymd_and_hms(now_dt.year(), now_dt.month(), 1, 0, 0, 0) {
            chrono::LocalResult::Single(dt) => dt.timestamp_millis(),
            _ => return Err(EngineError::Validation("timestamp out of range")),
        };
        let (next_year, next_month) = if now_dt.month() == 12 {
            (now_dt.year() + 1, 1)
        } else {
            (now_dt.year(), now_dt.month() + 1)
        };
        let next_month_start = match Utc.with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0) {
            chrono::LocalResult::Single(dt) => dt.timestamp_millis(),
            _ => return Err(EngineError::Validation("timestamp out of range")),
        };
        let days_in_month = ((next_month_start - month_start) / DAY_MS) as u32;

        let templates: Vec<Expense> = store
            .expenses
            .values()
            .filter(|e| e.recurring && e.day < month_start)
            .cloned()
            .collect();

        let mut inserted = 0;
        for template in templates {
            let already_present = store.expenses.values().any(|e| {
                e.day >= month_start && e.day < next_month_start && e.description == template.description
            });
            if already_present {
                continue;
            }
            let template_dom = Utc
                .timestamp_millis_opt(template.day)
                .single()
                .map(|d| d.day())
                .unwrap_or(1);
            let dom = template_dom.min(days_in_month);
            let row = Expense {
                id: Ulid::new(),
                day: month_start + (dom as i64 - 1) * DAY_MS,
                description: template.description.clone(),
                amount: template.amount,
                paid: false,
                method: None,
                recurring: true,
            };
            self.persist_and_apply(&mut store, &Event::ExpenseAdded { row }).await?;
            inserted += 1;
        }
        Ok(inserted)
    }

    // ── Transfers & settings ─────────────────────────────────

    /// Register a drawer → account transfer. Rejected when it exceeds the
    /// current drawer balance.
    pub async fn record_transfer(&self, id: Ulid, day: Ms, amount: Money) -> Result<(), EngineError> {
        if amount <= 0 {
            return Err(EngineError::Validation("transfer amount must be positive"));
        }
        let day = day_start(day);
        if !(MIN_VALID_TIMESTAMP_MS..=MAX_VALID_TIMESTAMP_MS).contains(&day) {
            return Err(EngineError::LimitExceeded("timestamp out of range"));
        }

        let mut store = self.store.write().await;
        if store.transfers.len() >= MAX_ROWS_PER_COLLECTION {
            return Err(EngineError::LimitExceeded("too many transfers"));
        }
        if store.transfers.contains_key(&id) {
            return Err(EngineError::AlreadyExists(id));
        }

        let appointments: Vec<Appointment> = store.appointments.values().cloned().collect();
        let expenses: Vec<Expense> = store.expenses.values().cloned().collect();
        let transfers: Vec<Transfer> = store.transfers.values().cloned().collect();
        let journal = super::ledger::entries(&appointments, &expenses, &transfers);
        let balances = super::ledger::balances(&journal, &appointments);
        if amount > balances.drawer {
            return Err(EngineError::Validation("transfer exceeds drawer balance"));
        }

        let row = Transfer { id, day, amount };
        self.persist_and_apply(&mut store, &Event::TransferRecorded { row }).await
    }

    /// Upsert a preference key (`alert_days`, `theme`, …).
    pub async fn put_setting(&self, key: String, value: String) -> Result<(), EngineError> {
        if key.is_empty() || key.len() > MAX_SETTING_KEY_LEN {
            return Err(EngineError::Validation("bad setting key"));
        }
        if value.len() > MAX_SETTING_VALUE_LEN {
            return Err(EngineError::LimitExceeded("setting value too long"));
        }
        let mut store = self.store.write().await;
        self.persist_and_apply(&mut store, &Event::SettingChanged { key, value }).await
    }
}

// ── Row validation ───────────────────────────────────────────

fn validate_client(row: &Client) -> Result<(), EngineError> {
    if row.name.is_empty() {
        return Err(EngineError::Validation("client name required"));
    }
    if row.name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("client name too long"));
    }
    for contact in [&row.phone, &row.email] {
        if contact.as_ref().is_some_and(|c| c.len() > MAX_CONTACT_LEN) {
            return Err(EngineError::LimitExceeded("contact field too long"));
        }
    }
    if row.notes.as_ref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
        return Err(EngineError::LimitExceeded("notes too long"));
    }
    Ok(())
}

fn validate_service(row: &Service) -> Result<(), EngineError> {
    if row.name.is_empty() {
        return Err(EngineError::Validation("service name required"));
    }
    if row.name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("service name too long"));
    }
    if row.price < 0 {
        return Err(EngineError::Validation("negative price"));
    }
    if row.duration_min < 0 {
        return Err(EngineError::Validation("negative duration"));
    }
    if row.description.as_ref().is_some_and(|d| d.len() > MAX_NOTES_LEN) {
        return Err(EngineError::LimitExceeded("description too long"));
    }
    if row.recurrence_days.is_some_and(|d| d <= 0) {
        return Err(EngineError::Validation("recurrence interval must be positive"));
    }
    Ok(())
}

fn validate_appointment(row: &Appointment) -> Result<(), EngineError> {
    // Zero-length spans are legal (no services selected yet).
    validate_span(&row.span)?;
    if row.client_name.is_empty() {
        return Err(EngineError::Validation("client name required"));
    }
    if row.client_name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("client name too long"));
    }
    if row.services.len() > MAX_SERVICES_PER_APPOINTMENT {
        return Err(EngineError::LimitExceeded("too many services"));
    }
    for item in &row.services {
        if item.name.len() > MAX_NAME_LEN {
            return Err(EngineError::LimitExceeded("service name too long"));
        }
        if item.price < 0 {
            return Err(EngineError::Validation("negative price"));
        }
        if item.duration_min < 0 {
            return Err(EngineError::Validation("negative duration"));
        }
    }
    if row.advance < 0 {
        return Err(EngineError::Validation("negative advance"));
    }
    if row.notes.as_ref().is_some_and(|n| n.len() > MAX_NOTES_LEN) {
        return Err(EngineError::LimitExceeded("notes too long"));
    }
    Ok(())
}

fn validate_expense(row: &Expense) -> Result<(), EngineError> {
    if row.description.is_empty() {
        return Err(EngineError::Validation("description required"));
    }
    if row.description.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("description too long"));
    }
    if row.amount <= 0 {
        return Err(EngineError::Validation("expense amount must be positive"));
    }
    if !(MIN_VALID_TIMESTAMP_MS..=MAX_VALID_TIMESTAMP_MS).contains(&row.day) {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    Ok(())
}

fn has_revision_fields(patch: &AppointmentPatch) -> bool {
    patch.client_id.is_some()
        || patch.client_name.is_some()
        || patch.start.is_some()
        || patch.end.is_some()
        || patch.services.is_some()
        || patch.advance.is_some()
        || patch.notes.is_some()
}
