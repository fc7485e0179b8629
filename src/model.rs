use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

/// Integer centavos — the only money type.
pub type Money = i64;

pub const MINUTE_MS: Ms = 60_000;
pub const DAY_MS: Ms = 86_400_000;

/// Half-open interval `[start, end)`. A zero-length span is legal (an
/// appointment with no services yet); `occupied()` widens it so it still
/// claims its start instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start <= end, "Span start must not be after end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }

    /// The span as it counts for conflict/occupancy tests: zero-length
    /// spans are widened to 1 ms.
    pub fn occupied(&self) -> Span {
        if self.end > self.start {
            *self
        } else {
            Span::new(self.start, self.start + 1)
        }
    }
}

/// UTC day bucket for a timestamp.
pub fn day_index(t: Ms) -> i64 {
    t.div_euclid(DAY_MS)
}

/// Midnight UTC of the day containing `t`.
pub fn day_start(t: Ms) -> Ms {
    day_index(t) * DAY_MS
}

/// Whole days from `from` to `to`, any partial day counting as a full one.
/// Callers normalize both ends to midnight first, which makes the division
/// exact; the ceiling only matters for raw timestamps.
pub fn days_between_ceil(from: Ms, to: Ms) -> i64 {
    let diff = to - from;
    diff.div_euclid(DAY_MS) + (diff.rem_euclid(DAY_MS) != 0) as i64
}

// ── Domain rows ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayMethod {
    Cash,
    Credit,
    Debit,
    Pix,
    Other,
}

impl PayMethod {
    /// Cash moves the drawer; everything else moves the account.
    pub fn is_cash(self) -> bool {
        matches!(self, PayMethod::Cash)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cash" => Some(PayMethod::Cash),
            "credit" => Some(PayMethod::Credit),
            "debit" => Some(PayMethod::Debit),
            "pix" => Some(PayMethod::Pix),
            "other" => Some(PayMethod::Other),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PayMethod::Cash => "cash",
            PayMethod::Credit => "credit",
            PayMethod::Debit => "debit",
            PayMethod::Pix => "pix",
            PayMethod::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

/// A service as frozen into an appointment at booking time. The duration
/// is per-booking editable, so it may diverge from the catalog's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceItem {
    pub id: Ulid,
    pub name: String,
    pub price: Money,
    pub duration_min: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Ulid,
    /// May be unlinked: a free-text client name with no client row yet.
    pub client_id: Option<Ulid>,
    pub client_name: String,
    pub span: Span,
    /// Snapshot, immutable in place — edits replace the whole list.
    pub services: Vec<ServiceItem>,
    pub status: AppointmentStatus,
    pub advance: Money,
    pub advance_confirmed: bool,
    pub advance_method: Option<PayMethod>,
    pub paid: Option<Money>,
    pub payment_method: Option<PayMethod>,
    pub notes: Option<String>,
    pub booked_at: Ms,
}

impl Appointment {
    /// Derived total: sum of the snapshot prices.
    pub fn total(&self) -> Money {
        self.services.iter().map(|s| s.price).sum()
    }

    /// Cancelled appointments never participate in conflict checks.
    pub fn blocks_time(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Ulid,
    pub name: String,
    pub price: Money,
    pub duration_min: i64,
    pub description: Option<String>,
    /// Absent means not recurring — never scheduled for forecast.
    pub recurrence_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Ulid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub alerts_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Ulid,
    /// Midnight UTC of the expense day.
    pub day: Ms,
    pub description: String,
    pub amount: Money,
    pub paid: bool,
    pub method: Option<PayMethod>,
    /// Recurring templates materialize a fresh unpaid copy each month.
    pub recurring: bool,
}

/// Drawer → account transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Ulid,
    pub day: Ms,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// Default alert lead time in days when the `alert_days` setting is unset.
pub const DEFAULT_ALERT_DAYS: i64 = 7;

// ── Collections & events ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Clients,
    Services,
    Appointments,
    Expenses,
    Transfers,
    Settings,
}

impl Collection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "clients" => Some(Collection::Clients),
            "services" => Some(Collection::Services),
            "appointments" => Some(Collection::Appointments),
            "expenses" => Some(Collection::Expenses),
            "transfers" => Some(Collection::Transfers),
            "settings" => Some(Collection::Settings),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Clients => "clients",
            Collection::Services => "services",
            Collection::Appointments => "appointments",
            Collection::Expenses => "expenses",
            Collection::Transfers => "transfers",
            Collection::Settings => "settings",
        }
    }
}

/// The event types — one per accepted mutation. This is the WAL record
/// format; updates carry the full new row so replay never merges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ClientCreated { row: Client },
    ClientUpdated { row: Client },
    ClientDeleted { id: Ulid },
    ServiceCreated { row: Service },
    ServiceUpdated { row: Service },
    ServiceDeleted { id: Ulid },
    AppointmentBooked { row: Appointment },
    /// Full-snapshot replacement of a scheduled appointment.
    AppointmentUpdated { row: Appointment },
    AppointmentCancelled { id: Ulid },
    AppointmentReinstated { id: Ulid },
    AdvanceConfirmed { id: Ulid, method: PayMethod },
    AppointmentCompleted { id: Ulid, paid: Money, method: PayMethod },
    ExpenseAdded { row: Expense },
    ExpenseUpdated { row: Expense },
    ExpensePaid { id: Ulid, method: PayMethod },
    ExpenseDeleted { id: Ulid },
    TransferRecorded { row: Transfer },
    SettingChanged { key: String, value: String },
}

impl Event {
    /// Which collection's listeners care about this event.
    pub fn collection(&self) -> Collection {
        match self {
            Event::ClientCreated { .. } | Event::ClientUpdated { .. } | Event::ClientDeleted { .. } => {
                Collection::Clients
            }
            Event::ServiceCreated { .. } | Event::ServiceUpdated { .. } | Event::ServiceDeleted { .. } => {
                Collection::Services
            }
            Event::AppointmentBooked { .. }
            | Event::AppointmentUpdated { .. }
            | Event::AppointmentCancelled { .. }
            | Event::AppointmentReinstated { .. }
            | Event::AdvanceConfirmed { .. }
            | Event::AppointmentCompleted { .. } => Collection::Appointments,
            Event::ExpenseAdded { .. }
            | Event::ExpenseUpdated { .. }
            | Event::ExpensePaid { .. }
            | Event::ExpenseDeleted { .. } => Collection::Expenses,
            Event::TransferRecorded { .. } => Collection::Transfers,
            Event::SettingChanged { .. } => Collection::Settings,
        }
    }
}

// ── Partial rows (UPDATE … SET patches) ──────────────────────────

#[derive(Debug, Default, PartialEq)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub alerts_enabled: Option<bool>,
}

#[derive(Debug, Default, PartialEq)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub duration_min: Option<i64>,
    pub description: Option<String>,
    /// `Some(None)` clears the recurrence interval.
    pub recurrence_days: Option<Option<i64>>,
}

#[derive(Debug, Default, PartialEq)]
pub struct AppointmentPatch {
    pub client_id: Option<Ulid>,
    pub client_name: Option<String>,
    pub start: Option<Ms>,
    pub end: Option<Ms>,
    pub services: Option<Vec<ServiceItem>>,
    pub advance: Option<Money>,
    pub notes: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub paid: Option<Money>,
    pub payment_method: Option<PayMethod>,
    pub advance_confirmed: Option<bool>,
    pub advance_method: Option<PayMethod>,
}

impl AppointmentPatch {
    /// True when the patch edits booking substance rather than performing
    /// a status or advance transition.
    pub fn is_revision(&self) -> bool {
        self.status.is_none() && self.advance_confirmed.is_none()
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct ExpensePatch {
    pub day: Option<Ms>,
    pub description: Option<String>,
    pub amount: Option<Money>,
    pub recurring: Option<bool>,
    pub paid: Option<bool>,
    pub method: Option<PayMethod>,
}

// ── Derived (never persisted) ────────────────────────────────────

/// One tick of the working day, for display only — the conflict check
/// stays authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub at: Ms,
    pub occupied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyForecast {
    /// Midnight UTC of the bucket day.
    pub day: Ms,
    pub clients_expected: u32,
    pub potential_revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Forecast {
    pub alerts: std::collections::BTreeSet<Ulid>,
    pub overdue_count: u32,
    pub overdue_revenue: Money,
    pub daily: Vec<DailyForecast>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Income,
    Outflow,
    Transfer,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Income => "income",
            EntryKind::Outflow => "outflow",
            EntryKind::Transfer => "transfer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Source-derived key, e.g. `appt-final-<id>`; stable across refetches.
    pub key: String,
    pub at: Ms,
    pub description: String,
    pub amount: Money,
    pub kind: EntryKind,
    pub method: Option<PayMethod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balances {
    pub account: Money,
    pub drawer: Money,
    pub total: Money,
    /// Confirmed advances on still-scheduled appointments.
    pub pending_advances: Money,
    pub available: Money,
}

/// Windowed income/outflow totals; transfers are internal and excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CashSummary {
    pub income: Money,
    pub outflow: Money,
    pub net: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyRevenue {
    pub day: Ms,
    pub realized: Money,
    pub projected: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCount {
    pub name: String,
    pub completed: u32,
}
