use std::collections::BTreeMap;

use ulid::Ulid;

use crate::model::*;

/// Every collection of one tenant. Plain data — locking lives in `Engine`,
/// which holds the store behind a single `RwLock` so a conflict check and
/// the insert it guards are one critical section.
#[derive(Debug, Default)]
pub struct Store {
    pub clients: BTreeMap<Ulid, Client>,
    pub services: BTreeMap<Ulid, Service>,
    pub appointments: BTreeMap<Ulid, Appointment>,
    pub expenses: BTreeMap<Ulid, Expense>,
    pub transfers: BTreeMap<Ulid, Transfer>,
    pub settings: BTreeMap<String, String>,
}

impl Store {
    /// Apply one event. Pure state transition — no validation, no I/O;
    /// both live mutation and WAL replay funnel through here.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::ClientCreated { row } | Event::ClientUpdated { row } => {
                self.clients.insert(row.id, row.clone());
            }
            Event::ClientDeleted { id } => {
                self.clients.remove(id);
                // Appointments keep the free-text name but lose the link.
                for appt in self.appointments.values_mut() {
                    if appt.client_id == Some(*id) {
                        appt.client_id = None;
                    }
                }
            }
            Event::ServiceCreated { row } | Event::ServiceUpdated { row } => {
                self.services.insert(row.id, row.clone());
            }
            Event::ServiceDeleted { id } => {
                // Snapshots embedded in appointments are frozen copies and
                // survive catalog deletion untouched.
                self.services.remove(id);
            }
            Event::AppointmentBooked { row } | Event::AppointmentUpdated { row } => {
                self.appointments.insert(row.id, row.clone());
            }
            Event::AppointmentCancelled { id } => {
                if let Some(appt) = self.appointments.get_mut(id) {
                    appt.status = AppointmentStatus::Cancelled;
                }
            }
            Event::AppointmentReinstated { id } => {
                if let Some(appt) = self.appointments.get_mut(id) {
                    appt.status = AppointmentStatus::Scheduled;
                }
            }
            Event::AdvanceConfirmed { id, method } => {
                if let Some(appt) = self.appointments.get_mut(id) {
                    appt.advance_confirmed = true;
                    appt.advance_method = Some(*method);
                }
            }
            Event::AppointmentCompleted { id, paid, method } => {
                if let Some(appt) = self.appointments.get_mut(id) {
                    appt.status = AppointmentStatus::Completed;
                    appt.paid = Some(*paid);
                    appt.payment_method = Some(*method);
                }
            }
            Event::ExpenseAdded { row } | Event::ExpenseUpdated { row } => {
                self.expenses.insert(row.id, row.clone());
            }
            Event::ExpensePaid { id, method } => {
                if let Some(expense) = self.expenses.get_mut(id) {
                    expense.paid = true;
                    expense.method = Some(*method);
                }
            }
            Event::ExpenseDeleted { id } => {
                self.expenses.remove(id);
            }
            Event::TransferRecorded { row } => {
                self.transfers.insert(row.id, row.clone());
            }
            Event::SettingChanged { key, value } => {
                self.settings.insert(key.clone(), value.clone());
            }
        }
    }

    /// The alert lead time consumed by the forecast, from the settings
    /// collection (device preference in the original data model).
    pub fn alert_days(&self) -> i64 {
        self.settings
            .get("alert_days")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_ALERT_DAYS)
    }

    /// Minimal event sequence that recreates the current state. Row-carrying
    /// events embed full rows, so one event per row suffices.
    pub fn snapshot_events(&self) -> Vec<Event> {
        let mut events = Vec::new();
        for row in self.clients.values() {
            events.push(Event::ClientCreated { row: row.clone() });
        }
        for row in self.services.values() {
            events.push(Event::ServiceCreated { row: row.clone() });
        }
        for row in self.appointments.values() {
            events.push(Event::AppointmentBooked { row: row.clone() });
        }
        for row in self.expenses.values() {
            events.push(Event::ExpenseAdded { row: row.clone() });
        }
        for row in self.transfers.values() {
            events.push(Event::TransferRecorded { row: row.clone() });
        }
        for (key, value) in &self.settings {
            events.push(Event::SettingChanged { key: key.clone(), value: value.clone() });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_client() -> Client {
        Client {
            id: Ulid::new(),
            name: "Ana".into(),
            phone: None,
            email: None,
            notes: None,
            alerts_enabled: true,
        }
    }

    fn sample_appointment(client_id: Option<Ulid>) -> Appointment {
        Appointment {
            id: Ulid::new(),
            client_id,
            client_name: "Ana".into(),
            span: Span::new(1_000_000_000_000, 1_000_000_900_000),
            services: Vec::new(),
            status: AppointmentStatus::Scheduled,
            advance: 0,
            advance_confirmed: false,
            advance_method: None,
            paid: None,
            payment_method: None,
            notes: None,
            booked_at: 999_999_000_000,
        }
    }

    #[test]
    fn deleting_client_unlinks_appointments() {
        let mut store = Store::default();
        let client = sample_client();
        let appt = sample_appointment(Some(client.id));
        store.apply(&Event::ClientCreated { row: client.clone() });
        store.apply(&Event::AppointmentBooked { row: appt.clone() });

        store.apply(&Event::ClientDeleted { id: client.id });
        assert!(store.clients.is_empty());
        let kept = &store.appointments[&appt.id];
        assert_eq!(kept.client_id, None);
        assert_eq!(kept.client_name, "Ana"); // free-text name survives
    }

    #[test]
    fn service_deletion_leaves_snapshots_alone() {
        let mut store = Store::default();
        let service = Service {
            id: Ulid::new(),
            name: "Corte".into(),
            price: 5_000,
            duration_min: 30,
            description: None,
            recurrence_days: None,
        };
        let mut appt = sample_appointment(None);
        appt.services.push(ServiceItem {
            id: service.id,
            name: service.name.clone(),
            price: service.price,
            duration_min: service.duration_min,
        });
        store.apply(&Event::ServiceCreated { row: service.clone() });
        store.apply(&Event::AppointmentBooked { row: appt.clone() });
        store.apply(&Event::ServiceDeleted { id: service.id });

        assert!(store.services.is_empty());
        assert_eq!(store.appointments[&appt.id].services.len(), 1);
    }

    #[test]
    fn transition_events_mutate_in_place() {
        let mut store = Store::default();
        let appt = sample_appointment(None);
        store.apply(&Event::AppointmentBooked { row: appt.clone() });

        store.apply(&Event::AppointmentCancelled { id: appt.id });
        assert_eq!(store.appointments[&appt.id].status, AppointmentStatus::Cancelled);

        store.apply(&Event::AppointmentReinstated { id: appt.id });
        assert_eq!(store.appointments[&appt.id].status, AppointmentStatus::Scheduled);

        store.apply(&Event::AppointmentCompleted {
            id: appt.id,
            paid: 8_000,
            method: PayMethod::Pix,
        });
        let done = &store.appointments[&appt.id];
        assert_eq!(done.status, AppointmentStatus::Completed);
        assert_eq!(done.paid, Some(8_000));
        assert_eq!(done.payment_method, Some(PayMethod::Pix));
    }

    #[test]
    fn alert_days_defaults_and_parses() {
        let mut store = Store::default();
        assert_eq!(store.alert_days(), DEFAULT_ALERT_DAYS);
        store.apply(&Event::SettingChanged { key: "alert_days".into(), value: "3".into() });
        assert_eq!(store.alert_days(), 3);
        store.apply(&Event::SettingChanged { key: "alert_days".into(), value: "junk".into() });
        assert_eq!(store.alert_days(), DEFAULT_ALERT_DAYS);
    }

    #[test]
    fn snapshot_events_rebuild_identical_state() {
        let mut store = Store::default();
        let client = sample_client();
        store.apply(&Event::ClientCreated { row: client.clone() });
        let appt = sample_appointment(Some(client.id));
        store.apply(&Event::AppointmentBooked { row: appt.clone() });
        store.apply(&Event::AppointmentCompleted { id: appt.id, paid: 5_000, method: PayMethod::Cash });
        store.apply(&Event::SettingChanged { key: "theme".into(), value: "dark".into() });

        let mut rebuilt = Store::default();
        for event in store.snapshot_events() {
            rebuilt.apply(&event);
        }
        assert_eq!(rebuilt.clients, store.clients);
        assert_eq!(rebuilt.appointments, store.appointments);
        assert_eq!(rebuilt.settings, store.settings);
    }
}
