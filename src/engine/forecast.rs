use std::collections::BTreeMap;

use crate::model::*;

/// Project client returns from recurring-service history.
///
/// For every (client, recurring service) pair, the most recent *completed*
/// appointment whose snapshot contains the service predicts a return at
/// `last visit + interval`, day granularity. Overdue pairs aggregate into a
/// count and a revenue figure; pairs due inside the horizon bucket into a
/// per-day series; clients with alerts enabled whose soonest pair is within
/// `alert_threshold_days` (overdue included) land in the alert set.
///
/// Revenue uses the service's current catalog price, not the price paid.
/// Empty input collections produce a zero-valued result with an empty
/// series, never an error.
pub fn compute_forecast(
    clients: &[Client],
    services: &[Service],
    appointments: &[Appointment],
    today: Ms,
    alert_threshold_days: i64,
    horizon_days: i64,
) -> Forecast {
    let mut forecast = Forecast::default();
    if clients.is_empty() || services.is_empty() || appointments.is_empty() {
        return forecast;
    }

    let today = day_start(today);
    // One bucket per day of [today, today + horizon]; integer day keys keep
    // the series chronological without any re-sort.
    let mut daily: BTreeMap<Ms, (u32, Money)> =
        (0..=horizon_days).map(|i| (today + i * DAY_MS, (0, 0))).collect();

    let recurring: Vec<&Service> = services
        .iter()
        .filter(|s| s.recurrence_days.is_some_and(|d| d > 0))
        .collect();

    for client in clients {
        let history: Vec<&Appointment> = appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Completed && a.client_id == Some(client.id))
            .collect();
        if history.is_empty() {
            continue;
        }

        let mut needs_alert = false;
        for service in &recurring {
            let Some(interval) = service.recurrence_days else { continue };
            // Only the single most recent visit counts; earlier ones are
            // fully ignored even if they imply a different return date.
            let Some(last) = history
                .iter()
                .filter(|a| a.services.iter().any(|item| item.id == service.id))
                .max_by_key(|a| a.span.start)
            else {
                continue;
            };

            let return_day = day_start(last.span.start) + interval * DAY_MS;
            let days_until = days_between_ceil(today, return_day);

            if days_until < 0 {
                forecast.overdue_count += 1;
                forecast.overdue_revenue += service.price;
            }
            if days_until >= 0 && days_until <= horizon_days
                && let Some(bucket) = daily.get_mut(&return_day) {
                    bucket.0 += 1;
                    bucket.1 += service.price;
                }
            if client.alerts_enabled && days_until <= alert_threshold_days {
                needs_alert = true;
            }
        }
        if needs_alert {
            forecast.alerts.insert(client.id);
        }
    }

    forecast.daily = daily
        .into_iter()
        .map(|(day, (clients_expected, potential_revenue))| DailyForecast {
            day,
            clients_expected,
            potential_revenue,
        })
        .collect();
    forecast
}
