use std::collections::BTreeMap;

use crate::model::*;

/// Derive the full cash-flow journal from the source collections.
///
/// A completed appointment with a final payment earns income at its end
/// time; a confirmed advance earns income at booking time; a paid expense
/// spends at its day; a transfer moves drawer money to the account. Order
/// follows the source collections — callers window and sort via
/// `statement`.
pub fn entries(
    appointments: &[Appointment],
    expenses: &[Expense],
    transfers: &[Transfer],
) -> Vec<LedgerEntry> {
    let mut out = Vec::new();

    for appt in appointments {
        if appt.status == AppointmentStatus::Completed
            && let Some(paid) = appt.paid {
                out.push(LedgerEntry {
                    key: format!("appt-final-{}", appt.id),
                    at: appt.span.end,
                    description: format!("Service: {}", appt.client_name),
                    amount: paid,
                    kind: EntryKind::Income,
                    method: appt.payment_method,
                });
            }
        if appt.advance_confirmed && appt.advance > 0 {
            out.push(LedgerEntry {
                key: format!("appt-advance-{}", appt.id),
                at: appt.booked_at,
                description: format!("Advance: {}", appt.client_name),
                amount: appt.advance,
                kind: EntryKind::Income,
                method: appt.advance_method,
            });
        }
    }

    for expense in expenses.iter().filter(|e| e.paid) {
        out.push(LedgerEntry {
            key: format!("expense-{}", expense.id),
            at: expense.day,
            description: expense.description.clone(),
            amount: expense.amount,
            kind: EntryKind::Outflow,
            method: expense.method,
        });
    }

    for transfer in transfers {
        out.push(LedgerEntry {
            key: format!("transfer-{}", transfer.id),
            at: transfer.day,
            description: "Transfer to account".into(),
            amount: transfer.amount,
            kind: EntryKind::Transfer,
            method: None,
        });
    }

    out
}

/// Fold all-time entries into running balances. Cash-method money moves the
/// drawer, everything else (including method-less entries) the account; a
/// transfer moves drawer → account. Confirmed advances on still-scheduled
/// appointments are earmarked and excluded from `available`.
pub fn balances(entries: &[LedgerEntry], appointments: &[Appointment]) -> Balances {
    let mut account: Money = 0;
    let mut drawer: Money = 0;

    for entry in entries {
        let cash = entry.method.is_some_and(PayMethod::is_cash);
        match entry.kind {
            EntryKind::Income => {
                if cash {
                    drawer += entry.amount;
                } else {
                    account += entry.amount;
                }
            }
            EntryKind::Outflow => {
                if cash {
                    drawer -= entry.amount;
                } else {
                    account -= entry.amount;
                }
            }
            EntryKind::Transfer => {
                drawer -= entry.amount;
                account += entry.amount;
            }
        }
    }

    let pending_advances: Money = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Scheduled && a.advance_confirmed)
        .map(|a| a.advance)
        .sum();

    let total = account + drawer;
    Balances {
        account,
        drawer,
        total,
        pending_advances,
        available: total - pending_advances,
    }
}

/// Entries within `[from, to]`, newest first.
pub fn statement(entries: &[LedgerEntry], from: Ms, to: Ms) -> Vec<LedgerEntry> {
    let mut windowed: Vec<LedgerEntry> = entries
        .iter()
        .filter(|e| e.at >= from && e.at <= to)
        .cloned()
        .collect();
    windowed.sort_by(|a, b| b.at.cmp(&a.at).then_with(|| a.key.cmp(&b.key)));
    windowed
}

/// Income, outflow, and net over a set of entries. Transfers are internal
/// movements and touch neither side.
pub fn summarize(entries: &[LedgerEntry]) -> CashSummary {
    let mut income: Money = 0;
    let mut outflow: Money = 0;
    for entry in entries {
        match entry.kind {
            EntryKind::Income => income += entry.amount,
            EntryKind::Outflow => outflow += entry.amount,
            EntryKind::Transfer => {}
        }
    }
    CashSummary { income, outflow, net: income - outflow }
}

/// Per-day realized (completed, final payments) vs projected (scheduled,
/// derived totals) revenue over `[from, to]`, bucketed by appointment start.
pub fn daily_revenue(appointments: &[Appointment], from: Ms, to: Ms) -> Vec<DailyRevenue> {
    let first = day_start(from);
    let last = day_start(to);
    let mut days: BTreeMap<Ms, (Money, Money)> = BTreeMap::new();
    let mut day = first;
    while day <= last {
        days.insert(day, (0, 0));
        day += DAY_MS;
    }

    for appt in appointments {
        let Some(bucket) = days.get_mut(&day_start(appt.span.start)) else { continue };
        match appt.status {
            AppointmentStatus::Completed => bucket.0 += appt.paid.unwrap_or(0),
            AppointmentStatus::Scheduled => bucket.1 += appt.total(),
            AppointmentStatus::Cancelled => {}
        }
    }

    days.into_iter()
        .map(|(day, (realized, projected))| DailyRevenue { day, realized, projected })
        .collect()
}

/// Completed-appointment service counts over `[from, to]`, most popular
/// first (name breaks ties).
pub fn top_services(appointments: &[Appointment], from: Ms, to: Ms) -> Vec<ServiceCount> {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for appt in appointments.iter().filter(|a| {
        a.status == AppointmentStatus::Completed && a.span.start >= from && a.span.start <= to
    }) {
        for item in &appt.services {
            *counts.entry(item.name.as_str()).or_default() += 1;
        }
    }
    let mut out: Vec<ServiceCount> = counts
        .into_iter()
        .map(|(name, completed)| ServiceCount { name: name.to_string(), completed })
        .collect();
    out.sort_by(|a, b| b.completed.cmp(&a.completed).then_with(|| a.name.cmp(&b.name)));
    out
}
