use sqlparser::ast::{
    self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value,
    ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::*;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertClient {
        row: Client,
    },
    UpdateClient {
        id: Ulid,
        patch: ClientPatch,
    },
    DeleteClient {
        id: Ulid,
    },
    InsertService {
        row: Service,
    },
    UpdateService {
        id: Ulid,
        patch: ServicePatch,
    },
    DeleteService {
        id: Ulid,
    },
    InsertAppointment {
        id: Ulid,
        client_id: Option<Ulid>,
        client_name: String,
        start: Ms,
        end: Ms,
        services: Vec<ServiceItem>,
        advance: Money,
        notes: Option<String>,
    },
    UpdateAppointment {
        id: Ulid,
        patch: AppointmentPatch,
    },
    InsertExpense {
        id: Ulid,
        day: Ms,
        description: String,
        amount: Money,
        recurring: bool,
    },
    UpdateExpense {
        id: Ulid,
        patch: ExpensePatch,
    },
    DeleteExpense {
        id: Ulid,
    },
    InsertTransfer {
        id: Ulid,
        day: Ms,
        amount: Money,
    },
    UpsertSetting {
        key: String,
        value: String,
    },
    SelectClients,
    SelectServices,
    SelectAppointments {
        from: Ms,
        to: Ms,
    },
    SelectExpenses,
    SelectTransfers,
    SelectSettings,
    SelectSlots {
        day: Ms,
        step_min: Option<i64>,
        work_start_min: Option<i64>,
        work_end_min: Option<i64>,
        exclude: Option<Ulid>,
    },
    SelectForecast {
        horizon_days: Option<i64>,
        threshold_days: Option<i64>,
    },
    SelectAlerts {
        threshold_days: Option<i64>,
    },
    SelectOverdue,
    SelectLedger {
        from: Ms,
        to: Ms,
    },
    SelectBalances,
    SelectSummary {
        from: Ms,
        to: Ms,
    },
    SelectRevenue {
        from: Ms,
        to: Ms,
    },
    SelectTopServices {
        from: Ms,
        to: Ms,
    },
    Listen {
        channel: String,
    },
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let trimmed = sql.trim();
    if trimmed.to_uppercase().starts_with("LISTEN ") {
        let channel = trimmed[7..].trim().trim_matches(';').to_string();
        return Ok(Command::Listen { channel });
    }

    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(table, assignments, selection),
        Statement::Delete(delete) => parse_delete(delete),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

// ── INSERT ────────────────────────────────────────────────────

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let values = extract_insert_values(insert)?;

    match table.as_str() {
        "clients" => {
            if values.len() < 2 {
                return Err(SqlError::WrongArity("clients", 2, values.len()));
            }
            Ok(Command::InsertClient {
                row: Client {
                    id: parse_ulid(&values[0])?,
                    name: parse_string(&values[1])?,
                    phone: opt(&values, 2).map(parse_string_or_null).transpose()?.flatten(),
                    email: opt(&values, 3).map(parse_string_or_null).transpose()?.flatten(),
                    notes: opt(&values, 4).map(parse_string_or_null).transpose()?.flatten(),
                    alerts_enabled: opt(&values, 5).map(parse_bool).transpose()?.unwrap_or(true),
                },
            })
        }
        "services" => {
            if values.len() < 4 {
                return Err(SqlError::WrongArity("services", 4, values.len()));
            }
            Ok(Command::InsertService {
                row: Service {
                    id: parse_ulid(&values[0])?,
                    name: parse_string(&values[1])?,
                    price: parse_i64(&values[2])?,
                    duration_min: parse_i64(&values[3])?,
                    description: opt(&values, 4).map(parse_string_or_null).transpose()?.flatten(),
                    recurrence_days: opt(&values, 5).map(parse_i64_or_null).transpose()?.flatten(),
                },
            })
        }
        "appointments" => {
            if values.len() < 6 {
                return Err(SqlError::WrongArity("appointments", 6, values.len()));
            }
            Ok(Command::InsertAppointment {
                id: parse_ulid(&values[0])?,
                client_id: parse_ulid_or_null(&values[1])?,
                client_name: parse_string(&values[2])?,
                start: parse_i64(&values[3])?,
                end: parse_i64(&values[4])?,
                services: parse_services(&values[5])?,
                advance: opt(&values, 6).map(parse_i64).transpose()?.unwrap_or(0),
                notes: opt(&values, 7).map(parse_string_or_null).transpose()?.flatten(),
            })
        }
        "expenses" => {
            if values.len() < 4 {
                return Err(SqlError::WrongArity("expenses", 4, values.len()));
            }
            Ok(Command::InsertExpense {
                id: parse_ulid(&values[0])?,
                day: parse_i64(&values[1])?,
                description: parse_string(&values[2])?,
                amount: parse_i64(&values[3])?,
                recurring: opt(&values, 4).map(parse_bool).transpose()?.unwrap_or(false),
            })
        }
        "transfers" => {
            if values.len() < 3 {
                return Err(SqlError::WrongArity("transfers", 3, values.len()));
            }
            Ok(Command::InsertTransfer {
                id: parse_ulid(&values[0])?,
                day: parse_i64(&values[1])?,
                amount: parse_i64(&values[2])?,
            })
        }
        "settings" => {
            if values.len() < 2 {
                return Err(SqlError::WrongArity("settings", 2, values.len()));
            }
            Ok(Command::UpsertSetting {
                key: parse_string(&values[0])?,
                value: parse_string(&values[1])?,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── UPDATE ────────────────────────────────────────────────────

fn parse_update(
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let table = table_factor_name(&table.relation)?;

    match table.as_str() {
        "clients" => {
            let id = extract_where_id(selection)?;
            let mut patch = ClientPatch::default();
            for (col, value) in assignment_pairs(assignments)? {
                match col.as_str() {
                    "name" => patch.name = Some(parse_string(value)?),
                    "phone" => patch.phone = Some(parse_string(value)?),
                    "email" => patch.email = Some(parse_string(value)?),
                    "notes" => patch.notes = Some(parse_string(value)?),
                    "alerts_enabled" => patch.alerts_enabled = Some(parse_bool(value)?),
                    _ => return Err(SqlError::UnknownColumn(col)),
                }
            }
            Ok(Command::UpdateClient { id, patch })
        }
        "services" => {
            let id = extract_where_id(selection)?;
            let mut patch = ServicePatch::default();
            for (col, value) in assignment_pairs(assignments)? {
                match col.as_str() {
                    "name" => patch.name = Some(parse_string(value)?),
                    "price" => patch.price = Some(parse_i64(value)?),
                    "duration_min" => patch.duration_min = Some(parse_i64(value)?),
                    "description" => patch.description = Some(parse_string(value)?),
                    "recurrence_days" => patch.recurrence_days = Some(parse_i64_or_null(value)?),
                    _ => return Err(SqlError::UnknownColumn(col)),
                }
            }
            Ok(Command::UpdateService { id, patch })
        }
        "appointments" => {
            let id = extract_where_id(selection)?;
            let mut patch = AppointmentPatch::default();
            for (col, value) in assignment_pairs(assignments)? {
                match col.as_str() {
                    "client_id" => patch.client_id = Some(parse_ulid(value)?),
                    "client_name" => patch.client_name = Some(parse_string(value)?),
                    "start" => patch.start = Some(parse_i64(value)?),
                    "end" => patch.end = Some(parse_i64(value)?),
                    "services" => patch.services = Some(parse_services(value)?),
                    "advance" => patch.advance = Some(parse_i64(value)?),
                    "notes" => patch.notes = Some(parse_string(value)?),
                    "status" => patch.status = Some(parse_status(value)?),
                    "paid" => patch.paid = Some(parse_i64(value)?),
                    "payment_method" => patch.payment_method = Some(parse_method(value)?),
                    "advance_confirmed" => patch.advance_confirmed = Some(parse_bool(value)?),
                    "advance_method" => patch.advance_method = Some(parse_method(value)?),
                    _ => return Err(SqlError::UnknownColumn(col)),
                }
            }
            Ok(Command::UpdateAppointment { id, patch })
        }
        "expenses" => {
            let id = extract_where_id(selection)?;
            let mut patch = ExpensePatch::default();
            for (col, value) in assignment_pairs(assignments)? {
                match col.as_str() {
                    "day" => patch.day = Some(parse_i64(value)?),
                    "description" => patch.description = Some(parse_string(value)?),
                    "amount" => patch.amount = Some(parse_i64(value)?),
                    "recurring" => patch.recurring = Some(parse_bool(value)?),
                    "paid" => patch.paid = Some(parse_bool(value)?),
                    "method" => patch.method = Some(parse_method(value)?),
                    _ => return Err(SqlError::UnknownColumn(col)),
                }
            }
            Ok(Command::UpdateExpense { id, patch })
        }
        "settings" => {
            let key = extract_where_key(selection)?;
            let mut value = None;
            for (col, expr) in assignment_pairs(assignments)? {
                match col.as_str() {
                    "value" => value = Some(parse_string(expr)?),
                    _ => return Err(SqlError::UnknownColumn(col)),
                }
            }
            let value = value.ok_or(SqlError::MissingFilter("value"))?;
            Ok(Command::UpsertSetting { key, value })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── DELETE ────────────────────────────────────────────────────

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = delete_table_name(delete)?;
    let id = extract_where_id(&delete.selection)?;

    match table.as_str() {
        "clients" => Ok(Command::DeleteClient { id }),
        "services" => Ok(Command::DeleteService { id }),
        "expenses" => Ok(Command::DeleteExpense { id }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── SELECT ────────────────────────────────────────────────────

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    let mut filters = Filters::default();
    if let Some(selection) = &select.selection {
        collect_filters(selection, &mut filters);
    }

    match table.as_str() {
        "clients" => Ok(Command::SelectClients),
        "services" => Ok(Command::SelectServices),
        "expenses" => Ok(Command::SelectExpenses),
        "transfers" => Ok(Command::SelectTransfers),
        "settings" => Ok(Command::SelectSettings),
        "balances" => Ok(Command::SelectBalances),
        "overdue" => Ok(Command::SelectOverdue),
        "appointments" => Ok(Command::SelectAppointments {
            from: filters.require_gte("start")?,
            to: filters.require_lte("start")?,
        }),
        "slots" => Ok(Command::SelectSlots {
            day: filters.eq("day").map(parse_i64).transpose()?.ok_or(SqlError::MissingFilter("day"))?,
            step_min: filters.eq("step").map(parse_i64).transpose()?,
            work_start_min: filters.eq("work_start").map(parse_i64).transpose()?,
            work_end_min: filters.eq("work_end").map(parse_i64).transpose()?,
            exclude: filters.eq("exclude").map(parse_ulid).transpose()?,
        }),
        "forecast" => Ok(Command::SelectForecast {
            horizon_days: filters.eq("horizon").map(parse_i64).transpose()?,
            threshold_days: filters.eq("threshold").map(parse_i64).transpose()?,
        }),
        "alerts" => Ok(Command::SelectAlerts {
            threshold_days: filters.eq("threshold").map(parse_i64).transpose()?,
        }),
        "ledger" => Ok(Command::SelectLedger {
            from: filters.require_gte("at")?,
            to: filters.require_lte("at")?,
        }),
        "summary" => Ok(Command::SelectSummary {
            from: filters.require_gte("at")?,
            to: filters.require_lte("at")?,
        }),
        "revenue" => Ok(Command::SelectRevenue {
            from: filters.require_gte("day")?,
            to: filters.require_lte("day")?,
        }),
        "top_services" => Ok(Command::SelectTopServices {
            from: filters.require_gte("day")?,
            to: filters.require_lte("day")?,
        }),
        _ => Err(SqlError::UnknownTable(table)),
    }
}

/// Conjunctive `col <op> value` filters from a WHERE clause. Anything
/// outside AND-of-comparisons is ignored, matching the row surface's
/// deliberately narrow dialect.
#[derive(Default)]
struct Filters<'a> {
    eqs: Vec<(String, &'a Expr)>,
    gtes: Vec<(String, &'a Expr)>,
    ltes: Vec<(String, &'a Expr)>,
}

impl<'a> Filters<'a> {
    fn eq(&self, col: &str) -> Option<&'a Expr> {
        self.eqs.iter().find(|(c, _)| c == col).map(|(_, e)| *e)
    }

    fn require_gte(&self, col: &'static str) -> Result<i64, SqlError> {
        self.gtes
            .iter()
            .find(|(c, _)| c == col)
            .map(|(_, e)| parse_i64(e))
            .transpose()?
            .ok_or(SqlError::MissingFilter(col))
    }

    fn require_lte(&self, col: &'static str) -> Result<i64, SqlError> {
        self.ltes
            .iter()
            .find(|(c, _)| c == col)
            .map(|(_, e)| parse_i64(e))
            .transpose()?
            .ok_or(SqlError::MissingFilter(col))
    }
}

fn collect_filters<'a>(expr: &'a Expr, filters: &mut Filters<'a>) {
    if let Expr::BinaryOp { left, op, right } = expr {
        match op {
            ast::BinaryOperator::And => {
                collect_filters(left, filters);
                collect_filters(right, filters);
            }
            ast::BinaryOperator::Eq => {
                if let Some(col) = expr_column_name(left) {
                    filters.eqs.push((col, right));
                }
            }
            ast::BinaryOperator::GtEq => {
                if let Some(col) = expr_column_name(left) {
                    filters.gtes.push((col, right));
                }
            }
            ast::BinaryOperator::LtEq => {
                if let Some(col) = expr_column_name(left) {
                    filters.ltes.push((col, right));
                }
            }
            _ => {}
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    if let Some(first) = tables_with_joins.first() {
        table_factor_name(&first.relation)
    } else {
        Err(SqlError::Parse("DELETE without table".into()))
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => {
            if values.rows.len() != 1 {
                return Err(SqlError::Parse("expected exactly one VALUES row".into()));
            }
            Ok(values.rows[0].clone())
        }
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn assignment_pairs(assignments: &[ast::Assignment]) -> Result<Vec<(String, &Expr)>, SqlError> {
    if assignments.is_empty() {
        return Err(SqlError::Parse("UPDATE without SET".into()));
    }
    assignments
        .iter()
        .map(|a| match &a.target {
            ast::AssignmentTarget::ColumnName(name) => object_name_last(name)
                .map(|col| (col, &a.value))
                .ok_or_else(|| SqlError::Parse("empty column name".into())),
            _ => Err(SqlError::Parse("unsupported assignment target".into())),
        })
        .collect()
}

fn extract_where_id(selection: &Option<Expr>) -> Result<Ulid, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("id"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => {
            if expr_column_name(left).as_deref() == Some("id") {
                parse_ulid(right)
            } else {
                Err(SqlError::MissingFilter("id"))
            }
        }
        _ => Err(SqlError::MissingFilter("id")),
    }
}

fn extract_where_key(selection: &Option<Expr>) -> Result<String, SqlError> {
    let sel = selection.as_ref().ok_or(SqlError::MissingFilter("key"))?;
    match sel {
        Expr::BinaryOp {
            left,
            op: ast::BinaryOperator::Eq,
            right,
        } => {
            if expr_column_name(left).as_deref() == Some("key") {
                parse_string(right)
            } else {
                Err(SqlError::MissingFilter("key"))
            }
        }
        _ => Err(SqlError::MissingFilter("key")),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn opt<'a>(values: &'a [Expr], idx: usize) -> Option<&'a Expr> {
    values.get(idx)
}

fn parse_ulid(expr: &Expr) -> Result<Ulid, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) | Value::Number(s, _) => {
                Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID: {e}")))
            }
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_ulid_or_null(expr: &Expr) -> Result<Option<Ulid>, SqlError> {
    if let Some(Value::Null) = extract_value(expr) {
        return Ok(None);
    }
    parse_ulid(expr).map(Some)
}

fn parse_i64(expr: &Expr) -> Result<i64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) | Value::SingleQuotedString(s) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad i64: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_i64(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_i64_or_null(expr: &Expr) -> Result<Option<i64>, SqlError> {
    if let Some(Value::Null) = extract_value(expr) {
        return Ok(None);
    }
    parse_i64(expr).map(Some)
}

fn parse_string(expr: &Expr) -> Result<String, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) => Ok(s.clone()),
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_string_or_null(expr: &Expr) -> Result<Option<String>, SqlError> {
    if let Some(Value::Null) = extract_value(expr) {
        return Ok(None);
    }
    parse_string(expr).map(Some)
}

fn parse_bool(expr: &Expr) -> Result<bool, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::SingleQuotedString(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "1" => Ok(true),
                "false" | "f" | "0" => Ok(false),
                _ => Err(SqlError::Parse(format!("bad bool: {s}"))),
            },
            Value::Number(n, _) => Ok(n != "0"),
            _ => Err(SqlError::Parse(format!("expected bool, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

/// The `services` column carries the appointment's snapshot as a JSON array
/// of `{id, name, price, duration_min}` objects.
fn parse_services(expr: &Expr) -> Result<Vec<ServiceItem>, SqlError> {
    let raw = parse_string(expr)?;
    serde_json::from_str(&raw).map_err(|e| SqlError::Parse(format!("bad services JSON: {e}")))
}

fn parse_method(expr: &Expr) -> Result<PayMethod, SqlError> {
    let raw = parse_string(expr)?;
    PayMethod::parse(&raw).ok_or_else(|| SqlError::Parse(format!("bad payment method: {raw}")))
}

fn parse_status(expr: &Expr) -> Result<AppointmentStatus, SqlError> {
    let raw = parse_string(expr)?;
    AppointmentStatus::parse(&raw).ok_or_else(|| SqlError::Parse(format!("bad status: {raw}")))
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    UnknownColumn(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::UnknownColumn(c) => write!(f, "unknown column: {c}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "01ARZ3NDEKTSV4RRFFQ69G5FAV";

    #[test]
    fn parse_insert_client_minimal() {
        let cmd = parse_sql(&format!("INSERT INTO clients (id, name) VALUES ('{ID}', 'Ana')")).unwrap();
        match cmd {
            Command::InsertClient { row } => {
                assert_eq!(row.id.to_string(), ID);
                assert_eq!(row.name, "Ana");
                assert_eq!(row.phone, None);
                assert!(row.alerts_enabled); // defaults on
            }
            _ => panic!("expected InsertClient, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_client_full() {
        let sql = format!(
            "INSERT INTO clients (id, name, phone, email, notes, alerts_enabled) \
             VALUES ('{ID}', 'Ana', '11 99999-0000', NULL, 'VIP', false)"
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::InsertClient { row } => {
                assert_eq!(row.phone.as_deref(), Some("11 99999-0000"));
                assert_eq!(row.email, None);
                assert_eq!(row.notes.as_deref(), Some("VIP"));
                assert!(!row.alerts_enabled);
            }
            _ => panic!("expected InsertClient, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_service_with_recurrence() {
        let sql = format!(
            "INSERT INTO services (id, name, price, duration_min, description, recurrence_days) \
             VALUES ('{ID}', 'Progressiva', 18000, 120, NULL, 90)"
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::InsertService { row } => {
                assert_eq!(row.price, 18000);
                assert_eq!(row.duration_min, 120);
                assert_eq!(row.recurrence_days, Some(90));
            }
            _ => panic!("expected InsertService, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_appointment_with_snapshot() {
        let services = format!(
            r#"[{{"id":"{ID}","name":"Corte","price":6000,"duration_min":45}}]"#
        );
        let sql = format!(
            r#"INSERT INTO appointments (id, client_id, client_name, start, "end", services, advance, notes)
               VALUES ('{ID}', NULL, 'Ana', 1700000000000, 1700002700000, '{services}', 2000, 'first visit')"#
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::InsertAppointment {
                client_id,
                client_name,
                start,
                end,
                services,
                advance,
                notes,
                ..
            } => {
                assert_eq!(client_id, None);
                assert_eq!(client_name, "Ana");
                assert_eq!(start, 1_700_000_000_000);
                assert_eq!(end, 1_700_002_700_000);
                assert_eq!(services.len(), 1);
                assert_eq!(services[0].name, "Corte");
                assert_eq!(services[0].price, 6000);
                assert_eq!(advance, 2000);
                assert_eq!(notes.as_deref(), Some("first visit"));
            }
            _ => panic!("expected InsertAppointment, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_appointment_bad_snapshot_errors() {
        let sql = format!(
            r#"INSERT INTO appointments (id, client_id, client_name, start, "end", services)
               VALUES ('{ID}', NULL, 'Ana', 1, 2, 'not json')"#
        );
        assert!(matches!(parse_sql(&sql), Err(SqlError::Parse(_))));
    }

    #[test]
    fn parse_insert_expense_defaults_non_recurring() {
        let sql = format!(
            "INSERT INTO expenses (id, day, description, amount) VALUES ('{ID}', 1700000000000, 'Aluguel', 150000)"
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::InsertExpense { recurring, amount, .. } => {
                assert!(!recurring);
                assert_eq!(amount, 150000);
            }
            _ => panic!("expected InsertExpense, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_transfer() {
        let sql = format!("INSERT INTO transfers (id, day, amount) VALUES ('{ID}', 1700000000000, 40000)");
        assert!(matches!(parse_sql(&sql).unwrap(), Command::InsertTransfer { amount: 40000, .. }));
    }

    #[test]
    fn parse_insert_setting_upserts() {
        let cmd = parse_sql("INSERT INTO settings (key, value) VALUES ('alert_days', '10')").unwrap();
        assert_eq!(
            cmd,
            Command::UpsertSetting { key: "alert_days".into(), value: "10".into() }
        );
    }

    #[test]
    fn parse_update_client_patch() {
        let sql = format!("UPDATE clients SET name = 'Bia', alerts_enabled = true WHERE id = '{ID}'");
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::UpdateClient { id, patch } => {
                assert_eq!(id.to_string(), ID);
                assert_eq!(patch.name.as_deref(), Some("Bia"));
                assert_eq!(patch.alerts_enabled, Some(true));
                assert_eq!(patch.phone, None);
            }
            _ => panic!("expected UpdateClient, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_service_clears_recurrence_with_null() {
        let sql = format!("UPDATE services SET recurrence_days = NULL WHERE id = '{ID}'");
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::UpdateService { patch, .. } => {
                assert_eq!(patch.recurrence_days, Some(None));
            }
            _ => panic!("expected UpdateService, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_appointment_checkout() {
        let sql = format!(
            "UPDATE appointments SET status = 'completed', paid = 9000, payment_method = 'pix' WHERE id = '{ID}'"
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::UpdateAppointment { patch, .. } => {
                assert_eq!(patch.status, Some(AppointmentStatus::Completed));
                assert_eq!(patch.paid, Some(9000));
                assert_eq!(patch.payment_method, Some(PayMethod::Pix));
                assert!(!patch.is_revision());
            }
            _ => panic!("expected UpdateAppointment, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_appointment_advance_confirmation() {
        let sql = format!(
            "UPDATE appointments SET advance_confirmed = true, advance_method = 'cash' WHERE id = '{ID}'"
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::UpdateAppointment { patch, .. } => {
                assert_eq!(patch.advance_confirmed, Some(true));
                assert_eq!(patch.advance_method, Some(PayMethod::Cash));
            }
            _ => panic!("expected UpdateAppointment, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_appointment_reschedule() {
        let sql = format!(r#"UPDATE appointments SET start = 100, "end" = 200 WHERE id = '{ID}'"#);
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::UpdateAppointment { patch, .. } => {
                assert_eq!(patch.start, Some(100));
                assert_eq!(patch.end, Some(200));
                assert!(patch.is_revision());
            }
            _ => panic!("expected UpdateAppointment, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_expense_pay() {
        let sql = format!("UPDATE expenses SET paid = true, method = 'debit' WHERE id = '{ID}'");
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::UpdateExpense { patch, .. } => {
                assert_eq!(patch.paid, Some(true));
                assert_eq!(patch.method, Some(PayMethod::Debit));
            }
            _ => panic!("expected UpdateExpense, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_setting_by_key() {
        let cmd = parse_sql("UPDATE settings SET value = '14' WHERE key = 'alert_days'").unwrap();
        assert_eq!(
            cmd,
            Command::UpsertSetting { key: "alert_days".into(), value: "14".into() }
        );
    }

    #[test]
    fn parse_update_unknown_column_errors() {
        let sql = format!("UPDATE clients SET hair = 'red' WHERE id = '{ID}'");
        assert!(matches!(parse_sql(&sql), Err(SqlError::UnknownColumn(_))));
    }

    #[test]
    fn parse_update_without_where_errors() {
        assert!(matches!(
            parse_sql("UPDATE clients SET name = 'Bia'"),
            Err(SqlError::MissingFilter("id"))
        ));
    }

    #[test]
    fn parse_delete_commands() {
        let del = |table: &str| parse_sql(&format!("DELETE FROM {table} WHERE id = '{ID}'"));
        assert!(matches!(del("clients").unwrap(), Command::DeleteClient { .. }));
        assert!(matches!(del("services").unwrap(), Command::DeleteService { .. }));
        assert!(matches!(del("expenses").unwrap(), Command::DeleteExpense { .. }));
        // Appointments are cancelled, never deleted
        assert!(matches!(del("appointments"), Err(SqlError::UnknownTable(_))));
    }

    #[test]
    fn parse_select_appointments_requires_window() {
        let cmd = parse_sql("SELECT * FROM appointments WHERE start >= 100 AND start <= 200").unwrap();
        assert_eq!(cmd, Command::SelectAppointments { from: 100, to: 200 });
        assert!(matches!(
            parse_sql("SELECT * FROM appointments"),
            Err(SqlError::MissingFilter("start"))
        ));
    }

    #[test]
    fn parse_select_slots() {
        let sql = format!(
            "SELECT * FROM slots WHERE day = 1700000000000 AND step = 15 AND exclude = '{ID}'"
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::SelectSlots { day, step_min, work_start_min, exclude, .. } => {
                assert_eq!(day, 1_700_000_000_000);
                assert_eq!(step_min, Some(15));
                assert_eq!(work_start_min, None);
                assert_eq!(exclude.map(|u| u.to_string()), Some(ID.to_string()));
            }
            _ => panic!("expected SelectSlots, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_forecast_variants() {
        assert_eq!(
            parse_sql("SELECT * FROM forecast").unwrap(),
            Command::SelectForecast { horizon_days: None, threshold_days: None }
        );
        assert_eq!(
            parse_sql("SELECT * FROM forecast WHERE horizon = 60 AND threshold = 3").unwrap(),
            Command::SelectForecast { horizon_days: Some(60), threshold_days: Some(3) }
        );
        assert_eq!(
            parse_sql("SELECT * FROM alerts WHERE threshold = 2").unwrap(),
            Command::SelectAlerts { threshold_days: Some(2) }
        );
        assert_eq!(parse_sql("SELECT * FROM overdue").unwrap(), Command::SelectOverdue);
    }

    #[test]
    fn parse_select_cash_views() {
        assert_eq!(parse_sql("SELECT * FROM balances").unwrap(), Command::SelectBalances);
        assert_eq!(
            parse_sql("SELECT * FROM ledger WHERE at >= 1 AND at <= 9").unwrap(),
            Command::SelectLedger { from: 1, to: 9 }
        );
        assert_eq!(
            parse_sql("SELECT * FROM summary WHERE at >= 1 AND at <= 9").unwrap(),
            Command::SelectSummary { from: 1, to: 9 }
        );
        assert_eq!(
            parse_sql("SELECT * FROM revenue WHERE day >= 1 AND day <= 9").unwrap(),
            Command::SelectRevenue { from: 1, to: 9 }
        );
        assert_eq!(
            parse_sql("SELECT * FROM top_services WHERE day >= 1 AND day <= 9").unwrap(),
            Command::SelectTopServices { from: 1, to: 9 }
        );
    }

    #[test]
    fn parse_plain_selects() {
        assert_eq!(parse_sql("SELECT * FROM clients").unwrap(), Command::SelectClients);
        assert_eq!(parse_sql("SELECT * FROM services").unwrap(), Command::SelectServices);
        assert_eq!(parse_sql("SELECT * FROM expenses").unwrap(), Command::SelectExpenses);
        assert_eq!(parse_sql("SELECT * FROM transfers").unwrap(), Command::SelectTransfers);
        assert_eq!(parse_sql("SELECT * FROM settings").unwrap(), Command::SelectSettings);
    }

    #[test]
    fn parse_listen() {
        let cmd = parse_sql("LISTEN appointments").unwrap();
        assert_eq!(cmd, Command::Listen { channel: "appointments".into() });
    }

    #[test]
    fn parse_unknown_table_errors() {
        assert!(matches!(
            parse_sql(&format!("INSERT INTO holds (id) VALUES ('{ID}')")),
            Err(SqlError::UnknownTable(_))
        ));
        assert!(matches!(
            parse_sql("SELECT * FROM availability"),
            Err(SqlError::UnknownTable(_))
        ));
    }

    #[test]
    fn parse_multi_row_insert_rejected() {
        let sql = format!(
            "INSERT INTO transfers (id, day, amount) VALUES ('{ID}', 1, 2), ('{ID}', 3, 4)"
        );
        assert!(matches!(parse_sql(&sql), Err(SqlError::Parse(_))));
    }

    #[test]
    fn parse_empty_errors() {
        assert!(matches!(parse_sql(""), Err(SqlError::Empty)));
    }

    #[test]
    fn parse_negative_number() {
        let cmd = parse_sql("SELECT * FROM appointments WHERE start >= -100 AND start <= 200").unwrap();
        assert_eq!(cmd, Command::SelectAppointments { from: -100, to: 200 });
    }
}
