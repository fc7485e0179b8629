use std::fmt::Debug;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::data::DataRow;
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;

use crate::auth::NavalhaAuthSource;
use crate::engine::Engine;
use crate::model::*;
use crate::observability;
use crate::sql::{self, Command};
use crate::tenant::TenantManager;

pub struct NavalhaHandler {
    tenant_manager: Arc<TenantManager>,
    query_parser: Arc<NavalhaQueryParser>,
}

impl NavalhaHandler {
    pub fn new(tenant_manager: Arc<TenantManager>) -> Self {
        Self {
            tenant_manager,
            query_parser: Arc::new(NavalhaQueryParser),
        }
    }

    fn resolve_engine<C: ClientInfo>(&self, client: &C) -> PgWireResult<Arc<Engine>> {
        let db = client
            .metadata()
            .get("database")
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        self.tenant_manager.get_or_create(&db).map_err(|e| {
            PgWireError::UserError(Box::new(ErrorInfo::new(
                "ERROR".into(),
                "08006".into(),
                format!("tenant error: {e}"),
            )))
        })
    }

    async fn run_command(&self, engine: &Engine, cmd: Command) -> PgWireResult<Vec<Response>> {
        let label = observability::command_label(&cmd);
        let started = std::time::Instant::now();
        let result = self.execute_command(engine, cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::QUERIES_TOTAL, "command" => label, "status" => status)
            .increment(1);
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(&self, engine: &Engine, cmd: Command) -> PgWireResult<Vec<Response>> {
        match cmd {
            // ── Mutations ────────────────────────────────────
            Command::InsertClient { row } => {
                engine.create_client(row).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateClient { id, patch } => {
                engine.update_client(id, patch).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::DeleteClient { id } => {
                engine.delete_client(id).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::InsertService { row } => {
                engine.create_service(row).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateService { id, patch } => {
                engine.update_service(id, patch).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::DeleteService { id } => {
                engine.delete_service(id).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::InsertAppointment {
                id,
                client_id,
                client_name,
                start,
                end,
                services,
                advance,
                notes,
            } => {
                engine
                    .book_appointment(id, client_id, client_name, Span { start, end }, services, advance, notes)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateAppointment { id, patch } => {
                engine.update_appointment(id, patch).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::InsertExpense { id, day, description, amount, recurring } => {
                engine
                    .add_expense(id, day, description, amount, recurring)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpdateExpense { id, patch } => {
                engine.update_expense(id, patch).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }
            Command::DeleteExpense { id } => {
                engine.delete_expense(id).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("DELETE").with_rows(1))])
            }
            Command::InsertTransfer { id, day, amount } => {
                engine.record_transfer(id, day, amount).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("INSERT").with_rows(1))])
            }
            Command::UpsertSetting { key, value } => {
                engine.put_setting(key, value).await.map_err(engine_err)?;
                Ok(vec![Response::Execution(Tag::new("UPDATE").with_rows(1))])
            }

            // ── Collections ──────────────────────────────────
            Command::SelectClients => {
                let rows = engine.list_clients().await;
                Ok(vec![query_response(clients_schema(), rows, encode_client)])
            }
            Command::SelectServices => {
                let rows = engine.list_services().await;
                Ok(vec![query_response(services_schema(), rows, encode_service)])
            }
            Command::SelectAppointments { from, to } => {
                let rows = engine.list_appointments(from, to).await.map_err(engine_err)?;
                Ok(vec![query_response(appointments_schema(), rows, encode_appointment)])
            }
            Command::SelectExpenses => {
                let rows = engine.list_expenses().await;
                Ok(vec![query_response(expenses_schema(), rows, encode_expense)])
            }
            Command::SelectTransfers => {
                let rows = engine.list_transfers().await;
                Ok(vec![query_response(transfers_schema(), rows, encode_transfer)])
            }
            Command::SelectSettings => {
                let rows = engine.list_settings().await;
                Ok(vec![query_response(settings_schema(), rows, |enc, s: &Setting| {
                    enc.encode_field(&s.key)?;
                    enc.encode_field(&s.value)
                })])
            }

            // ── Derived views ────────────────────────────────
            Command::SelectSlots { day, step_min, work_start_min, work_end_min, exclude } => {
                let rows = engine
                    .day_slots(day, step_min, work_start_min, work_end_min, exclude)
                    .await
                    .map_err(engine_err)?;
                Ok(vec![query_response(slots_schema(), rows, |enc, s: &Slot| {
                    enc.encode_field(&s.at)?;
                    enc.encode_field(&s.occupied)
                })])
            }
            Command::SelectForecast { horizon_days, threshold_days } => {
                let forecast = engine.forecast(horizon_days, threshold_days).await.map_err(engine_err)?;
                Ok(vec![query_response(forecast_schema(), forecast.daily, |enc, d: &DailyForecast| {
                    enc.encode_field(&d.day)?;
                    enc.encode_field(&(d.clients_expected as i64))?;
                    enc.encode_field(&d.potential_revenue)
                })])
            }
            Command::SelectAlerts { threshold_days } => {
                let forecast = engine.forecast(None, threshold_days).await.map_err(engine_err)?;
                let ids: Vec<String> = forecast.alerts.iter().map(|id| id.to_string()).collect();
                Ok(vec![query_response(alerts_schema(), ids, |enc, id: &String| {
                    enc.encode_field(id)
                })])
            }
            Command::SelectOverdue => {
                let forecast = engine.forecast(None, None).await.map_err(engine_err)?;
                Ok(vec![query_response(
                    overdue_schema(),
                    vec![(forecast.overdue_count as i64, forecast.overdue_revenue)],
                    |enc, row: &(i64, Money)| {
                        enc.encode_field(&row.0)?;
                        enc.encode_field(&row.1)
                    },
                )])
            }
            Command::SelectLedger { from, to } => {
                let rows = engine.ledger(from, to).await.map_err(engine_err)?;
                Ok(vec![query_response(ledger_schema(), rows, |enc, e: &LedgerEntry| {
                    enc.encode_field(&e.key)?;
                    enc.encode_field(&e.at)?;
                    enc.encode_field(&e.description)?;
                    enc.encode_field(&e.amount)?;
                    enc.encode_field(&e.kind.as_str())?;
                    enc.encode_field(&e.method.map(PayMethod::as_str))
                })])
            }
            Command::SelectBalances => {
                let b = engine.balances().await;
                Ok(vec![query_response(balances_schema(), vec![b], |enc, b: &Balances| {
                    enc.encode_field(&b.account)?;
                    enc.encode_field(&b.drawer)?;
                    enc.encode_field(&b.total)?;
                    enc.encode_field(&b.pending_advances)?;
                    enc.encode_field(&b.available)
                })])
            }
            Command::SelectSummary { from, to } => {
                let s = engine.summary(from, to).await.map_err(engine_err)?;
                Ok(vec![query_response(summary_schema(), vec![s], |enc, s: &CashSummary| {
                    enc.encode_field(&s.income)?;
                    enc.encode_field(&s.outflow)?;
                    enc.encode_field(&s.net)
                })])
            }
            Command::SelectRevenue { from, to } => {
                let rows = engine.daily_revenue(from, to).await.map_err(engine_err)?;
                Ok(vec![query_response(revenue_schema(), rows, |enc, r: &DailyRevenue| {
                    enc.encode_field(&r.day)?;
                    enc.encode_field(&r.realized)?;
                    enc.encode_field(&r.projected)
                })])
            }
            Command::SelectTopServices { from, to } => {
                let rows = engine.top_services(from, to).await.map_err(engine_err)?;
                Ok(vec![query_response(top_services_schema(), rows, |enc, r: &ServiceCount| {
                    enc.encode_field(&r.name)?;
                    enc.encode_field(&(r.completed as i64))
                })])
            }

            Command::Listen { channel } => {
                if Collection::parse(&channel).is_none() {
                    return Err(PgWireError::UserError(Box::new(ErrorInfo::new(
                        "ERROR".into(),
                        "42000".into(),
                        format!("unknown channel: {channel} (expected a collection name)"),
                    ))));
                }
                Ok(vec![Response::Execution(Tag::new("LISTEN"))])
            }
        }
    }
}

// ── Row schemas & encoding ───────────────────────────────────────

fn text_field(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::VARCHAR, FieldFormat::Text)
}

fn int_field(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::INT8, FieldFormat::Text)
}

fn bool_field(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::BOOL, FieldFormat::Text)
}

fn clients_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id"),
        text_field("name"),
        text_field("phone"),
        text_field("email"),
        text_field("notes"),
        bool_field("alerts_enabled"),
    ]
}

fn services_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id"),
        text_field("name"),
        int_field("price"),
        int_field("duration_min"),
        text_field("description"),
        int_field("recurrence_days"),
    ]
}

fn appointments_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id"),
        text_field("client_id"),
        text_field("client_name"),
        int_field("start"),
        int_field("end"),
        text_field("services"),
        text_field("status"),
        int_field("advance"),
        bool_field("advance_confirmed"),
        text_field("advance_method"),
        int_field("paid"),
        text_field("payment_method"),
        text_field("notes"),
        int_field("booked_at"),
    ]
}

fn expenses_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id"),
        int_field("day"),
        text_field("description"),
        int_field("amount"),
        bool_field("paid"),
        text_field("method"),
        bool_field("recurring"),
    ]
}

fn transfers_schema() -> Vec<FieldInfo> {
    vec![text_field("id"), int_field("day"), int_field("amount")]
}

fn settings_schema() -> Vec<FieldInfo> {
    vec![text_field("key"), text_field("value")]
}

fn slots_schema() -> Vec<FieldInfo> {
    vec![int_field("at"), bool_field("occupied")]
}

fn forecast_schema() -> Vec<FieldInfo> {
    vec![int_field("day"), int_field("clients_expected"), int_field("potential_revenue")]
}

fn alerts_schema() -> Vec<FieldInfo> {
    vec![text_field("client_id")]
}

fn overdue_schema() -> Vec<FieldInfo> {
    vec![int_field("overdue_count"), int_field("overdue_revenue")]
}

fn ledger_schema() -> Vec<FieldInfo> {
    vec![
        text_field("key"),
        int_field("at"),
        text_field("description"),
        int_field("amount"),
        text_field("kind"),
        text_field("method"),
    ]
}

fn balances_schema() -> Vec<FieldInfo> {
    vec![
        int_field("account"),
        int_field("drawer"),
        int_field("total"),
        int_field("pending_advances"),
        int_field("available"),
    ]
}

fn summary_schema() -> Vec<FieldInfo> {
    vec![int_field("income"), int_field("outflow"), int_field("net")]
}

fn revenue_schema() -> Vec<FieldInfo> {
    vec![int_field("day"), int_field("realized"), int_field("projected")]
}

fn top_services_schema() -> Vec<FieldInfo> {
    vec![text_field("name"), int_field("completed")]
}

fn query_response<T>(
    schema: Vec<FieldInfo>,
    rows: Vec<T>,
    encode: impl Fn(&mut DataRowEncoder, &T) -> PgWireResult<()>,
) -> Response {
    let schema = Arc::new(schema);
    let encoded: Vec<PgWireResult<DataRow>> = rows
        .iter()
        .map(|row| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            encode(&mut encoder, row)?;
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(encoded)))
}

fn encode_client(enc: &mut DataRowEncoder, c: &Client) -> PgWireResult<()> {
    enc.encode_field(&c.id.to_string())?;
    enc.encode_field(&c.name)?;
    enc.encode_field(&c.phone)?;
    enc.encode_field(&c.email)?;
    enc.encode_field(&c.notes)?;
    enc.encode_field(&c.alerts_enabled)
}

fn encode_service(enc: &mut DataRowEncoder, s: &Service) -> PgWireResult<()> {
    enc.encode_field(&s.id.to_string())?;
    enc.encode_field(&s.name)?;
    enc.encode_field(&s.price)?;
    enc.encode_field(&s.duration_min)?;
    enc.encode_field(&s.description)?;
    enc.encode_field(&s.recurrence_days)
}

fn encode_appointment(enc: &mut DataRowEncoder, a: &Appointment) -> PgWireResult<()> {
    let services = serde_json::to_string(&a.services).map_err(|e| {
        PgWireError::ApiError(Box::new(io::Error::new(io::ErrorKind::InvalidData, e)))
    })?;
    enc.encode_field(&a.id.to_string())?;
    enc.encode_field(&a.client_id.map(|id| id.to_string()))?;
    enc.encode_field(&a.client_name)?;
    enc.encode_field(&a.span.start)?;
    enc.encode_field(&a.span.end)?;
    enc.encode_field(&services)?;
    enc.encode_field(&a.status.as_str())?;
    enc.encode_field(&a.advance)?;
    enc.encode_field(&a.advance_confirmed)?;
    enc.encode_field(&a.advance_method.map(PayMethod::as_str))?;
    enc.encode_field(&a.paid)?;
    enc.encode_field(&a.payment_method.map(PayMethod::as_str))?;
    enc.encode_field(&a.notes)?;
    enc.encode_field(&a.booked_at)
}

fn encode_expense(enc: &mut DataRowEncoder, e: &Expense) -> PgWireResult<()> {
    enc.encode_field(&e.id.to_string())?;
    enc.encode_field(&e.day)?;
    enc.encode_field(&e.description)?;
    enc.encode_field(&e.amount)?;
    enc.encode_field(&e.paid)?;
    enc.encode_field(&e.method.map(PayMethod::as_str))?;
    enc.encode_field(&e.recurring)
}

fn encode_transfer(enc: &mut DataRowEncoder, t: &Transfer) -> PgWireResult<()> {
    enc.encode_field(&t.id.to_string())?;
    enc.encode_field(&t.day)?;
    enc.encode_field(&t.amount)
}

/// Result schema for a statement, derived by parsing it as a command.
/// Unparseable statements (e.g. with unbound placeholders) describe as
/// row-less.
fn statement_schema(stmt: &str) -> Vec<FieldInfo> {
    match sql::parse_sql(stmt) {
        Ok(Command::SelectClients) => clients_schema(),
        Ok(Command::SelectServices) => services_schema(),
        Ok(Command::SelectAppointments { .. }) => appointments_schema(),
        Ok(Command::SelectExpenses) => expenses_schema(),
        Ok(Command::SelectTransfers) => transfers_schema(),
        Ok(Command::SelectSettings) => settings_schema(),
        Ok(Command::SelectSlots { .. }) => slots_schema(),
        Ok(Command::SelectForecast { .. }) => forecast_schema(),
        Ok(Command::SelectAlerts { .. }) => alerts_schema(),
        Ok(Command::SelectOverdue) => overdue_schema(),
        Ok(Command::SelectLedger { .. }) => ledger_schema(),
        Ok(Command::SelectBalances) => balances_schema(),
        Ok(Command::SelectSummary { .. }) => summary_schema(),
        Ok(Command::SelectRevenue { .. }) => revenue_schema(),
        Ok(Command::SelectTopServices { .. }) => top_services_schema(),
        _ => vec![],
    }
}

#[async_trait]
impl SimpleQueryHandler for NavalhaHandler {
    async fn do_query<C>(&self, client: &mut C, query: &str) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(client)?;
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        self.run_command(&engine, cmd).await
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct NavalhaQueryParser;

#[async_trait]
impl QueryParser for NavalhaQueryParser {
    type Statement = String;

    async fn parse_sql<C>(&self, _client: &C, sql: &str, _types: &[Option<Type>]) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(statement_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for NavalhaHandler {
    type Statement = String;
    type QueryParser = NavalhaQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let engine = self.resolve_engine(client)?;
        let sql = substitute_params(portal);
        let cmd = sql::parse_sql(&sql).map_err(sql_err)?;
        let mut responses = self.run_command(&engine, cmd).await?;
        Ok(responses.remove(0))
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            statement_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(statement_schema(
            &target.statement.statement,
        )))
    }
}

/// Count the highest $N parameter placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let mut max = 0usize;
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i > start
                && let Ok(n) = sql[start..i].parse::<usize>()
                && n > max {
                    max = n;
                }
        } else {
            i += 1;
        }
    }
    max
}

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
fn substitute_params(portal: &Portal<String>) -> String {
    let sql = portal.statement.statement.to_string();
    let params = &portal.parameters;
    let mut result = sql;

    for (i, param) in params.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        let value = match param {
            Some(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                format!("'{}'", text.replace('\'', "''"))
            }
            None => "NULL".to_string(),
        };
        result = result.replace(&placeholder, &value);
    }

    result
}

// ── Factory & connection entry point ─────────────────────────────

pub struct NavalhaFactory {
    handler: Arc<NavalhaHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<NavalhaAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl NavalhaFactory {
    pub fn new(tenant_manager: Arc<TenantManager>, password: String) -> Self {
        let auth_source = NavalhaAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(NavalhaHandler::new(tenant_manager)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for NavalhaFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one accepted TCP connection until the peer disconnects.
pub async fn process_connection(
    socket: TcpStream,
    tenant_manager: Arc<TenantManager>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> io::Result<()> {
    let factory = Arc::new(NavalhaFactory::new(tenant_manager, password));
    pgwire::tokio::process_socket(socket, tls, factory).await
}

fn engine_err(e: crate::engine::EngineError) -> PgWireError {
    use crate::engine::EngineError::*;
    let code = match &e {
        Conflict { .. } => "23P01",          // exclusion_violation
        NotFound(_) => "P0002",              // no_data_found
        AlreadyExists(_) => "23505",         // unique_violation
        Validation(_) | InvalidTransition(_) => "23514", // check_violation
        LimitExceeded(_) => "54000",         // program_limit_exceeded
        WalError(_) => "58030",              // io_error
    };
    PgWireError::UserError(Box::new(ErrorInfo::new("ERROR".into(), code.into(), e.to_string())))
}

fn sql_err(e: crate::sql::SqlError) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        "42601".into(),
        e.to_string(),
    )))
}
