//! SQLite-based store implementation

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use warden_api::{AccountContext, ConfirmationStatus, RecordUpdate, ResourceType, ServiceRecord};
use warden_util::ServiceId;

use crate::{AuditEvent, AuditEventType, LifecycleStore, StoreError, StoreResult};

const RECORD_COLUMNS: &str = "service_id, resource_type, resource_locator, creator_identity, \
     creator_name, creation_timestamp, account_id, region, status, confirmation_token, \
     confirmation_token_expiry, last_notification_sent, last_action_time, \
     last_action_message, confirmed_at";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("Store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- One row per governed resource
            CREATE TABLE IF NOT EXISTS service_records (
                service_id TEXT PRIMARY KEY,
                resource_type TEXT NOT NULL,
                resource_locator TEXT NOT NULL,
                creator_identity TEXT NOT NULL,
                creator_name TEXT NOT NULL,
                creation_timestamp TEXT NOT NULL,
                account_id TEXT,
                region TEXT,
                status TEXT NOT NULL,
                confirmation_token TEXT NOT NULL,
                confirmation_token_expiry TEXT NOT NULL,
                last_notification_sent TEXT,
                last_action_time TEXT,
                last_action_message TEXT,
                confirmed_at TEXT
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_service_records_status ON service_records(status);
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

/// Fixed-width nanoseconds: lossless, and text order matches time order
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("Bad timestamp '{}': {}", s, e)))
}

fn parse_opt_ts(s: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_ts).transpose()
}

/// Columns as stored, before timestamp and enum parsing
struct RecordRow {
    service_id: String,
    resource_type: String,
    resource_locator: String,
    creator_identity: String,
    creator_name: String,
    creation_timestamp: String,
    account_id: Option<String>,
    region: Option<String>,
    status: String,
    confirmation_token: String,
    confirmation_token_expiry: String,
    last_notification_sent: Option<String>,
    last_action_time: Option<String>,
    last_action_message: Option<String>,
    confirmed_at: Option<String>,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            service_id: row.get(0)?,
            resource_type: row.get(1)?,
            resource_locator: row.get(2)?,
            creator_identity: row.get(3)?,
            creator_name: row.get(4)?,
            creation_timestamp: row.get(5)?,
            account_id: row.get(6)?,
            region: row.get(7)?,
            status: row.get(8)?,
            confirmation_token: row.get(9)?,
            confirmation_token_expiry: row.get(10)?,
            last_notification_sent: row.get(11)?,
            last_action_time: row.get(12)?,
            last_action_message: row.get(13)?,
            confirmed_at: row.get(14)?,
        })
    }

    fn into_record(self) -> StoreResult<ServiceRecord> {
        let status = self
            .status
            .parse::<ConfirmationStatus>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(ServiceRecord {
            service_id: ServiceId::new(self.service_id),
            resource_type: ResourceType::parse(&self.resource_type),
            resource_locator: self.resource_locator,
            creator_identity: self.creator_identity,
            creator_name: self.creator_name,
            creation_timestamp: parse_ts(&self.creation_timestamp)?,
            account: AccountContext {
                account_id: self.account_id,
                region: self.region,
            },
            status,
            confirmation_token: self.confirmation_token,
            confirmation_token_expiry: parse_ts(&self.confirmation_token_expiry)?,
            last_notification_sent: parse_opt_ts(self.last_notification_sent)?,
            last_action_time: parse_opt_ts(self.last_action_time)?,
            last_action_message: self.last_action_message,
            confirmed_at: parse_opt_ts(self.confirmed_at)?,
        })
    }
}

fn current_status(conn: &Connection, service_id: &ServiceId) -> StoreResult<Option<ConfirmationStatus>> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM service_records WHERE service_id = ?",
            [service_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    status
        .map(|s| {
            s.parse::<ConfirmationStatus>()
                .map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
}

impl LifecycleStore for SqliteStore {
    fn create_if_absent(&self, record: &ServiceRecord) -> StoreResult<()> {
        let conn = self.conn()?;

        let inserted = conn.execute(
            &format!(
                "INSERT INTO service_records ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15) \
                 ON CONFLICT(service_id) DO NOTHING",
                RECORD_COLUMNS
            ),
            params![
                record.service_id.as_str(),
                record.resource_type.as_str(),
                record.resource_locator,
                record.creator_identity,
                record.creator_name,
                format_ts(record.creation_timestamp),
                record.account.account_id,
                record.account.region,
                record.status.as_str(),
                record.confirmation_token,
                format_ts(record.confirmation_token_expiry),
                record.last_notification_sent.map(format_ts),
                record.last_action_time.map(format_ts),
                record.last_action_message,
                record.confirmed_at.map(format_ts),
            ],
        )?;

        if inserted == 0 {
            return Err(StoreError::AlreadyExists(record.service_id.clone()));
        }

        debug!(service_id = %record.service_id, "Service record created");
        Ok(())
    }

    fn get(&self, service_id: &ServiceId) -> StoreResult<Option<ServiceRecord>> {
        let conn = self.conn()?;

        let row = conn
            .query_row(
                &format!("SELECT {} FROM service_records WHERE service_id = ?", RECORD_COLUMNS),
                [service_id.as_str()],
                RecordRow::from_row,
            )
            .optional()?;

        row.map(RecordRow::into_record).transpose()
    }

    fn conditional_update(
        &self,
        service_id: &ServiceId,
        expected: ConfirmationStatus,
        update: &RecordUpdate,
    ) -> StoreResult<()> {
        let conn = self.conn()?;

        // Single statement: the status guard and the write cannot interleave
        // with another writer
        let updated = conn.execute(
            r#"
            UPDATE service_records SET
                status = COALESCE(?1, status),
                last_notification_sent = COALESCE(?2, last_notification_sent),
                last_action_time = COALESCE(?3, last_action_time),
                last_action_message = COALESCE(?4, last_action_message),
                confirmed_at = COALESCE(?5, confirmed_at)
            WHERE service_id = ?6 AND status = ?7
            "#,
            params![
                update.status.map(|s| s.as_str()),
                update.last_notification_sent.map(format_ts),
                update.last_action_time.map(format_ts),
                update.last_action_message,
                update.confirmed_at.map(format_ts),
                service_id.as_str(),
                expected.as_str(),
            ],
        )?;

        if updated == 0 {
            return match current_status(&conn, service_id)? {
                Some(current) => Err(StoreError::Conflict {
                    service_id: service_id.clone(),
                    expected,
                    current,
                }),
                None => Err(StoreError::NotFound(service_id.clone())),
            };
        }

        debug!(
            service_id = %service_id,
            expected = %expected,
            new_status = ?update.status,
            "Service record updated"
        );
        Ok(())
    }

    fn scan_by_status(&self, status: ConfirmationStatus) -> StoreResult<Vec<ServiceRecord>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM service_records WHERE status = ? ORDER BY creation_timestamp, service_id",
            RECORD_COLUMNS
        ))?;

        let rows = stmt.query_map([status.as_str()], RecordRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }

        Ok(records)
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![format_ts(event.timestamp), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = parse_ts(&timestamp_str)?;
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}
