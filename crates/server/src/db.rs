// Row store over SQLite.
//
// Tables: clients, assets, events. Deleting a client cascades to its
// assets and events. JSON payload columns (settings, vulnerabilities,
// forensics) deserialize leniently with defaults so one malformed row
// cannot take down a report; timestamps are load-bearing and fail the
// query instead.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

use soc_core::{Asset, AssetStatus, Client, Label, SecurityEvent, Severity};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store rejected or could not execute a query. Fatal to the
    /// requesting view; no partial report is rendered on top of it.
    #[error("row store query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("malformed row in {table}: {reason}")]
    MalformedRow { table: &'static str, reason: String },

    #[error("unknown column '{column}' for table '{table}'")]
    UnknownColumn { table: &'static str, column: String },
}

/// Tables exposed through the generic query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Clients,
    Assets,
    Events,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Clients => "clients",
            Table::Assets => "assets",
            Table::Events => "events",
        }
    }

    fn columns(self) -> &'static [&'static str] {
        match self {
            Table::Clients => &["client_id", "name", "contact_email", "settings"],
            Table::Assets => &[
                "asset_id",
                "client_id",
                "name",
                "ip_address",
                "status",
                "vulnerabilities",
            ],
            Table::Events => &[
                "event_id",
                "client_id",
                "ts",
                "severity",
                "event_type",
                "alert_name",
                "host",
                "label",
                "status",
                "comments",
                "forensics",
            ],
        }
    }

    fn check_column(self, column: &str) -> Result<(), StoreError> {
        if self.columns().contains(&column) {
            Ok(())
        } else {
            Err(StoreError::UnknownColumn {
                table: self.name(),
                column: column.to_string(),
            })
        }
    }
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS clients (
                client_id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                contact_email TEXT NOT NULL,
                settings TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE IF NOT EXISTS assets (
                asset_id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL
                    REFERENCES clients(client_id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                ip_address TEXT NOT NULL,
                status TEXT NOT NULL,
                vulnerabilities TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS events (
                event_id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL
                    REFERENCES clients(client_id) ON DELETE CASCADE,
                ts TEXT NOT NULL,
                severity TEXT NOT NULL,
                event_type TEXT NOT NULL,
                alert_name TEXT NOT NULL,
                host TEXT NOT NULL,
                label TEXT NOT NULL DEFAULT 'unclassified',
                status TEXT NOT NULL DEFAULT '',
                comments TEXT NOT NULL DEFAULT '',
                forensics TEXT NOT NULL DEFAULT '{}'
            );

            CREATE INDEX IF NOT EXISTS idx_assets_client
                ON assets(client_id);
            CREATE INDEX IF NOT EXISTS idx_events_client_ts
                ON events(client_id, ts DESC);
            "#,
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Clients
    // ------------------------------------------------------------------

    pub fn upsert_client(&self, client: &Client) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let settings = serde_json::to_string(&client.settings).unwrap_or_else(|_| "{}".to_string());
        conn.execute(
            "INSERT INTO clients (client_id, name, contact_email, settings)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(client_id) DO UPDATE SET
                 name = excluded.name,
                 contact_email = excluded.contact_email,
                 settings = excluded.settings",
            params![client.client_id, client.name, client.contact_email, settings],
        )?;
        Ok(())
    }

    pub fn list_clients(&self) -> Result<Vec<Client>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT client_id, name, contact_email, settings FROM clients ORDER BY name",
        )?;
        let rows = stmt.query_map([], row_to_client)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_client(&self, client_id: &str) -> Result<Option<Client>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT client_id, name, contact_email, settings FROM clients WHERE client_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![client_id], row_to_client)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Cascades to the client's assets and events.
    pub fn delete_client(&self, client_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM clients WHERE client_id = ?1", params![client_id])?;
        Ok(deleted > 0)
    }

    // ------------------------------------------------------------------
    // Assets
    // ------------------------------------------------------------------

    pub fn upsert_asset(&self, asset: &Asset) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let vulnerabilities =
            serde_json::to_string(&asset.vulnerabilities).unwrap_or_else(|_| "[]".to_string());
        conn.execute(
            "INSERT INTO assets (asset_id, client_id, name, ip_address, status, vulnerabilities)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(asset_id) DO UPDATE SET
                 client_id = excluded.client_id,
                 name = excluded.name,
                 ip_address = excluded.ip_address,
                 status = excluded.status,
                 vulnerabilities = excluded.vulnerabilities",
            params![
                asset.asset_id,
                asset.client_id,
                asset.name,
                asset.ip_address,
                asset.status.as_str(),
                vulnerabilities
            ],
        )?;
        Ok(())
    }

    pub fn assets_for_client(&self, client_id: &str) -> Result<Vec<Asset>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT asset_id, client_id, name, ip_address, status, vulnerabilities
             FROM assets WHERE client_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![client_id], row_to_asset)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn insert_event(&self, event: &SecurityEvent) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let forensics =
            serde_json::to_string(&event.forensics).unwrap_or_else(|_| "{}".to_string());
        conn.execute(
            "INSERT INTO events
                 (event_id, client_id, ts, severity, event_type, alert_name,
                  host, label, status, comments, forensics)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                event.event_id,
                event.client_id,
                event.timestamp.to_rfc3339(),
                event.severity.as_str(),
                event.event_type,
                event.alert_name,
                event.host,
                event.label.as_str(),
                event.status,
                event.comments,
                forensics
            ],
        )?;
        Ok(())
    }

    /// Events for a tenant, newest first.
    pub fn events_for_client(
        &self,
        client_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SecurityEvent>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT event_id, client_id, ts, severity, event_type, alert_name,
                    host, label, status, comments, forensics
             FROM events WHERE client_id = ?1 ORDER BY ts DESC LIMIT ?2",
        )?;
        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        let rows = stmt.query_map(params![client_id, limit], row_to_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(parse_event_row(row?)?);
        }
        Ok(events)
    }

    // ------------------------------------------------------------------
    // Generic query surface: select(table, filter, order-desc, limit)
    // ------------------------------------------------------------------

    /// Generic row query consumed by dashboard widgets that do not need
    /// typed rows. Column names are checked against the table's
    /// allowlist before being interpolated.
    pub fn select_rows(
        &self,
        table: Table,
        filter: Option<(&str, &str)>,
        order_by_desc: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        if let Some((column, _)) = filter {
            table.check_column(column)?;
        }
        if let Some(column) = order_by_desc {
            table.check_column(column)?;
        }

        let mut sql = format!("SELECT {} FROM {}", table.columns().join(", "), table.name());
        if let Some((column, _)) = filter {
            sql.push_str(&format!(" WHERE {column} = ?1"));
        }
        if let Some(column) = order_by_desc {
            sql.push_str(&format!(" ORDER BY {column} DESC"));
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let columns = table.columns();

        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<serde_json::Value> {
            let mut object = serde_json::Map::new();
            for (idx, column) in columns.iter().enumerate() {
                let value: rusqlite::types::Value = row.get(idx)?;
                let json = match value {
                    rusqlite::types::Value::Null => serde_json::Value::Null,
                    rusqlite::types::Value::Integer(n) => serde_json::Value::from(n),
                    rusqlite::types::Value::Real(n) => serde_json::Value::from(n),
                    rusqlite::types::Value::Text(s) => serde_json::Value::from(s),
                    rusqlite::types::Value::Blob(_) => serde_json::Value::Null,
                };
                object.insert((*column).to_string(), json);
            }
            Ok(serde_json::Value::Object(object))
        };

        let rows = match filter {
            Some((_, value)) => stmt
                .query_map(params![value], map_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
        };
        Ok(rows)
    }
}

// ----------------------------------------------------------------------
// Row mapping
// ----------------------------------------------------------------------

fn row_to_client(row: &rusqlite::Row<'_>) -> rusqlite::Result<Client> {
    let settings: String = row.get(3)?;
    Ok(Client {
        client_id: row.get(0)?,
        name: row.get(1)?,
        contact_email: row.get(2)?,
        settings: serde_json::from_str(&settings).unwrap_or_default(),
    })
}

fn row_to_asset(row: &rusqlite::Row<'_>) -> rusqlite::Result<Asset> {
    let status: String = row.get(4)?;
    let vulnerabilities: String = row.get(5)?;
    Ok(Asset {
        asset_id: row.get(0)?,
        client_id: row.get(1)?,
        name: row.get(2)?,
        ip_address: row.get(3)?,
        status: AssetStatus::parse(&status),
        vulnerabilities: serde_json::from_str(&vulnerabilities).unwrap_or_default(),
    })
}

/// Intermediate event row; the timestamp is parsed in a second step so
/// a bad value surfaces as `StoreError::MalformedRow` instead of a
/// rusqlite conversion panic.
struct EventRow {
    event_id: String,
    client_id: String,
    ts: String,
    severity: String,
    event_type: String,
    alert_name: String,
    host: String,
    label: String,
    status: String,
    comments: String,
    forensics: String,
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        event_id: row.get(0)?,
        client_id: row.get(1)?,
        ts: row.get(2)?,
        severity: row.get(3)?,
        event_type: row.get(4)?,
        alert_name: row.get(5)?,
        host: row.get(6)?,
        label: row.get(7)?,
        status: row.get(8)?,
        comments: row.get(9)?,
        forensics: row.get(10)?,
    })
}

fn parse_event_row(row: EventRow) -> Result<SecurityEvent, StoreError> {
    let timestamp = DateTime::parse_from_rfc3339(&row.ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::MalformedRow {
            table: "events",
            reason: format!("bad timestamp '{}': {e}", row.ts),
        })?;

    Ok(SecurityEvent {
        event_id: row.event_id,
        client_id: row.client_id,
        timestamp,
        severity: Severity::parse(&row.severity),
        event_type: row.event_type,
        alert_name: row.alert_name,
        host: row.host,
        label: Label::parse(&row.label),
        status: row.status,
        comments: row.comments,
        forensics: serde_json::from_str(&row.forensics).unwrap_or_default(),
    })
}
