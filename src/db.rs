// 🗄️ Ledger Store - vehicle balances + append-only deduction history (SQLite)
//
// Every operation opens its own connection. There is no process-wide lock:
// the deduction path is one IMMEDIATE write transaction whose conditional
// UPDATE decides and acts in the same statement, and whose history insert
// commits (or rolls back) together with it.

use crate::error::{Result, TollError};
use crate::money::Amount;
use crate::normalizer::canonicalize;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a connection waits on a competing writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub plate_id: String,
    pub owner_name: String,
    pub model: String,
    pub balance: Amount,
}

impl VehicleRecord {
    pub fn new(plate_id: &str, owner_name: &str, model: &str, balance: Amount) -> Self {
        Self {
            plate_id: plate_id.to_string(),
            owner_name: owner_name.to_string(),
            model: model.to_string(),
            balance,
        }
    }

    /// Provisioning checks: canonical non-empty plate, non-empty owner/model
    pub fn validate(&self) -> Result<()> {
        if self.plate_id.is_empty() {
            return Err(TollError::InvalidRecord("plate_id is empty".to_string()));
        }
        if canonicalize(&self.plate_id) != self.plate_id {
            return Err(TollError::InvalidRecord(format!(
                "plate_id {:?} is not canonical",
                self.plate_id
            )));
        }
        if self.owner_name.trim().is_empty() {
            return Err(TollError::InvalidRecord(format!(
                "{}: owner_name is empty",
                self.plate_id
            )));
        }
        if self.model.trim().is_empty() {
            return Err(TollError::InvalidRecord(format!("{}: model is empty", self.plate_id)));
        }
        Ok(())
    }
}

/// Immutable audit record of one toll charge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeductionEntry {
    pub id: i64,
    pub plate_id: String,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
    pub remaining_balance: Amount,
}

/// Result of an atomic compare-and-deduct
#[derive(Debug, Clone, PartialEq)]
pub enum Deduction {
    /// Balance reduced; `vehicle.balance` is the new balance
    Charged {
        vehicle: VehicleRecord,
        entry: DeductionEntry,
    },

    /// Record exists but the balance is below the amount; nothing written
    Insufficient(VehicleRecord),

    /// No record for the plate; nothing written
    NotFound,
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Balances and amounts are INTEGER minor units (see money::Amount)
pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL lets readers proceed while a deduction commits
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS vehicles (
            plate_id TEXT PRIMARY KEY,
            owner_name TEXT NOT NULL CHECK (length(owner_name) > 0),
            model TEXT NOT NULL CHECK (length(model) > 0),
            balance INTEGER NOT NULL CHECK (balance >= 0)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS deductions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            plate_id TEXT NOT NULL REFERENCES vehicles(plate_id),
            amount INTEGER NOT NULL CHECK (amount > 0),
            timestamp TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            remaining_balance INTEGER NOT NULL CHECK (remaining_balance >= 0)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_deductions_plate ON deductions(plate_id, timestamp)",
        [],
    )?;

    Ok(())
}

fn row_to_vehicle(row: &Row<'_>) -> rusqlite::Result<VehicleRecord> {
    Ok(VehicleRecord {
        plate_id: row.get(0)?,
        owner_name: row.get(1)?,
        model: row.get(2)?,
        balance: row.get(3)?,
    })
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<DeductionEntry> {
    let timestamp: String = row.get(3)?;

    Ok(DeductionEntry {
        id: row.get(0)?,
        plate_id: row.get(1)?,
        amount: row.get(2)?,
        timestamp: parse_timestamp(3, &timestamp)?,
        remaining_balance: row.get(4)?,
    })
}

// ============================================================================
// LEDGER
// ============================================================================

/// Handle to the ledger database file
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Open (creating if needed) the ledger at `path` and ensure the schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let ledger = Self {
            path: path.as_ref().to_path_buf(),
        };

        let conn = ledger.connect()?;
        setup_database(&conn)?;
        debug!("Ledger ready at {:?}", ledger.path);

        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    pub fn get(&self, plate_id: &str) -> Result<Option<VehicleRecord>> {
        let conn = self.connect()?;

        let record = conn
            .query_row(
                "SELECT plate_id, owner_name, model, balance FROM vehicles WHERE plate_id = ?1",
                [plate_id],
                row_to_vehicle,
            )
            .optional()?;

        Ok(record)
    }

    /// Subtract `amount` if and only if the balance covers it, appending the
    /// history entry in the same transaction.
    pub fn compare_and_deduct(&self, plate_id: &str, amount: Amount) -> Result<Deduction> {
        if amount.is_zero() {
            return Err(TollError::InvalidAmount(
                "deduction amount must be positive".to_string(),
            ));
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let charged = tx
            .query_row(
                "UPDATE vehicles SET balance = balance - ?1
                 WHERE plate_id = ?2 AND balance >= ?1
                 RETURNING plate_id, owner_name, model, balance",
                params![amount, plate_id],
                row_to_vehicle,
            )
            .optional()?;

        let Some(vehicle) = charged else {
            let existing = tx
                .query_row(
                    "SELECT plate_id, owner_name, model, balance FROM vehicles WHERE plate_id = ?1",
                    [plate_id],
                    row_to_vehicle,
                )
                .optional()?;
            tx.rollback()?;

            return Ok(match existing {
                Some(vehicle) => Deduction::Insufficient(vehicle),
                None => Deduction::NotFound,
            });
        };

        // Per-plate timestamps never go backwards, even if the clock does
        let last: Option<String> = tx.query_row(
            "SELECT MAX(timestamp) FROM deductions WHERE plate_id = ?1",
            [plate_id],
            |row| row.get(0),
        )?;
        let now = Utc::now();
        let timestamp = match last {
            Some(last) => now.max(parse_timestamp(0, &last)?),
            None => now,
        };
        let stamp = timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);

        tx.execute(
            "INSERT INTO deductions (plate_id, amount, timestamp, remaining_balance)
             VALUES (?1, ?2, ?3, ?4)",
            params![vehicle.plate_id, amount, stamp, vehicle.balance],
        )?;
        let id = tx.last_insert_rowid();

        tx.commit()?;

        let entry = DeductionEntry {
            id,
            plate_id: vehicle.plate_id.clone(),
            amount,
            timestamp: parse_timestamp(0, &stamp)?,
            remaining_balance: vehicle.balance,
        };

        Ok(Deduction::Charged { vehicle, entry })
    }

    /// Deduction history for a plate in creation order
    pub fn history(&self, plate_id: &str) -> Result<Vec<DeductionEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, plate_id, amount, timestamp, remaining_balance
             FROM deductions
             WHERE plate_id = ?1
             ORDER BY timestamp ASC, id ASC",
        )?;

        let entries = stmt
            .query_map([plate_id], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Insert-if-absent per plate; existing records are never overwritten.
    /// Returns how many records were newly inserted.
    pub fn seed(&self, records: &[VehicleRecord]) -> Result<usize> {
        for record in records {
            record.validate()?;
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO vehicles (plate_id, owner_name, model, balance)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                inserted += stmt.execute(params![
                    record.plate_id,
                    record.owner_name,
                    record.model,
                    record.balance,
                ])?;
            }
        }

        tx.commit()?;

        info!(
            "Seeded ledger: {} inserted, {} already present",
            inserted,
            records.len() - inserted
        );
        Ok(inserted)
    }

    pub fn count_vehicles(&self) -> Result<i64> {
        let conn = self.connect()?;
        let count = conn.query_row("SELECT COUNT(*) FROM vehicles", [], |row| row.get(0))?;
        Ok(count)
    }
}

// ============================================================================
// SEED DATA
// ============================================================================

/// Demonstration vehicles installed on first start
pub fn default_seed() -> Vec<VehicleRecord> {
    let rupees = |whole: i64| Amount::from_minor(whole * 100).unwrap_or_default();

    vec![
        VehicleRecord::new("HR99G1000", "John Doe", "Hyundai i20", rupees(300)),
        VehicleRecord::new("DL09CD5678", "Priya Sharma", "Honda City", rupees(150)),
        VehicleRecord::new("KA05EF9012", "Ravi Kumar", "Maruti Swift", rupees(70)),
    ]
}

#[derive(Debug, Deserialize)]
struct SeedRow {
    plate_id: String,
    owner_name: String,
    model: String,
    balance: String,
}

/// Read provisioning records from CSV (`plate_id,owner_name,model,balance`)
pub fn load_seed_csv(csv_path: &Path) -> Result<Vec<VehicleRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)
        .map_err(|e| TollError::InvalidRecord(format!("cannot open {:?}: {}", csv_path, e)))?;

    let mut records = Vec::new();

    for (idx, result) in rdr.deserialize::<SeedRow>().enumerate() {
        let line = idx + 2; // header is line 1
        let row = result.map_err(|e| TollError::InvalidRecord(format!("line {}: {}", line, e)))?;

        let balance = Amount::parse(&row.balance)
            .map_err(|e| TollError::InvalidRecord(format!("line {}: {}", line, e)))?;

        let record = VehicleRecord {
            plate_id: canonicalize(&row.plate_id),
            owner_name: row.owner_name,
            model: row.model,
            balance,
        };
        record.validate()?;
        records.push(record);
    }

    Ok(records)
}
