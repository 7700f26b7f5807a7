//! Transaction engine: one toll charge attempt against the ledger.
//!
//! The engine owns the fixed toll amount and turns the ledger's atomic
//! compare-and-deduct into one of three business outcomes.

use crate::db::{Deduction, DeductionEntry, Ledger};
use crate::error::{Result, TollError};
use crate::money::Amount;
use log::{debug, info};
use std::sync::Arc;

/// The three mutually exclusive results of a charge attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    NotFound {
        plate: String,
    },
    Insufficient {
        plate: String,
        owner: String,
        model: String,
        balance: Amount,
    },
    Charged {
        plate: String,
        owner: String,
        model: String,
        amount: Amount,
        balance: Amount,
        entry: DeductionEntry,
    },
}

impl TransactionOutcome {
    pub fn plate(&self) -> &str {
        match self {
            TransactionOutcome::NotFound { plate }
            | TransactionOutcome::Insufficient { plate, .. }
            | TransactionOutcome::Charged { plate, .. } => plate,
        }
    }

    pub fn is_charged(&self) -> bool {
        matches!(self, TransactionOutcome::Charged { .. })
    }
}

pub struct TollEngine {
    ledger: Arc<Ledger>,
    toll: Amount,
}

impl TollEngine {
    pub fn new(ledger: Arc<Ledger>, toll: Amount) -> Result<Self> {
        if toll.is_zero() {
            return Err(TollError::InvalidAmount("toll must be positive".to_string()));
        }
        Ok(Self { ledger, toll })
    }

    pub fn toll(&self) -> Amount {
        self.toll
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Attempt to charge the toll to `plate`.
    ///
    /// An empty plate id is a normal lookup that finds nothing.
    pub fn charge(&self, plate: &str) -> Result<TransactionOutcome> {
        if plate.is_empty() {
            debug!("Empty plate id, nothing to charge");
            return Ok(TransactionOutcome::NotFound {
                plate: String::new(),
            });
        }

        let outcome = match self.ledger.compare_and_deduct(plate, self.toll)? {
            Deduction::NotFound => {
                info!("Plate {} not in ledger", plate);
                TransactionOutcome::NotFound {
                    plate: plate.to_string(),
                }
            }
            Deduction::Insufficient(vehicle) => {
                info!(
                    "Plate {} has insufficient balance {} (toll {})",
                    plate, vehicle.balance, self.toll
                );
                TransactionOutcome::Insufficient {
                    plate: vehicle.plate_id,
                    owner: vehicle.owner_name,
                    model: vehicle.model,
                    balance: vehicle.balance,
                }
            }
            Deduction::Charged { vehicle, entry } => {
                info!(
                    "Charged {} to {}; remaining {}",
                    self.toll, plate, vehicle.balance
                );
                TransactionOutcome::Charged {
                    plate: vehicle.plate_id,
                    owner: vehicle.owner_name,
                    model: vehicle.model,
                    amount: entry.amount,
                    balance: vehicle.balance,
                    entry,
                }
            }
        };

        Ok(outcome)
    }
}
