// 📨 Outcome Classifier - engine result → caller-facing response
// Pure projection. Currency symbol and precision are presentation settings.

use crate::engine::TransactionOutcome;
use crate::money::Amount;
use serde::{Deserialize, Serialize};

pub const NOT_FOUND_MESSAGE: &str = "Plate not found in records.";
pub const INSUFFICIENT_MESSAGE: &str = "Insufficient balance!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub currency_symbol: String,
    pub decimal_places: u32,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            currency_symbol: "₹".to_string(),
            decimal_places: 2,
        }
    }
}

impl Presentation {
    pub fn money(&self, amount: Amount) -> String {
        format!("{}{}", self.currency_symbol, amount.format(self.decimal_places))
    }
}

/// Response body for one processed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TollResponse {
    pub plate: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Amount>,

    pub message: String,
}

pub fn classify(outcome: &TransactionOutcome, presentation: &Presentation) -> TollResponse {
    match outcome {
        TransactionOutcome::NotFound { plate } => TollResponse {
            plate: plate.clone(),
            owner: None,
            model: None,
            balance: None,
            message: NOT_FOUND_MESSAGE.to_string(),
        },
        TransactionOutcome::Insufficient {
            plate,
            owner,
            model,
            balance,
        } => TollResponse {
            plate: plate.clone(),
            owner: Some(owner.clone()),
            model: Some(model.clone()),
            balance: Some(*balance),
            message: INSUFFICIENT_MESSAGE.to_string(),
        },
        TransactionOutcome::Charged {
            plate,
            owner,
            model,
            amount,
            balance,
            ..
        } => TollResponse {
            plate: plate.clone(),
            owner: Some(owner.clone()),
            model: Some(model.clone()),
            balance: Some(*balance),
            message: format!(
                "{} deducted. Remaining {}",
                presentation.money(*amount),
                presentation.money(*balance)
            ),
        },
    }
}
