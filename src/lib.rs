// Tollgate - plate recognition to prepaid toll ledger
// Exposes all modules for use in CLI, API server, and tests

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod frame;
pub mod money;
pub mod normalizer;
pub mod outcome;
pub mod pipeline;
pub mod recognizer;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Config;
pub use db::{
    default_seed, load_seed_csv, setup_database, Deduction, DeductionEntry, Ledger, VehicleRecord,
};
pub use engine::{TollEngine, TransactionOutcome};
pub use error::{Result, TollError};
pub use frame::{decode_payload, downscale};
pub use money::{Amount, AmountError};
pub use normalizer::{canonicalize, normalize, MIN_CONFIDENCE};
pub use outcome::{classify, Presentation, TollResponse, INSUFFICIENT_MESSAGE, NOT_FOUND_MESSAGE};
pub use pipeline::TollBooth;
pub use recognizer::{FixedRecognizer, Fragment, HttpRecognizer, Recognizer, UnconfiguredRecognizer};
