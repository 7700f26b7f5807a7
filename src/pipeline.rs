// 🚧 Toll booth - frame → plate → ledger → response
//
// Built once at startup and shared by reference. Recognition runs to
// completion before the ledger is touched.

use crate::engine::TollEngine;
use crate::error::Result;
use crate::frame::{decode_payload, downscale};
use crate::normalizer::{canonicalize, normalize};
use crate::outcome::{classify, Presentation, TollResponse};
use crate::recognizer::Recognizer;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

pub struct TollBooth {
    recognizer: Arc<dyn Recognizer>,
    engine: TollEngine,
    presentation: Presentation,
    max_frame_dim: u32,
}

impl TollBooth {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        engine: TollEngine,
        presentation: Presentation,
        max_frame_dim: u32,
    ) -> Self {
        Self {
            recognizer,
            engine,
            presentation,
            max_frame_dim,
        }
    }

    pub fn engine(&self) -> &TollEngine {
        &self.engine
    }

    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    /// Full pipeline for one transport-encoded frame
    pub fn process_frame(&self, payload: &str) -> Result<TollResponse> {
        let request_id = Uuid::new_v4();
        debug!("[{}] frame received ({} bytes)", request_id, payload.len());

        let result = self.run(request_id, payload);
        if let Err(e) = &result {
            warn!("[{}] frame rejected: {}", request_id, e);
        }
        result
    }

    fn run(&self, request_id: Uuid, payload: &str) -> Result<TollResponse> {
        let image = downscale(decode_payload(payload)?, self.max_frame_dim);

        let fragments = self.recognizer.recognize(&image)?;
        let plate = normalize(&fragments);
        debug!(
            "[{}] {} fragments → plate {:?}",
            request_id,
            fragments.len(),
            plate
        );

        let outcome = self.engine.charge(&plate)?;
        info!("[{}] plate {:?} processed", request_id, outcome.plate());

        Ok(classify(&outcome, &self.presentation))
    }

    /// Manual lane: charge a typed-in plate without recognition
    pub fn charge_plate(&self, plate: &str) -> Result<TollResponse> {
        let outcome = self.engine.charge(&canonicalize(plate))?;
        Ok(classify(&outcome, &self.presentation))
    }
}
