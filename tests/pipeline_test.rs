use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;
use tollgate::{
    Amount, Config, FixedRecognizer, Fragment, Ledger, TollBooth, TollEngine, TollError,
    TransactionOutcome, UnconfiguredRecognizer, VehicleRecord, INSUFFICIENT_MESSAGE,
    NOT_FOUND_MESSAGE,
};

fn amount(s: &str) -> Amount {
    Amount::parse(s).unwrap()
}

fn frame_payload() -> String {
    let mut buf = Vec::new();
    DynamicImage::new_rgb8(64, 32)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(&buf))
}

fn booth(dir: &tempfile::TempDir, recognizer: FixedRecognizer) -> TollBooth {
    let config = Config {
        database_path: dir.path().join("plates.db"),
        ..Config::default()
    };
    config.build_booth_with(Arc::new(recognizer)).unwrap()
}

#[test]
fn test_two_passages_then_history() {
    let dir = tempfile::tempdir().unwrap();
    let booth = booth(
        &dir,
        FixedRecognizer::new(vec![
            Fragment::new("hr 99", 0.93),
            Fragment::new("IND", 0.31),
            Fragment::new("g1000", 0.87),
        ]),
    );
    let payload = frame_payload();

    let first = booth.process_frame(&payload).unwrap();
    assert_eq!(first.plate, "HR99G1000");
    assert_eq!(first.owner.as_deref(), Some("John Doe"));
    assert_eq!(first.model.as_deref(), Some("Hyundai i20"));
    assert_eq!(first.balance, Some(amount("250")));
    assert_eq!(first.message, "₹50.00 deducted. Remaining ₹250.00");

    let second = booth.process_frame(&payload).unwrap();
    assert_eq!(second.balance, Some(amount("200")));

    let history = booth.engine().ledger().history("HR99G1000").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].remaining_balance, amount("250"));
    assert_eq!(history[1].remaining_balance, amount("200"));
    assert!(history[0].id < history[1].id);
    assert!(history[0].timestamp <= history[1].timestamp);
    assert!(history.iter().all(|e| e.amount == amount("50")));
}

#[test]
fn test_unknown_plate_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let booth = booth(&dir, FixedRecognizer::plate("ZZ00ZZ0000"));

    let response = booth.process_frame(&frame_payload()).unwrap();
    assert_eq!(response.plate, "ZZ00ZZ0000");
    assert_eq!(response.message, NOT_FOUND_MESSAGE);
    assert!(response.owner.is_none());
    assert!(response.model.is_none());
    assert!(response.balance.is_none());
}

#[test]
fn test_nothing_confident_is_not_found_with_empty_plate() {
    let dir = tempfile::tempdir().unwrap();
    let booth = booth(&dir, FixedRecognizer::new(vec![Fragment::new("HR99G1000", 0.5)]));

    let response = booth.process_frame(&frame_payload()).unwrap();
    assert_eq!(response.plate, "");
    assert_eq!(response.message, NOT_FOUND_MESSAGE);

    // Nothing was charged
    let record = booth.engine().ledger().get("HR99G1000").unwrap().unwrap();
    assert_eq!(record.balance, amount("300"));
}

#[test]
fn test_insufficient_balance_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let booth = booth(&dir, FixedRecognizer::plate("SHORT1"));
    booth
        .engine()
        .ledger()
        .seed(&[VehicleRecord::new("SHORT1", "Meera", "Alto", amount("49.99"))])
        .unwrap();

    let response = booth.process_frame(&frame_payload()).unwrap();
    assert_eq!(response.message, INSUFFICIENT_MESSAGE);
    assert_eq!(response.balance, Some(amount("49.99")));
    assert!(booth.engine().ledger().history("SHORT1").unwrap().is_empty());
}

#[test]
fn test_malformed_payload_never_reaches_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let booth = booth(&dir, FixedRecognizer::plate("HR99G1000"));

    let err = booth.process_frame("data:image/png;base64,@@@").unwrap_err();
    assert!(matches!(err, TollError::MalformedInput(_)));
    assert!(booth.engine().ledger().history("HR99G1000").unwrap().is_empty());
}

#[test]
fn test_unavailable_recognizer_never_reaches_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        database_path: dir.path().join("plates.db"),
        ..Config::default()
    };
    let booth = config
        .build_booth_with(Arc::new(UnconfiguredRecognizer))
        .unwrap();

    let err = booth.process_frame(&frame_payload()).unwrap_err();
    assert!(matches!(err, TollError::RecognitionUnavailable(_)));
    assert!(booth.engine().ledger().history("HR99G1000").unwrap().is_empty());
}

#[test]
fn test_manual_lane_canonicalizes_plate() {
    let dir = tempfile::tempdir().unwrap();
    let booth = booth(&dir, FixedRecognizer::default());

    let response = booth.charge_plate("dl09 cd5678").unwrap();
    assert_eq!(response.plate, "DL09CD5678");
    assert_eq!(response.balance, Some(amount("100")));
}

#[test]
fn test_concurrent_charges_single_winner() {
    const WORKERS: usize = 8;

    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(Ledger::open(dir.path().join("plates.db")).unwrap());
    ledger
        .seed(&[VehicleRecord::new("RACE01", "Ann", "Polo", amount("50"))])
        .unwrap();
    let engine = TollEngine::new(ledger.clone(), amount("50")).unwrap();

    let outcomes: Vec<TransactionOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| scope.spawn(|| engine.charge("RACE01").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let charged = outcomes.iter().filter(|o| o.is_charged()).count();
    let insufficient = outcomes
        .iter()
        .filter(|o| matches!(o, TransactionOutcome::Insufficient { .. }))
        .count();

    assert_eq!(charged, 1);
    assert_eq!(insufficient, WORKERS - 1);
    assert_eq!(ledger.get("RACE01").unwrap().unwrap().balance, Amount::ZERO);
    assert_eq!(ledger.history("RACE01").unwrap().len(), 1);
}

#[test]
fn test_different_plates_charge_independently() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(Ledger::open(dir.path().join("plates.db")).unwrap());
    let plates: Vec<String> = (0..6).map(|i| format!("LANE{}", i)).collect();
    let records: Vec<VehicleRecord> = plates
        .iter()
        .map(|p| VehicleRecord::new(p, "Owner", "Model", amount("100")))
        .collect();
    ledger.seed(&records).unwrap();
    let engine = TollEngine::new(ledger.clone(), amount("50")).unwrap();

    std::thread::scope(|scope| {
        for plate in &plates {
            let engine = &engine;
            scope.spawn(move || {
                assert!(engine.charge(plate).unwrap().is_charged());
                assert!(engine.charge(plate).unwrap().is_charged());
            });
        }
    });

    for plate in &plates {
        assert_eq!(ledger.get(plate).unwrap().unwrap().balance, Amount::ZERO);
        assert_eq!(ledger.history(plate).unwrap().len(), 2);
    }
}
