use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::env;
use std::path::Path;

use tollgate::{canonicalize, default_seed, load_seed_csv, Config, Ledger, TollResponse};

const USAGE: &str = "Usage:
  tollgate init [seed.csv]     create the ledger and seed vehicles
  tollgate show <PLATE>        print a vehicle record
  tollgate history <PLATE>     print deduction history
  tollgate charge <PLATE>      charge the toll without recognition
  tollgate decode <IMAGE>      run the full pipeline on an image file";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = Config::load()?;

    match (args.get(1).map(String::as_str), args.get(2)) {
        (Some("init"), seed) => run_init(&config, seed.map(Path::new))?,
        (Some("show"), Some(plate)) => run_show(&config, plate)?,
        (Some("history"), Some(plate)) => run_history(&config, plate)?,
        (Some("charge"), Some(plate)) => run_charge(&config, plate)?,
        (Some("decode"), Some(image)) => run_decode(&config, Path::new(image))?,
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

fn run_init(config: &Config, seed_csv: Option<&Path>) -> Result<()> {
    println!("🗄️  Ledger init - SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let ledger = Ledger::open(&config.database_path)
        .with_context(|| format!("Failed to open {:?}", config.database_path))?;
    println!("✓ Database ready: {}", config.database_path.display());

    let seed_path = seed_csv.or(config.seed_file.as_deref());
    let records = match seed_path {
        Some(path) => {
            println!("\n📂 Loading seed file {}...", path.display());
            load_seed_csv(path)?
        }
        None => default_seed(),
    };

    let inserted = ledger.seed(&records)?;
    println!("✓ Inserted: {} vehicles", inserted);
    println!("✓ Already present: {}", records.len() - inserted);
    println!("✓ Ledger contains {} vehicles", ledger.count_vehicles()?);

    Ok(())
}

fn run_show(config: &Config, plate: &str) -> Result<()> {
    let ledger = Ledger::open(&config.database_path)?;
    let plate = canonicalize(plate);

    match ledger.get(&plate)? {
        Some(record) => {
            println!("🚗 {}", record.plate_id);
            println!("   Owner:   {}", record.owner_name);
            println!("   Model:   {}", record.model);
            println!("   Balance: {}{}", config.currency_symbol, record.balance);
        }
        None => bail!("Plate {} not found in records", plate),
    }

    Ok(())
}

fn run_history(config: &Config, plate: &str) -> Result<()> {
    let ledger = Ledger::open(&config.database_path)?;
    let plate = canonicalize(plate);
    let entries = ledger.history(&plate)?;

    println!("📜 Deductions for {} ({})", plate, entries.len());
    for entry in entries {
        println!(
            "   #{:<5} {}  -{}{}  → {}{}",
            entry.id,
            entry.timestamp.to_rfc3339(),
            config.currency_symbol,
            entry.amount,
            config.currency_symbol,
            entry.remaining_balance
        );
    }

    Ok(())
}

fn run_charge(config: &Config, plate: &str) -> Result<()> {
    let booth = config.build_booth()?;
    let response = booth.charge_plate(plate)?;
    print_response(&response)
}

fn run_decode(config: &Config, image_path: &Path) -> Result<()> {
    let bytes = std::fs::read(image_path)
        .with_context(|| format!("Failed to read image {:?}", image_path))?;
    let payload = general_purpose::STANDARD.encode(bytes);

    let booth = config.build_booth()?;
    let response = booth.process_frame(&payload)?;
    print_response(&response)
}

fn print_response(response: &TollResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}
