//! Regenerate `src/airports.json` from the public airport table.
//!
//! Usage: `cargo run --bin build_airports [URL or local file]`

use trip_wizard::airports::records_from_upstream;
use trip_wizard::{AirportDataset, BundledAirports};

const UPSTREAM_URL: &str = "https://raw.githubusercontent.com/mwgg/Airports/master/airports.json";
const OUTPUT_PATH: &str = "src/airports.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let source = std::env::args().nth(1).unwrap_or_else(|| UPSTREAM_URL.to_string());
    println!("🚀 Building airport dataset from {}", source);

    let body = if source.starts_with("http://") || source.starts_with("https://") {
        reqwest::get(&source).await?.error_for_status()?.text().await?
    } else {
        std::fs::read_to_string(&source)?
    };

    let records = records_from_upstream(&body)?;
    println!("📊 Airports with an IATA code: {}", records.len());

    let json = serde_json::to_string_pretty(&records)? + "\n";
    std::fs::write(OUTPUT_PATH, &json)?;
    println!("✅ Dataset written to {}", OUTPUT_PATH);

    // read it back the way the library will
    let dataset = BundledAirports::from_json(&json)?;
    println!("\n🔍 Spot checks:");
    for code in ["ORD", "SMF", "OGG", "LHR", "NRT"] {
        match dataset.lookup(code) {
            Some(record) => println!("  {} -> {}", code, record.city.or(record.name).unwrap_or_default()),
            None => println!("  {} -> missing", code),
        }
    }

    Ok(())
}
