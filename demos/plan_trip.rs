//! Plan a Chicago to San Diego trip end to end against the live services
//!
//! Needs OPENAI_API_KEY, AMADEUS_CLIENT_ID and AMADEUS_CLIENT_SECRET in the
//! environment or a .env file.

use trip_wizard::{Settings, TripForm, TripServices, TripWizard};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env();
    if !settings.placeholder_credentials().is_empty() {
        eprintln!("Missing credentials: {:?}", settings.placeholder_credentials());
        eprintln!("Requests will fail to authenticate.");
    }

    let mut wizard = TripWizard::new(TripServices::from_settings(&settings)?);

    let form = TripForm {
        departure: "Chicago".to_string(),
        destination: "San Diego".to_string(),
        start_date: "2025-09-12".to_string(),
        end_date: "2025-09-15".to_string(),
        budget: "180".to_string(),
    };

    println!("Resolving cities, fetching a flight and hotel ideas...");
    if let Err(e) = wizard.submit_trip_basics(&form).await {
        eprintln!("❌ {}", e);
        return Ok(());
    }

    let state = wizard.state();
    println!("\n{}", state.flight_text.as_deref().unwrap_or_default());
    println!("\n{}", state.hotel_text.as_deref().unwrap_or_default());

    let first_hotel = state
        .hotels
        .first()
        .map(|summary| summary.hotel.name.clone())
        .unwrap_or_else(|| "Any downtown hotel".to_string());
    wizard.choose_hotel(&first_hotel)?;

    println!("Planning the days...");
    wizard.submit_preferences("museums, beaches", "seafood").await?;

    let summary = wizard.compose_summary().await?;
    println!("\n✅ Final summary:\n\n{}", summary);

    Ok(())
}
