//! CLI interface for trip-wizard

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Write};
use trip_wizard::{telemetry, Settings, TripError, TripForm, TripServices, TripWizard};

#[derive(Parser)]
#[command(name = "trip-wizard")]
#[command(about = "AI-assisted travel planning: one flight, five hotels, a day-by-day plan")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Plan a trip interactively
    Plan {
        /// Departure city or airport
        #[arg(short, long)]
        from: Option<String>,
        /// Destination city or airport
        #[arg(short, long)]
        to: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(short, long)]
        end: Option<String>,
        /// Hotel budget per night
        #[arg(short, long)]
        budget: Option<String>,
        /// Write the finished session as JSON to this file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Resolve a city or airport name to its IATA code
    Resolve {
        /// City or airport name
        query: String,
    },
}

/// Read one trimmed line from stdin after printing `label`
fn ask(label: &str) -> anyhow::Result<String> {
    print!("{} ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("input closed before the wizard finished");
    }
    Ok(line.trim().to_string())
}

/// Use the pre-filled value if there is one, otherwise ask
fn ask_or(prefilled: &mut Option<String>, label: &str) -> anyhow::Result<String> {
    match prefilled.take() {
        Some(value) => {
            println!("{} {}", label, value);
            Ok(value)
        }
        None => ask(label),
    }
}

/// Print a user-facing error and report whether the screen should be asked again
fn retry_on_validation(result: Result<(), TripError>) -> anyhow::Result<bool> {
    match result {
        Ok(()) => Ok(false),
        Err(e) if e.is_user_facing() => {
            eprintln!("Error: {}", e);
            Ok(true)
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_plan(
    services: TripServices,
    mut from: Option<String>,
    mut to: Option<String>,
    mut start: Option<String>,
    mut end: Option<String>,
    mut budget: Option<String>,
    output: Option<String>,
) -> anyhow::Result<()> {
    let mut wizard = TripWizard::new(services);

    loop {
        let form = TripForm {
            departure: ask_or(&mut from, "Departing from (City or Airport):")?,
            destination: ask_or(&mut to, "Where would you like to travel?")?,
            start_date: ask_or(&mut start, "Start date (YYYY-MM-DD):")?,
            end_date: ask_or(&mut end, "End date (YYYY-MM-DD):")?,
            budget: ask_or(&mut budget, "Hotel budget (per night):")?,
        };
        println!("\nLooking up your flight and hotels...");
        if !retry_on_validation(wizard.submit_trip_basics(&form).await)? {
            break;
        }
    }

    let state = wizard.state();
    println!("\nFlight Info:\n{}", state.flight_text.as_deref().unwrap_or_default());
    println!("\nHotel Options:\n{}", state.hotel_text.as_deref().unwrap_or_default());

    loop {
        let choice = ask("Enter the hotel name or # you choose:")?;
        if !retry_on_validation(wizard.choose_hotel(&choice))? {
            break;
        }
    }

    loop {
        let interests = ask("What are your interests? (e.g., museums, hiking)")?;
        let food = ask("What kind of food do you like? (e.g., seafood, vegetarian)")?;
        println!("\nPlanning your days...");
        if !retry_on_validation(wizard.submit_preferences(&interests, &food).await)? {
            break;
        }
    }

    let summary = wizard.compose_summary().await?.to_string();
    println!("\nYour Final Trip Summary:\n\n{}", summary);
    println!("\nEnd of AI-Assisted Travel Planning");

    if let Some(output_file) = output {
        let json = serde_json::to_string_pretty(wizard.state())?;
        fs::write(&output_file, json).with_context(|| format!("writing {}", output_file))?;
        println!("Session saved to {}", output_file);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init_stderr_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let settings = Settings::from_env();
    let services = TripServices::from_settings(&settings)?;

    match cli.command {
        Commands::Plan {
            from,
            to,
            start,
            end,
            budget,
            output,
        } => run_plan(services, from, to, start, end, budget, output).await?,
        Commands::Resolve { query } => match services.resolver().resolve_code(&query).await {
            Some(code) => println!("{} -> {} ({})", query, code, services.resolver().resolve_city_name(&code)),
            None => {
                eprintln!("Could not find IATA code for: {}", query);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
