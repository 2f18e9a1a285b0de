// src/mcp_server.rs

use rmcp::{
    ServerHandler, ServiceExt,
    model::{ServerCapabilities, ServerInfo},
    schemars, tool,
    transport::stdio,
};
use trip_wizard::{
    fetch_one_offer, format_offer, parse_budget, telemetry, Settings, TripError, TripForm, TripServices, TripWizard,
};
use serde::Deserialize;
use anyhow::Result;
use tracing::{info, warn, error, debug};
use std::path::PathBuf;
use std::sync::Arc;

/// City-name cache bound for the long-running server
const RESOLVER_CACHE_LIMIT: usize = 4096;

/// Trip planning MCP server
#[derive(Clone)]
pub struct TripServer {
    services: Arc<TripServices>,
}

impl TripServer {
    pub fn new(services: TripServices) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}

fn error_json(message: impl std::fmt::Display) -> String {
    serde_json::json!({ "error": message.to_string() }).to_string()
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct LookupParams {
    #[schemars(description = "City or airport name (e.g., Chicago, San Diego)")]
    pub query: String,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct FlightOfferParams {
    #[schemars(description = "Origin IATA code (e.g., ORD)")]
    pub origin: String,
    #[schemars(description = "Destination IATA code (e.g., SAN)")]
    pub destination: String,
    #[schemars(description = "Departure date in YYYY-MM-DD format")]
    pub departure_date: String,
    #[schemars(description = "Return date in YYYY-MM-DD format")]
    pub return_date: String,
    #[schemars(description = "Number of adult passengers (default: 1)")]
    pub adults: Option<u32>,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct HotelParams {
    #[schemars(description = "Destination city")]
    pub destination: String,
    #[schemars(description = "Maximum nightly budget in USD; omit for no limit")]
    pub budget: Option<String>,
}

#[derive(Debug, Deserialize, Clone, schemars::JsonSchema)]
pub struct PlanTripParams {
    #[schemars(description = "Departure city or airport")]
    pub departure: String,
    #[schemars(description = "Destination city or airport")]
    pub destination: String,
    #[schemars(description = "Start date in YYYY-MM-DD format")]
    pub start_date: String,
    #[schemars(description = "End date in YYYY-MM-DD format")]
    pub end_date: String,
    #[schemars(description = "Hotel budget per night in USD; omit for no limit")]
    pub budget: Option<String>,
    #[schemars(description = "Hotel the traveler will stay at (free text, e.g. one of the recommended names)")]
    pub hotel_choice: String,
    #[schemars(description = "Traveler interests (e.g., museums, hiking)")]
    pub interests: String,
    #[schemars(description = "Food preferences (e.g., seafood, vegetarian)")]
    pub food: String,
}

#[tool(tool_box)]
impl TripServer {
    /// Resolve a city or airport name to an IATA code
    #[tool(description = "Resolve a city or airport name to its IATA code and display city name.")]
    async fn lookup_airport_code(&self, #[tool(aggr)] params: LookupParams) -> String {
        info!(query = params.query, "Airport lookup request received");
        let resolver = self.services.resolver();
        match resolver.resolve_code(&params.query).await {
            Some(code) => serde_json::json!({
                "query": params.query,
                "code": code,
                "city": resolver.resolve_city_name(&code),
            })
            .to_string(),
            None => {
                warn!(query = params.query, "No IATA code found");
                error_json(format!("Could not find IATA code for: {}", params.query))
            }
        }
    }

    /// Fetch one flight offer and return it formatted
    #[tool(description = "Fetch a single round-trip flight offer between two IATA codes and return it as readable text.")]
    async fn search_flight_offer(&self, #[tool(aggr)] params: FlightOfferParams) -> String {
        info!(
            origin = params.origin,
            destination = params.destination,
            departure_date = params.departure_date,
            return_date = params.return_date,
            "Flight offer request received"
        );
        let offer = fetch_one_offer(
            self.services.flights(),
            &params.origin,
            &params.destination,
            &params.departure_date,
            &params.return_date,
            params.adults.unwrap_or(1),
        )
        .await;
        format_offer(offer.as_ref(), self.services.resolver())
    }

    /// Ask the model for five hotels and describe each
    #[tool(description = "Recommend exactly five hotels in a destination under a nightly budget, each with a short description.")]
    async fn recommend_hotels(&self, #[tool(aggr)] params: HotelParams) -> String {
        info!(destination = params.destination, budget = params.budget.as_deref(), "Hotel request received");
        let destination = params.destination.trim();
        if destination.is_empty() {
            return error_json("Destination is required.");
        }
        let max_nightly_budget = match parse_budget(params.budget.as_deref().unwrap_or_default()) {
            Ok(budget) => budget,
            Err(e) => return error_json(e),
        };

        let advisor = self.services.hotel_advisor();
        let candidates = advisor.fetch_candidates(destination, max_nightly_budget).await;
        let hotels = advisor.summarize(&candidates).await;
        debug!(hotels = hotels.len(), "Hotel summaries ready");
        serde_json::to_string_pretty(&hotels).unwrap_or_else(error_json)
    }

    /// Run the whole wizard in one call
    #[tool(description = "Plan a complete trip: resolve both cities, fetch one flight, recommend five hotels, build a day-by-day itinerary and compose a final summary. Returns the full session as JSON.")]
    async fn plan_trip(&self, #[tool(aggr)] params: PlanTripParams) -> String {
        info!(
            departure = params.departure,
            destination = params.destination,
            start_date = params.start_date,
            end_date = params.end_date,
            "Trip plan request received"
        );

        let mut wizard = TripWizard::new(self.services.as_ref().clone());
        let form = TripForm {
            departure: params.departure,
            destination: params.destination,
            start_date: params.start_date,
            end_date: params.end_date,
            budget: params.budget.unwrap_or_default(),
        };

        let result: Result<(), TripError> = async {
            wizard.submit_trip_basics(&form).await?;
            wizard.choose_hotel(&params.hotel_choice)?;
            wizard.submit_preferences(&params.interests, &params.food).await?;
            wizard.compose_summary().await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            error!(stage = %wizard.stage(), error = %e, "Trip planning stopped");
            return error_json(e);
        }

        info!("Trip plan completed");
        serde_json::to_string_pretty(wizard.state()).unwrap_or_else(error_json)
    }
}

#[tool(tool_box)]
impl ServerHandler for TripServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("An AI-assisted travel planner. Resolves airports, fetches a single flight offer, recommends five hotels under a budget and plans a day-by-day itinerary. Use plan_trip for the whole flow or the individual tools for each step.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging before anything else
    if let Err(e) = telemetry::init_file_logging(&PathBuf::from("logs"), "trip-wizard-mcp.log") {
        eprintln!("Failed to initialize logging: {}", e);
        // Continue without logging rather than failing
    }

    info!("Starting MCP trip planning server");

    let settings = Settings::from_env();
    let services = TripServices::from_settings(&settings)?.with_cache_limit(RESOLVER_CACHE_LIMIT);
    let server = TripServer::new(services);
    let transport = stdio();

    // SDK handles initialization, tool discovery, and message routing
    let service = server.serve(transport).await?;

    info!("MCP service started, waiting for requests");

    service.waiting().await?;

    info!("MCP service shutting down");
    Ok(())
}
