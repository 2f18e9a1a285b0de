//! # Trip Wizard
//!
//! An AI-assisted travel planner. A trip is collected in a fixed sequence of stages:
//! city names are resolved to IATA codes, a single flight offer is fetched from the
//! Amadeus self-service API, and a hosted LLM proposes hotels and a day-by-day
//! itinerary before composing everything into one final summary.
//!
//! The library has no presentation layer of its own. [`TripWizard`] exposes one
//! transition function per stage; the `trip-wizard` CLI and the `trip-wizard-mcp`
//! server are thin surfaces over it.

pub mod airports;
pub mod amadeus;
pub mod config;
pub mod flights;
pub mod hotels;
pub mod itinerary;
pub mod llm;
pub mod summary;
pub mod telemetry;
pub mod wizard;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

// Re-export main types for convenience
pub use airports::{AirportCodeResolver, AirportDataset, AirportRecord, BundledAirports};
pub use amadeus::{AmadeusClient, FlightOfferQuery, FlightSearch, Location, LocationSearch, TravelApiError};
pub use config::Settings;
pub use flights::{fetch_one_offer, format_offer, FlightOffer, Itinerary, Segment, NO_FLIGHT_OFFERS};
pub use hotels::{HotelAdvisor, HotelCandidate, HotelSummary, NO_HOTELS_FOUND};
pub use itinerary::{trip_length, ItineraryAdvisor, ItineraryRequest};
pub use llm::{ChatTransport, LlmError, LlmGateway, OpenAiTransport};
pub use summary::{SummaryComposer, SummaryInputs};
pub use wizard::{parse_budget, SessionState, Stage, TripForm, TripRequest, TripServices, TripWizard};

/// Error types for the trip wizard
#[derive(Error, Debug)]
pub enum TripError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Wizard is at stage {actual}, but this step belongs to stage {expected}")]
    OutOfOrder { expected: Stage, actual: Stage },

    #[error("Travel API error: {0}")]
    TravelApi(#[from] TravelApiError),

    #[error("Language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client setup failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Input problems the user can fix by editing the current screen.
///
/// The display text is what the user sees; it is kept stable so surfaces can show it
/// without further formatting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in departure, destination, and start/end dates.")]
    MissingTripFields,

    #[error("Hotel budget must be a number.")]
    InvalidBudget,

    #[error("Could not find IATA code for departure: {0}")]
    UnresolvedDeparture(String),

    #[error("Could not find IATA code for destination: {0}")]
    UnresolvedDestination(String),

    #[error("Please enter the hotel you wish to choose.")]
    MissingHotelChoice,

    #[error("Please enter your interests and food preferences.")]
    MissingPreferences,

    #[error("Your end date must be after your start date.")]
    EndBeforeStart,

    #[error("Could not parse dates: {0}")]
    UnparseableDate(String),
}

impl TripError {
    /// True when the error should be shown to the user as a correctable input problem
    /// rather than treated as a failure of the program.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, TripError::Validation(_))
    }
}
