//! The trip-planning wizard as an explicit, forward-only state machine
//!
//! Each stage has one transition function. A transition checks that the wizard is at
//! its stage, validates its input, computes its artifacts into locals and only then
//! commits them to the [`SessionState`] and advances. A failed transition leaves both
//! stage and state exactly as they were, so the same screen can simply be shown again.

use crate::airports::{AirportCodeResolver, BundledAirports};
use crate::amadeus::{AmadeusClient, FlightSearch};
use crate::config::Settings;
use crate::flights::{fetch_one_offer, format_offer, FlightOffer};
use crate::hotels::{render_summaries, HotelAdvisor, HotelSummary};
use crate::itinerary::{ItineraryAdvisor, ItineraryRequest};
use crate::llm::{LlmGateway, OpenAiTransport};
use crate::summary::{SummaryComposer, SummaryInputs};
use crate::{TripError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Budget used when the user leaves the field empty
pub const UNBOUNDED_NIGHTLY_BUDGET: f64 = 999_999.0;

/// Passengers on every flight search
pub const DEFAULT_ADULTS: u32 = 1;

/// Wizard stages, in the only order they can be visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    TripBasics,
    HotelChoice,
    Preferences,
    Summary,
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::TripBasics => "trip basics",
            Stage::HotelChoice => "hotel choice",
            Stage::Preferences => "preferences",
            Stage::Summary => "summary",
            Stage::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Raw text of the first screen, exactly as typed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripForm {
    pub departure: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub budget: String,
}

/// Nightly hotel budget from user text. Blank means no limit.
pub fn parse_budget(raw: &str) -> Result<f64, ValidationError> {
    let budget = raw.trim();
    if budget.is_empty() {
        return Ok(UNBOUNDED_NIGHTLY_BUDGET);
    }
    match budget.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ValidationError::InvalidBudget),
    }
}

impl TripForm {
    /// Trim every field, require the four trip fields and a numeric (or empty) budget
    pub fn validate(&self) -> Result<TripRequest, ValidationError> {
        let max_nightly_budget = parse_budget(&self.budget)?;

        let departure = self.departure.trim();
        let destination = self.destination.trim();
        let start_date = self.start_date.trim();
        let end_date = self.end_date.trim();
        if departure.is_empty() || destination.is_empty() || start_date.is_empty() || end_date.is_empty() {
            return Err(ValidationError::MissingTripFields);
        }

        Ok(TripRequest {
            departure: departure.to_string(),
            destination: destination.to_string(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            max_nightly_budget,
        })
    }
}

/// A validated first screen. Never changes once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub departure: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub max_nightly_budget: f64,
}

/// Everything accumulated over one wizard run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub request: Option<TripRequest>,
    pub origin_code: Option<String>,
    pub destination_code: Option<String>,
    pub flight_offer: Option<FlightOffer>,
    pub flight_text: Option<String>,
    pub hotels: Vec<HotelSummary>,
    pub hotel_text: Option<String>,
    /// Free text; not checked against the listed hotels
    pub chosen_hotel: Option<String>,
    pub interests: Option<String>,
    pub food: Option<String>,
    pub itinerary_text: Option<String>,
    pub final_summary: Option<String>,
}

/// The external collaborators a wizard run talks to
#[derive(Clone)]
pub struct TripServices {
    resolver: Arc<AirportCodeResolver>,
    flights: Arc<dyn FlightSearch>,
    gateway: LlmGateway,
}

impl TripServices {
    pub fn new(resolver: Arc<AirportCodeResolver>, flights: Arc<dyn FlightSearch>, gateway: LlmGateway) -> Self {
        Self {
            resolver,
            flights,
            gateway,
        }
    }

    /// Wire the real Amadeus and OpenAI clients from settings
    pub fn from_settings(settings: &Settings) -> Result<Self, TripError> {
        let amadeus = Arc::new(AmadeusClient::new(
            &settings.amadeus_base_url,
            &settings.amadeus_client_id,
            &settings.amadeus_client_secret,
        )?);
        let airports = BundledAirports::load()
            .map_err(|e| TripError::Config(format!("bundled airport data is invalid: {}", e)))?;
        debug!(airports = airports.len(), "Loaded airport reference data");

        let resolver = AirportCodeResolver::new(Arc::new(airports), amadeus.clone());
        let transport = OpenAiTransport::new(&settings.openai_base_url, &settings.openai_api_key)?;
        let gateway = LlmGateway::new(Arc::new(transport), &settings.openai_model);

        Ok(Self::new(Arc::new(resolver), amadeus, gateway))
    }

    /// Bound the resolver's city-name cache, for processes that outlive a single
    /// session. Has no effect once the resolver is shared.
    pub fn with_cache_limit(self, limit: usize) -> Self {
        match Arc::try_unwrap(self.resolver) {
            Ok(resolver) => Self {
                resolver: Arc::new(resolver.with_cache_limit(limit)),
                ..self
            },
            Err(shared) => Self { resolver: shared, ..self },
        }
    }

    pub fn resolver(&self) -> &AirportCodeResolver {
        &self.resolver
    }

    pub fn flights(&self) -> &dyn FlightSearch {
        self.flights.as_ref()
    }

    pub fn hotel_advisor(&self) -> HotelAdvisor {
        HotelAdvisor::new(self.gateway.clone())
    }

    pub fn itinerary_advisor(&self) -> ItineraryAdvisor {
        ItineraryAdvisor::new(self.gateway.clone())
    }

    pub fn summary_composer(&self) -> SummaryComposer {
        SummaryComposer::new(self.gateway.clone())
    }
}

/// One run of the wizard
pub struct TripWizard {
    services: TripServices,
    stage: Stage,
    state: SessionState,
}

impl TripWizard {
    pub fn new(services: TripServices) -> Self {
        Self {
            services,
            stage: Stage::TripBasics,
            state: SessionState::default(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    fn expect_stage(&self, expected: Stage) -> Result<(), TripError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(TripError::OutOfOrder {
                expected,
                actual: self.stage,
            })
        }
    }

    fn advance(&mut self, next: Stage) {
        info!(from = %self.stage, to = %next, "Wizard advanced");
        self.stage = next;
    }

    /// Stage 1: resolve both cities, fetch the flight offer and the hotel suggestions
    #[instrument(level = "info", skip_all)]
    pub async fn submit_trip_basics(&mut self, form: &TripForm) -> Result<(), TripError> {
        self.expect_stage(Stage::TripBasics)?;
        let request = form.validate()?;

        let resolver = self.services.resolver();
        let origin_code = resolver.resolve_code(&request.departure).await;
        let destination_code = resolver.resolve_code(&request.destination).await;
        let origin_code = origin_code.ok_or_else(|| ValidationError::UnresolvedDeparture(request.departure.clone()))?;
        let destination_code =
            destination_code.ok_or_else(|| ValidationError::UnresolvedDestination(request.destination.clone()))?;

        let offer = fetch_one_offer(
            self.services.flights(),
            &origin_code,
            &destination_code,
            &request.start_date,
            &request.end_date,
            DEFAULT_ADULTS,
        )
        .await;
        let flight_text = format_offer(offer.as_ref(), resolver);

        let advisor = self.services.hotel_advisor();
        let candidates = advisor
            .fetch_candidates(&request.destination, request.max_nightly_budget)
            .await;
        let hotels = advisor.summarize(&candidates).await;
        let hotel_text = render_summaries(&hotels);

        self.state.request = Some(request);
        self.state.origin_code = Some(origin_code);
        self.state.destination_code = Some(destination_code);
        self.state.flight_offer = offer;
        self.state.flight_text = Some(flight_text);
        self.state.hotels = hotels;
        self.state.hotel_text = Some(hotel_text);
        self.advance(Stage::HotelChoice);
        Ok(())
    }

    /// Stage 2: record the hotel the user picked
    pub fn choose_hotel(&mut self, choice: &str) -> Result<(), TripError> {
        self.expect_stage(Stage::HotelChoice)?;
        let choice = choice.trim();
        if choice.is_empty() {
            return Err(ValidationError::MissingHotelChoice.into());
        }

        self.state.chosen_hotel = Some(choice.to_string());
        self.advance(Stage::Preferences);
        Ok(())
    }

    /// Stage 3: collect interests and food preferences and request the itinerary
    #[instrument(level = "info", skip_all)]
    pub async fn submit_preferences(&mut self, interests: &str, food: &str) -> Result<(), TripError> {
        self.expect_stage(Stage::Preferences)?;
        let interests = interests.trim();
        let food = food.trim();
        if interests.is_empty() || food.is_empty() {
            return Err(ValidationError::MissingPreferences.into());
        }

        let Some(request) = self.state.request.as_ref() else {
            return Err(TripError::OutOfOrder {
                expected: Stage::TripBasics,
                actual: self.stage,
            });
        };
        let itinerary_request = ItineraryRequest {
            destination: request.destination.clone(),
            start_date: request.start_date.clone(),
            end_date: request.end_date.clone(),
            hotel_name: self.state.chosen_hotel.clone().unwrap_or_default(),
            interests: interests.to_string(),
            food: food.to_string(),
        };

        let itinerary_text = match self.services.itinerary_advisor().plan(&itinerary_request).await {
            Ok(text) => text,
            Err(TripError::Llm(e)) => e.inline_notice(),
            Err(other) => return Err(other),
        };

        self.state.interests = Some(itinerary_request.interests);
        self.state.food = Some(itinerary_request.food);
        self.state.itinerary_text = Some(itinerary_text);
        self.advance(Stage::Summary);
        Ok(())
    }

    /// Stage 4: compose the final summary. Takes no input and ends the run.
    #[instrument(level = "info", skip_all)]
    pub async fn compose_summary(&mut self) -> Result<&str, TripError> {
        self.expect_stage(Stage::Summary)?;

        let summary = {
            let state = &self.state;
            let (departure, destination) = state
                .request
                .as_ref()
                .map(|r| (r.departure.as_str(), r.destination.as_str()))
                .unwrap_or_default();
            let inputs = SummaryInputs {
                departure,
                destination,
                flight_text: state.flight_text.as_deref().unwrap_or_default(),
                hotel_text: state.hotel_text.as_deref().unwrap_or_default(),
                chosen_hotel: state.chosen_hotel.as_deref().unwrap_or_default(),
                itinerary_text: state.itinerary_text.as_deref().unwrap_or_default(),
            };
            match self.services.summary_composer().compose(&inputs).await {
                Ok(text) => text,
                Err(e) => e.inline_notice(),
            }
        };

        self.advance(Stage::Complete);
        Ok(self.state.final_summary.insert(summary).as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{services, trip_form, FakeFlightSearch, ScriptedChat};

    #[test]
    fn test_form_validation() {
        let request = trip_form("150").validate().unwrap();
        assert_eq!(request.max_nightly_budget, 150.0);
        assert_eq!(request.departure, "Chicago");

        let request = trip_form("  ").validate().unwrap();
        assert_eq!(request.max_nightly_budget, UNBOUNDED_NIGHTLY_BUDGET);

        assert_eq!(trip_form("cheap").validate(), Err(ValidationError::InvalidBudget));
        assert_eq!(trip_form("inf").validate(), Err(ValidationError::InvalidBudget));

        let mut form = trip_form("150");
        form.end_date = "   ".to_string();
        assert_eq!(form.validate(), Err(ValidationError::MissingTripFields));
    }

    #[test]
    fn test_parse_budget() {
        assert_eq!(parse_budget("150"), Ok(150.0));
        assert_eq!(parse_budget(" 89.50 "), Ok(89.5));
        assert_eq!(parse_budget(""), Ok(UNBOUNDED_NIGHTLY_BUDGET));
        assert_eq!(parse_budget("   "), Ok(UNBOUNDED_NIGHTLY_BUDGET));
        assert_eq!(parse_budget("cheap"), Err(ValidationError::InvalidBudget));
        assert_eq!(parse_budget("NaN"), Err(ValidationError::InvalidBudget));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::HotelChoice.to_string(), "hotel choice");
    }

    #[tokio::test]
    async fn test_unresolved_destination_does_not_advance() {
        let chat = Arc::new(ScriptedChat::travel_assistant());
        let mut wizard = TripWizard::new(services(&[("Chicago", "ORD")], FakeFlightSearch::empty(), chat.clone()));

        let err = wizard.submit_trip_basics(&trip_form("150")).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not find IATA code for destination: San Diego");
        assert!(err.is_user_facing());
        assert_eq!(wizard.stage(), Stage::TripBasics);
        assert_eq!(wizard.state(), &SessionState::default());
        assert!(chat.requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_budget_checked_before_lookups() {
        let chat = Arc::new(ScriptedChat::travel_assistant());
        let mut wizard = TripWizard::new(services(&[], FakeFlightSearch::empty(), chat));
        let err = wizard.submit_trip_basics(&trip_form("abc")).await.unwrap_err();
        assert!(matches!(err, TripError::Validation(ValidationError::InvalidBudget)));
    }

    #[tokio::test]
    async fn test_stages_cannot_be_skipped() {
        let chat = Arc::new(ScriptedChat::travel_assistant());
        let mut wizard = TripWizard::new(services(&[], FakeFlightSearch::empty(), chat));

        assert!(matches!(
            wizard.choose_hotel("Hotel 1"),
            Err(TripError::OutOfOrder {
                expected: Stage::HotelChoice,
                actual: Stage::TripBasics
            })
        ));
        assert!(wizard.submit_preferences("museums", "tacos").await.is_err());
        assert!(wizard.compose_summary().await.is_err());
        assert_eq!(wizard.stage(), Stage::TripBasics);
    }

    #[tokio::test]
    async fn test_empty_hotel_list_message() {
        let chat = Arc::new(ScriptedChat::with_hotels_answer("Sorry, I can't help with that."));
        let mut wizard = TripWizard::new(services(
            &[("Chicago", "ORD"), ("San Diego", "SAN")],
            FakeFlightSearch::empty(),
            chat.clone(),
        ));

        wizard.submit_trip_basics(&trip_form("")).await.unwrap();
        let state = wizard.state();
        assert!(state.hotels.is_empty());
        assert_eq!(state.hotel_text.as_deref(), Some(crate::NO_HOTELS_FOUND));
        assert_eq!(state.flight_text.as_deref(), Some(crate::NO_FLIGHT_OFFERS));
        // only the candidate request; no descriptions without candidates
        assert_eq!(chat.requests().len(), 1);
        assert!(chat.requests()[0].messages[1].content.contains("$999999.00 USD"));
    }

    #[tokio::test]
    async fn test_preferences_validation_keeps_stage() {
        let chat = Arc::new(ScriptedChat::travel_assistant());
        let mut wizard = TripWizard::new(services(
            &[("Chicago", "ORD"), ("San Diego", "SAN")],
            FakeFlightSearch::empty(),
            chat,
        ));
        let mut form = trip_form("150");
        form.start_date = "2024-07-05".to_string();
        form.end_date = "2024-07-01".to_string();
        wizard.submit_trip_basics(&form).await.unwrap();

        assert_eq!(
            wizard.choose_hotel("   ").unwrap_err().to_string(),
            "Please enter the hotel you wish to choose."
        );
        wizard.choose_hotel("Somewhere not on the list").unwrap();

        let err = wizard.submit_preferences("", "seafood").await.unwrap_err();
        assert!(matches!(err, TripError::Validation(ValidationError::MissingPreferences)));

        let err = wizard.submit_preferences("museums", "seafood").await.unwrap_err();
        assert!(matches!(err, TripError::Validation(ValidationError::EndBeforeStart)));
        assert_eq!(wizard.stage(), Stage::Preferences);
        assert!(wizard.state().itinerary_text.is_none());
        assert!(wizard.state().interests.is_none());
    }

    #[tokio::test]
    async fn test_llm_failure_is_reported_inline() {
        let chat = Arc::new(ScriptedChat::failing());
        let mut wizard = TripWizard::new(services(
            &[("Chicago", "ORD"), ("San Diego", "SAN")],
            FakeFlightSearch::empty(),
            chat,
        ));

        wizard.submit_trip_basics(&trip_form("150")).await.unwrap();
        wizard.choose_hotel("Hotel 1").unwrap();
        wizard.submit_preferences("museums", "seafood").await.unwrap();
        let summary = wizard.compose_summary().await.unwrap().to_string();

        assert!(summary.starts_with("An error occurred while calling the language model"));
        assert!(wizard
            .state()
            .itinerary_text
            .as_deref()
            .unwrap()
            .starts_with("An error occurred while calling the language model"));
        assert_eq!(wizard.stage(), Stage::Complete);
    }

    #[tokio::test]
    async fn test_summary_is_computed_once() {
        let chat = Arc::new(ScriptedChat::travel_assistant());
        let mut wizard = TripWizard::new(services(
            &[("Chicago", "ORD"), ("San Diego", "SAN")],
            FakeFlightSearch::empty(),
            chat.clone(),
        ));
        wizard.submit_trip_basics(&trip_form("150")).await.unwrap();
        wizard.choose_hotel("2").unwrap();
        wizard.submit_preferences("museums", "seafood").await.unwrap();
        wizard.compose_summary().await.unwrap();
        let calls = chat.requests().len();

        assert!(wizard.compose_summary().await.is_err());
        assert!(wizard.submit_preferences("hiking", "tacos").await.is_err());
        assert_eq!(chat.requests().len(), calls);
        assert_eq!(wizard.state().interests.as_deref(), Some("museums"));
    }
}
