//! Day-by-day itinerary from the LLM

use crate::llm::LlmGateway;
use crate::{TripError, ValidationError};
use chrono::NaiveDate;
use tracing::{info, instrument};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%B %d, %Y"];

fn parse_date(text: &str) -> Result<NaiveDate, ValidationError> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(|| ValidationError::UnparseableDate(format!("unrecognized date '{}'", text)))
}

/// Trip length in days, counting both the start and the end day.
///
/// A same-day trip is 1 day; an end date before the start date is rejected.
pub fn trip_length(start_date: &str, end_date: &str) -> Result<i64, ValidationError> {
    let start = parse_date(start_date)?;
    let end = parse_date(end_date)?;
    let days = (end - start).num_days() + 1;
    if days < 1 {
        return Err(ValidationError::EndBeforeStart);
    }
    Ok(days)
}

/// Everything the itinerary prompt is built from
#[derive(Debug, Clone, PartialEq)]
pub struct ItineraryRequest {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub hotel_name: String,
    pub interests: String,
    pub food: String,
}

impl ItineraryRequest {
    pub fn prompt(&self, total_days: i64) -> String {
        format!(
            "I am traveling to {} from {} to {} (a total of {} days) and staying at '{}'. \
             I enjoy {} and prefer {} cuisine. \
             Please create a day-by-day itinerary, providing at least one recommended activity \
             and one recommended restaurant for each day. Label each day as 'Day 1', 'Day 2', etc. \
             Focus on attractions and food options that match my preferences.",
            self.destination, self.start_date, self.end_date, total_days, self.hotel_name, self.interests, self.food
        )
    }
}

#[derive(Clone)]
pub struct ItineraryAdvisor {
    gateway: LlmGateway,
}

impl ItineraryAdvisor {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    /// Validate the dates, then ask for the plan in a single call
    #[instrument(level = "info", skip(self, request), fields(destination = %request.destination))]
    pub async fn plan(&self, request: &ItineraryRequest) -> Result<String, TripError> {
        let total_days = trip_length(&request.start_date, &request.end_date)?;
        info!(total_days, "Requesting itinerary");
        Ok(self.gateway.ask(&request.prompt(total_days)).await?)
    }
}
