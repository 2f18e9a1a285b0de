//! Final trip summary composed by the LLM from the earlier artifacts

use crate::llm::{LlmError, LlmGateway};
use tracing::instrument;

/// The artifacts the summary is built from, embedded verbatim in the prompt
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryInputs<'a> {
    pub departure: &'a str,
    pub destination: &'a str,
    pub flight_text: &'a str,
    pub hotel_text: &'a str,
    pub chosen_hotel: &'a str,
    pub itinerary_text: &'a str,
}

impl SummaryInputs<'_> {
    pub fn prompt(&self) -> String {
        format!(
            "Create a concise final travel summary that includes:\n\n\
             1) The single flight option from {} to {}:\n{}\n\n\
             2) The five recommended hotels under the user's budget, and the chosen hotel: {}.\n\
             Hotel options:\n{}\n\n\
             3) Day-by-day activities & restaurants recommended:\n{}\n\n\
             Please format it nicely for the user, but do not ask for more data.",
            self.departure, self.destination, self.flight_text, self.chosen_hotel, self.hotel_text, self.itinerary_text
        )
    }
}

#[derive(Clone)]
pub struct SummaryComposer {
    gateway: LlmGateway,
}

impl SummaryComposer {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    #[instrument(level = "info", skip_all)]
    pub async fn compose(&self, inputs: &SummaryInputs<'_>) -> Result<String, LlmError> {
        self.gateway.ask(&inputs.prompt()).await
    }
}
