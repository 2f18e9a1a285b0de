//! Hotel suggestions from the LLM
//!
//! The model is asked for exactly five hotels as a bare JSON array. Anything else
//! (prose, an object, four or six entries) is discarded whole; there is no partial
//! acceptance and no retry. Each accepted hotel then gets its own description call.

use crate::llm::{LlmError, LlmGateway};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use tracing::{info, instrument, warn};

/// Number of hotels a candidate response must contain
pub const HOTEL_COUNT: usize = 5;

/// Hotel text shown when no candidates could be obtained
pub const NO_HOTELS_FOUND: &str = "No hotels found by the assistant or an error occurred.";

/// A hotel as proposed by the model. Price is free text such as "Approx. 120".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotelCandidate {
    pub name: String,
    pub price: String,
    pub address: String,
}

impl HotelCandidate {
    /// Read one array entry, filling in placeholders for missing fields
    fn from_value(value: &Value) -> Self {
        Self {
            name: text_field(value, "name").unwrap_or_else(|| "Unknown Hotel".to_string()),
            price: text_field(value, "price").unwrap_or_else(|| "N/A".to_string()),
            address: text_field(value, "address").unwrap_or_else(|| "N/A".to_string()),
        }
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A candidate together with its generated description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotelSummary {
    /// 1-based position in the candidate list
    pub index: usize,
    pub hotel: HotelCandidate,
    pub description: String,
}

impl fmt::Display for HotelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hotel Option #{}", self.index)?;
        writeln!(f, "Name: {}", self.hotel.name)?;
        writeln!(f, "Approx. Price/Night: {}", self.hotel.price)?;
        writeln!(f, "Address: {}", self.hotel.address)?;
        writeln!(f, "Description: {}", self.description)
    }
}

/// Join summaries into the hotel text block shown to the user
pub fn render_summaries(summaries: &[HotelSummary]) -> String {
    if summaries.is_empty() {
        return NO_HOTELS_FOUND.to_string();
    }
    summaries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn language_tag() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"^(?i:json)\s*\n").expect("static regex is valid"))
}

/// Remove stray markdown code fences around a model answer
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim().trim_matches('`');
    let untagged = match language_tag().find(trimmed) {
        Some(tag) => &trimmed[tag.end()..],
        None => trimmed,
    };
    untagged.trim()
}

/// Parse a candidate response; `None` unless it is a JSON array of exactly five entries
pub fn parse_candidates(raw: &str) -> Option<Vec<HotelCandidate>> {
    let cleaned = strip_code_fences(raw);
    let value: Value = match serde_json::from_str(cleaned) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, response = raw, "Failed to parse hotel data as JSON");
            return None;
        }
    };

    match value {
        Value::Array(entries) if entries.len() == HOTEL_COUNT => {
            Some(entries.iter().map(HotelCandidate::from_value).collect())
        }
        Value::Array(entries) => {
            warn!(count = entries.len(), "Model did not return a list of exactly 5 hotels");
            None
        }
        _ => {
            warn!("Model returned JSON that is not a list of hotels");
            None
        }
    }
}

pub fn candidates_prompt(destination: &str, max_nightly_budget: f64) -> String {
    format!(
        "Recommend exactly 5 real hotels in {destination} that typically have an average \
         nightly rate at or under ${max_nightly_budget:.2} USD. \
         Only provide valid JSON with no code fences or extra text. The response must look like:\n\
         [\n  \
           {{\n    \
             \"name\": \"Hotel Name\",\n    \
             \"price\": \"Approx. 120\",\n    \
             \"address\": \"123 Street, City\"\n  \
           }},\n  \
           ... (5 total) ...\n\
         ]"
    )
}

pub fn description_prompt(hotel_name: &str, address: &str, approx_price: &str) -> String {
    format!(
        "Write a short, engaging description for a hotel named '{hotel_name}' located in the destination. \
         The approximate nightly rate is {approx_price}. Its address is: {address}. \
         Highlight proximity to popular landmarks or city centers, and the general vibe."
    )
}

/// Hotel recommendations built on the LLM gateway
#[derive(Clone)]
pub struct HotelAdvisor {
    gateway: LlmGateway,
}

impl HotelAdvisor {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    /// Exactly five hotels at or under the budget, or an empty list
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_candidates(&self, destination: &str, max_nightly_budget: f64) -> Vec<HotelCandidate> {
        let prompt = candidates_prompt(destination, max_nightly_budget);
        let raw = match self.gateway.ask(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Hotel candidate request failed");
                return Vec::new();
            }
        };

        let candidates = parse_candidates(&raw).unwrap_or_default();
        info!(candidates = candidates.len(), "Hotel candidates fetched");
        candidates
    }

    /// Short promotional blurb for one hotel
    pub async fn describe(&self, hotel_name: &str, address: &str, approx_price: &str) -> Result<String, LlmError> {
        self.gateway
            .ask(&description_prompt(hotel_name, address, approx_price))
            .await
    }

    /// Describe every candidate, one call at a time.
    ///
    /// A failed description is replaced by the inline error notice so the list keeps
    /// all its entries.
    pub async fn summarize(&self, candidates: &[HotelCandidate]) -> Vec<HotelSummary> {
        let mut summaries = Vec::with_capacity(candidates.len());
        for (i, hotel) in candidates.iter().enumerate() {
            let description = match self.describe(&hotel.name, &hotel.address, &hotel.price).await {
                Ok(text) => text,
                Err(e) => e.inline_notice(),
            };
            summaries.push(HotelSummary {
                index: i + 1,
                hotel: hotel.clone(),
                description,
            });
        }
        summaries
    }
}
