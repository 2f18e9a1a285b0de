//! In-memory fakes for the external services, shared by the unit tests

use crate::airports::{AirportCodeResolver, AirportDataset, AirportRecord, BundledAirports};
use crate::amadeus::{FlightOfferQuery, FlightSearch, Location, LocationSearch, TravelApiError};
use crate::flights::{FlightOffer, Itinerary, OfferPrice, Segment, SegmentEndpoint};
use crate::llm::{ChatMessage, ChatRequest, ChatResponse, ChatTransport, Choice, LlmError, LlmGateway};
use crate::wizard::{TripForm, TripServices};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Location search answering from a fixed table
pub struct FakeLocationSearch {
    table: HashMap<String, Vec<String>>,
    fail: bool,
}

impl FakeLocationSearch {
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            table: HashMap::new(),
            fail: true,
        }
    }

    pub fn with(entries: &[(&str, &[&str])]) -> Self {
        let table = entries
            .iter()
            .map(|(query, codes)| (query.to_string(), codes.iter().map(|c| c.to_string()).collect()))
            .collect();
        Self { table, fail: false }
    }
}

#[async_trait]
impl LocationSearch for FakeLocationSearch {
    async fn search_locations(&self, keyword: &str) -> Result<Vec<Location>, TravelApiError> {
        if self.fail {
            return Err(TravelApiError::Authentication("invalid_client".to_string()));
        }
        Ok(self
            .table
            .get(keyword)
            .map(|codes| {
                codes
                    .iter()
                    .map(|code| Location {
                        iata_code: Some(code.clone()),
                        name: None,
                        sub_type: Some("AIRPORT".to_string()),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Flight search returning canned offers and recording every query
pub struct FakeFlightSearch {
    offers: Vec<FlightOffer>,
    fail: bool,
    queries: Mutex<Vec<FlightOfferQuery>>,
}

impl FakeFlightSearch {
    pub fn with_offers(offers: Vec<FlightOffer>) -> Self {
        Self {
            offers,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_offers(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::empty()
        }
    }

    pub fn queries(&self) -> Vec<FlightOfferQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl FlightSearch for FakeFlightSearch {
    async fn search_flight_offers(&self, query: &FlightOfferQuery) -> Result<Vec<FlightOffer>, TravelApiError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail {
            return Err(TravelApiError::Service {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(self.offers.clone())
    }
}

/// The bundled dataset, counting how often it is consulted
pub struct CountingDataset {
    inner: BundledAirports,
    lookups: AtomicUsize,
}

impl CountingDataset {
    pub fn new() -> Self {
        Self {
            inner: BundledAirports::load().unwrap(),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl AirportDataset for CountingDataset {
    fn lookup(&self, code: &str) -> Option<AirportRecord> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(code)
    }
}

enum Script {
    Always(String),
    TravelAssistant { hotels_answer: String },
    Fail,
    NoChoices,
}

/// Chat transport answering from a script and recording every request
pub struct ScriptedChat {
    script: Script,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    fn new(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Same answer to every prompt
    pub fn always(answer: &str) -> Self {
        Self::new(Script::Always(answer.to_string()))
    }

    /// Answers each wizard prompt with something shaped like a real reply
    pub fn travel_assistant() -> Self {
        Self::with_hotels_answer(&hotels_json(5))
    }

    pub fn with_hotels_answer(answer: &str) -> Self {
        Self::new(Script::TravelAssistant {
            hotels_answer: answer.to_string(),
        })
    }

    pub fn failing() -> Self {
        Self::new(Script::Fail)
    }

    pub fn no_choices() -> Self {
        Self::new(Script::NoChoices)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn reply(content: String) -> ChatResponse {
    ChatResponse {
        choices: vec![Choice {
            message: ChatMessage {
                role: "assistant".to_string(),
                content,
            },
        }],
    }
}

#[async_trait]
impl ChatTransport for ScriptedChat {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse, LlmError> {
        self.requests.lock().unwrap().push(req.clone());
        let prompt = req.messages.last().map(|m| m.content.as_str()).unwrap_or_default();

        match &self.script {
            Script::Always(answer) => Ok(reply(answer.clone())),
            Script::Fail => Err(LlmError::Authentication("Incorrect API key provided".to_string())),
            Script::NoChoices => Ok(ChatResponse { choices: Vec::new() }),
            Script::TravelAssistant { hotels_answer } => {
                let answer = if prompt.starts_with("Recommend exactly 5") {
                    hotels_answer.clone()
                } else if prompt.starts_with("Write a short, engaging description") {
                    "A bright, breezy stay a short walk from the waterfront.".to_string()
                } else if prompt.starts_with("I am traveling to") {
                    "Day 1: Balboa Park, dinner at a fish market.\nDay 2: La Jolla Cove, tacos.".to_string()
                } else {
                    "Here is your final trip summary.".to_string()
                };
                Ok(reply(answer))
            }
        }
    }
}

/// A JSON array of `count` hotels
pub fn hotels_json(count: usize) -> String {
    let entries: Vec<serde_json::Value> = (1..=count)
        .map(|i| {
            serde_json::json!({
                "name": format!("Hotel {}", i),
                "price": format!("Approx. {}", 100 + i * 10),
                "address": format!("{} Harbor Dr, San Diego", i),
            })
        })
        .collect();
    serde_json::to_string_pretty(&entries).unwrap()
}

/// An offer whose itineraries are lists of `(from, departs, to, arrives)` legs
pub fn offer(total: &str, itineraries: &[&[(&str, &str, &str, &str)]]) -> FlightOffer {
    let endpoint = |code: &str, at: &str| SegmentEndpoint {
        iata_code: code.to_string(),
        at: NaiveDateTime::parse_from_str(at, "%Y-%m-%dT%H:%M:%S").unwrap(),
    };
    FlightOffer {
        price: OfferPrice {
            total: total.to_string(),
            currency: "USD".to_string(),
        },
        itineraries: itineraries
            .iter()
            .map(|legs| Itinerary {
                segments: legs
                    .iter()
                    .map(|(from, departs, to, arrives)| Segment {
                        departure: endpoint(from, departs),
                        arrival: endpoint(to, arrives),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Resolver over the bundled dataset and a one-code-per-query location table
pub fn resolver_with_locations(locations: &[(&str, &str)]) -> AirportCodeResolver {
    let table: Vec<(&str, [&str; 1])> = locations.iter().map(|(query, code)| (*query, [*code])).collect();
    let entries: Vec<(&str, &[&str])> = table.iter().map(|(query, codes)| (*query, &codes[..])).collect();
    AirportCodeResolver::new(
        Arc::new(BundledAirports::load().unwrap()),
        Arc::new(FakeLocationSearch::with(&entries)),
    )
}

pub fn services(locations: &[(&str, &str)], flights: FakeFlightSearch, chat: Arc<ScriptedChat>) -> TripServices {
    TripServices::new(
        Arc::new(resolver_with_locations(locations)),
        Arc::new(flights),
        LlmGateway::new(chat, "gpt-4o"),
    )
}

pub fn trip_form(budget: &str) -> TripForm {
    TripForm {
        departure: "Chicago".to_string(),
        destination: "San Diego".to_string(),
        start_date: "2024-07-01".to_string(),
        end_date: "2024-07-05".to_string(),
        budget: budget.to_string(),
    }
}
