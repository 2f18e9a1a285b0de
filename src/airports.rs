//! Airport code resolution
//!
//! Maps free-text city queries to IATA codes through the location search, and IATA
//! codes back to display city names through a bundled reference dataset. City-name
//! lookups are memoized per uppercased code for the life of the resolver.

use crate::amadeus::LocationSearch;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, instrument, warn};

/// One airport in the reference dataset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AirportRecord {
    pub iata: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Reference data keyed by uppercase IATA code
pub trait AirportDataset: Send + Sync {
    fn lookup(&self, code: &str) -> Option<AirportRecord>;
}

/// The airport list compiled into the binary from `airports.json`
#[derive(Debug, Clone)]
pub struct BundledAirports {
    records: HashMap<String, AirportRecord>,
}

impl BundledAirports {
    pub fn load() -> Result<Self, serde_json::Error> {
        Self::from_json(include_str!("airports.json"))
    }

    /// Build a dataset from a JSON array of records
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let list: Vec<AirportRecord> = serde_json::from_str(json)?;
        let records = list
            .into_iter()
            .map(|record| (record.iata.to_uppercase(), record))
            .collect();
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl AirportDataset for BundledAirports {
    fn lookup(&self, code: &str) -> Option<AirportRecord> {
        self.records.get(code).cloned()
    }
}

/// Entry of the upstream ICAO-keyed airport table the bundled dataset is built from
#[derive(Debug, Deserialize)]
struct UpstreamAirport {
    #[serde(default)]
    iata: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    country: String,
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Convert the upstream table (`{"KORD": {"iata": "ORD", ...}, ...}`) into bundled records.
///
/// Entries without a three-letter IATA code are dropped. When two entries share a code
/// the first in ICAO order wins. The result is sorted by code.
pub fn records_from_upstream(json: &str) -> Result<Vec<AirportRecord>, serde_json::Error> {
    let table: BTreeMap<String, UpstreamAirport> = serde_json::from_str(json)?;
    let mut by_code: BTreeMap<String, AirportRecord> = BTreeMap::new();

    for airport in table.into_values() {
        let code = airport.iata.trim().to_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            continue;
        }
        by_code.entry(code.clone()).or_insert(AirportRecord {
            iata: code,
            name: non_empty(airport.name),
            city: non_empty(airport.city),
            country: non_empty(airport.country),
        });
    }

    Ok(by_code.into_values().collect())
}

/// Title-case a city name that arrived in all capitals.
///
/// "SAN DIEGO" becomes "San Diego"; anything containing a lowercase letter is
/// returned unchanged.
pub fn fix_city_case(city_name: &str) -> String {
    let stripped = city_name.chars().filter(|c| *c != ' ');
    let mut has_upper = false;
    for c in stripped {
        if c.is_lowercase() {
            return city_name.to_string();
        }
        has_upper |= c.is_uppercase();
    }
    if !has_upper {
        return city_name.to_string();
    }

    let mut titled = String::with_capacity(city_name.len());
    let mut in_word = false;
    for c in city_name.chars() {
        if c.is_alphabetic() {
            if in_word {
                titled.extend(c.to_lowercase());
            } else {
                titled.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            titled.push(c);
            in_word = false;
        }
    }
    titled
}

/// Resolves city queries to codes and codes to city names
pub struct AirportCodeResolver {
    dataset: Arc<dyn AirportDataset>,
    locations: Arc<dyn LocationSearch>,
    cache: Mutex<HashMap<String, String>>,
    cache_limit: Option<usize>,
}

impl AirportCodeResolver {
    /// Create a resolver with an unbounded city-name cache
    pub fn new(dataset: Arc<dyn AirportDataset>, locations: Arc<dyn LocationSearch>) -> Self {
        Self {
            dataset,
            locations,
            cache: Mutex::new(HashMap::new()),
            cache_limit: None,
        }
    }

    /// Stop caching new codes once `limit` entries are held. Lookups past the limit
    /// still succeed, they just consult the dataset every time.
    pub fn with_cache_limit(mut self, limit: usize) -> Self {
        self.cache_limit = Some(limit);
        self
    }

    /// Display city name for an IATA code.
    ///
    /// Uses the record's `city`, then its `name`, then the uppercased code itself,
    /// and runs whichever it picked through [`fix_city_case`].
    pub fn resolve_city_name(&self, code: &str) -> String {
        let code_upper = code.to_uppercase();
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(city) = cache.get(&code_upper) {
            return city.clone();
        }

        let city = self
            .dataset
            .lookup(&code_upper)
            .and_then(|record| record.city.filter(|c| !c.is_empty()).or(record.name))
            .unwrap_or_else(|| code_upper.clone());
        let city = fix_city_case(&city);

        if self.cache_limit.map_or(true, |limit| cache.len() < limit) {
            cache.insert(code_upper, city.clone());
        } else {
            debug!(code = %code_upper, "City-name cache full, not caching");
        }
        city
    }

    /// IATA code of the first airport-or-city match for `query`.
    ///
    /// No match and a failed search both come back as `None`; the caller reports it to
    /// the user.
    #[instrument(level = "info", skip(self))]
    pub async fn resolve_code(&self, query: &str) -> Option<String> {
        match self.locations.search_locations(query).await {
            Ok(matches) => {
                let code = matches.into_iter().next().and_then(|location| location.iata_code);
                info!(code = code.as_deref(), "Resolved location query");
                code
            }
            Err(e) => {
                warn!(error = %e, "Location search failed");
                None
            }
        }
    }

    /// Number of codes currently cached
    pub fn cached_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
