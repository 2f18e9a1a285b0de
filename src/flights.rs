//! Single flight-offer lookup and its text rendering

use crate::airports::AirportCodeResolver;
use crate::amadeus::{FlightOfferQuery, FlightSearch};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Text shown when the search produced no offer
pub const NO_FLIGHT_OFFERS: &str = "No flight offers found for these dates.";

/// A priced flight option as returned by the flight-offer search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightOffer {
    pub price: OfferPrice,
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
}

/// Total price, kept as the decimal string the API sends
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferPrice {
    pub total: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    crate::amadeus::CURRENCY_CODE.to_string()
}

/// One direction of travel (outbound or return)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Itinerary {
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// One point-to-point leg
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub departure: SegmentEndpoint,
    pub arrival: SegmentEndpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEndpoint {
    pub iata_code: String,
    /// Local time at the airport; the API sends no offset
    pub at: NaiveDateTime,
}

impl FlightOffer {
    /// All segments across all itineraries, in itinerary order
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.itineraries.iter().flat_map(|itinerary| itinerary.segments.iter())
    }
}

/// Fetch at most one offer for a round trip.
///
/// Service failures are logged and reported as `None`, the same as an empty result.
#[instrument(level = "info", skip(search))]
pub async fn fetch_one_offer(
    search: &dyn FlightSearch,
    origin: &str,
    destination: &str,
    start_date: &str,
    end_date: &str,
    adults: u32,
) -> Option<FlightOffer> {
    let query = FlightOfferQuery {
        origin: origin.to_string(),
        destination: destination.to_string(),
        departure_date: start_date.to_string(),
        return_date: end_date.to_string(),
        adults,
    };

    match search.search_flight_offers(&query).await {
        Ok(offers) => {
            info!(offers_found = offers.len(), "Flight-offer search completed");
            offers.into_iter().next()
        }
        Err(e) => {
            warn!(error = %e, "Flight-offer search failed");
            None
        }
    }
}

/// Render an offer for display, resolving every airport code to a city name.
///
/// Segments are numbered from 1 across the whole offer, not per itinerary.
pub fn format_offer(offer: Option<&FlightOffer>, resolver: &AirportCodeResolver) -> String {
    let Some(offer) = offer else {
        return NO_FLIGHT_OFFERS.to_string();
    };

    let mut lines = vec![
        "Flight detail".to_string(),
        format!("Total Price (per adult): ${}\n", offer.price.total),
    ];

    for (index, segment) in offer.segments().enumerate() {
        lines.push(format!("Segment {}:", index + 1));
        push_endpoint(&mut lines, "From", &segment.departure, resolver);
        push_endpoint(&mut lines, "To", &segment.arrival, resolver);
    }

    lines.join("\n")
}

fn push_endpoint(lines: &mut Vec<String>, label: &str, endpoint: &SegmentEndpoint, resolver: &AirportCodeResolver) {
    let city = resolver.resolve_city_name(&endpoint.iata_code);
    lines.push(format!("  {}: {} ({})", label, city, endpoint.iata_code));
    lines.push(format!("  Date: {}", endpoint.at.format("%B %d, %Y")));
    lines.push(format!("  Time: {}\n", endpoint.at.format("%I:%M %p")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{offer, resolver_with_locations, FakeFlightSearch};

    #[test]
    fn test_format_empty_offer() {
        let resolver = resolver_with_locations(&[]);
        assert_eq!(format_offer(None, &resolver), "No flight offers found for these dates.");
    }

    #[test]
    fn test_format_single_segment() {
        let resolver = resolver_with_locations(&[]);
        let offer = offer(
            "355.34",
            &[&[("ORD", "2024-07-01T08:15:00", "SAN", "2024-07-01T10:30:00")]],
        );

        let text = format_offer(Some(&offer), &resolver);
        let expected = "Flight detail\n\
                        Total Price (per adult): $355.34\n\
                        \n\
                        Segment 1:\n  \
                        From: Chicago (ORD)\n  \
                        Date: July 01, 2024\n  \
                        Time: 08:15 AM\n\
                        \n  \
                        To: San Diego (SAN)\n  \
                        Date: July 01, 2024\n  \
                        Time: 10:30 AM\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_segment_numbering_spans_itineraries() {
        let resolver = resolver_with_locations(&[]);
        let offer = offer(
            "412.00",
            &[
                &[
                    ("ORD", "2024-07-01T08:15:00", "DEN", "2024-07-01T09:45:00"),
                    ("DEN", "2024-07-01T11:00:00", "SAN", "2024-07-01T12:40:00"),
                ],
                &[("SAN", "2024-07-05T18:05:00", "ORD", "2024-07-06T00:10:00")],
            ],
        );

        let text = format_offer(Some(&offer), &resolver);
        assert!(text.contains("Segment 1:"));
        assert!(text.contains("Segment 2:"));
        assert!(text.contains("Segment 3:"));
        assert!(!text.contains("Segment 4:"));
        assert!(text.find("Segment 2:").unwrap() < text.find("Segment 3:").unwrap());
        assert!(text.contains("From: Denver (DEN)"));
        assert!(text.contains("Time: 06:05 PM"));
        assert!(text.contains("Date: July 06, 2024"));
    }

    #[test]
    fn test_unknown_code_falls_back_to_code() {
        let resolver = resolver_with_locations(&[]);
        let offer = offer("99.00", &[&[("ZZZ", "2024-07-01T08:15:00", "SAN", "2024-07-01T10:30:00")]]);
        assert!(format_offer(Some(&offer), &resolver).contains("From: Zzz (ZZZ)"));
    }

    #[tokio::test]
    async fn test_fetch_one_offer_takes_first() {
        let first = offer("100.00", &[&[("ORD", "2024-07-01T08:15:00", "SAN", "2024-07-01T10:30:00")]]);
        let second = offer("200.00", &[&[("ORD", "2024-07-01T09:15:00", "SAN", "2024-07-01T11:30:00")]]);
        let search = FakeFlightSearch::with_offers(vec![first.clone(), second]);

        let result = fetch_one_offer(&search, "ORD", "SAN", "2024-07-01", "2024-07-05", 1).await;
        assert_eq!(result, Some(first));

        let queries = search.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].origin, "ORD");
        assert_eq!(queries[0].return_date, "2024-07-05");
        assert_eq!(queries[0].adults, 1);
    }

    #[tokio::test]
    async fn test_fetch_one_offer_swallows_errors() {
        let search = FakeFlightSearch::failing();
        let result = fetch_one_offer(&search, "ORD", "SAN", "2024-07-01", "2024-07-05", 1).await;
        assert!(result.is_none());
    }
}
