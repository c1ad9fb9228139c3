//! Real Phuket locations for realistic itinerary fixtures.
//!
//! Coordinates sourced from OpenStreetMap. Opening hours are the venues'
//! published hours at the time of writing.

use itinerary_planner::memory::InMemoryPlaceDirectory;
use itinerary_planner::ticks::ClockTime;
use itinerary_planner::traits::PlaceDetails;

/// A named place with coordinates and optional business hours.
#[derive(Debug, Clone)]
pub struct Location {
    pub id: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
    /// `(open, close)` as `HH:MM`.
    pub hours: Option<(&'static str, &'static str)>,
}

impl Location {
    pub const fn new(id: &'static str, name: &'static str, lat: f64, lng: f64) -> Self {
        Self {
            id,
            name,
            lat,
            lng,
            hours: None,
        }
    }

    pub const fn open(mut self, open: &'static str, close: &'static str) -> Self {
        self.hours = Some((open, close));
        self
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    pub fn details(&self) -> PlaceDetails {
        let details = PlaceDetails::at(self.lat, self.lng);
        match self.hours {
            Some((open, close)) => details.with_hours(clock(open), clock(close)),
            None => details,
        }
    }
}

fn clock(text: &str) -> ClockTime {
    text.parse().expect("fixture clock times are valid")
}

// ============================================================================
// Accommodation
// ============================================================================

pub const HOTEL: Location = Location::new("H0001", "Patong Beach Hotel", 7.8921, 98.2986);

// ============================================================================
// Attractions
// ============================================================================

pub const ATTRACTIONS: &[Location] = &[
    Location::new("A0001", "Big Buddha", 7.8276, 98.3126).open("08:00", "19:30"),
    Location::new("A0002", "Wat Chalong", 7.8467, 98.3369).open("07:00", "17:00"),
    Location::new("A0003", "Phuket Old Town", 7.8840, 98.3880),
    Location::new("A0004", "Karon Viewpoint", 7.7717, 98.3036),
    Location::new("A0005", "Promthep Cape", 7.7617, 98.3056),
    Location::new("A0006", "Kata Beach", 7.8206, 98.2980),
    Location::new("A0007", "Phuket Weekend Night Market", 7.8681, 98.3730).open("16:00", "23:00"),
    Location::new("A0008", "Bangla Road", 7.8937, 98.2968).open("18:00", "02:00"),
];

pub fn attraction(id: &str) -> &'static Location {
    ATTRACTIONS
        .iter()
        .find(|location| location.id == id)
        .expect("unknown fixture attraction")
}

/// Directory containing the hotel and every attraction.
pub fn directory() -> InMemoryPlaceDirectory {
    ATTRACTIONS
        .iter()
        .fold(
            InMemoryPlaceDirectory::new().with_place(HOTEL.id, HOTEL.details()),
            |directory, location| directory.with_place(location.id, location.details()),
        )
}
