//! Text → coordinates by lexical lookup.
//!
//! Case-insensitive substring search over a static place table, longest names
//! first, so "Tehran" wins over "Iran" and "Strait of Hormuz" over "Hormuz".
//! Collisions with person names are accepted.

use crate::ingest::types::Location;
use once_cell::sync::Lazy;

struct Place {
    name: &'static str,
    lat: f64,
    lng: f64,
    country: Option<&'static str>,
}

const fn place(name: &'static str, lat: f64, lng: f64, country: Option<&'static str>) -> Place {
    Place {
        name,
        lat,
        lng,
        country,
    }
}

const PLACES: &[Place] = &[
    // Iran
    place("Iran", 32.43, 53.69, Some("Iran")),
    place("Tehran", 35.69, 51.39, Some("Iran")),
    place("Isfahan", 32.65, 51.67, Some("Iran")),
    place("Natanz", 33.51, 51.92, Some("Iran")),
    place("Bushehr", 28.96, 50.83, Some("Iran")),
    place("Fordow", 34.88, 51.59, Some("Iran")),
    place("Arak", 34.09, 49.68, Some("Iran")),
    place("Bandar Abbas", 27.18, 56.27, Some("Iran")),
    place("Kharg Island", 29.24, 50.31, Some("Iran")),
    place("Chabahar", 25.29, 60.64, Some("Iran")),
    place("Tabriz", 38.08, 46.29, Some("Iran")),
    // Gulf
    place("Strait of Hormuz", 26.59, 56.47, Some("Iran")),
    place("Hormuz", 26.59, 56.47, Some("Iran")),
    place("Persian Gulf", 26.0, 52.0, None),
    // Israel / Palestine
    place("Israel", 31.05, 34.85, Some("Israel")),
    place("Tel Aviv", 32.08, 34.78, Some("Israel")),
    place("Jerusalem", 31.77, 35.23, Some("Israel")),
    place("Haifa", 32.79, 34.99, Some("Israel")),
    place("Gaza", 31.50, 34.47, Some("Palestine")),
    place("Rafah", 31.28, 34.25, Some("Palestine")),
    place("West Bank", 31.95, 35.20, Some("Palestine")),
    place("Golan Heights", 33.15, 35.77, Some("Israel")),
    // Lebanon / Syria
    place("Lebanon", 33.85, 35.86, Some("Lebanon")),
    place("Beirut", 33.89, 35.50, Some("Lebanon")),
    place("Syria", 34.80, 38.99, Some("Syria")),
    place("Damascus", 33.51, 36.29, Some("Syria")),
    place("Aleppo", 36.20, 37.15, Some("Syria")),
    // Iraq
    place("Iraq", 33.22, 43.68, Some("Iraq")),
    place("Baghdad", 33.31, 44.37, Some("Iraq")),
    place("Erbil", 36.19, 44.01, Some("Iraq")),
    place("Basra", 30.51, 47.81, Some("Iraq")),
    // Yemen / Red Sea
    place("Yemen", 15.55, 48.52, Some("Yemen")),
    place("Sanaa", 15.37, 44.19, Some("Yemen")),
    place("Aden", 12.79, 45.03, Some("Yemen")),
    place("Red Sea", 20.0, 38.0, None),
    place("Bab el-Mandeb", 12.58, 43.32, None),
    // Saudi Arabia
    place("Riyadh", 24.71, 46.67, Some("Saudi Arabia")),
    place("Jeddah", 21.49, 39.19, Some("Saudi Arabia")),
    // Turkey
    place("Ankara", 39.93, 32.85, Some("Turkey")),
    place("Istanbul", 41.01, 28.98, Some("Turkey")),
    // Egypt
    place("Cairo", 30.04, 31.24, Some("Egypt")),
    place("Suez Canal", 30.46, 32.35, Some("Egypt")),
    // Russia / Ukraine
    place("Ukraine", 48.38, 31.17, Some("Ukraine")),
    place("Russia", 55.75, 37.62, Some("Russia")),
    place("Kyiv", 50.45, 30.52, Some("Ukraine")),
    place("Moscow", 55.75, 37.62, Some("Russia")),
    place("Kharkiv", 49.99, 36.23, Some("Ukraine")),
    place("Crimea", 44.95, 34.10, Some("Ukraine")),
    place("Donbas", 48.00, 38.00, Some("Ukraine")),
    // East Asia
    place("Taiwan", 23.70, 120.96, Some("Taiwan")),
    place("Taipei", 25.03, 121.56, Some("Taiwan")),
    place("Taiwan Strait", 24.50, 119.50, None),
    place("Pyongyang", 39.02, 125.75, Some("North Korea")),
    place("Seoul", 37.57, 126.98, Some("South Korea")),
    place("Tokyo", 35.68, 139.69, Some("Japan")),
    place("Beijing", 39.90, 116.40, Some("China")),
    place("South China Sea", 15.0, 115.0, None),
    // Major capitals
    place("Washington", 38.91, -77.04, Some("USA")),
    place("Washington DC", 38.91, -77.04, Some("USA")),
    place("London", 51.51, -0.13, Some("UK")),
    place("Paris", 48.86, 2.35, Some("France")),
    place("Berlin", 52.52, 13.41, Some("Germany")),
    place("Brussels", 50.85, 4.35, Some("Belgium")),
    place("New York", 40.71, -74.01, Some("USA")),
    // Africa
    place("Sudan", 12.86, 30.22, Some("Sudan")),
    place("Khartoum", 15.50, 32.56, Some("Sudan")),
    place("Somalia", 5.15, 46.20, Some("Somalia")),
    place("Mogadishu", 2.05, 45.32, Some("Somalia")),
    place("Libya", 26.34, 17.23, Some("Libya")),
    place("Ethiopia", 9.15, 40.49, Some("Ethiopia")),
    // South Asia
    place("Afghanistan", 33.94, 67.71, Some("Afghanistan")),
    place("Kabul", 34.53, 69.17, Some("Afghanistan")),
    place("Pakistan", 30.38, 69.35, Some("Pakistan")),
    place("Islamabad", 33.69, 73.04, Some("Pakistan")),
    place("India", 20.59, 78.96, Some("India")),
    place("New Delhi", 28.61, 77.21, Some("India")),
    place("China", 35.86, 104.20, Some("China")),
    place("North Korea", 40.34, 127.51, Some("North Korea")),
    place("South Korea", 35.91, 127.77, Some("South Korea")),
    place("Japan", 36.20, 138.25, Some("Japan")),
    // Organizations
    place("United Nations", 40.75, -73.97, Some("USA")),
    place("NATO", 50.88, 4.43, Some("Belgium")),
    place("Pentagon", 38.87, -77.06, Some("USA")),
];

/// `(lowercased name, place)`, longest name first; ties keep table order.
static BY_LENGTH: Lazy<Vec<(String, &'static Place)>> = Lazy::new(|| {
    let mut v: Vec<_> = PLACES.iter().map(|p| (p.name.to_lowercase(), p)).collect();
    v.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    v
});

/// Resolve the most specific known place mentioned in `text`.
pub fn geocode(text: &str) -> Option<Location> {
    let haystack = text.to_lowercase();
    BY_LENGTH
        .iter()
        .find(|(key, _)| haystack.contains(key.as_str()))
        .map(|(_, p)| Location {
            lat: p.lat,
            lng: p.lng,
            name: p.name.to_string(),
            country: p.country.map(str::to_string),
        })
}
