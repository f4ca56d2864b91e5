//! Fixed weather sampling points, grouped by grid zone.
//!
//! External zones (`H Q`, `O H`, `PJM`, `NPX`) are represented by a single
//! proxy city in the neighbouring region.

use grid_ingest_source_models::WeatherLocation;

const fn loc(zone: &'static str, name: &'static str, latitude: f64, longitude: f64) -> WeatherLocation {
    WeatherLocation {
        zone,
        name,
        latitude,
        longitude,
    }
}

/// Every sampling point, in zone order.
pub const WEATHER_LOCATIONS: &[WeatherLocation] = &[
    // ── Upstate ──────────────────────────────────────────────────────
    loc("WEST", "Buffalo", 42.8864, -78.8784),
    loc("WEST", "Rochester", 43.1566, -77.6088),
    loc("WEST", "Jamestown", 42.0970, -79.2353),
    loc("GENESE", "Rochester Airport", 43.1189, -77.6724),
    loc("GENESE", "Hornell", 42.3276, -77.6611),
    loc("GENESE", "Geneseo", 42.7959, -77.8172),
    loc("CENTRL", "Syracuse", 43.0481, -76.1474),
    loc("CENTRL", "Oswego", 43.4553, -76.5105),
    loc("CENTRL", "Cortland", 42.6012, -76.1816),
    loc("MHK VL", "Utica", 43.1009, -75.2327),
    loc("MHK VL", "Rome", 43.2128, -75.4557),
    loc("MHK VL", "Amsterdam", 42.9377, -74.1903),
    loc("NORTH", "Watertown", 43.9748, -75.9108),
    loc("NORTH", "Plattsburgh", 44.6995, -73.4529),
    loc("NORTH", "Massena", 44.9281, -74.8919),
    loc("CAPITL", "Albany", 42.6526, -73.7562),
    loc("CAPITL", "Schenectady", 42.8142, -73.9396),
    loc("CAPITL", "Glens Falls", 43.3095, -73.6440),
    // ── Downstate ────────────────────────────────────────────────────
    loc("HUD VL", "Poughkeepsie", 41.7004, -73.9210),
    loc("HUD VL", "Kingston", 41.9270, -74.0000),
    loc("HUD VL", "Middletown", 41.4459, -74.4229),
    loc("MILLWD", "Yorktown Heights", 41.2631, -73.7739),
    loc("MILLWD", "Mount Kisco", 41.2043, -73.7271),
    loc("DUNWOD", "Yonkers", 40.9312, -73.8987),
    loc("DUNWOD", "White Plains", 41.0340, -73.7629),
    loc("N.Y.C.", "Central Park", 40.7829, -73.9654),
    loc("N.Y.C.", "JFK Airport", 40.6413, -73.7781),
    loc("N.Y.C.", "LaGuardia", 40.7769, -73.8740),
    loc("LONGIL", "Islip", 40.7282, -73.2141),
    loc("LONGIL", "Montauk", 41.0359, -71.9545),
    loc("LONGIL", "Garden City", 40.7268, -73.6343),
    // ── External proxies ─────────────────────────────────────────────
    loc("H Q", "Montreal (Proxy)", 45.5017, -73.5673),
    loc("O H", "Toronto (Proxy)", 43.6532, -79.3832),
    loc("PJM", "Allentown PA (Proxy)", 40.6023, -75.4714),
    loc("NPX", "Bridgeport CT (Proxy)", 41.1792, -73.1894),
];

/// Returns every sampling point.
#[must_use]
pub fn all_locations() -> Vec<WeatherLocation> {
    WEATHER_LOCATIONS.to_vec()
}

/// Returns the sampling points for one zone (empty if the zone is unknown).
#[must_use]
pub fn locations_for_zone(zone: &str) -> Vec<WeatherLocation> {
    WEATHER_LOCATIONS
        .iter()
        .filter(|l| l.zone == zone)
        .copied()
        .collect()
}
