use chrono::Utc;

use crate::models::{
    bus::{Bus, BusStatus, GeoPoint},
    bus_stop::{BusStop, CrowdLevel},
};

struct StopSeed {
    name: &'static str,
    lat: f64,
    lon: f64,
    crowd: CrowdLevel,
    amenities: &'static [&'static str],
    routes: &'static [&'static str],
}

struct BusSeed {
    bus_id: &'static str,
    route: &'static str,
    lat: f64,
    lon: f64,
    next_stop: &'static str,
    last_stop: &'static str,
    eta: i64,
    capacity: i64,
    passengers: i64,
    speed: f64,
}

const STOPS: &[StopSeed] = &[
    StopSeed {
        name: "Majestic Bus Stand",
        lat: 12.9774,
        lon: 77.5711,
        crowd: CrowdLevel::High,
        amenities: &["Ticket Counter", "Waiting Area", "Food Court", "Restrooms"],
        routes: &["Vajra 1", "Vajra 2", "Big 10", "Big 5", "Airport"],
    },
    StopSeed {
        name: "Shivajinagar",
        lat: 12.9915,
        lon: 77.6037,
        crowd: CrowdLevel::Medium,
        amenities: &["Ticket Counter", "Waiting Area"],
        routes: &["Vajra 1", "Vajra 2", "Vajra 3"],
    },
    StopSeed {
        name: "Electronic City",
        lat: 12.8459,
        lon: 77.6633,
        crowd: CrowdLevel::Low,
        amenities: &["Ticket Counter", "Restrooms"],
        routes: &["Airport", "Big 10", "Vajra 4"],
    },
    StopSeed {
        name: "Whitefield",
        lat: 12.9698,
        lon: 77.7500,
        crowd: CrowdLevel::Medium,
        amenities: &["Ticket Counter", "Food Court", "Restrooms"],
        routes: &["Big 5", "Vajra 2", "City Circular"],
    },
    StopSeed {
        name: "Jayanagar",
        lat: 12.9279,
        lon: 77.5939,
        crowd: CrowdLevel::Low,
        amenities: &["Ticket Counter", "Waiting Area"],
        routes: &["Big 10", "Vajra 1", "Express 1"],
    },
];

const BUSES: &[BusSeed] = &[
    BusSeed {
        bus_id: "KA01AB1234",
        route: "Vajra 1",
        lat: 12.9774,
        lon: 77.5711,
        next_stop: "Majestic Bus Stand",
        last_stop: "Jayanagar",
        eta: 5,
        capacity: 50,
        passengers: 35,
        speed: 30.0,
    },
    BusSeed {
        bus_id: "KA01CD5678",
        route: "Vajra 2",
        lat: 12.9816,
        lon: 77.6046,
        next_stop: "Shivajinagar",
        last_stop: "Majestic Bus Stand",
        eta: 8,
        capacity: 50,
        passengers: 20,
        speed: 28.0,
    },
    BusSeed {
        bus_id: "KA01EF9012",
        route: "Big 10",
        lat: 12.9616,
        lon: 77.5846,
        next_stop: "Whitefield",
        last_stop: "Electronic City",
        eta: 12,
        capacity: 40,
        passengers: 38,
        speed: 35.0,
    },
    BusSeed {
        bus_id: "KA01GH3456",
        route: "Big 5",
        lat: 12.9916,
        lon: 77.6146,
        next_stop: "Majestic Bus Stand",
        last_stop: "Jayanagar",
        eta: 3,
        capacity: 40,
        passengers: 10,
        speed: 25.0,
    },
    BusSeed {
        bus_id: "KA01IJ7890",
        route: "Airport",
        lat: 12.9516,
        lon: 77.5746,
        next_stop: "Electronic City",
        last_stop: "Whitefield",
        eta: 15,
        capacity: 60,
        passengers: 45,
        speed: 32.0,
    },
];

pub fn demo_stops() -> Vec<BusStop> {
    STOPS
        .iter()
        .map(|s| BusStop {
            id: None,
            name: s.name.to_string(),
            location: GeoPoint { lat: s.lat, lon: s.lon },
            crowd_level: s.crowd,
            vendor_blocked: false,
            amenities: s.amenities.iter().map(|a| a.to_string()).collect(),
            bus_routes: s.routes.iter().map(|r| r.to_string()).collect(),
            ticket_counter: true,
        })
        .collect()
}

pub fn demo_buses() -> Vec<Bus> {
    let now = Utc::now();
    BUSES
        .iter()
        .map(|b| Bus {
            id: None,
            bus_id: b.bus_id.to_string(),
            route: b.route.to_string(),
            current_location: GeoPoint { lat: b.lat, lon: b.lon },
            next_stop: Some(b.next_stop.to_string()),
            last_stop: Some(b.last_stop.to_string()),
            eta: b.eta,
            capacity: b.capacity,
            current_passengers: b.passengers,
            available_seats: b.capacity - b.passengers,
            occupancy_rate: b.passengers as f64 / b.capacity as f64,
            speed: b.speed,
            status: BusStatus::Active,
            last_updated: now,
        })
        .collect()
}
