use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusStatus {
    Active,
    Inactive,
    Maintenance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub bus_id: String,
    pub route: String,
    pub current_location: GeoPoint,
    pub next_stop: Option<String>,
    pub last_stop: Option<String>,
    pub eta: i64,
    pub capacity: i64,
    pub current_passengers: i64,
    pub available_seats: i64,
    pub occupancy_rate: f64,
    pub speed: f64,
    pub status: BusStatus,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub last_updated: DateTime<Utc>,
}

/// Live-mutable subset written back by the position simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMovement {
    pub location: GeoPoint,
    pub eta: i64,
    pub next_stop: Option<String>,
}

/// Live-mutable subset written back by the occupancy simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusOccupancy {
    pub current_passengers: i64,
    pub available_seats: i64,
    pub occupancy_rate: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBusView {
    pub id: String,
    pub route: String,
    pub lat: f64,
    pub lon: f64,
    pub eta: i64,
    pub next_stop: Option<String>,
    pub available_seats: i64,
    pub capacity: i64,
    pub occupancy_rate: f64,
    pub status: BusStatus,
}

impl From<Bus> for LiveBusView {
    fn from(bus: Bus) -> Self {
        LiveBusView {
            id: bus.bus_id,
            route: bus.route,
            lat: bus.current_location.lat,
            lon: bus.current_location.lon,
            eta: bus.eta,
            next_stop: bus.next_stop,
            available_seats: bus.available_seats,
            capacity: bus.capacity,
            occupancy_rate: bus.occupancy_rate,
            status: bus.status,
        }
    }
}
