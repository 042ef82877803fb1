use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::bus::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrowdLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusStop {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub location: GeoPoint,
    pub crowd_level: CrowdLevel,
    pub vendor_blocked: bool,
    pub amenities: Vec<String>,
    pub bus_routes: Vec<String>,
    pub ticket_counter: bool,
}

/// Rider-reported condition at a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReport {
    Crowd,
    Vendor,
}

impl StopReport {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "crowd" => Some(StopReport::Crowd),
            "vendor" => Some(StopReport::Vendor),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusStopView {
    pub id: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub crowd_level: CrowdLevel,
    pub vendor_blocked: bool,
    pub amenities: Vec<String>,
}

impl From<BusStop> for BusStopView {
    fn from(stop: BusStop) -> Self {
        BusStopView {
            id: stop.id.map(|id| id.to_hex()),
            name: stop.name,
            lat: stop.location.lat,
            lon: stop.location.lon,
            crowd_level: stop.crowd_level,
            vendor_blocked: stop.vendor_blocked,
            amenities: stop.amenities,
        }
    }
}
