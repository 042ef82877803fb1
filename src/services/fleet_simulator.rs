//! Demo fleet motion and occupancy.
//!
//! Pure step functions over a caller-supplied RNG; the handlers persist the
//! results through the store.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use rand::Rng;

use crate::models::{
    bus::{Bus, BusMovement, BusOccupancy, GeoPoint},
    bus_stop::BusStop,
};

pub const LAT_BOUNDS: (f64, f64) = (12.80, 13.10);
pub const LON_BOUNDS: (f64, f64) = (77.50, 77.80);
pub const MAX_JITTER_DEG: f64 = 0.005;
pub const MIN_ETA: i64 = 1;

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn step_movement<R: Rng + ?Sized>(bus: &Bus, stops: &[BusStop], rng: &mut R) -> BusMovement {
    let lat = bus.current_location.lat + rng.gen_range(-MAX_JITTER_DEG..=MAX_JITTER_DEG);
    let lon = bus.current_location.lon + rng.gen_range(-MAX_JITTER_DEG..=MAX_JITTER_DEG);
    let location = GeoPoint {
        lat: lat.clamp(LAT_BOUNDS.0, LAT_BOUNDS.1),
        lon: lon.clamp(LON_BOUNDS.0, LON_BOUNDS.1),
    };

    let eta = (bus.eta - 1).max(MIN_ETA);
    if eta > MIN_ETA || stops.is_empty() {
        return BusMovement {
            location,
            eta,
            next_stop: bus.next_stop.clone(),
        };
    }

    // Arrived: head for a new stop.
    let next = &stops[rng.gen_range(0..stops.len())];
    BusMovement {
        location,
        eta: rng.gen_range(5..20),
        next_stop: Some(next.name.clone()),
    }
}

/// 08-11 and 17-20 local time.
pub fn is_rush_hour(hour: u32) -> bool {
    (8..=11).contains(&hour) || (17..=20).contains(&hour)
}

pub fn local_hour(now: DateTime<Utc>) -> u32 {
    match FixedOffset::east_opt(IST_OFFSET_SECS) {
        Some(ist) => now.with_timezone(&ist).hour(),
        None => now.hour(),
    }
}

pub fn step_occupancy<R: Rng + ?Sized>(bus: &Bus, hour: u32, rng: &mut R) -> BusOccupancy {
    let delta = if is_rush_hour(hour) {
        rng.gen_range(3..=7)
    } else {
        rng.gen_range(-3..=2)
    };
    occupancy_for(bus.capacity, bus.current_passengers + delta)
}

pub fn occupancy_for(capacity: i64, riders: i64) -> BusOccupancy {
    let capacity = capacity.max(0);
    let current_passengers = riders.clamp(0, capacity);
    let occupancy_rate = if capacity == 0 {
        0.0
    } else {
        current_passengers as f64 / capacity as f64
    };

    BusOccupancy {
        current_passengers,
        available_seats: capacity - current_passengers,
        occupancy_rate,
    }
}
