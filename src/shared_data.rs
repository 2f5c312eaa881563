// src/shared_data.rs

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// The object classes the detector reports, in the order they appear in a
/// count vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleClass {
    Person,
    Bicycle,
    Car,
    Motorbike,
    Bus,
    Truck,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 6] = [
        VehicleClass::Person,
        VehicleClass::Bicycle,
        VehicleClass::Car,
        VehicleClass::Motorbike,
        VehicleClass::Bus,
        VehicleClass::Truck,
    ];
}

/// Per-class vehicle counts observed on one approach group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub person: u32,
    pub bicycle: u32,
    pub car: u32,
    pub motorbike: u32,
    pub bus: u32,
    pub truck: u32,
}

impl ClassCounts {
    /// Traffic-load score favoring heavy vehicles: buses and trucks count
    /// double relative to cars; other classes are excluded.
    pub fn weighted(&self) -> f64 {
        self.car as f64 + 2.0 * (self.bus as f64 + self.truck as f64)
    }

    pub fn add(&mut self, class: VehicleClass) {
        match class {
            VehicleClass::Person => self.person += 1,
            VehicleClass::Bicycle => self.bicycle += 1,
            VehicleClass::Car => self.car += 1,
            VehicleClass::Motorbike => self.motorbike += 1,
            VehicleClass::Bus => self.bus += 1,
            VehicleClass::Truck => self.truck += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.person + self.bicycle + self.car + self.motorbike + self.bus + self.truck
    }
}

/// One full observation of the intersection: per-class counts for every
/// approach group, published as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountSnapshot {
    pub timestamp: u64,
    pub groups: Vec<ClassCounts>,
}

/// Flat per-group row of a [`CountSnapshot`], for CSV persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountRecord {
    pub timestamp: u64,
    pub group: usize,
    pub person: u32,
    pub bicycle: u32,
    pub car: u32,
    pub motorbike: u32,
    pub bus: u32,
    pub truck: u32,
}

impl CountRecord {
    pub fn from_snapshot(snapshot: &CountSnapshot) -> Vec<CountRecord> {
        snapshot
            .groups
            .iter()
            .enumerate()
            .map(|(group, counts)| CountRecord {
                timestamp: snapshot.timestamp,
                group,
                person: counts.person,
                bicycle: counts.bicycle,
                car: counts.car,
                motorbike: counts.motorbike,
                bus: counts.bus,
                truck: counts.truck,
            })
            .collect()
    }
}

/// Emitted by the driver whenever the controller enters a new phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseEvent {
    pub timestamp: u64,
    pub phase_index: usize,
    /// Target duration of the phase just entered, in simulation seconds.
    pub duration: f64,
    pub adaptive: bool,
}

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_density_doubles_heavy_vehicles() {
        let counts = ClassCounts {
            car: 3,
            bus: 2,
            truck: 1,
            person: 7,
            bicycle: 4,
            motorbike: 5,
        };
        // 3 + 2 * (2 + 1); pedestrians, bicycles and motorbikes do not count.
        assert_eq!(counts.weighted(), 9.0);
    }

    #[test]
    fn add_routes_to_the_right_class() {
        let mut counts = ClassCounts::default();
        for class in VehicleClass::ALL {
            counts.add(class);
        }
        counts.add(VehicleClass::Truck);
        assert_eq!(counts.truck, 2);
        assert_eq!(counts.total(), 7);
    }
}
