//! Vehicle and cargo profiles and the trip economics they imply.
//!
//! None of this feeds the learning signal directly except for humanitarian
//! cargo, which switches its agent to the [`Objective::Time`] reward.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::agent::Objective;
use crate::error::SimError;

/// Price of a litre of diesel.
pub const PRICE_DIESEL: f64 = 15_000.0;
/// Price of a kWh of electricity.
pub const PRICE_ELECTRIC: f64 = 2_500.0;
/// Driver wage per km driven.
pub const DRIVER_WAGE_KM: f64 = 3_000.0;
/// Reputation never exceeds this.
pub const REPUTATION_CAP: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Diesel,
    Electric,
}

impl FuelType {
    pub fn unit_price(self) -> f64 {
        match self {
            FuelType::Diesel => PRICE_DIESEL,
            FuelType::Electric => PRICE_ELECTRIC,
        }
    }
}

/// Physical characteristics of a vehicle class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleProfile {
    pub label: &'static str,
    /// kg CO₂ per km.
    pub co2_per_km: f64,
    /// km per litre, or per kWh for electric vehicles.
    pub efficiency: f64,
    pub fuel: FuelType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    #[default]
    Diesel,
    Hybrid,
    Ev,
    Lng,
}

impl VehicleKind {
    pub const ALL: [VehicleKind; 4] = [
        VehicleKind::Diesel,
        VehicleKind::Hybrid,
        VehicleKind::Ev,
        VehicleKind::Lng,
    ];

    pub fn profile(self) -> VehicleProfile {
        match self {
            VehicleKind::Diesel => VehicleProfile {
                label: "Diesel Heavy",
                co2_per_km: 2.6,
                efficiency: 3.0,
                fuel: FuelType::Diesel,
            },
            VehicleKind::Hybrid => VehicleProfile {
                label: "Hybrid Wingbox",
                co2_per_km: 1.8,
                efficiency: 5.0,
                fuel: FuelType::Diesel,
            },
            VehicleKind::Ev => VehicleProfile {
                label: "Electric Semi",
                co2_per_km: 0.0,
                efficiency: 1.0,
                fuel: FuelType::Electric,
            },
            // Priced as diesel-equivalent.
            VehicleKind::Lng => VehicleProfile {
                label: "LNG Truck",
                co2_per_km: 1.2,
                efficiency: 3.5,
                fuel: FuelType::Diesel,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleKind::Diesel => "diesel",
            VehicleKind::Hybrid => "hybrid",
            VehicleKind::Ev => "ev",
            VehicleKind::Lng => "lng",
        }
    }
}

/// Commercial characteristics of a cargo class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CargoProfile {
    pub label: &'static str,
    /// Scales operating cost (handling, insurance).
    pub cost_multiplier: f64,
    pub base_revenue: f64,
    /// Reputation earned per delivery.
    pub reputation: u32,
    /// Emergency cargo is routed for time, not profit.
    pub emergency: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CargoKind {
    #[default]
    General,
    Cold,
    Danger,
    Express,
    Humanitarian,
}

impl CargoKind {
    pub const ALL: [CargoKind; 5] = [
        CargoKind::General,
        CargoKind::Cold,
        CargoKind::Danger,
        CargoKind::Express,
        CargoKind::Humanitarian,
    ];

    pub fn profile(self) -> CargoProfile {
        let commercial = |label, cost_multiplier, base_revenue| CargoProfile {
            label,
            cost_multiplier,
            base_revenue,
            reputation: 0,
            emergency: false,
        };
        match self {
            CargoKind::General => commercial("General Goods", 1.0, 25_000_000.0),
            CargoKind::Cold => commercial("Cold Chain", 1.8, 65_000_000.0),
            CargoKind::Danger => commercial("Hazardous", 2.5, 85_000_000.0),
            CargoKind::Express => commercial("Express", 1.5, 45_000_000.0),
            CargoKind::Humanitarian => CargoProfile {
                label: "Disaster Relief",
                cost_multiplier: 0.5,
                base_revenue: 15_000_000.0,
                reputation: 100,
                emergency: true,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CargoKind::General => "general",
            CargoKind::Cold => "cold",
            CargoKind::Danger => "danger",
            CargoKind::Express => "express",
            CargoKind::Humanitarian => "humanitarian",
        }
    }
}

macro_rules! str_enum {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = SimError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase();
                $ty::ALL
                    .into_iter()
                    .find(|k| k.as_str() == wanted)
                    .ok_or_else(|| SimError::validation(format!(concat!("Unknown ", $what, ": {}"), s)))
            }
        }
    };
}

str_enum!(VehicleKind, "vehicle");
str_enum!(CargoKind, "cargo");

/// Vehicle and cargo an agent operates with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FleetAssignment {
    pub vehicle: VehicleKind,
    pub cargo: CargoKind,
}

impl FleetAssignment {
    pub fn new(vehicle: VehicleKind, cargo: CargoKind) -> Self {
        Self { vehicle, cargo }
    }

    /// Reward objective this assignment trains under.
    pub fn objective(&self) -> Objective {
        if self.cargo.profile().emergency {
            Objective::Time
        } else {
            Objective::Profit
        }
    }

    /// Money and emissions for a trip of `distance_km`.
    pub fn economics(&self, distance_km: f64) -> TripEconomics {
        let vehicle = self.vehicle.profile();
        let cargo = self.cargo.profile();

        let fuel_needed = distance_km / vehicle.efficiency;
        let fuel_cost = fuel_needed * vehicle.fuel.unit_price();
        let labor_cost = distance_km * DRIVER_WAGE_KM;
        let cost = (fuel_cost + labor_cost) * cargo.cost_multiplier;

        TripEconomics {
            fuel_needed,
            cost,
            revenue: cargo.base_revenue,
            profit: cargo.base_revenue - cost,
            co2_kg: distance_km * vehicle.co2_per_km,
        }
    }
}

/// Outcome of one trip under a [`FleetAssignment`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TripEconomics {
    pub fuel_needed: f64,
    pub cost: f64,
    pub revenue: f64,
    pub profit: f64,
    pub co2_kg: f64,
}
