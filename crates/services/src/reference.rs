//! Static reference data: departments and railway zones.
//!
//! Loaded once from an embedded JSON document; read-only lookups only.

use serde::Deserialize;

const REFERENCE_JSON: &str = include_str!("reference_data.json");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Department {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RailwayZone {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceData {
    departments: Vec<Department>,
    railway_zones: Vec<RailwayZone>,
}

impl ReferenceData {
    pub fn load() -> Result<Self, serde_json::Error> {
        serde_json::from_str(REFERENCE_JSON)
    }

    pub fn departments(&self) -> &[Department] {
        &self.departments
    }

    pub fn railway_zones(&self) -> &[RailwayZone] {
        &self.railway_zones
    }

    pub fn department(&self, code: &str) -> Option<&Department> {
        self.departments.iter().find(|d| d.code == code)
    }

    pub fn railway_zone(&self, code: &str) -> Option<&RailwayZone> {
        self.railway_zones.iter().find(|z| z.code == code)
    }
}
