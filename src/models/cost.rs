use crate::constants::DEFAULT_NUM_PEOPLE;
use crate::models::Place;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Trip cost estimate. Degrades to `totalCost: "unknown"` with `details`
/// and `error` when the model's answer can't be used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub total_cost: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CostEstimate {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

fn default_num_people() -> u32 {
    DEFAULT_NUM_PEOPLE
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostRequest {
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub places: Vec<Place>,
    #[serde(default = "default_num_people")]
    pub num_people: u32,
}

impl CostRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.origin.trim().is_empty() {
            return Err("origin is required".to_string());
        }
        if self.destination.trim().is_empty() {
            return Err("destination is required".to_string());
        }
        if self.num_people == 0 {
            return Err("numPeople must be at least 1".to_string());
        }
        Ok(())
    }
}
