use crate::constants::UNKNOWN_TOTAL_COST;
use crate::models::{CostEstimate, Place};
use crate::services::gemini::TextGenerator;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

const UNSTRUCTURED_RESPONSE: &str = "unstructured response";
const GENERATION_FAILED: &str = "failed to generate cost estimate";

fn json_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json[ \t]*\r?\n(.*?)```").expect("fence pattern is valid"))
}

fn any_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)```").expect("fence pattern is valid")
    })
}

pub struct CostEstimator {
    generator: Arc<dyn TextGenerator>,
}

impl CostEstimator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        CostEstimator { generator }
    }

    /// Ask the model for a cost breakdown. Never fails; problems show up in
    /// the estimate's `error` field.
    pub async fn estimate_cost(
        &self,
        origin: &str,
        destination: &str,
        places: &[Place],
        num_people: u32,
    ) -> CostEstimate {
        let prompt = cost_prompt(origin, destination, places, num_people);

        match self.generator.generate(&prompt).await {
            Ok(text) => {
                let estimate = parse_cost_response(&text);
                if estimate.is_degraded() {
                    tracing::warn!("Cost answer was not valid JSON, returning raw text");
                } else {
                    tracing::info!(
                        total = %estimate.total_cost,
                        "Cost estimate for {} -> {} ({} people)",
                        origin,
                        destination,
                        num_people
                    );
                }
                estimate
            }
            Err(e) => {
                tracing::warn!("Cost estimate generation failed: {}", e);
                CostEstimate {
                    total_cost: UNKNOWN_TOTAL_COST.to_string(),
                    breakdown: None,
                    details: None,
                    error: Some(GENERATION_FAILED.to_string()),
                }
            }
        }
    }
}

fn cost_prompt(origin: &str, destination: &str, places: &[Place], num_people: u32) -> String {
    let stops = if places.is_empty() {
        "no additional stops".to_string()
    } else {
        places
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Estimate the cost of a road trip by car from {origin} to {destination} for {num_people} people, visiting these places along the way: {stops}.

Please provide a detailed breakdown including:
1. Fuel costs (estimate distance, average fuel consumption, and current fuel prices)
2. Accommodation costs (assuming mid-range hotels/accommodations)
3. Food and dining expenses (average per person per day)
4. Entrance fees for attractions (estimate based on typical costs)
5. Miscellaneous expenses (parking, tolls, etc.)

Format the response as a JSON object with these categories as properties, including both the individual category costs and a totalCost property for the whole trip."
    )
}

/// The JSON payload inside model output: a ```json fence, any fence, or the
/// whole text, in that order.
pub fn extract_json_block(text: &str) -> &str {
    json_fence_re()
        .captures(text)
        .or_else(|| any_fence_re().captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
        .trim()
}

pub fn parse_cost_response(text: &str) -> CostEstimate {
    let block = extract_json_block(text);

    match serde_json::from_str::<Value>(block) {
        Ok(Value::Object(breakdown)) => CostEstimate {
            total_cost: total_of(&breakdown),
            breakdown: Some(breakdown),
            details: None,
            error: None,
        },
        _ => CostEstimate {
            total_cost: UNKNOWN_TOTAL_COST.to_string(),
            breakdown: None,
            details: Some(text.to_string()),
            error: Some(UNSTRUCTURED_RESPONSE.to_string()),
        },
    }
}

/// First top-level key mentioning "total".
fn total_of(breakdown: &Map<String, Value>) -> String {
    breakdown
        .iter()
        .find(|(key, _)| key.to_lowercase().contains("total"))
        .map(|(_, value)| match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Null => UNKNOWN_TOTAL_COST.to_string(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| UNKNOWN_TOTAL_COST.to_string())
}
