//! Resource catalog: food types and medicines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A kind of chicken feed, stocked in sacks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A medicine, stocked in its own unit of measure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// e.g. "ml", "tablets", "grams"
    pub unit_of_measure: String,
    pub created_at: DateTime<Utc>,
}
