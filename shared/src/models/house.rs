//! Chicken houses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InventoryError;

/// A chicken house and its current flock size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChickenHouse {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub capacity: i32,
    pub current_chicken_count: i32,
    /// Worker responsible for the house; receives its distributions
    pub worker_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChickenHouse {
    pub fn available_capacity(&self) -> i32 {
        (self.capacity - self.current_chicken_count).max(0)
    }

    /// Add chickens to the house. Exceeding capacity is rejected outright.
    pub fn add_chickens(&mut self, count: i32) -> Result<(), InventoryError> {
        if count <= 0 {
            return Err(InventoryError::validation(
                "number_of_chickens",
                "Number of chickens must be positive",
            ));
        }

        let requested = i64::from(self.current_chicken_count) + i64::from(count);
        if requested > i64::from(self.capacity) {
            return Err(InventoryError::CapacityExceeded {
                capacity: self.capacity,
                requested,
            });
        }

        self.current_chicken_count += count;
        Ok(())
    }

    /// Remove dead chickens, never going below zero. Returns how many were
    /// actually removed.
    pub fn record_deaths(&mut self, count: i32) -> i32 {
        let removed = count.clamp(0, self.current_chicken_count);
        self.current_chicken_count -= removed;
        removed
    }
}
