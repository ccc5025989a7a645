use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// How a habit counts as done for a day: a plain checkbox, or a number
/// measured against a daily target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HabitType {
    Boolean,
    Quantity,
}

impl HabitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HabitType::Boolean => "boolean",
            HabitType::Quantity => "quantity",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "boolean" => Ok(HabitType::Boolean),
            "quantity" => Ok(HabitType::Quantity),
            other => Err(AppError::ValidationError(format!(
                "Unknown habit type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Habit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub habit_type: HabitType,
    pub target: Option<f64>,
    pub color: String,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
