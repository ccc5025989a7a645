use crate::errors::{AppError, Result};
use chrono::NaiveDate;
use regex::Regex;

pub struct Validator;

impl Validator {
    pub fn validate_email(email: &str) -> Result<()> {
        let email_regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .map_err(|e| AppError::InternalError(format!("Regex error: {}", e)))?;

        if !email_regex.is_match(email) {
            return Err(AppError::ValidationError("Invalid email format".to_string()));
        }

        if email.len() > 254 {
            return Err(AppError::ValidationError("Email too long".to_string()));
        }

        Ok(())
    }

    pub fn validate_habit_name(name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "Habit name must not be empty".to_string(),
            ));
        }
        if name.len() > 100 {
            return Err(AppError::ValidationError(
                "Habit name must be 100 characters or less".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_color(color: &str) -> Result<()> {
        let color_regex = Regex::new(r"^#[0-9A-Fa-f]{6}$")
            .map_err(|e| AppError::InternalError(format!("Regex error: {}", e)))?;

        if !color_regex.is_match(color) {
            return Err(AppError::ValidationError(
                "Color must be a hex value like #3B82F6".to_string(),
            ));
        }
        Ok(())
    }

    /// Mood, energy, and productivity are all scored on the same 1-10 scale.
    pub fn validate_score(label: &str, value: i64) -> Result<()> {
        if !(1..=10).contains(&value) {
            return Err(AppError::ValidationError(format!(
                "{} must be between 1 and 10",
                label
            )));
        }
        Ok(())
    }

    pub fn validate_target(target: f64) -> Result<()> {
        if !(1.0..=999.0).contains(&target) {
            return Err(AppError::ValidationError(
                "Target must be between 1 and 999".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_note(note: &str) -> Result<()> {
        if note.len() > 2000 {
            return Err(AppError::ValidationError(
                "Note must be 2000 characters or less".to_string(),
            ));
        }
        Ok(())
    }

    pub fn parse_date(value: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
            AppError::ValidationError(format!("Invalid date (expected YYYY-MM-DD): {}", value))
        })
    }

    pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
        if start > end {
            return Err(AppError::ValidationError(
                "Start date must not be after end date".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(Validator::validate_email("someone@example.com").is_ok());
        assert!(Validator::validate_email("not-an-email").is_err());
        assert!(Validator::validate_email("@example.com").is_err());
    }

    #[test]
    fn habit_name_bounds() {
        assert!(Validator::validate_habit_name("Read 20 pages").is_ok());
        assert!(Validator::validate_habit_name("   ").is_err());
        assert!(Validator::validate_habit_name(&"x".repeat(101)).is_err());
        assert!(Validator::validate_habit_name(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn color_must_be_hex() {
        assert!(Validator::validate_color("#3B82F6").is_ok());
        assert!(Validator::validate_color("#3b82f6").is_ok());
        assert!(Validator::validate_color("3B82F6").is_err());
        assert!(Validator::validate_color("#3B82F").is_err());
        assert!(Validator::validate_color("#GGGGGG").is_err());
    }

    #[test]
    fn score_range() {
        assert!(Validator::validate_score("mood", 1).is_ok());
        assert!(Validator::validate_score("mood", 10).is_ok());
        assert!(Validator::validate_score("mood", 0).is_err());
        assert!(Validator::validate_score("mood", 11).is_err());
    }

    #[test]
    fn target_range() {
        assert!(Validator::validate_target(1.0).is_ok());
        assert!(Validator::validate_target(999.0).is_ok());
        assert!(Validator::validate_target(0.5).is_err());
        assert!(Validator::validate_target(1000.0).is_err());
    }

    #[test]
    fn date_parsing_and_ranges() {
        let start = Validator::parse_date("2026-03-01").unwrap();
        let end = Validator::parse_date("2026-03-31").unwrap();
        assert!(Validator::validate_date_range(start, end).is_ok());
        assert!(Validator::validate_date_range(end, start).is_err());
        assert!(Validator::parse_date("03/01/2026").is_err());
    }
}
