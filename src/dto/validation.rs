//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a venue is present once surrounding whitespace is ignored.
///
/// # Examples
///
/// ```ignore
/// validate_venue("Stade Charléty") // Ok
/// validate_venue("   ")            // Err - blank
/// ```
pub fn validate_venue(venue: &str) -> Result<(), ValidationError> {
    if venue.trim().is_empty() {
        let mut err = ValidationError::new("venue_blank");
        err.message = Some("Venue must not be empty".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_venue_valid() {
        assert!(validate_venue("Stade Charléty").is_ok());
        assert!(validate_venue("  City Park pitch 3 ").is_ok());
    }

    #[test]
    fn test_validate_venue_blank() {
        assert!(validate_venue("").is_err());
        assert!(validate_venue(" \t\n").is_err());
    }

    #[test]
    fn test_validate_venue_long_label() {
        assert!(validate_venue(&"Terrain synthétique ".repeat(20)).is_ok());
    }
}
