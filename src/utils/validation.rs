use crate::utils::error::{StageError, StageResult};

pub trait Validate {
    type Error;

    fn validate(&self) -> Result<(), Self::Error>;
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> StageResult<()> {
    if value.trim().is_empty() {
        return Err(StageError::InvalidInput {
            field: field_name.to_string(),
            expected: "a non-empty, non-whitespace string".to_string(),
            value: format!("{:?}", value),
        });
    }
    Ok(())
}

/// Rejects zero, negative, NaN and infinite values.
pub fn validate_positive(field_name: &str, value: f64) -> StageResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(StageError::InvalidInput {
            field: field_name.to_string(),
            expected: "a positive finite number".to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_empty_list<T>(field_name: &str, values: &[T]) -> StageResult<()> {
    if values.is_empty() {
        return Err(StageError::InvalidInput {
            field: field_name.to_string(),
            expected: "at least one entry".to_string(),
            value: "[]".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> StageResult<()> {
    if value < min || value > max {
        return Err(StageError::InvalidInput {
            field: field_name.to_string(),
            expected: format!("a value between {} and {}", min, max),
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("user_request", "cable blanket").is_ok());
        assert!(validate_non_empty_string("user_request", "").is_err());
        assert!(validate_non_empty_string("user_request", "  \t\n").is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive("gauge.stitches_per_inch", 4.0).is_ok());
        assert!(validate_positive("gauge.stitches_per_inch", 0.0).is_err());
        assert!(validate_positive("gauge.stitches_per_inch", -1.5).is_err());
        assert!(validate_positive("gauge.stitches_per_inch", f64::NAN).is_err());
        assert!(validate_positive("gauge.stitches_per_inch", f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_non_empty_list() {
        assert!(validate_non_empty_list::<u8>("construction_zones", &[]).is_err());
        assert!(validate_non_empty_list("construction_zones", &[1]).is_ok());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("default_width", 48.0, 0.1, 200.0).is_ok());
        let err = validate_range("default_width", 250.0, 0.1, 200.0).unwrap_err();
        assert!(err.to_string().contains("between 0.1 and 200"));
    }
}
