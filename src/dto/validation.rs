//! Validation helpers for content items.

use validator::ValidationError;

/// Validates that exactly one entry of a list of flags is set.
///
/// # Examples
///
/// ```ignore
/// validate_exactly_one(&[false, true, false]) // Ok
/// validate_exactly_one(&[true, true])         // Err - two answers
/// validate_exactly_one(&[false, false])       // Err - no answer
/// ```
pub fn validate_exactly_one(flags: &[bool], code: &'static str, what: &str) -> Result<(), ValidationError> {
    let count = flags.iter().filter(|flag| **flag).count();
    if count != 1 {
        let mut err = ValidationError::new(code);
        err.message = Some(format!("expected exactly one {what} (got {count})").into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a numeric range is ordered and contains `value`.
pub fn validate_range_contains(min: f64, max: f64, value: f64) -> Result<(), ValidationError> {
    if !(min.is_finite() && max.is_finite() && value.is_finite()) {
        let mut err = ValidationError::new("range_not_finite");
        err.message = Some("range bounds and answer must be finite numbers".into());
        return Err(err);
    }

    if min > max {
        let mut err = ValidationError::new("range_order");
        err.message = Some(format!("range minimum {min} exceeds maximum {max}").into());
        return Err(err);
    }

    if value < min || value > max {
        let mut err = ValidationError::new("range_contains");
        err.message = Some(format!("answer {value} lies outside [{min}, {max}]").into());
        return Err(err);
    }

    Ok(())
}

/// Validates that `answer` is one of `options`.
pub fn validate_listed(options: &[String], answer: &str) -> Result<(), ValidationError> {
    if !options.iter().any(|option| option == answer) {
        let mut err = ValidationError::new("answer_not_listed");
        err.message = Some(format!("answer `{answer}` is not among the options").into());
        return Err(err);
    }
    Ok(())
}

/// Validates that no entry of a list is blank.
pub fn validate_no_blank(values: &[String]) -> Result<(), ValidationError> {
    if values.iter().any(|value| value.trim().is_empty()) {
        let mut err = ValidationError::new("blank_entry");
        err.message = Some("entries must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_exactly_one() {
        assert!(validate_exactly_one(&[false, true, false], "one", "answer").is_ok());
        assert!(validate_exactly_one(&[true, true], "one", "answer").is_err());
        assert!(validate_exactly_one(&[false, false], "one", "answer").is_err());
        assert!(validate_exactly_one(&[], "one", "answer").is_err());
    }

    #[test]
    fn test_validate_range_contains() {
        assert!(validate_range_contains(0.0, 100.0, 42.0).is_ok());
        assert!(validate_range_contains(5.0, 5.0, 5.0).is_ok());
        assert!(validate_range_contains(10.0, 0.0, 5.0).is_err()); // reversed
        assert!(validate_range_contains(0.0, 10.0, 11.0).is_err()); // outside
        assert!(validate_range_contains(0.0, f64::NAN, 1.0).is_err()); // not finite
    }

    #[test]
    fn test_validate_listed_and_blank() {
        let options = vec!["denial".to_string(), "projection".to_string()];
        assert!(validate_listed(&options, "denial").is_ok());
        assert!(validate_listed(&options, "humor").is_err());
        assert!(validate_no_blank(&options).is_ok());
        assert!(validate_no_blank(&["ok".to_string(), "  ".to_string()]).is_err());
    }
}
