use super::{AddToCartRequest, RemoveFromCartRequest, UserRequest, ValidationError, ValidationResult};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_MOBILE_LENGTH: usize = 20;
pub const MAX_FOOD_ID_LENGTH: usize = 64;
pub const MIN_CART_QUANTITY: i64 = 1;
pub const MAX_CART_QUANTITY: i64 = 1000;

impl Validate for UserRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        if let Some(mobile) = &self.mobile {
            validate_mobile(mobile)?;
        }
        Ok(())
    }
}

impl Validate for AddToCartRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_food_id(&self.food_id)?;
        validate_cart_quantity(self.quantity)?;
        Ok(())
    }
}

impl Validate for RemoveFromCartRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_food_id(&self.food_id)?;
        // An oversized removal just drops the line, so only the lower bound applies
        if let Some(quantity) = self.quantity {
            if quantity < MIN_CART_QUANTITY {
                return Err(ValidationError::OutOfRange {
                    field: "quantity".to_string(),
                    min: MIN_CART_QUANTITY.to_string(),
                    max: u32::MAX.to_string(),
                    value: quantity.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Validate a display name
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "name".to_string(),
        });
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max_length: MAX_NAME_LENGTH,
            actual_length: trimmed.chars().count(),
        });
    }

    if trimmed.chars().any(char::is_control) {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            value: name.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate an email address (shape only, no deliverability check)
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "email".to_string(),
        });
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max_length: MAX_EMAIL_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    let well_formed = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !trimmed.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !well_formed {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            expected: "local-part@domain.tld".to_string(),
        });
    }

    Ok(())
}

/// Validate a registration password
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min_length: MIN_PASSWORD_LENGTH,
            actual_length: password.chars().count(),
        });
    }

    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max_length: MAX_PASSWORD_LENGTH,
            actual_length: password.chars().count(),
        });
    }

    Ok(())
}

/// Validate an optional mobile number; blank means "not provided"
pub fn validate_mobile(mobile: &str) -> ValidationResult<()> {
    let trimmed = mobile.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    if trimmed.len() > MAX_MOBILE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "mobile".to_string(),
            max_length: MAX_MOBILE_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty()
        || !digits
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "mobile".to_string(),
            expected: "digits, optionally prefixed with '+'".to_string(),
        });
    }

    Ok(())
}

/// Validate food ID format
pub fn validate_food_id(food_id: &str) -> ValidationResult<()> {
    let trimmed = food_id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "food_id".to_string(),
        });
    }

    if trimmed.len() > MAX_FOOD_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: "food_id".to_string(),
            max_length: MAX_FOOD_ID_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "food_id".to_string(),
            expected: "Food ID must contain only alphanumeric characters, hyphens, and underscores"
                .to_string(),
        });
    }

    Ok(())
}

/// Validate a quantity being added to the cart
pub fn validate_cart_quantity(quantity: i64) -> ValidationResult<()> {
    if !(MIN_CART_QUANTITY..=MAX_CART_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: MIN_CART_QUANTITY.to_string(),
            max: MAX_CART_QUANTITY.to_string(),
            value: quantity.to_string(),
        });
    }

    Ok(())
}
