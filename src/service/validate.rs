//! Field checks run before anything is persisted.

use crate::{
    errors::ValidationError,
    models::{Event, UNLIMITED_SPOTS},
};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_NAME_LEN: usize = 3;
pub const MIN_TITLE_LEN: usize = 3;
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Emails are compared trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Same shape as `^[^\s@]+@[^\s@]+\.[^\s@]+$`.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::new("email", format!("\"{email}\" is not a valid email"));
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let dotted = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !dotted {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::new("password", "password is missing"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            "password",
            format!("password should be at least {MIN_PASSWORD_LEN} characters long"),
        ));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().chars().count() < MIN_NAME_LEN {
        return Err(ValidationError::new(
            "name",
            format!("name should be at least {MIN_NAME_LEN} characters long"),
        ));
    }
    Ok(())
}

pub fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ValidationError> {
    if let Some(lat) = latitude {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::new("latitude", "latitude must be within [-90, 90]"));
        }
    }
    if let Some(long) = longitude {
        if !(-180.0..=180.0).contains(&long) {
            return Err(ValidationError::new("longitude", "longitude must be within [-180, 180]"));
        }
    }
    Ok(())
}

pub fn validate_event(event: &Event) -> Result<(), ValidationError> {
    if event.title.chars().count() < MIN_TITLE_LEN {
        return Err(ValidationError::new(
            "title",
            format!("title should be at least {MIN_TITLE_LEN} characters long"),
        ));
    }
    if event.description.chars().count() < MIN_DESCRIPTION_LEN {
        return Err(ValidationError::new(
            "description",
            format!("description should be at least {MIN_DESCRIPTION_LEN} characters long"),
        ));
    }
    if event.address.is_empty() {
        return Err(ValidationError::new("address", "address is required"));
    }
    validate_coordinates(Some(event.latitude), Some(event.longitude))?;
    if event.spots < UNLIMITED_SPOTS {
        return Err(ValidationError::new(
            "spots",
            "spots must be a non-negative number, or -1 for unlimited",
        ));
    }
    if event.end_date <= event.start_date {
        return Err(ValidationError::new("endDate", "the end date has to be after the start date"));
    }
    Ok(())
}

/// Capacity may not drop below the volunteers already signed up.
pub fn validate_capacity(event: &Event) -> Result<(), ValidationError> {
    if !event.is_unlimited() && event.volunteers.len() as i64 > i64::from(event.spots) {
        return Err(ValidationError::new(
            "spots",
            format!("{} volunteers are already signed up", event.volunteers.len()),
        ));
    }
    Ok(())
}
