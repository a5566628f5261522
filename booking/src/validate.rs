//! Request validation for registration intake.
//!
//! Validation collects every offending field instead of failing on the
//! first one, so a client can fix the whole form in one round trip.

use crate::error::FieldError;
use crate::intake::RegistrationRequest;

/// Validate email address format.
///
/// Basic RFC 5322 validation: exactly one `@`, non-empty local and domain
/// parts, a dotted domain, and a conservative character set.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return false;
    }

    if !domain.contains('.') {
        return false;
    }

    let valid_local_chars =
        |c: char| c.is_alphanumeric() || c == '.' || c == '-' || c == '+' || c == '_';
    let valid_domain_chars = |c: char| c.is_alphanumeric() || c == '.' || c == '-';

    if !local.chars().all(valid_local_chars) {
        return false;
    }

    if !domain.chars().all(valid_domain_chars) {
        return false;
    }

    domain.split('.').all(|part| !part.is_empty())
}

/// Validate phone number format.
///
/// Accepts 8 to 15 digits with an optional leading `+`; separators
/// (spaces, dashes) are tolerated and ignored.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    let trimmed = phone.trim();
    let rest = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let digits: Vec<char> = rest
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    (8..=15).contains(&digits.len()) && digits.iter().all(char::is_ascii_digit)
}

/// Field checks that need no database access.
///
/// The event-dependent checks (per-event ticket cap, capacity) run in the
/// intake service after the event row is loaded.
#[must_use]
pub fn validate_static(request: &RegistrationRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if request.name.trim().is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    }

    if !is_valid_email(&request.email) {
        errors.push(FieldError::new("email", "invalid email format"));
    }

    if !is_valid_phone(&request.phone) {
        errors.push(FieldError::new("phone", "invalid phone format"));
    }

    if request.tickets < 1 {
        errors.push(FieldError::new("tickets", "must be at least 1"));
    }

    if request.tickets > 1 {
        match &request.ticket_details {
            None => {
                errors.push(FieldError::new(
                    "ticket_details",
                    "required when tickets > 1",
                ));
            }
            Some(details) => {
                if details.len() != request.tickets as usize {
                    errors.push(FieldError::new(
                        "ticket_details",
                        format!(
                            "expected {} entries, got {}",
                            request.tickets,
                            details.len()
                        ),
                    ));
                }
                for (index, detail) in details.iter().enumerate() {
                    if detail.name.trim().is_empty() {
                        errors.push(FieldError::new(
                            format!("ticket_details[{index}].name"),
                            "must not be empty",
                        ));
                    }
                    if let Some(email) = &detail.email {
                        if !is_valid_email(email) {
                            errors.push(FieldError::new(
                                format!("ticket_details[{index}].email"),
                                "invalid email format",
                            ));
                        }
                    }
                }
            }
        }
    }

    errors
}
