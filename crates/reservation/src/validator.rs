//! Well-formedness and availability checks for booking requests.

use crate::error::{BookingError, Field};

/// Minimum number of characters in a first or last name.
pub const DEFAULT_MIN_NAME_LENGTH: usize = 2;

/// Outcome of validating a booking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    pub name_ok: bool,
    pub email_ok: bool,
    pub count_ok: bool,
}

impl Validation {
    /// Returns true if every check passed.
    pub fn is_valid(&self) -> bool {
        self.name_ok && self.email_ok && self.count_ok
    }

    /// Converts the first failed check (name, email, tickets) into an error.
    pub fn into_result(self) -> Result<(), BookingError> {
        let field = if !self.name_ok {
            Field::Name
        } else if !self.email_ok {
            Field::Email
        } else if !self.count_ok {
            Field::Tickets
        } else {
            return Ok(());
        };
        Err(BookingError::ValidationFailed { field })
    }
}

/// Pure validator for booking requests.
///
/// The email check is structural only: exactly one `@` with a `.` somewhere
/// after it. It does not attempt RFC 5322 validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validator {
    min_name_length: usize,
}

impl Validator {
    /// Creates a validator requiring names of at least `min_name_length` characters.
    pub fn new(min_name_length: usize) -> Self {
        Self { min_name_length }
    }

    pub fn min_name_length(&self) -> usize {
        self.min_name_length
    }

    /// Validates a request against the currently remaining ticket count.
    pub fn validate(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        requested_tickets: u32,
        remaining_tickets: u32,
    ) -> Validation {
        Validation {
            name_ok: self.is_valid_name(first_name) && self.is_valid_name(last_name),
            email_ok: is_valid_email(email),
            count_ok: is_valid_ticket_count(requested_tickets, remaining_tickets),
        }
    }

    /// Returns true if the trimmed name is long enough.
    pub fn is_valid_name(&self, name: &str) -> bool {
        name.trim().chars().count() >= self.min_name_length
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_NAME_LENGTH)
    }
}

/// Validates a request with the default name length threshold.
pub fn validate(
    first_name: &str,
    last_name: &str,
    email: &str,
    requested_tickets: u32,
    remaining_tickets: u32,
) -> Validation {
    Validator::default().validate(
        first_name,
        last_name,
        email,
        requested_tickets,
        remaining_tickets,
    )
}

/// Exactly one `@`, followed somewhere by a `.`.
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(domain), None) => domain.contains('.'),
        _ => false,
    }
}

pub fn is_valid_ticket_count(requested: u32, remaining: u32) -> bool {
    requested > 0 && requested <= remaining
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_request() {
        let v = validate("Ada", "Lovelace", "ada@x.com", 5, 50);
        assert!(v.is_valid());
        assert!(v.into_result().is_ok());
    }

    #[test]
    fn names_are_trimmed_before_length_check() {
        let v = validate(" A ", "Lovelace", "ada@x.com", 1, 50);
        assert!(!v.name_ok);

        let v = validate("  Al  ", "Li", "al@x.com", 1, 50);
        assert!(v.name_ok);
    }

    #[test]
    fn name_threshold_is_configurable() {
        let validator = Validator::new(4);
        assert!(!validator.validate("Ada", "Lovelace", "ada@x.com", 1, 5).name_ok);
        assert!(validator.validate("Adam", "Smith", "ada@x.com", 1, 5).name_ok);
    }

    #[test]
    fn name_length_counts_characters() {
        assert!(Validator::new(2).is_valid_name("Żó"));
        assert!(!Validator::new(3).is_valid_name("Żó"));
    }

    #[test]
    fn email_requires_one_at_and_a_dot_after_it() {
        assert!(is_valid_email("ada@x.com"));
        assert!(is_valid_email("a.b@mail.example.org"));
        assert!(!is_valid_email("ada.x.com"));
        assert!(!is_valid_email("ada@xcom"));
        assert!(!is_valid_email("ada@@x.com"));
        assert!(!is_valid_email("a@b@x.com"));
        assert!(!is_valid_email("ada.lovelace@localhost"));
    }

    #[test]
    fn ticket_count_must_be_positive_and_available() {
        assert!(!is_valid_ticket_count(0, 10));
        assert!(is_valid_ticket_count(1, 10));
        assert!(is_valid_ticket_count(10, 10));
        assert!(!is_valid_ticket_count(11, 10));
        assert!(!is_valid_ticket_count(1, 0));
    }

    #[test]
    fn first_failed_check_is_reported() {
        let err = validate("A", "B", "nope", 0, 0).into_result().unwrap_err();
        assert!(matches!(
            err,
            BookingError::ValidationFailed { field: Field::Name }
        ));

        let err = validate("Ada", "Lovelace", "nope", 0, 0)
            .into_result()
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::ValidationFailed {
                field: Field::Email
            }
        ));

        let err = validate("Ada", "Lovelace", "ada@x.com", 3, 2)
            .into_result()
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::ValidationFailed {
                field: Field::Tickets
            }
        ));
    }
}
