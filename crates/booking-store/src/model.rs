use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BookingId, ConferenceId};

/// A bookable conference and its ticket inventory.
///
/// `remaining_tickets` never exceeds `total_tickets` and only shrinks as
/// bookings are committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    pub id: ConferenceId,
    pub name: String,
    pub total_tickets: u32,
    pub remaining_tickets: u32,
    pub created_at: DateTime<Utc>,
}

impl Conference {
    /// Number of tickets already taken by committed bookings.
    pub fn booked_tickets(&self) -> u32 {
        self.total_tickets.saturating_sub(self.remaining_tickets)
    }

    /// Returns true when no tickets are left.
    pub fn is_sold_out(&self) -> bool {
        self.remaining_tickets == 0
    }
}

/// A committed reservation of tickets against one conference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub conference_id: ConferenceId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub number_of_tickets: u32,
    pub created_at: DateTime<Utc>,
}

/// Fields of a booking before the store assigns its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub conference_id: ConferenceId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub number_of_tickets: u32,
}

/// A booking joined with the conference it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    #[serde(flatten)]
    pub booking: Booking,
    pub conference_name: String,
}

impl BookingRecord {
    pub fn new(booking: Booking, conference_name: impl Into<String>) -> Self {
        Self {
            booking,
            conference_name: conference_name.into(),
        }
    }
}

/// Scope within which a booking email must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailUniqueness {
    /// One booking per email across every conference.
    #[default]
    Global,
    /// One booking per email within each conference.
    PerConference,
    /// No uniqueness constraint on email.
    None,
}

impl EmailUniqueness {
    /// Name of the constraint that enforces this scope, if any.
    pub fn constraint_name(&self) -> Option<&'static str> {
        match self {
            EmailUniqueness::Global => Some("bookings_email_key"),
            EmailUniqueness::PerConference => Some("bookings_conference_email_key"),
            EmailUniqueness::None => None,
        }
    }

    /// Returns true if `candidate` may not coexist with `existing` under this scope.
    pub fn conflicts(&self, existing: &Booking, candidate: &NewBooking) -> bool {
        match self {
            EmailUniqueness::Global => existing.email == candidate.email,
            EmailUniqueness::PerConference => {
                existing.conference_id == candidate.conference_id
                    && existing.email == candidate.email
            }
            EmailUniqueness::None => false,
        }
    }
}

impl std::fmt::Display for EmailUniqueness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EmailUniqueness::Global => "global",
            EmailUniqueness::PerConference => "per-conference",
            EmailUniqueness::None => "none",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for EmailUniqueness {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(EmailUniqueness::Global),
            "per-conference" | "per_conference" | "conference" => {
                Ok(EmailUniqueness::PerConference)
            }
            "none" | "off" => Ok(EmailUniqueness::None),
            other => Err(format!("unknown email uniqueness scope: {other}")),
        }
    }
}
