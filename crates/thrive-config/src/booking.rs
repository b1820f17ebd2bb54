//! Booking policy knobs.

use crate::parse_env;

#[derive(Clone, Debug)]
pub struct BookingConfig {
    /// Cancelling at least this many hours before the start refunds the credit.
    pub cancellation_notice_hours: i64,
    /// Widest range accepted by the availability endpoint.
    pub max_availability_days: i64,
    /// Length of private sessions booked with credits when the client gives none.
    pub default_session_minutes: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            cancellation_notice_hours: 24,
            max_availability_days: 62,
            default_session_minutes: 60,
        }
    }
}

impl BookingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cancellation_notice_hours: parse_env(
                "CANCELLATION_NOTICE_HOURS",
                defaults.cancellation_notice_hours,
            ),
            max_availability_days: parse_env(
                "MAX_AVAILABILITY_DAYS",
                defaults.max_availability_days,
            ),
            default_session_minutes: parse_env(
                "DEFAULT_SESSION_MINUTES",
                defaults.default_session_minutes,
            ),
        }
    }
}
