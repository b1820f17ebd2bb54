//! # Thrive Models
//!
//! Entities, status enums and request/response DTOs for the Thrive booking
//! API. Entities derive `sqlx::FromRow` and map one table each; status enums
//! map to Postgres enum types.
//!
//! # Modules
//!
//! - [`ids`]: typed UUID wrappers
//! - [`students`], [`teachers`]: people
//! - [`products`]: Stripe product/price mapping per service key
//! - [`sessions`], [`bookings`]: class instances and reservations, with their
//!   status state machines
//! - [`packages`]: purchased credit bundles and their consumption ledger
//! - [`availability`]: recurring rules, blackouts and expanded windows
//! - [`payments`]: payment intent and webhook DTOs

pub mod availability;
pub mod bookings;
pub mod ids;
pub mod packages;
pub mod payments;
pub mod products;
pub mod sessions;
pub mod students;
pub mod teachers;

pub use availability::{
    AvailabilityKind, AvailabilityQuery, AvailabilityWindow, CreateAvailabilityDto,
    TeacherAvailability, TeacherAvailabilityResponse,
};
pub use bookings::{
    BookWithCreditsDto, Booking, BookingFilterParams, BookingStatus, CancelBookingDto,
    CancelBookingResponse, PaginatedBookingsResponse,
};
pub use packages::{PackageUse, StudentPackage, StudentPackageView};
pub use payments::{
    CreatePaymentIntentDto, PaymentIntentResponse, PaymentKind, WebhookAck, WebhookOutcome,
};
pub use products::{ProductFilterParams, ProductImportRow, ServiceType, StripeProductMap, UpsertProductDto};
pub use sessions::{
    CancelSessionDto, CreateSessionDto, PaginatedSessionsResponse, Session, SessionFilterParams,
    SessionStatus, SessionType,
};
pub use students::{CreateStudentDto, Student};
pub use teachers::{CreateTeacherDto, Teacher};
