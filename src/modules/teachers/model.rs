pub use thrive_models::availability::{
    AvailabilityKind, AvailabilityQuery, AvailabilityWindow, CreateAvailabilityDto,
    TeacherAvailability, TeacherAvailabilityResponse,
};
pub use thrive_models::teachers::*;
