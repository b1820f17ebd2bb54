pub mod bookings;
pub mod payments;
pub mod products;
pub mod sessions;
pub mod students;
pub mod teachers;
