use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use thrive_core::errors::ErrorResponse;
use thrive_core::{PaginationMeta, PaginationParams};
use thrive_models::{
    AvailabilityKind, AvailabilityWindow, BookWithCreditsDto, Booking, BookingStatus,
    CancelBookingDto, CancelBookingResponse, CancelSessionDto, CreateAvailabilityDto,
    CreatePaymentIntentDto, CreateSessionDto, CreateStudentDto, CreateTeacherDto, PackageUse,
    PaginatedBookingsResponse, PaginatedSessionsResponse, PaymentIntentResponse, PaymentKind,
    ServiceType, Session, SessionStatus, SessionType, StripeProductMap, Student, StudentPackage,
    StudentPackageView, Teacher, TeacherAvailability, TeacherAvailabilityResponse,
    UpsertProductDto, WebhookAck, WebhookOutcome,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::payments::controller::create_payment_intent,
        crate::modules::payments::controller::stripe_webhook,
        crate::modules::bookings::controller::book_with_credits,
        crate::modules::bookings::controller::list_my_bookings,
        crate::modules::bookings::controller::get_booking,
        crate::modules::bookings::controller::cancel_booking,
        crate::modules::sessions::controller::list_sessions,
        crate::modules::sessions::controller::create_session,
        crate::modules::sessions::controller::get_session,
        crate::modules::sessions::controller::complete_session,
        crate::modules::sessions::controller::cancel_session,
        crate::modules::teachers::controller::list_teachers,
        crate::modules::teachers::controller::create_teacher,
        crate::modules::teachers::controller::get_teacher,
        crate::modules::teachers::controller::list_availability_rules,
        crate::modules::teachers::controller::add_availability_rule,
        crate::modules::teachers::controller::delete_availability_rule,
        crate::modules::teachers::controller::get_availability,
        crate::modules::products::controller::list_products,
        crate::modules::products::controller::get_product,
        crate::modules::products::controller::upsert_product,
        crate::modules::products::controller::deactivate_product,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_me,
        crate::modules::students::controller::get_my_packages,
        crate::modules::students::controller::get_my_package_uses,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::get_student_packages,
        crate::modules::students::controller::get_student_bookings,
    ),
    components(
        schemas(
            ErrorResponse,
            PaginationMeta,
            PaginationParams,
            CreatePaymentIntentDto,
            PaymentIntentResponse,
            PaymentKind,
            WebhookAck,
            WebhookOutcome,
            Booking,
            BookingStatus,
            BookWithCreditsDto,
            CancelBookingDto,
            CancelBookingResponse,
            PaginatedBookingsResponse,
            Session,
            SessionStatus,
            SessionType,
            CreateSessionDto,
            CancelSessionDto,
            PaginatedSessionsResponse,
            Teacher,
            CreateTeacherDto,
            TeacherAvailability,
            AvailabilityKind,
            AvailabilityWindow,
            CreateAvailabilityDto,
            TeacherAvailabilityResponse,
            StripeProductMap,
            ServiceType,
            UpsertProductDto,
            Student,
            CreateStudentDto,
            StudentPackage,
            StudentPackageView,
            PackageUse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Payments", description = "Stripe payment intents and webhook"),
        (name = "Bookings", description = "Credit bookings and cancellations"),
        (name = "Sessions", description = "Session lifecycle"),
        (name = "Teachers", description = "Teachers and their availability"),
        (name = "Products", description = "Stripe product mapping"),
        (name = "Students", description = "Students and their credit packages")
    ),
    info(
        title = "Thrive API",
        version = "0.1.0",
        description = "Booking and payments backend for a language school, built with Rust, Axum, and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
