//! Payment intents and Stripe webhook reconciliation.
//!
//! Checkout creates drafts (a booking, and for private lessons a session)
//! before the provider intent exists. The webhook later promotes or cancels
//! them. Every webhook is handled in one transaction that also records the
//! event id, so a delivery either applies fully and is remembered, or leaves
//! nothing behind and can be retried by Stripe.

use anyhow::anyhow;
use chrono::{Duration, Utc};
use sqlx::{Connection, PgConnection, PgPool};
use thrive_config::StripeConfig;
use thrive_core::AppError;
use thrive_models::bookings::{Booking, BookingStatus};
use thrive_models::ids::{BookingId, SessionId, StudentId};
use thrive_models::packages::StudentPackage;
use thrive_models::products::{ServiceType, StripeProductMap};
use thrive_models::sessions::{SessionStatus, SessionType};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::metrics;
use crate::modules::bookings::service::BookingService;
use crate::modules::payments::model::{
    CreatePaymentIntentDto, IntentMetadata, PaymentIntentResponse, PaymentKind, WebhookAck,
    WebhookOutcome,
};
use crate::modules::payments::provider::{CreateIntentRequest, PaymentProvider};
use crate::modules::payments::webhook::{
    PaymentIntentObject, SignatureError, StripeEvent, WebhookEvent, verify_signature,
};
use crate::modules::products::service::ProductService;
use crate::modules::sessions::service::SessionService;
use crate::modules::students::service::StudentService;

/// Drafts created for one checkout.
#[derive(Debug, Default, Clone, Copy)]
struct Drafts {
    session_id: Option<SessionId>,
    booking_id: Option<BookingId>,
    /// The session itself is a draft (private lessons)
    owns_session: bool,
}

pub struct PaymentService;

impl PaymentService {
    #[instrument(skip(db, provider))]
    pub async fn create_payment_intent(
        db: &PgPool,
        provider: &dyn PaymentProvider,
        student_id: StudentId,
        dto: CreatePaymentIntentDto,
    ) -> Result<PaymentIntentResponse, AppError> {
        let product = ProductService::get_product(db, &dto.service_key, false).await?;
        let quantity = dto.quantity.unwrap_or(1);
        if quantity > 1 && product.service_type != ServiceType::Package {
            return Err(AppError::bad_request(anyhow!(
                "Only packages can be bought in quantity"
            )));
        }
        let student = StudentService::get_student(db, student_id).await?;

        let kind = if product.service_type == ServiceType::Package {
            PaymentKind::Package
        } else {
            PaymentKind::Session
        };
        let amount_cents = product.unit_amount_cents * i64::from(quantity);

        let mut tx = db.begin().await?;
        let drafts = Self::create_drafts(&mut tx, &product, student_id, &dto).await?;
        tx.commit().await?;

        let metadata = IntentMetadata {
            student_id,
            service_key: product.service_key.clone(),
            product_map_id: product.id,
            quantity,
            kind,
            session_id: drafts.session_id,
            booking_id: drafts.booking_id,
        };
        let idempotency_key = drafts
            .booking_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let request = CreateIntentRequest {
            amount_cents,
            currency: product.currency.clone(),
            customer_id: student.stripe_customer_id.clone(),
            description: if quantity > 1 {
                format!("{} x{}", product.service_key, quantity)
            } else {
                product.service_key.clone()
            },
            metadata: metadata.to_map(),
            idempotency_key,
        };

        let intent = match provider.create_payment_intent(request).await {
            Ok(intent) => intent,
            Err(e) => {
                warn!(error = %e, service_key = %product.service_key, "Payment intent creation failed");
                Self::abandon_drafts(db, drafts).await?;
                return Err(AppError::bad_gateway(e));
            }
        };

        if let Some(booking_id) = drafts.booking_id {
            sqlx::query(
                "UPDATE bookings SET stripe_payment_intent_id = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(booking_id)
            .bind(&intent.id)
            .execute(db)
            .await?;
        }
        if drafts.owns_session
            && let Some(session_id) = drafts.session_id
        {
            sqlx::query(
                r#"UPDATE sessions SET source_payment_id = $2, updated_at = NOW()
                   WHERE id = $1 AND status = 'DRAFT'"#,
            )
            .bind(session_id)
            .bind(&intent.id)
            .execute(db)
            .await?;
        }

        metrics::track_payment_intent_created(kind.as_str());
        info!(
            payment_intent.id = %intent.id,
            kind = %kind,
            amount_cents,
            "Payment intent created"
        );

        Ok(PaymentIntentResponse {
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            amount_cents,
            currency: product.currency,
            kind,
            session_id: drafts.session_id,
            booking_id: drafts.booking_id,
        })
    }

    /// Verify, deduplicate and dispatch one Stripe webhook delivery.
    #[instrument(skip(db, config, payload))]
    pub async fn handle_webhook(
        db: &PgPool,
        config: &StripeConfig,
        signature: Option<&str>,
        payload: &[u8],
    ) -> Result<WebhookAck, AppError> {
        verify_signature(
            &config.webhook_secret,
            signature,
            payload,
            config.webhook_tolerance_secs,
            Utc::now().timestamp(),
        )
        .map_err(|e| {
            warn!(error = %e, "Rejected webhook delivery");
            match e {
                SignatureError::NotConfigured => AppError::internal(e),
                _ => AppError::bad_request(e),
            }
        })?;

        let event: StripeEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::bad_request(anyhow!("Invalid webhook payload: {e}")))?;

        let mut tx = db.begin().await?;

        let first_delivery = sqlx::query_scalar::<_, String>(
            r#"INSERT INTO stripe_webhook_events (event_id, event_type)
               VALUES ($1, $2)
               ON CONFLICT (event_id) DO NOTHING
               RETURNING event_id"#,
        )
        .bind(&event.id)
        .bind(&event.event_type)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();

        if !first_delivery {
            info!(event.id = %event.id, "Duplicate webhook delivery");
            metrics::track_webhook_event(&event.event_type, WebhookOutcome::AlreadyProcessed.as_str());
            return Ok(WebhookAck {
                received: true,
                outcome: WebhookOutcome::AlreadyProcessed,
            });
        }

        let outcome = match event.classify() {
            Ok(WebhookEvent::PaymentSucceeded(intent)) => {
                Self::handle_payment_succeeded(&mut tx, &intent).await?
            }
            Ok(WebhookEvent::PaymentFailed(intent)) => {
                Self::handle_payment_failed(&mut tx, &intent).await?
            }
            Ok(WebhookEvent::Unhandled) => WebhookOutcome::Ignored,
            Err(e) => {
                warn!(event.id = %event.id, error = %e, "Unreadable payment intent in webhook");
                WebhookOutcome::Ignored
            }
        };

        sqlx::query("UPDATE stripe_webhook_events SET outcome = $2 WHERE event_id = $1")
            .bind(&event.id)
            .bind(outcome.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        metrics::track_webhook_event(&event.event_type, outcome.as_str());
        info!(
            event.id = %event.id,
            event.kind = %event.event_type,
            outcome = %outcome,
            "Webhook processed"
        );

        Ok(WebhookAck {
            received: true,
            outcome,
        })
    }

    pub(crate) async fn handle_payment_succeeded(
        conn: &mut PgConnection,
        intent: &PaymentIntentObject,
    ) -> Result<WebhookOutcome, AppError> {
        let metadata = match IntentMetadata::from_map(&intent.metadata) {
            Ok(metadata) => metadata,
            Err(reason) => {
                warn!(payment_intent.id = %intent.id, %reason, "Payment without usable metadata");
                return Ok(WebhookOutcome::Ignored);
            }
        };

        match metadata.kind {
            PaymentKind::Package => Self::fulfill_package_purchase(conn, &intent.id, &metadata).await,
            PaymentKind::Session => Self::promote_drafts(conn, &intent.id, &metadata).await,
        }
    }

    /// Create the purchased package, once per payment intent. When the
    /// checkout named a session, its first credit is spent there; failing to
    /// book leaves the package whole.
    pub(crate) async fn fulfill_package_purchase(
        conn: &mut PgConnection,
        intent_id: &str,
        metadata: &IntentMetadata,
    ) -> Result<WebhookOutcome, AppError> {
        let fulfilled = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM student_packages WHERE source_payment_id = $1)",
        )
        .bind(intent_id)
        .fetch_one(&mut *conn)
        .await?;
        if fulfilled {
            return Ok(WebhookOutcome::AlreadyFulfilled);
        }

        let product =
            sqlx::query_as::<_, StripeProductMap>("SELECT * FROM stripe_product_map WHERE id = $1")
                .bind(metadata.product_map_id)
                .fetch_optional(&mut *conn)
                .await?;
        let Some(product) = product else {
            warn!(payment_intent.id = %intent_id, product.id = %metadata.product_map_id, "Paid for an unknown product");
            return Ok(WebhookOutcome::Ignored);
        };

        let student_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM students WHERE id = $1)",
        )
        .bind(metadata.student_id)
        .fetch_one(&mut *conn)
        .await?;
        if !student_exists {
            warn!(payment_intent.id = %intent_id, student.id = %metadata.student_id, "Paid for an unknown student");
            return Ok(WebhookOutcome::Ignored);
        }

        let quantity = metadata.quantity.max(1);
        let credits = product.credits * quantity;
        let expires_at = product
            .validity_days
            .map(|days| Utc::now() + Duration::days(i64::from(days)));
        let label = if quantity > 1 {
            format!("{} x{}", product.service_key, quantity)
        } else {
            product.service_key.clone()
        };

        let package = sqlx::query_as::<_, StudentPackage>(
            r#"INSERT INTO student_packages
                   (student_id, product_map_id, label, total_credits, remaining_credits,
                    source_payment_id, expires_at)
               VALUES ($1, $2, $3, $4, $4, $5, $6)
               ON CONFLICT (source_payment_id) DO NOTHING
               RETURNING *"#,
        )
        .bind(metadata.student_id)
        .bind(product.id)
        .bind(&label)
        .bind(credits)
        .bind(intent_id)
        .bind(expires_at)
        .fetch_optional(&mut *conn)
        .await?;
        let Some(package) = package else {
            return Ok(WebhookOutcome::AlreadyFulfilled);
        };

        info!(
            package.id = %package.id,
            student.id = %package.student_id,
            credits,
            "Package fulfilled"
        );

        if let Some(session_id) = metadata.session_id {
            let mut savepoint = conn.begin().await?;
            match BookingService::attach_package_booking(&mut savepoint, &package, session_id).await
            {
                Ok(booking) => {
                    savepoint.commit().await?;
                    metrics::track_booking_created("package_purchase");
                    info!(booking.id = %booking.id, session.id = %session_id, "Booked first package credit");
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    warn!(
                        session.id = %session_id,
                        package.id = %package.id,
                        error = %e.error,
                        "Could not book the purchased session; package keeps its credits"
                    );
                }
            }
        }

        Ok(WebhookOutcome::PackageFulfilled)
    }

    /// Confirm the draft booking (and draft private session) paid for by
    /// `intent_id`. A payment that arrives after its drafts were cancelled
    /// becomes a one-credit package.
    pub(crate) async fn promote_drafts(
        conn: &mut PgConnection,
        intent_id: &str,
        metadata: &IntentMetadata,
    ) -> Result<WebhookOutcome, AppError> {
        let session_id = sqlx::query_scalar::<_, SessionId>(
            r#"SELECT session_id FROM bookings
               WHERE stripe_payment_intent_id = $1 OR id = $2
               ORDER BY created_at
               LIMIT 1"#,
        )
        .bind(intent_id)
        .bind(metadata.booking_id)
        .fetch_optional(&mut *conn)
        .await?;
        let Some(session_id) = session_id else {
            warn!(payment_intent.id = %intent_id, "No booking for paid intent");
            return Ok(WebhookOutcome::Ignored);
        };

        let session = SessionService::lock_session(conn, session_id).await?;
        let booking = sqlx::query_as::<_, Booking>(
            r#"SELECT * FROM bookings
               WHERE session_id = $1 AND (stripe_payment_intent_id = $2 OR id = $3)
               ORDER BY created_at
               LIMIT 1
               FOR UPDATE"#,
        )
        .bind(session_id)
        .bind(intent_id)
        .bind(metadata.booking_id)
        .fetch_one(&mut *conn)
        .await?;

        match booking.status {
            BookingStatus::Confirmed => Ok(WebhookOutcome::AlreadyFulfilled),
            BookingStatus::Draft if !session.status.is_terminal() => {
                let booking = sqlx::query_as::<_, Booking>(
                    r#"UPDATE bookings
                       SET status = 'CONFIRMED',
                           stripe_payment_intent_id = COALESCE(stripe_payment_intent_id, $2),
                           updated_at = NOW()
                       WHERE id = $1
                       RETURNING *"#,
                )
                .bind(booking.id)
                .bind(intent_id)
                .fetch_one(&mut *conn)
                .await?;

                if session.status == SessionStatus::Draft {
                    SessionService::transition(conn, &session, SessionStatus::Scheduled, None)
                        .await?;
                }

                metrics::track_booking_created("payment");
                info!(booking.id = %booking.id, session.id = %session.id, "Drafts promoted");
                Ok(WebhookOutcome::DraftsPromoted)
            }
            BookingStatus::Draft | BookingStatus::Cancelled => {
                if booking.status == BookingStatus::Draft {
                    sqlx::query(
                        r#"UPDATE bookings
                           SET status = 'CANCELLED', cancelled_at = NOW(),
                               cancel_reason = 'session_closed', updated_at = NOW()
                           WHERE id = $1"#,
                    )
                    .bind(booking.id)
                    .execute(&mut *conn)
                    .await?;
                }
                Self::issue_late_payment_credit(conn, intent_id, &booking, metadata).await
            }
        }
    }

    /// Cancel the drafts belonging to a failed or cancelled intent. Rows that
    /// already left the draft state are not touched.
    pub(crate) async fn handle_payment_failed(
        conn: &mut PgConnection,
        intent: &PaymentIntentObject,
    ) -> Result<WebhookOutcome, AppError> {
        let booking_id = intent
            .metadata
            .get("booking_id")
            .and_then(|raw| raw.parse::<BookingId>().ok());
        let session_id = intent
            .metadata
            .get("session_id")
            .and_then(|raw| raw.parse::<SessionId>().ok());

        // Lock order: session, then booking.
        let sessions = sqlx::query(
            r#"UPDATE sessions
               SET status = 'CANCELLED', cancelled_at = NOW(), cancel_reason = 'payment_failed',
                   updated_at = NOW()
               WHERE status = 'DRAFT' AND (source_payment_id = $1 OR id = $2)"#,
        )
        .bind(&intent.id)
        .bind(session_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        let bookings = sqlx::query(
            r#"UPDATE bookings
               SET status = 'CANCELLED', cancelled_at = NOW(), cancel_reason = 'payment_failed',
                   updated_at = NOW()
               WHERE status = 'DRAFT' AND (stripe_payment_intent_id = $1 OR id = $2)"#,
        )
        .bind(&intent.id)
        .bind(booking_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if sessions + bookings == 0 {
            return Ok(WebhookOutcome::Ignored);
        }
        info!(payment_intent.id = %intent.id, sessions, bookings, "Drafts cancelled");
        Ok(WebhookOutcome::DraftsCancelled)
    }

    async fn create_drafts(
        conn: &mut PgConnection,
        product: &StripeProductMap,
        student_id: StudentId,
        dto: &CreatePaymentIntentDto,
    ) -> Result<Drafts, AppError> {
        match product.service_type.session_type() {
            Some(SessionType::Private) => {
                let (Some(teacher_id), Some(start_at)) = (dto.teacher_id, dto.start_at) else {
                    return Err(AppError::bad_request(anyhow!(
                        "Private lessons need teacher_id and start_at"
                    )));
                };
                let session = SessionService::create_private_session(
                    conn,
                    teacher_id,
                    start_at,
                    i64::from(product.session_minutes),
                    SessionStatus::Draft,
                )
                .await?;
                let booking = Self::insert_draft_booking(conn, session.id, student_id).await?;

                Ok(Drafts {
                    session_id: Some(session.id),
                    booking_id: Some(booking.id),
                    owns_session: true,
                })
            }
            Some(session_type) => {
                let Some(session_id) = dto.session_id else {
                    return Err(AppError::bad_request(anyhow!(
                        "session_id is required for {} products",
                        product.service_key
                    )));
                };
                let session = SessionService::lock_session(conn, session_id).await?;
                if session.session_type != session_type {
                    return Err(AppError::bad_request(anyhow!(
                        "Product {} cannot pay for this session",
                        product.service_key
                    )));
                }
                SessionService::ensure_open_seat(conn, &session, Utc::now()).await?;
                if BookingService::active_booking(conn, session.id, student_id)
                    .await?
                    .is_some()
                {
                    return Err(AppError::conflict(anyhow!(
                        "You already have a booking for this session"
                    )));
                }
                let booking = Self::insert_draft_booking(conn, session.id, student_id).await?;

                Ok(Drafts {
                    session_id: Some(session.id),
                    booking_id: Some(booking.id),
                    owns_session: false,
                })
            }
            None => {
                if dto.teacher_id.is_some() {
                    return Err(AppError::bad_request(anyhow!(
                        "Packages cannot reserve a private slot"
                    )));
                }
                if let Some(session_id) = dto.session_id {
                    let session = SessionService::lock_session(conn, session_id).await?;
                    if session.status != SessionStatus::Scheduled {
                        return Err(AppError::conflict(anyhow!(
                            "Session is {} and cannot be booked",
                            session.status.as_str()
                        )));
                    }
                }

                Ok(Drafts {
                    session_id: dto.session_id,
                    ..Drafts::default()
                })
            }
        }
    }

    async fn insert_draft_booking(
        conn: &mut PgConnection,
        session_id: SessionId,
        student_id: StudentId,
    ) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>(
            r#"INSERT INTO bookings (session_id, student_id, status)
               VALUES ($1, $2, 'DRAFT')
               RETURNING *"#,
        )
        .bind(session_id)
        .bind(student_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict(anyhow!("You already have a booking for this session"));
            }
            AppError::from(e)
        })
    }

    /// Provider call failed: release the seat and the slot.
    async fn abandon_drafts(db: &PgPool, drafts: Drafts) -> Result<(), AppError> {
        let mut tx = db.begin().await?;
        if drafts.owns_session
            && let Some(session_id) = drafts.session_id
        {
            sqlx::query(
                r#"UPDATE sessions
                   SET status = 'CANCELLED', cancelled_at = NOW(),
                       cancel_reason = 'payment_intent_failed', updated_at = NOW()
                   WHERE id = $1 AND status = 'DRAFT'"#,
            )
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        }
        if let Some(booking_id) = drafts.booking_id {
            sqlx::query(
                r#"UPDATE bookings
                   SET status = 'CANCELLED', cancelled_at = NOW(),
                       cancel_reason = 'payment_intent_failed', updated_at = NOW()
                   WHERE id = $1 AND status = 'DRAFT'"#,
            )
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn issue_late_payment_credit(
        conn: &mut PgConnection,
        intent_id: &str,
        booking: &Booking,
        metadata: &IntentMetadata,
    ) -> Result<WebhookOutcome, AppError> {
        let issued = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO student_packages
                   (student_id, product_map_id, label, total_credits, remaining_credits, source_payment_id)
               VALUES ($1, $2, $3, 1, 1, $4)
               ON CONFLICT (source_payment_id) DO NOTHING
               RETURNING id"#,
        )
        .bind(booking.student_id)
        .bind(metadata.product_map_id)
        .bind(format!("{} (late payment credit)", metadata.service_key))
        .bind(intent_id)
        .fetch_optional(&mut *conn)
        .await?;

        if issued.is_none() {
            return Ok(WebhookOutcome::AlreadyFulfilled);
        }
        warn!(
            payment_intent.id = %intent_id,
            booking.id = %booking.id,
            "Payment arrived after its drafts closed; issued a credit"
        );
        Ok(WebhookOutcome::CreditIssued)
    }
}
