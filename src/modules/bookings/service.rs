use anyhow::anyhow;
use chrono::{Duration, Utc};
use sqlx::{PgConnection, PgPool};
use thrive_config::BookingConfig;
use thrive_core::{AppError, PaginationMeta};
use thrive_models::ids::{BookingId, SessionId, StudentId, StudentPackageId};
use thrive_models::sessions::{Session, SessionStatus, SessionType};
use tracing::{info, instrument, warn};

use crate::metrics;
use crate::modules::bookings::model::{
    BookWithCreditsDto, Booking, BookingFilterParams, BookingStatus, CancelBookingResponse,
    PackageUse, PaginatedBookingsResponse, StudentPackage,
};
use crate::modules::sessions::service::SessionService;
use crate::modules::students::service::StudentService;

pub struct BookingService;

impl BookingService {
    /// Book a seat paying with one package credit.
    #[instrument(skip(db, config))]
    pub async fn book_with_credits(
        db: &PgPool,
        config: &BookingConfig,
        student_id: StudentId,
        dto: BookWithCreditsDto,
    ) -> Result<Booking, AppError> {
        StudentService::get_student(db, student_id).await?;
        let now = Utc::now();
        let mut tx = db.begin().await?;

        let session = match (dto.session_id, dto.teacher_id, dto.start_at) {
            (Some(session_id), _, _) => {
                let session = SessionService::lock_session(&mut tx, session_id).await?;
                SessionService::ensure_open_seat(&mut tx, &session, now).await?;
                session
            }
            (None, Some(teacher_id), Some(start_at)) => {
                SessionService::create_private_session(
                    &mut tx,
                    teacher_id,
                    start_at,
                    dto.duration_minutes.unwrap_or(config.default_session_minutes),
                    SessionStatus::Scheduled,
                )
                .await?
            }
            _ => {
                return Err(AppError::bad_request(anyhow!(
                    "Provide either session_id, or teacher_id together with start_at"
                )));
            }
        };

        if Self::active_booking(&mut tx, session.id, student_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(anyhow!(
                "You already have a booking for this session"
            )));
        }

        let package = Self::spend_credit(&mut tx, student_id, dto.student_package_id).await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"INSERT INTO bookings (session_id, student_id, status, student_package_id)
               VALUES ($1, $2, 'CONFIRMED', $3)
               RETURNING *"#,
        )
        .bind(session.id)
        .bind(student_id)
        .bind(package.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict(anyhow!("You already have a booking for this session"));
            }
            AppError::from(e)
        })?;

        Self::record_package_use(&mut tx, package.id, &booking).await?;
        tx.commit().await?;

        metrics::track_booking_created("credits");
        info!(
            booking.id = %booking.id,
            session.id = %session.id,
            package.id = %package.id,
            remaining = package.remaining_credits,
            "Booked with credits"
        );
        Ok(booking)
    }

    /// Cancel a booking. `scope` limits the call to one student's bookings.
    ///
    /// The consumed credit goes back to its package when the session starts
    /// more than the configured notice period from now.
    #[instrument(skip(db, config))]
    pub async fn cancel_booking(
        db: &PgPool,
        config: &BookingConfig,
        scope: Option<StudentId>,
        booking_id: BookingId,
        reason: Option<String>,
    ) -> Result<CancelBookingResponse, AppError> {
        let mut tx = db.begin().await?;

        let session_id = sqlx::query_scalar::<_, SessionId>(
            "SELECT session_id FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Booking not found")))?;

        // Lock order: session, then booking.
        let session = SessionService::lock_session(&mut tx, session_id).await?;
        let booking =
            sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(booking_id)
                .fetch_one(&mut *tx)
                .await?;

        if let Some(student_id) = scope
            && booking.student_id != student_id
        {
            return Err(AppError::forbidden(anyhow!(
                "You can only cancel your own bookings"
            )));
        }
        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(AppError::conflict(anyhow!(
                "Cannot move booking from {} to {}",
                booking.status.as_str(),
                BookingStatus::Cancelled.as_str()
            )));
        }

        let booking = sqlx::query_as::<_, Booking>(
            r#"UPDATE bookings
               SET status = 'CANCELLED', cancelled_at = NOW(), cancel_reason = $2, updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(booking_id)
        .bind(reason.as_deref().unwrap_or("cancelled_by_user"))
        .fetch_one(&mut *tx)
        .await?;

        let notice = Duration::hours(config.cancellation_notice_hours);
        let credit_refunded = if session.start_at > Utc::now() + notice {
            Self::refund_credit(&mut tx, booking.id).await?
        } else {
            false
        };

        if session.session_type == SessionType::Private
            && !session.status.is_terminal()
            && SessionService::active_booking_count(&mut tx, session.id).await? == 0
        {
            SessionService::transition(
                &mut tx,
                &session,
                SessionStatus::Cancelled,
                Some("booking_cancelled"),
            )
            .await?;
        }

        tx.commit().await?;

        metrics::track_booking_cancelled(credit_refunded);
        info!(booking.id = %booking.id, credit_refunded, "Booking cancelled");
        Ok(CancelBookingResponse {
            booking,
            credit_refunded,
        })
    }

    #[instrument(skip(db))]
    pub async fn get_booking(
        db: &PgPool,
        scope: Option<StudentId>,
        booking_id: BookingId,
    ) -> Result<Booking, AppError> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE id = $1 AND ($2::uuid IS NULL OR student_id = $2)",
        )
        .bind(booking_id)
        .bind(scope)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Booking not found")))
    }

    #[instrument(skip(db))]
    pub async fn list_student_bookings(
        db: &PgPool,
        student_id: StudentId,
        filters: BookingFilterParams,
    ) -> Result<PaginatedBookingsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM bookings
               WHERE student_id = $1 AND ($2::booking_status IS NULL OR status = $2)"#,
        )
        .bind(student_id)
        .bind(filters.status)
        .fetch_one(db)
        .await?;

        let bookings = sqlx::query_as::<_, Booking>(
            r#"SELECT * FROM bookings
               WHERE student_id = $1 AND ($2::booking_status IS NULL OR status = $2)
               ORDER BY created_at DESC
               LIMIT $3 OFFSET $4"#,
        )
        .bind(student_id)
        .bind(filters.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(PaginatedBookingsResponse {
            data: bookings,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    /// Take one credit from `package_id`, or from the student's usable package
    /// expiring first. The decrement is guarded so credits never go negative.
    pub(crate) async fn spend_credit(
        conn: &mut PgConnection,
        student_id: StudentId,
        package_id: Option<StudentPackageId>,
    ) -> Result<StudentPackage, AppError> {
        let Some(package_id) = package_id else {
            return sqlx::query_as::<_, StudentPackage>(
                r#"UPDATE student_packages
                   SET remaining_credits = remaining_credits - 1, updated_at = NOW()
                   WHERE id = (
                       SELECT id FROM student_packages
                       WHERE student_id = $1
                         AND remaining_credits > 0
                         AND (expires_at IS NULL OR expires_at > NOW())
                       ORDER BY expires_at ASC NULLS LAST, purchased_at ASC
                       LIMIT 1
                       FOR UPDATE
                   )
                   AND remaining_credits > 0
                   RETURNING *"#,
            )
            .bind(student_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::payment_required(anyhow!("No usable credits left")));
        };

        let spent = sqlx::query_as::<_, StudentPackage>(
            r#"UPDATE student_packages
               SET remaining_credits = remaining_credits - 1, updated_at = NOW()
               WHERE id = $1 AND student_id = $2
                 AND remaining_credits > 0
                 AND (expires_at IS NULL OR expires_at > NOW())
               RETURNING *"#,
        )
        .bind(package_id)
        .bind(student_id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(package) = spent {
            return Ok(package);
        }

        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM student_packages WHERE id = $1 AND student_id = $2)",
        )
        .bind(package_id)
        .bind(student_id)
        .fetch_one(&mut *conn)
        .await?;

        if owned {
            Err(AppError::payment_required(anyhow!(
                "Package has no usable credits"
            )))
        } else {
            Err(AppError::not_found(anyhow!("Package not found")))
        }
    }

    pub(crate) async fn record_package_use(
        conn: &mut PgConnection,
        package_id: StudentPackageId,
        booking: &Booking,
    ) -> Result<PackageUse, AppError> {
        let package_use = sqlx::query_as::<_, PackageUse>(
            r#"INSERT INTO package_uses (student_package_id, booking_id, session_id, credits_used)
               VALUES ($1, $2, $3, 1)
               RETURNING *"#,
        )
        .bind(package_id)
        .bind(booking.id)
        .bind(booking.session_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(package_use)
    }

    /// Return the credit consumed by `booking_id`, if any. Reports whether a
    /// credit went back.
    pub(crate) async fn refund_credit(
        conn: &mut PgConnection,
        booking_id: BookingId,
    ) -> Result<bool, AppError> {
        let refunded = sqlx::query_as::<_, PackageUse>(
            r#"UPDATE package_uses SET refunded_at = NOW()
               WHERE booking_id = $1 AND refunded_at IS NULL
               RETURNING *"#,
        )
        .bind(booking_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(package_use) = refunded else {
            return Ok(false);
        };

        sqlx::query(
            r#"UPDATE student_packages
               SET remaining_credits = LEAST(remaining_credits + $2, total_credits),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(package_use.student_package_id)
        .bind(package_use.credits_used)
        .execute(&mut *conn)
        .await?;

        Ok(true)
    }

    /// Spend a credit of a freshly bought package on `session_id`.
    ///
    /// An existing seat (for example a draft left by an earlier checkout) is
    /// confirmed and linked to the package unless a credit already paid for
    /// it. Otherwise a new confirmed booking is created.
    ///
    /// A seat already confirmed by a direct payment still takes a credit and
    /// is linked to the package: the checkout asked for that session to be
    /// paid from the package.
    pub(crate) async fn attach_package_booking(
        conn: &mut PgConnection,
        package: &StudentPackage,
        session_id: SessionId,
    ) -> Result<Booking, AppError> {
        let session = SessionService::lock_session(conn, session_id).await?;

        if let Some(existing) = Self::active_booking(conn, session.id, package.student_id).await? {
            let consumed = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM package_uses WHERE booking_id = $1 AND refunded_at IS NULL)",
            )
            .bind(existing.id)
            .fetch_one(&mut *conn)
            .await?;
            if consumed {
                return Ok(existing);
            }

            Self::spend_credit(conn, package.student_id, Some(package.id)).await?;
            let booking = sqlx::query_as::<_, Booking>(
                r#"UPDATE bookings
                   SET status = 'CONFIRMED', student_package_id = $2, updated_at = NOW()
                   WHERE id = $1
                   RETURNING *"#,
            )
            .bind(existing.id)
            .bind(package.id)
            .fetch_one(&mut *conn)
            .await?;
            Self::record_package_use(conn, package.id, &booking).await?;
            Self::schedule_if_draft(conn, &session).await?;
            return Ok(booking);
        }

        SessionService::ensure_open_seat(conn, &session, Utc::now()).await?;
        Self::spend_credit(conn, package.student_id, Some(package.id)).await?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"INSERT INTO bookings (session_id, student_id, status, student_package_id)
               VALUES ($1, $2, 'CONFIRMED', $3)
               RETURNING *"#,
        )
        .bind(session.id)
        .bind(package.student_id)
        .bind(package.id)
        .fetch_one(&mut *conn)
        .await?;
        Self::record_package_use(conn, package.id, &booking).await?;

        Ok(booking)
    }

    pub(crate) async fn active_booking(
        conn: &mut PgConnection,
        session_id: SessionId,
        student_id: StudentId,
    ) -> Result<Option<Booking>, AppError> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"SELECT * FROM bookings
               WHERE session_id = $1 AND student_id = $2 AND status <> 'CANCELLED'
               FOR UPDATE"#,
        )
        .bind(session_id)
        .bind(student_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(booking)
    }

    async fn schedule_if_draft(conn: &mut PgConnection, session: &Session) -> Result<(), AppError> {
        if session.status == SessionStatus::Draft {
            SessionService::transition(conn, session, SessionStatus::Scheduled, None).await?;
        } else if session.status.is_terminal() {
            warn!(
                session.id = %session.id,
                status = session.status.as_str(),
                "Confirmed a booking on a closed session"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::DateTime;
    use thrive_models::ids::TeacherId;

    async fn student(pool: &PgPool, email: &str) -> StudentId {
        sqlx::query_scalar::<_, StudentId>(
            "INSERT INTO students (email, first_name, last_name) VALUES ($1, 'Lea', 'Schmidt') RETURNING id",
        )
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn group_session(pool: &PgPool, start_at: DateTime<Utc>, capacity: i32) -> Session {
        let teacher = sqlx::query_scalar::<_, TeacherId>(
            "INSERT INTO teachers (display_name, email) VALUES ('Ana', $1) RETURNING id",
        )
        .bind(format!("{}@example.com", uuid::Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap();

        sqlx::query_as::<_, Session>(
            r#"INSERT INTO sessions (teacher_id, session_type, status, start_at, end_at, capacity)
               VALUES ($1, 'GROUP', 'SCHEDULED', $2, $3, $4)
               RETURNING *"#,
        )
        .bind(teacher)
        .bind(start_at)
        .bind(start_at + Duration::hours(1))
        .bind(capacity)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn package(
        pool: &PgPool,
        student_id: StudentId,
        credits: i32,
        expires_at: Option<DateTime<Utc>>,
    ) -> StudentPackage {
        sqlx::query_as::<_, StudentPackage>(
            r#"INSERT INTO student_packages (student_id, label, total_credits, remaining_credits, expires_at)
               VALUES ($1, 'pack', $2, $2, $3)
               RETURNING *"#,
        )
        .bind(student_id)
        .bind(credits)
        .bind(expires_at)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn remaining(pool: &PgPool, package_id: StudentPackageId) -> i32 {
        sqlx::query_scalar::<_, i32>("SELECT remaining_credits FROM student_packages WHERE id = $1")
            .bind(package_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn join(session_id: SessionId) -> BookWithCreditsDto {
        BookWithCreditsDto {
            session_id: Some(session_id),
            teacher_id: None,
            start_at: None,
            duration_minutes: None,
            student_package_id: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_spends_earliest_expiring_package(pool: PgPool) {
        let student = student(&pool, "lea@example.com").await;
        let later = package(&pool, student, 5, None).await;
        let sooner = package(&pool, student, 2, Some(Utc::now() + Duration::days(10))).await;
        let session = group_session(&pool, Utc::now() + Duration::days(3), 5).await;

        let booking = BookingService::book_with_credits(
            &pool,
            &BookingConfig::default(),
            student,
            join(session.id),
        )
        .await
        .unwrap();

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.student_package_id, Some(sooner.id));
        assert_eq!(remaining(&pool, sooner.id).await, 1);
        assert_eq!(remaining(&pool, later.id).await, 5);

        let err = BookingService::book_with_credits(
            &pool,
            &BookingConfig::default(),
            student,
            join(session.id),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_no_usable_credits(pool: PgPool) {
        let student = student(&pool, "lea@example.com").await;
        let expired = package(&pool, student, 3, Some(Utc::now() - Duration::days(1))).await;
        let session = group_session(&pool, Utc::now() + Duration::days(3), 5).await;
        let config = BookingConfig::default();

        let err = BookingService::book_with_credits(&pool, &config, student, join(session.id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::PAYMENT_REQUIRED);

        let err = BookingService::book_with_credits(
            &pool,
            &config,
            student,
            BookWithCreditsDto {
                student_package_id: Some(expired.id),
                ..join(session.id)
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(remaining(&pool, expired.id).await, 3);

        let someone_else = self::student(&pool, "max@example.com").await;
        let foreign = package(&pool, someone_else, 3, None).await;
        let err = BookingService::book_with_credits(
            &pool,
            &config,
            student,
            BookWithCreditsDto {
                student_package_id: Some(foreign.id),
                ..join(session.id)
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_full_session_keeps_credit(pool: PgPool) {
        let first = student(&pool, "lea@example.com").await;
        let second = student(&pool, "max@example.com").await;
        package(&pool, first, 1, None).await;
        let pack = package(&pool, second, 1, None).await;
        let session = group_session(&pool, Utc::now() + Duration::days(3), 1).await;
        let config = BookingConfig::default();

        BookingService::book_with_credits(&pool, &config, first, join(session.id))
            .await
            .unwrap();
        let err = BookingService::book_with_credits(&pool, &config, second, join(session.id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(remaining(&pool, pack.id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_cancel_refunds_with_notice(pool: PgPool) {
        let student = student(&pool, "lea@example.com").await;
        let pack = package(&pool, student, 2, None).await;
        let config = BookingConfig::default();

        let far = group_session(&pool, Utc::now() + Duration::days(3), 5).await;
        let booking = BookingService::book_with_credits(&pool, &config, student, join(far.id))
            .await
            .unwrap();
        let cancelled =
            BookingService::cancel_booking(&pool, &config, Some(student), booking.id, None)
                .await
                .unwrap();
        assert!(cancelled.credit_refunded);
        assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
        assert_eq!(remaining(&pool, pack.id).await, 2);

        let err = BookingService::cancel_booking(&pool, &config, Some(student), booking.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let soon = group_session(&pool, Utc::now() + Duration::hours(2), 5).await;
        let booking = BookingService::book_with_credits(&pool, &config, student, join(soon.id))
            .await
            .unwrap();
        let cancelled = BookingService::cancel_booking(&pool, &config, None, booking.id, None)
            .await
            .unwrap();
        assert!(!cancelled.credit_refunded);
        assert_eq!(remaining(&pool, pack.id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_students_cancel_only_their_own(pool: PgPool) {
        let owner = student(&pool, "lea@example.com").await;
        let other = student(&pool, "max@example.com").await;
        package(&pool, owner, 1, None).await;
        let session = group_session(&pool, Utc::now() + Duration::days(3), 5).await;
        let config = BookingConfig::default();

        let booking = BookingService::book_with_credits(&pool, &config, owner, join(session.id))
            .await
            .unwrap();

        let err = BookingService::cancel_booking(&pool, &config, Some(other), booking.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let err = BookingService::get_booking(&pool, Some(other), booking.id)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let page = BookingService::list_student_bookings(
            &pool,
            owner,
            BookingFilterParams {
                status: Some(BookingStatus::Confirmed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data[0].id, booking.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_cancelling_session_refunds_everyone(pool: PgPool) {
        let student = student(&pool, "lea@example.com").await;
        let pack = package(&pool, student, 1, None).await;
        let session = group_session(&pool, Utc::now() + Duration::hours(1), 5).await;
        let booking = BookingService::book_with_credits(
            &pool,
            &BookingConfig::default(),
            student,
            join(session.id),
        )
        .await
        .unwrap();
        assert_eq!(remaining(&pool, pack.id).await, 0);

        SessionService::cancel_session(&pool, session.id, Some("teacher ill".to_string()))
            .await
            .unwrap();

        let booking = BookingService::get_booking(&pool, None, booking.id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);
        assert_eq!(booking.cancel_reason.as_deref(), Some("teacher ill"));
        assert_eq!(remaining(&pool, pack.id).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_private_slot_on_credits_and_empty_session_closes(pool: PgPool) {
        use chrono::Datelike;

        let student = student(&pool, "lea@example.com").await;
        let pack = package(&pool, student, 2, None).await;
        let teacher = sqlx::query_scalar::<_, TeacherId>(
            "INSERT INTO teachers (display_name, email) VALUES ('Ana', 'ana@example.com') RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        let day = (Utc::now() + Duration::days(7)).date_naive();
        sqlx::query(
            r#"INSERT INTO teacher_availability (teacher_id, kind, weekday, start_time, end_time)
               VALUES ($1, 'RECURRING', $2, '08:00', '20:00')"#,
        )
        .bind(teacher)
        .bind(day.weekday().num_days_from_sunday() as i16)
        .execute(&pool)
        .await
        .unwrap();
        let start_at = day.and_hms_opt(10, 0, 0).unwrap().and_utc();
        let config = BookingConfig::default();

        let booking = BookingService::book_with_credits(
            &pool,
            &config,
            student,
            BookWithCreditsDto {
                session_id: None,
                teacher_id: Some(teacher),
                start_at: Some(start_at),
                duration_minutes: None,
                student_package_id: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(remaining(&pool, pack.id).await, 1);

        let session = SessionService::get_session(&pool, booking.session_id).await.unwrap();
        assert_eq!(session.session_type, SessionType::Private);
        assert_eq!(session.status, SessionStatus::Scheduled);
        assert_eq!(session.capacity, 1);
        assert_eq!(session.start_at, start_at);
        assert_eq!(
            session.end_at,
            start_at + Duration::minutes(config.default_session_minutes)
        );

        let cancelled =
            BookingService::cancel_booking(&pool, &config, Some(student), booking.id, None)
                .await
                .unwrap();
        assert!(cancelled.credit_refunded);

        let session = SessionService::get_session(&pool, booking.session_id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Cancelled);
        assert_eq!(session.cancel_reason.as_deref(), Some("booking_cancelled"));
    }
}
