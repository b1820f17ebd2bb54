use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use thrive_core::{AppError, PaginationMeta};
use thrive_models::bookings::Booking;
use thrive_models::ids::{SessionId, TeacherId};
use tracing::{info, instrument, warn};

use crate::metrics;
use crate::modules::bookings::service::BookingService;
use crate::modules::sessions::model::{
    CreateSessionDto, PaginatedSessionsResponse, Session, SessionFilterParams, SessionStatus,
    SessionType,
};
use crate::modules::teachers::service::TeacherService;

/// Rows touched by [`SessionService::expire_stale_drafts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiredDrafts {
    pub bookings: u64,
    pub sessions: u64,
}

pub struct SessionService;

impl SessionService {
    #[instrument(skip(db))]
    pub async fn get_session(db: &PgPool, session_id: SessionId) -> Result<Session, AppError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Session not found")))
    }

    #[instrument(skip(db))]
    pub async fn list_sessions(
        db: &PgPool,
        filters: SessionFilterParams,
    ) -> Result<PaginatedSessionsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let where_clause = r#"
            WHERE ($1::uuid IS NULL OR teacher_id = $1)
              AND ($2::session_status IS NULL OR status = $2)
              AND ($3::session_type IS NULL OR session_type = $3)
              AND ($4::timestamptz IS NULL OR start_at >= $4)
              AND ($5::timestamptz IS NULL OR start_at < $5)"#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM sessions {where_clause}"
        ))
        .bind(filters.teacher_id)
        .bind(filters.status)
        .bind(filters.session_type)
        .bind(filters.from)
        .bind(filters.to)
        .fetch_one(db)
        .await?;

        let sessions = sqlx::query_as::<_, Session>(&format!(
            "SELECT * FROM sessions {where_clause} ORDER BY start_at ASC LIMIT $6 OFFSET $7"
        ))
        .bind(filters.teacher_id)
        .bind(filters.status)
        .bind(filters.session_type)
        .bind(filters.from)
        .bind(filters.to)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(PaginatedSessionsResponse {
            data: sessions,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn create_session(db: &PgPool, dto: CreateSessionDto) -> Result<Session, AppError> {
        let teacher = TeacherService::get_teacher(db, dto.teacher_id).await?;
        if !teacher.is_active {
            return Err(AppError::conflict(anyhow!("Teacher is not active")));
        }
        if dto.start_at <= Utc::now() {
            return Err(AppError::bad_request(anyhow!("Sessions must start in the future")));
        }

        let session = sqlx::query_as::<_, Session>(
            r#"INSERT INTO sessions
                   (teacher_id, session_type, status, title, start_at, end_at, capacity, meeting_url)
               VALUES ($1, $2, 'SCHEDULED', $3, $4, $5, $6, $7)
               RETURNING *"#,
        )
        .bind(dto.teacher_id)
        .bind(dto.session_type)
        .bind(&dto.title)
        .bind(dto.start_at)
        .bind(dto.end_at)
        .bind(dto.capacity)
        .bind(&dto.meeting_url)
        .fetch_one(db)
        .await?;

        info!(session.id = %session.id, "Session scheduled");
        Ok(session)
    }

    #[instrument(skip(db))]
    pub async fn complete_session(db: &PgPool, session_id: SessionId) -> Result<Session, AppError> {
        let mut tx = db.begin().await?;
        let session = Self::lock_session(&mut tx, session_id).await?;

        if !session.has_ended(Utc::now()) {
            return Err(AppError::conflict(anyhow!(
                "Session cannot be completed before it ends"
            )));
        }
        let session = Self::transition(&mut tx, &session, SessionStatus::Completed, None).await?;

        tx.commit().await?;
        Ok(session)
    }

    /// Cancel a session and every booking still holding a seat in it. Consumed
    /// credits are returned whatever the notice.
    #[instrument(skip(db))]
    pub async fn cancel_session(
        db: &PgPool,
        session_id: SessionId,
        reason: Option<String>,
    ) -> Result<Session, AppError> {
        let reason = reason.unwrap_or_else(|| "session_cancelled".to_string());
        let mut tx = db.begin().await?;
        let session = Self::lock_session(&mut tx, session_id).await?;
        let session =
            Self::transition(&mut tx, &session, SessionStatus::Cancelled, Some(&reason)).await?;

        let bookings = sqlx::query_as::<_, Booking>(
            r#"UPDATE bookings
               SET status = 'CANCELLED', cancelled_at = NOW(), cancel_reason = $2, updated_at = NOW()
               WHERE session_id = $1 AND status <> 'CANCELLED'
               RETURNING *"#,
        )
        .bind(session_id)
        .bind(&reason)
        .fetch_all(&mut *tx)
        .await?;

        let mut refunds = Vec::with_capacity(bookings.len());
        for booking in &bookings {
            refunds.push(BookingService::refund_credit(&mut tx, booking.id).await?);
        }

        tx.commit().await?;

        for refunded in refunds {
            metrics::track_booking_cancelled(refunded);
        }
        info!(
            session.id = %session.id,
            bookings = bookings.len(),
            "Session cancelled"
        );
        Ok(session)
    }

    /// Mark every scheduled session whose end has passed as completed.
    #[instrument(skip(db))]
    pub async fn complete_ended_sessions(db: &PgPool) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"UPDATE sessions SET status = 'COMPLETED', updated_at = NOW()
               WHERE status = 'SCHEDULED' AND end_at <= NOW()"#,
        )
        .execute(db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Cancel drafts whose payment never arrived.
    #[instrument(skip(db))]
    pub async fn expire_stale_drafts(
        db: &PgPool,
        older_than_minutes: i64,
    ) -> Result<ExpiredDrafts, AppError> {
        let cutoff = Utc::now() - Duration::minutes(older_than_minutes);
        let mut tx = db.begin().await?;

        let bookings = sqlx::query(
            r#"UPDATE bookings
               SET status = 'CANCELLED', cancelled_at = NOW(), cancel_reason = 'payment_expired',
                   updated_at = NOW()
               WHERE status = 'DRAFT' AND created_at < $1"#,
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let sessions = sqlx::query(
            r#"UPDATE sessions
               SET status = 'CANCELLED', cancelled_at = NOW(), cancel_reason = 'payment_expired',
                   updated_at = NOW()
               WHERE status = 'DRAFT' AND created_at < $1"#,
        )
        .bind(cutoff)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if bookings > 0 || sessions > 0 {
            warn!(bookings, sessions, "Expired unpaid drafts");
        }
        Ok(ExpiredDrafts { bookings, sessions })
    }

    pub(crate) async fn lock_session(
        conn: &mut PgConnection,
        session_id: SessionId,
    ) -> Result<Session, AppError> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1 FOR UPDATE")
            .bind(session_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Session not found")))
    }

    /// Bookings holding a seat (draft or confirmed).
    pub(crate) async fn active_booking_count(
        conn: &mut PgConnection,
        session_id: SessionId,
    ) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings WHERE session_id = $1 AND status <> 'CANCELLED'",
        )
        .bind(session_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// A locked session accepts a new booking only while scheduled, not yet
    /// started and below capacity.
    pub(crate) async fn ensure_open_seat(
        conn: &mut PgConnection,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if session.status != SessionStatus::Scheduled {
            return Err(AppError::conflict(anyhow!(
                "Session is {} and cannot be booked",
                session.status.as_str()
            )));
        }
        if session.has_started(now) {
            return Err(AppError::conflict(anyhow!("Session has already started")));
        }
        if Self::active_booking_count(conn, session.id).await? >= i64::from(session.capacity) {
            return Err(AppError::conflict(anyhow!("Session is full")));
        }
        Ok(())
    }

    /// Create a one-seat private session after checking the slot against the
    /// teacher's availability. The teacher row stays locked until the caller
    /// commits.
    pub(crate) async fn create_private_session(
        conn: &mut PgConnection,
        teacher_id: TeacherId,
        start_at: DateTime<Utc>,
        minutes: i64,
        status: SessionStatus,
    ) -> Result<Session, AppError> {
        let teacher = TeacherService::lock_teacher(conn, teacher_id).await?;
        if !teacher.is_active {
            return Err(AppError::conflict(anyhow!("Teacher is not accepting bookings")));
        }
        if start_at <= Utc::now() {
            return Err(AppError::bad_request(anyhow!("start_at must be in the future")));
        }

        let end_at = start_at + Duration::minutes(minutes);
        TeacherService::ensure_slot_available(conn, &teacher, start_at, end_at).await?;

        let session = sqlx::query_as::<_, Session>(
            r#"INSERT INTO sessions (teacher_id, session_type, status, start_at, end_at, capacity)
               VALUES ($1, $2, $3, $4, $5, 1)
               RETURNING *"#,
        )
        .bind(teacher_id)
        .bind(SessionType::Private)
        .bind(status)
        .bind(start_at)
        .bind(end_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(session)
    }

    pub(crate) async fn transition(
        conn: &mut PgConnection,
        session: &Session,
        next: SessionStatus,
        reason: Option<&str>,
    ) -> Result<Session, AppError> {
        if !session.status.can_transition_to(next) {
            return Err(AppError::conflict(anyhow!(
                "Cannot move session from {} to {}",
                session.status.as_str(),
                next.as_str()
            )));
        }

        let session = sqlx::query_as::<_, Session>(
            r#"UPDATE sessions
               SET status = $2,
                   cancelled_at = CASE WHEN $2 = 'CANCELLED'::session_status THEN NOW() ELSE cancelled_at END,
                   cancel_reason = COALESCE($3, cancel_reason),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(session.id)
        .bind(next)
        .bind(reason)
        .fetch_one(&mut *conn)
        .await?;

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::teachers::model::CreateTeacherDto;
    use axum::http::StatusCode;

    async fn teacher_id(pool: &PgPool) -> TeacherId {
        TeacherService::create_teacher(
            pool,
            CreateTeacherDto {
                display_name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                timezone: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn insert_session(
        pool: &PgPool,
        teacher_id: TeacherId,
        status: &str,
        start_at: DateTime<Utc>,
    ) -> Session {
        sqlx::query_as::<_, Session>(
            r#"INSERT INTO sessions (teacher_id, session_type, status, start_at, end_at, capacity)
               VALUES ($1, 'GROUP', $2::session_status, $3, $4, 4)
               RETURNING *"#,
        )
        .bind(teacher_id)
        .bind(status)
        .bind(start_at)
        .bind(start_at + Duration::hours(1))
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_and_filter_sessions(pool: PgPool) {
        let teacher = teacher_id(&pool).await;
        let start = Utc::now() + Duration::days(3);
        let session = SessionService::create_session(
            &pool,
            CreateSessionDto {
                teacher_id: teacher,
                session_type: SessionType::Group,
                title: Some("Conversation club".to_string()),
                start_at: start,
                end_at: start + Duration::hours(1),
                capacity: 6,
                meeting_url: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(session.status, SessionStatus::Scheduled);

        insert_session(&pool, teacher, "CANCELLED", start + Duration::days(1)).await;

        let scheduled = SessionService::list_sessions(
            &pool,
            SessionFilterParams {
                status: Some(SessionStatus::Scheduled),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(scheduled.meta.total, 1);
        assert_eq!(scheduled.data[0].id, session.id);

        let all = SessionService::list_sessions(&pool, SessionFilterParams::default())
            .await
            .unwrap();
        assert_eq!(all.meta.total, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_complete_requires_end(pool: PgPool) {
        let teacher = teacher_id(&pool).await;
        let upcoming = insert_session(&pool, teacher, "SCHEDULED", Utc::now() + Duration::days(1)).await;
        let err = SessionService::complete_session(&pool, upcoming.id)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let past = insert_session(&pool, teacher, "SCHEDULED", Utc::now() - Duration::hours(3)).await;
        let completed = SessionService::complete_session(&pool, past.id).await.unwrap();
        assert_eq!(completed.status, SessionStatus::Completed);

        let err = SessionService::cancel_session(&pool, past.id, None)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert!(err.error.to_string().contains("COMPLETED"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_batch_maintenance(pool: PgPool) {
        let teacher = teacher_id(&pool).await;
        insert_session(&pool, teacher, "SCHEDULED", Utc::now() - Duration::hours(3)).await;
        insert_session(&pool, teacher, "SCHEDULED", Utc::now() + Duration::hours(3)).await;
        let draft = insert_session(&pool, teacher, "DRAFT", Utc::now() + Duration::days(2)).await;
        sqlx::query("UPDATE sessions SET created_at = NOW() - INTERVAL '2 hours' WHERE id = $1")
            .bind(draft.id)
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(SessionService::complete_ended_sessions(&pool).await.unwrap(), 1);

        let expired = SessionService::expire_stale_drafts(&pool, 60).await.unwrap();
        assert_eq!(expired, ExpiredDrafts { bookings: 0, sessions: 1 });
        let draft = SessionService::get_session(&pool, draft.id).await.unwrap();
        assert_eq!(draft.status, SessionStatus::Cancelled);
        assert_eq!(draft.cancel_reason.as_deref(), Some("payment_expired"));
    }
}
