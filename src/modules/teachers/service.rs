use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgConnection, PgPool};
use thrive_config::BookingConfig;
use thrive_core::AppError;
use thrive_models::availability::{covers, expand_availability};
use thrive_models::ids::{AvailabilityId, TeacherId};
use tracing::instrument;

use crate::modules::teachers::model::{
    AvailabilityQuery, AvailabilityWindow, CreateAvailabilityDto, CreateTeacherDto, Teacher,
    TeacherAvailability, TeacherAvailabilityResponse,
};

pub struct TeacherService;

impl TeacherService {
    #[instrument(skip(db))]
    pub async fn list_teachers(db: &PgPool) -> Result<Vec<Teacher>, AppError> {
        let teachers = sqlx::query_as::<_, Teacher>(
            "SELECT * FROM teachers WHERE is_active ORDER BY display_name",
        )
        .fetch_all(db)
        .await?;

        Ok(teachers)
    }

    #[instrument(skip(db))]
    pub async fn get_teacher(db: &PgPool, teacher_id: TeacherId) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = $1")
            .bind(teacher_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Teacher not found")))
    }

    #[instrument(skip(db))]
    pub async fn create_teacher(db: &PgPool, dto: CreateTeacherDto) -> Result<Teacher, AppError> {
        let teacher = sqlx::query_as::<_, Teacher>(
            r#"INSERT INTO teachers (display_name, email, timezone)
               VALUES ($1, LOWER($2), $3)
               RETURNING *"#,
        )
        .bind(&dto.display_name)
        .bind(&dto.email)
        .bind(dto.timezone.as_deref().unwrap_or("UTC"))
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict(anyhow!("A teacher with email {} already exists", dto.email));
            }
            AppError::from(e)
        })?;

        Ok(teacher)
    }

    #[instrument(skip(db))]
    pub async fn add_availability(
        db: &PgPool,
        teacher_id: TeacherId,
        dto: CreateAvailabilityDto,
    ) -> Result<TeacherAvailability, AppError> {
        Self::get_teacher(db, teacher_id).await?;

        let row = sqlx::query_as::<_, TeacherAvailability>(
            r#"INSERT INTO teacher_availability
                   (teacher_id, kind, weekday, start_time, end_time, start_at, end_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING *"#,
        )
        .bind(teacher_id)
        .bind(dto.kind)
        .bind(dto.weekday)
        .bind(dto.start_time)
        .bind(dto.end_time)
        .bind(dto.start_at)
        .bind(dto.end_at)
        .fetch_one(db)
        .await?;

        Ok(row)
    }

    #[instrument(skip(db))]
    pub async fn list_availability(
        db: &PgPool,
        teacher_id: TeacherId,
    ) -> Result<Vec<TeacherAvailability>, AppError> {
        Self::get_teacher(db, teacher_id).await?;

        let rows = sqlx::query_as::<_, TeacherAvailability>(
            r#"SELECT * FROM teacher_availability
               WHERE teacher_id = $1
               ORDER BY kind, weekday NULLS LAST, start_time, start_at"#,
        )
        .bind(teacher_id)
        .fetch_all(db)
        .await?;

        Ok(rows)
    }

    #[instrument(skip(db))]
    pub async fn delete_availability(
        db: &PgPool,
        teacher_id: TeacherId,
        availability_id: AvailabilityId,
    ) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM teacher_availability WHERE id = $1 AND teacher_id = $2")
                .bind(availability_id)
                .bind(teacher_id)
                .execute(db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Availability entry not found")));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn expand_availability(
        db: &PgPool,
        config: &BookingConfig,
        teacher_id: TeacherId,
        query: AvailabilityQuery,
    ) -> Result<TeacherAvailabilityResponse, AppError> {
        if query.from >= query.to {
            return Err(AppError::bad_request(anyhow!("from must be before to")));
        }
        if query.to - query.from > Duration::days(config.max_availability_days) {
            return Err(AppError::bad_request(anyhow!(
                "Range may span at most {} days",
                config.max_availability_days
            )));
        }

        let teacher = Self::get_teacher(db, teacher_id).await?;
        let mut conn = db.acquire().await?;
        let windows =
            Self::windows_for(&mut conn, &teacher, query.from, query.to, query.include_occupied)
                .await?;

        Ok(TeacherAvailabilityResponse {
            teacher_id,
            timezone: teacher.timezone,
            from: query.from,
            to: query.to,
            windows,
        })
    }

    /// Lock the teacher row. Private-slot creation runs under this lock so two
    /// requests cannot claim the same free window.
    pub(crate) async fn lock_teacher(
        conn: &mut PgConnection,
        teacher_id: TeacherId,
    ) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = $1 FOR UPDATE")
            .bind(teacher_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Teacher not found")))
    }

    pub(crate) async fn windows_for(
        conn: &mut PgConnection,
        teacher: &Teacher,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        include_occupied: bool,
    ) -> Result<Vec<AvailabilityWindow>, AppError> {
        let rows = sqlx::query_as::<_, TeacherAvailability>(
            "SELECT * FROM teacher_availability WHERE teacher_id = $1 AND is_active",
        )
        .bind(teacher.id)
        .fetch_all(&mut *conn)
        .await?;

        let rules: Vec<_> = rows.iter().filter_map(TeacherAvailability::weekly_rule).collect();
        let blackouts: Vec<_> = rows.iter().filter_map(TeacherAvailability::blackout).collect();

        let occupied = if include_occupied {
            Vec::new()
        } else {
            sqlx::query_as::<_, AvailabilityWindow>(
                r#"SELECT start_at, end_at FROM sessions
                   WHERE teacher_id = $1
                     AND status IN ('DRAFT', 'SCHEDULED')
                     AND start_at < $3 AND end_at > $2"#,
            )
            .bind(teacher.id)
            .bind(from)
            .bind(to)
            .fetch_all(&mut *conn)
            .await?
        };

        Ok(expand_availability(
            teacher.tz(),
            &rules,
            &blackouts,
            &occupied,
            from,
            to,
        ))
    }

    /// Fails with 409 unless `[start_at, end_at)` is free in the teacher's
    /// expanded availability.
    pub(crate) async fn ensure_slot_available(
        conn: &mut PgConnection,
        teacher: &Teacher,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let windows = Self::windows_for(conn, teacher, start_at, end_at, false).await?;
        if covers(&windows, start_at, end_at) {
            Ok(())
        } else {
            Err(AppError::conflict(anyhow!(
                "Requested slot is outside the teacher's availability"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::teachers::model::AvailabilityKind;
    use axum::http::StatusCode;
    use chrono::{NaiveTime, TimeZone};

    async fn teacher(pool: &PgPool, timezone: &str) -> Teacher {
        TeacherService::create_teacher(
            pool,
            CreateTeacherDto {
                display_name: "Marta".to_string(),
                email: format!("marta-{}@example.com", uuid::Uuid::new_v4()),
                timezone: Some(timezone.to_string()),
            },
        )
        .await
        .unwrap()
    }

    fn weekly(weekday: i16, start: (u32, u32), end: (u32, u32)) -> CreateAvailabilityDto {
        CreateAvailabilityDto {
            kind: AvailabilityKind::Recurring,
            weekday: Some(weekday),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0),
            start_at: None,
            end_at: None,
        }
    }

    fn query(from: DateTime<Utc>, to: DateTime<Utc>) -> AvailabilityQuery {
        AvailabilityQuery {
            from,
            to,
            include_occupied: false,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_teacher_duplicate_email(pool: PgPool) {
        let dto = CreateTeacherDto {
            display_name: "Rui".to_string(),
            email: "rui@example.com".to_string(),
            timezone: None,
        };
        let created = TeacherService::create_teacher(&pool, dto.clone()).await.unwrap();
        assert_eq!(created.timezone, "UTC");

        let err = TeacherService::create_teacher(&pool, dto).await.unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_expansion_subtracts_blackouts_and_sessions(pool: PgPool) {
        let teacher = teacher(&pool, "Europe/Lisbon").await;
        // Monday 09:00-13:00 Lisbon; Lisbon is UTC+0 in March
        TeacherService::add_availability(&pool, teacher.id, weekly(1, (9, 0), (13, 0)))
            .await
            .unwrap();
        TeacherService::add_availability(
            &pool,
            teacher.id,
            CreateAvailabilityDto {
                kind: AvailabilityKind::Blackout,
                weekday: None,
                start_time: None,
                end_time: None,
                start_at: Some(Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()),
                end_at: Some(Utc.with_ymd_and_hms(2026, 3, 2, 13, 0, 0).unwrap()),
            },
        )
        .await
        .unwrap();
        sqlx::query(
            r#"INSERT INTO sessions (teacher_id, session_type, status, start_at, end_at)
               VALUES ($1, 'PRIVATE', 'SCHEDULED', $2, $3)"#,
        )
        .bind(teacher.id)
        .bind(Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap())
        .bind(Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap())
        .execute(&pool)
        .await
        .unwrap();

        let from = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap();

        let free = TeacherService::expand_availability(
            &pool,
            &BookingConfig::default(),
            teacher.id,
            query(from, to),
        )
        .await
        .unwrap();
        assert_eq!(
            free.windows,
            vec![
                AvailabilityWindow::new(
                    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
                    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap(),
                ),
                AvailabilityWindow::new(
                    Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap(),
                    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap(),
                ),
            ]
        );

        let with_occupied = TeacherService::expand_availability(
            &pool,
            &BookingConfig::default(),
            teacher.id,
            AvailabilityQuery {
                include_occupied: true,
                ..query(from, to)
            },
        )
        .await
        .unwrap();
        assert_eq!(
            with_occupied.windows,
            vec![AvailabilityWindow::new(
                Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap(),
            )]
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_range_limits(pool: PgPool) {
        let teacher = teacher(&pool, "UTC").await;
        let from = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let config = BookingConfig::default();

        let backwards =
            TeacherService::expand_availability(&pool, &config, teacher.id, query(from, from))
                .await
                .unwrap_err();
        assert_eq!(backwards.status, StatusCode::BAD_REQUEST);

        let too_wide = TeacherService::expand_availability(
            &pool,
            &config,
            teacher.id,
            query(from, from + Duration::days(63)),
        )
        .await
        .unwrap_err();
        assert_eq!(too_wide.status, StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_delete_availability_scoped_to_teacher(pool: PgPool) {
        let owner = teacher(&pool, "UTC").await;
        let other = teacher(&pool, "UTC").await;
        let rule = TeacherService::add_availability(&pool, owner.id, weekly(2, (8, 0), (9, 0)))
            .await
            .unwrap();

        let err = TeacherService::delete_availability(&pool, other.id, rule.id)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        TeacherService::delete_availability(&pool, owner.id, rule.id)
            .await
            .unwrap();
        assert!(TeacherService::list_availability(&pool, owner.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_slot_check(pool: PgPool) {
        let teacher = teacher(&pool, "UTC").await;
        TeacherService::add_availability(&pool, teacher.id, weekly(1, (9, 0), (12, 0)))
            .await
            .unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let inside = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        TeacherService::ensure_slot_available(&mut conn, &teacher, inside, inside + Duration::hours(1))
            .await
            .unwrap();

        let straddling = Utc.with_ymd_and_hms(2026, 3, 2, 11, 30, 0).unwrap();
        let err = TeacherService::ensure_slot_available(
            &mut conn,
            &teacher,
            straddling,
            straddling + Duration::hours(1),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }
}
