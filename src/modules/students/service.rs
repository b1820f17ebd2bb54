use anyhow::anyhow;
use chrono::Utc;
use sqlx::PgPool;
use thrive_core::AppError;
use thrive_models::ids::{StudentId, StudentPackageId};
use tracing::instrument;

use crate::modules::students::model::{
    CreateStudentDto, PackageUse, Student, StudentPackage, StudentPackageView,
};

pub struct StudentService;

impl StudentService {
    /// Create a student, or refresh the one with the same email.
    #[instrument(skip(db))]
    pub async fn create_student(db: &PgPool, dto: CreateStudentDto) -> Result<Student, AppError> {
        let student = sqlx::query_as::<_, Student>(
            r#"INSERT INTO students (email, first_name, last_name, wp_user_id, stripe_customer_id)
               VALUES (LOWER($1), $2, $3, $4, $5)
               ON CONFLICT (email) DO UPDATE SET
                   first_name = EXCLUDED.first_name,
                   last_name = EXCLUDED.last_name,
                   wp_user_id = COALESCE(EXCLUDED.wp_user_id, students.wp_user_id),
                   stripe_customer_id = COALESCE(EXCLUDED.stripe_customer_id, students.stripe_customer_id),
                   updated_at = NOW()
               RETURNING *"#,
        )
        .bind(&dto.email)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(dto.wp_user_id)
        .bind(&dto.stripe_customer_id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict(anyhow!(
                    "WordPress user {} is linked to another student",
                    dto.wp_user_id.unwrap_or_default()
                ));
            }
            AppError::from(e)
        })?;

        Ok(student)
    }

    #[instrument(skip(db))]
    pub async fn get_student(db: &PgPool, student_id: StudentId) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(student_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
    }

    /// Packages with usable ones first, soonest expiry first.
    #[instrument(skip(db))]
    pub async fn list_packages(
        db: &PgPool,
        student_id: StudentId,
    ) -> Result<Vec<StudentPackageView>, AppError> {
        let packages = sqlx::query_as::<_, StudentPackage>(
            r#"SELECT * FROM student_packages
               WHERE student_id = $1
               ORDER BY (remaining_credits > 0 AND (expires_at IS NULL OR expires_at > NOW())) DESC,
                        expires_at ASC NULLS LAST,
                        purchased_at DESC"#,
        )
        .bind(student_id)
        .fetch_all(db)
        .await?;

        let now = Utc::now();
        Ok(packages
            .into_iter()
            .map(|package| StudentPackageView::new(package, now))
            .collect())
    }

    /// Ledger entries for one of the student's packages, newest first.
    #[instrument(skip(db))]
    pub async fn list_package_uses(
        db: &PgPool,
        student_id: StudentId,
        package_id: StudentPackageId,
    ) -> Result<Vec<PackageUse>, AppError> {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM student_packages WHERE id = $1 AND student_id = $2)",
        )
        .bind(package_id)
        .bind(student_id)
        .fetch_one(db)
        .await?;

        if !owned {
            return Err(AppError::not_found(anyhow!("Package not found")));
        }

        let uses = sqlx::query_as::<_, PackageUse>(
            "SELECT * FROM package_uses WHERE student_package_id = $1 ORDER BY used_at DESC",
        )
        .bind(package_id)
        .fetch_all(db)
        .await?;

        Ok(uses)
    }
}
