use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::models::{
    DepartmentHead, NewStudentProfile, ProfileDocument, StudentProfile, SupervisorProfile, User,
};
use crate::db::DbResult;

const STUDENT_COLUMNS: &str = "user_id, full_name, student_number, study_program, cohort_year, \
                               gender, phone, consultation_url, sptjm_url, portfolio_url, cv_url, \
                               has_internship, created_at, updated_at";

const SUPERVISOR_COLUMNS: &str = "user_id, full_name, email, phone, company, business_field, \
                                  created_automatically, created_at, updated_at";

pub struct StudentProfileRepository;

impl StudentProfileRepository {
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        profile: &NewStudentProfile,
    ) -> DbResult<StudentProfile> {
        let created = sqlx::query_as::<_, StudentProfile>(&format!(
            r#"
            INSERT INTO student_profiles
                (user_id, full_name, student_number, study_program, cohort_year, gender, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {STUDENT_COLUMNS}
            "#
        ))
        .bind(profile.user_id)
        .bind(profile.full_name.trim())
        .bind(profile.student_number.trim())
        .bind(profile.study_program.trim())
        .bind(profile.cohort_year)
        .bind(profile.gender)
        .bind(profile.phone.trim())
        .fetch_one(&mut **tx)
        .await?;
        Ok(created)
    }

    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> DbResult<Option<StudentProfile>> {
        let profile = sqlx::query_as::<_, StudentProfile>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM student_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(profile)
    }

    pub async fn student_number_exists(pool: &PgPool, student_number: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM student_profiles WHERE student_number = $1)",
        )
        .bind(student_number.trim())
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    pub async fn list_all(pool: &PgPool) -> DbResult<Vec<StudentProfile>> {
        let profiles = sqlx::query_as::<_, StudentProfile>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM student_profiles ORDER BY full_name"
        ))
        .fetch_all(pool)
        .await?;
        Ok(profiles)
    }

    pub async fn list_by_program(pool: &PgPool, program: &str) -> DbResult<Vec<StudentProfile>> {
        let profiles = sqlx::query_as::<_, StudentProfile>(&format!(
            r#"
            SELECT {STUDENT_COLUMNS}
            FROM student_profiles
            WHERE study_program = $1
            ORDER BY full_name
            "#
        ))
        .bind(program)
        .fetch_all(pool)
        .await?;
        Ok(profiles)
    }

    pub async fn update_contact(
        pool: &PgPool,
        user_id: Uuid,
        full_name: &str,
        phone: &str,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE student_profiles
            SET full_name = $1, phone = $2, updated_at = NOW()
            WHERE user_id = $3
            "#,
        )
        .bind(full_name.trim())
        .bind(phone.trim())
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Returns the URL that was replaced, if any.
    pub async fn set_document(
        pool: &PgPool,
        user_id: Uuid,
        document: ProfileDocument,
        url: &str,
    ) -> DbResult<Option<String>> {
        let column = document.column();
        let previous: Option<Option<String>> = sqlx::query_scalar(&format!(
            r#"
            UPDATE student_profiles AS p
            SET {column} = $1, updated_at = NOW()
            FROM (SELECT user_id, {column} AS old_url FROM student_profiles WHERE user_id = $2) AS o
            WHERE p.user_id = o.user_id
            RETURNING o.old_url
            "#
        ))
        .bind(url)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(previous.flatten())
    }

    pub async fn mark_has_internship(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE student_profiles
            SET has_internship = TRUE, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

pub struct SupervisorProfileRepository;

impl SupervisorProfileRepository {
    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> DbResult<Option<SupervisorProfile>> {
        let profile = sqlx::query_as::<_, SupervisorProfile>(&format!(
            "SELECT {SUPERVISOR_COLUMNS} FROM supervisor_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(profile)
    }

    /// Supervisor profiles are created on first access from the account itself.
    pub async fn get_or_create(pool: &PgPool, user: &User) -> DbResult<SupervisorProfile> {
        let profile = sqlx::query_as::<_, SupervisorProfile>(&format!(
            r#"
            INSERT INTO supervisor_profiles (user_id, full_name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {SUPERVISOR_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .fetch_one(pool)
        .await?;
        Ok(profile)
    }

    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        user: &User,
        phone: &str,
        company: &str,
        business_field: &str,
        created_automatically: bool,
    ) -> DbResult<SupervisorProfile> {
        let profile = sqlx::query_as::<_, SupervisorProfile>(&format!(
            r#"
            INSERT INTO supervisor_profiles
                (user_id, full_name, email, phone, company, business_field, created_automatically)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SUPERVISOR_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(phone.trim())
        .bind(company.trim())
        .bind(business_field.trim())
        .bind(created_automatically)
        .fetch_one(&mut **tx)
        .await?;
        Ok(profile)
    }

    /// Fills company details that are still empty; existing values win.
    pub async fn fill_missing_details(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        phone: &str,
        company: &str,
        business_field: &str,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE supervisor_profiles
            SET phone = CASE WHEN phone = '' THEN $1 ELSE phone END,
                company = CASE WHEN company = '' THEN $2 ELSE company END,
                business_field = CASE WHEN business_field = '' THEN $3 ELSE business_field END,
                updated_at = NOW()
            WHERE user_id = $4
            "#,
        )
        .bind(phone.trim())
        .bind(company.trim())
        .bind(business_field.trim())
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn list_all(pool: &PgPool) -> DbResult<Vec<SupervisorProfile>> {
        let profiles = sqlx::query_as::<_, SupervisorProfile>(&format!(
            "SELECT {SUPERVISOR_COLUMNS} FROM supervisor_profiles ORDER BY full_name"
        ))
        .fetch_all(pool)
        .await?;
        Ok(profiles)
    }
}

pub struct DepartmentHeadRepository;

impl DepartmentHeadRepository {
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
        study_program: &str,
    ) -> DbResult<DepartmentHead> {
        let head = sqlx::query_as::<_, DepartmentHead>(
            r#"
            INSERT INTO department_heads (user_id, study_program)
            VALUES ($1, $2)
            RETURNING user_id, study_program, created_at
            "#,
        )
        .bind(user_id)
        .bind(study_program.trim())
        .fetch_one(&mut **tx)
        .await?;
        Ok(head)
    }

    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> DbResult<Option<DepartmentHead>> {
        let head = sqlx::query_as::<_, DepartmentHead>(
            "SELECT user_id, study_program, created_at FROM department_heads WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(head)
    }

    pub async fn user_ids_for_program(
        tx: &mut Transaction<'_, Postgres>,
        study_program: &str,
    ) -> DbResult<Vec<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM department_heads WHERE study_program = $1")
                .bind(study_program)
                .fetch_all(&mut **tx)
                .await?;
        Ok(ids)
    }
}
