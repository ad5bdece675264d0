use askama::Template;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use time::OffsetDateTime;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::extractors::{AuthRejection, FORCE_PASSWORD_PATH};
use crate::auth::session::{removal_cookie, with_cookie, SESSION_COOKIE};
use crate::auth::{
    check_new_password, hash_password, hash_token, start_session, verify_password, AdminUser,
    SessionUser,
};
use crate::db::models::{
    FlashLevel, FlashMessage, Gender, NewStudentProfile, NewUser, SupervisorProfile, User,
    UserRole,
};
use crate::db::repositories::{
    DepartmentHeadRepository, PasswordResetRepository, SessionRepository, StudentProfileRepository,
    SupervisorProfileRepository, UserRepository,
};
use crate::db::DatabaseError;
use crate::error::{AppError, AppResult};
use crate::i18n::I18n;
use crate::i18n_args;
use crate::modules::common::{
    flash_message_redirect, flash_redirect, validation_message, HtmlTemplate, Page,
};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ---- login / logout ----

#[derive(Template)]
#[template(path = "accounts/login.html")]
struct LoginTemplate {
    page: Page,
    email: String,
}

fn login_page(page: Page, email: String) -> Response {
    HtmlTemplate(LoginTemplate { page, email }).into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub logged_out: Option<String>,
}

/// `/` sends visitors to their dashboard or to the login page.
pub async fn home(session: Result<SessionUser, AuthRejection>) -> Response {
    match session {
        Ok(session) if session.user.must_change_password => {
            Redirect::to(FORCE_PASSWORD_PATH).into_response()
        }
        Ok(session) => Redirect::to(session.user.role.dashboard_path()).into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

pub async fn login_form(t: I18n, Query(query): Query<LoginQuery>) -> Response {
    let mut page = Page::anonymous(t, "title-login");
    if query.logged_out.is_some() {
        page = page.notice_key(FlashLevel::Success, "logout-success");
    }
    login_page(page, String::new())
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    t: I18n,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let email = normalize_email(&form.email);
    let user = UserRepository::get_user_by_email(&state.db, &email).await?;

    let authenticated = match user {
        Some(u) if u.is_active => {
            let verified = match u.password_hash.as_deref() {
                Some(hash) => verify_password(&form.password, hash).await,
                None => false,
            };
            verified.then_some(u)
        }
        _ => None,
    };

    let Some(user) = authenticated else {
        tracing::info!(email = %email, "Login rejected");
        let page = Page::anonymous(t, "title-login")
            .notice_key(FlashLevel::Error, "error-invalid-credentials");
        return Ok(login_page(page, email));
    };

    let welcome = FlashMessage::new(
        FlashLevel::Success,
        t.get_with_args("welcome", &i18n_args!("name" => user.full_name.clone())),
    );
    let cookie = start_session(&state, &user, &[welcome]).await?;
    let target = if user.must_change_password {
        FORCE_PASSWORD_PATH
    } else {
        user.role.dashboard_path()
    };
    Ok(with_cookie(Redirect::to(target).into_response(), cookie))
}

pub async fn logout(State(state): State<AppState>, session: SessionUser) -> AppResult<Response> {
    SessionRepository::delete(&state.db, &session.session_id).await?;
    tracing::info!(user_id = %session.user.id, "Session ended");
    Ok(with_cookie(
        Redirect::to("/accounts/login?logged_out=1").into_response(),
        removal_cookie(SESSION_COOKIE),
    ))
}

// ---- student self-registration ----

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub student_number: String,
    #[serde(default)]
    pub study_program: String,
    #[serde(default)]
    pub cohort_year: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Template)]
#[template(path = "accounts/register.html")]
struct RegisterTemplate {
    page: Page,
    form: RegisterForm,
}

pub async fn register_form(t: I18n) -> impl IntoResponse {
    HtmlTemplate(RegisterTemplate {
        page: Page::anonymous(t, "title-register"),
        form: RegisterForm::default(),
    })
}

fn register_error(t: I18n, form: RegisterForm, message: String) -> Response {
    let mut form = form;
    form.password.clear();
    form.password_confirm.clear();
    HtmlTemplate(RegisterTemplate {
        page: Page::anonymous(t, "title-register").notice(FlashLevel::Error, message),
        form,
    })
    .into_response()
}

pub async fn register(
    State(state): State<AppState>,
    t: I18n,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if let Err(key) = check_new_password(&form.password, &form.password_confirm) {
        let message = t.get(key);
        return Ok(register_error(t, form, message));
    }
    let parsed = (form.cohort_year.trim().parse::<i32>(), Gender::parse(&form.gender));
    let (Ok(cohort_year), Some(gender)) = parsed else {
        let message = t.get("error-form-invalid");
        return Ok(register_error(t, form, message));
    };

    let new_user = NewUser {
        email: normalize_email(&form.email),
        password_hash: None,
        full_name: form.full_name.trim().to_string(),
        role: UserRole::Student,
        must_change_password: false,
    };
    if let Err(errors) = new_user.validate() {
        let message = validation_message(&t, &errors);
        return Ok(register_error(t, form, message));
    }
    if UserRepository::email_exists(&state.db, &new_user.email).await? {
        let message = t.get("error-email-taken");
        return Ok(register_error(t, form, message));
    }
    let student_number = form.student_number.trim().to_string();
    if StudentProfileRepository::student_number_exists(&state.db, &student_number).await? {
        let message = t.get("error-student-number-taken");
        return Ok(register_error(t, form, message));
    }

    let new_user = NewUser {
        password_hash: Some(hash_password(&form.password).await?),
        ..new_user
    };

    let mut tx = state.db.begin().await?;
    let user = match UserRepository::create_user(&mut tx, &new_user).await {
        Ok(user) => user,
        Err(DatabaseError::Duplicate) => {
            let message = t.get("error-email-taken");
            return Ok(register_error(t, form, message));
        }
        Err(e) => return Err(e.into()),
    };
    let profile = NewStudentProfile {
        user_id: user.id,
        full_name: user.full_name.clone(),
        student_number,
        study_program: form.study_program.trim().to_string(),
        cohort_year,
        gender,
        phone: form.phone.trim().to_string(),
    };
    if let Err(errors) = profile.validate() {
        let message = validation_message(&t, &errors);
        return Ok(register_error(t, form, message));
    }
    StudentProfileRepository::create(&mut tx, &profile).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, "Student registered");
    let page =
        Page::anonymous(t, "title-login").notice_key(FlashLevel::Success, "register-success");
    Ok(login_page(page, user.email))
}

// ---- password changes ----

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub password: String,
    pub password_confirm: String,
}

#[derive(Template)]
#[template(path = "accounts/force_password.html")]
struct ForcePasswordTemplate {
    page: Page,
}

pub async fn force_password_form(
    State(state): State<AppState>,
    session: SessionUser,
) -> impl IntoResponse {
    let page = Page::for_user(&state, &session, "title-force-password").await;
    HtmlTemplate(ForcePasswordTemplate { page })
}

pub async fn force_password(
    State(state): State<AppState>,
    session: SessionUser,
    Form(form): Form<PasswordForm>,
) -> AppResult<Response> {
    if let Err(key) = check_new_password(&form.password, &form.password_confirm) {
        return Ok(flash_redirect(
            &state,
            &session,
            FlashLevel::Error,
            key,
            FORCE_PASSWORD_PATH,
        )
        .await);
    }
    let hash = hash_password(&form.password).await?;
    UserRepository::set_password(&state.db, session.user.id, &hash).await?;
    tracing::info!(user_id = %session.user.id, "Password changed");
    Ok(flash_redirect(
        &state,
        &session,
        FlashLevel::Success,
        "password-changed",
        session.user.role.dashboard_path(),
    )
    .await)
}

#[derive(Template)]
#[template(path = "accounts/reset_password.html")]
struct ResetPasswordTemplate {
    page: Page,
    token: String,
    valid: bool,
}

async fn usable_reset(
    state: &AppState,
    token: &str,
) -> AppResult<Option<crate::db::models::PasswordResetToken>> {
    let reset = PasswordResetRepository::find_by_hash(&state.db, &hash_token(token)).await?;
    Ok(reset.filter(|r| r.is_usable(OffsetDateTime::now_utc())))
}

pub async fn reset_password_form(
    State(state): State<AppState>,
    t: I18n,
    Path(token): Path<String>,
) -> AppResult<Response> {
    let valid = usable_reset(&state, &token).await?.is_some();
    let mut page = Page::anonymous(t, "title-reset-password");
    if !valid {
        page = page.notice_key(FlashLevel::Error, "error-reset-invalid");
    }
    Ok(HtmlTemplate(ResetPasswordTemplate { page, token, valid }).into_response())
}

pub async fn reset_password(
    State(state): State<AppState>,
    t: I18n,
    Path(token): Path<String>,
    Form(form): Form<PasswordForm>,
) -> AppResult<Response> {
    let Some(reset) = usable_reset(&state, &token).await? else {
        let page = Page::anonymous(t, "title-reset-password")
            .notice_key(FlashLevel::Error, "error-reset-invalid");
        return Ok(HtmlTemplate(ResetPasswordTemplate {
            page,
            token,
            valid: false,
        })
        .into_response());
    };
    if let Err(key) = check_new_password(&form.password, &form.password_confirm) {
        let page = Page::anonymous(t, "title-reset-password").notice_key(FlashLevel::Error, key);
        return Ok(HtmlTemplate(ResetPasswordTemplate {
            page,
            token,
            valid: true,
        })
        .into_response());
    }

    let hash = hash_password(&form.password).await?;
    UserRepository::set_password(&state.db, reset.user_id, &hash).await?;
    PasswordResetRepository::mark_used(&state.db, reset.id).await?;
    tracing::info!(user_id = %reset.user_id, "Password set from reset link");

    let email = UserRepository::get_user_by_id(&state.db, reset.user_id)
        .await?
        .map(|u| u.email)
        .unwrap_or_default();
    let page = Page::anonymous(t, "title-login")
        .notice_key(FlashLevel::Success, "password-reset-success");
    Ok(login_page(page, email))
}

// ---- admin provisioning ----

#[derive(Debug, Deserialize)]
pub struct SupervisorForm {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub business_field: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Template)]
#[template(path = "accounts/supervisors.html")]
struct SupervisorsTemplate {
    page: Page,
    supervisors: Vec<SupervisorProfile>,
}

pub async fn supervisors(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let supervisors = SupervisorProfileRepository::list_all(&state.db).await?;
    let page = Page::for_user(&state, &admin, "title-supervisors").await;
    Ok(HtmlTemplate(SupervisorsTemplate { page, supervisors }))
}

struct StaffAccount<'a> {
    role: UserRole,
    full_name: &'a str,
    email: &'a str,
    password: &'a str,
    password_confirm: &'a str,
}

/// Creates a staff account with a temporary password the owner must replace.
/// On a form problem the `Err` side holds the redirect to show instead.
async fn create_staff_user(
    state: &AppState,
    session: &SessionUser,
    account: StaffAccount<'_>,
    back_to: &str,
) -> AppResult<Result<(User, sqlx::Transaction<'static, sqlx::Postgres>), Response>> {
    let StaffAccount {
        role,
        full_name,
        email,
        password,
        password_confirm,
    } = account;
    if let Err(key) = check_new_password(password, password_confirm) {
        return Ok(Err(flash_redirect(state, session, FlashLevel::Error, key, back_to).await));
    }
    let new_user = NewUser {
        email: normalize_email(email),
        password_hash: Some(hash_password(password).await?),
        full_name: full_name.trim().to_string(),
        role,
        must_change_password: true,
    };
    if let Err(errors) = new_user.validate() {
        let t = I18n::new(state.localizer.clone(), session.language);
        let message = validation_message(&t, &errors);
        return Ok(Err(
            flash_message_redirect(state, session, FlashLevel::Error, message, back_to).await,
        ));
    }
    if UserRepository::email_exists(&state.db, &new_user.email).await? {
        return Ok(Err(
            flash_redirect(state, session, FlashLevel::Error, "error-email-taken", back_to).await,
        ));
    }

    let mut tx = state.db.begin().await?;
    match UserRepository::create_user(&mut tx, &new_user).await {
        Ok(user) => Ok(Ok((user, tx))),
        Err(DatabaseError::Duplicate) => Ok(Err(
            flash_redirect(state, session, FlashLevel::Error, "error-email-taken", back_to).await,
        )),
        Err(e) => Err(AppError::from(e)),
    }
}

pub async fn create_supervisor(
    State(state): State<AppState>,
    admin: AdminUser,
    Form(form): Form<SupervisorForm>,
) -> AppResult<Response> {
    const BACK: &str = "/accounts/supervisors";
    let (user, mut tx) = match create_staff_user(
        &state,
        &admin,
        StaffAccount {
            role: UserRole::Supervisor,
            full_name: &form.full_name,
            email: &form.email,
            password: &form.password,
            password_confirm: &form.password_confirm,
        },
        BACK,
    )
    .await?
    {
        Ok(created) => created,
        Err(response) => return Ok(response),
    };
    SupervisorProfileRepository::create(
        &mut tx,
        &user,
        form.phone.trim(),
        form.company.trim(),
        form.business_field.trim(),
        false,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, admin_id = %admin.user.id, "Supervisor provisioned");
    let t = I18n::new(state.localizer.clone(), admin.language);
    let message = t.get_with_args("supervisor-created", &i18n_args!("name" => user.full_name));
    Ok(flash_message_redirect(&state, &admin, FlashLevel::Success, message, BACK).await)
}

#[derive(Debug, Deserialize)]
pub struct DepartmentHeadForm {
    pub full_name: String,
    pub email: String,
    pub study_program: String,
    pub password: String,
    pub password_confirm: String,
}

pub struct DepartmentHeadRow {
    pub full_name: String,
    pub email: String,
    pub study_program: String,
}

#[derive(Template)]
#[template(path = "accounts/department_heads.html")]
struct DepartmentHeadsTemplate {
    page: Page,
    heads: Vec<DepartmentHeadRow>,
}

pub async fn department_heads(
    State(state): State<AppState>,
    admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let users = UserRepository::list_by_role(&state.db, UserRole::DepartmentHead).await?;
    let mut heads = Vec::with_capacity(users.len());
    for user in users {
        let study_program = DepartmentHeadRepository::find_by_user(&state.db, user.id)
            .await?
            .map(|h| h.study_program)
            .unwrap_or_default();
        heads.push(DepartmentHeadRow {
            full_name: user.full_name,
            email: user.email,
            study_program,
        });
    }
    let page = Page::for_user(&state, &admin, "title-department-heads").await;
    Ok(HtmlTemplate(DepartmentHeadsTemplate { page, heads }))
}

pub async fn create_department_head(
    State(state): State<AppState>,
    admin: AdminUser,
    Form(form): Form<DepartmentHeadForm>,
) -> AppResult<Response> {
    const BACK: &str = "/accounts/department-heads";
    let study_program = form.study_program.trim().to_string();
    if study_program.is_empty() {
        return Ok(flash_redirect(
            &state,
            &admin,
            FlashLevel::Error,
            "error-form-invalid",
            BACK,
        )
        .await);
    }
    let (user, mut tx) = match create_staff_user(
        &state,
        &admin,
        StaffAccount {
            role: UserRole::DepartmentHead,
            full_name: &form.full_name,
            email: &form.email,
            password: &form.password,
            password_confirm: &form.password_confirm,
        },
        BACK,
    )
    .await?
    {
        Ok(created) => created,
        Err(response) => return Ok(response),
    };
    DepartmentHeadRepository::create(&mut tx, user.id, &study_program).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, program = %study_program, "Department head provisioned");
    let t = I18n::new(state.localizer.clone(), admin.language);
    let message = t.get_with_args("department-head-created", &i18n_args!("name" => user.full_name));
    Ok(flash_message_redirect(&state, &admin, FlashLevel::Success, message, BACK).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Rina@Nusantara.CO.ID "), "rina@nusantara.co.id");
    }
}
