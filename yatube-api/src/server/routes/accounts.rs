use crate::server::{
    AuthSettings, Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    forms::{
        FormContext, FormErrors, LoginForm, LoginValues, NON_FIELD_ERRORS, SignupForm,
        SignupValues, login_form, signup_form,
    },
    render::{Found, Render},
    routes::{Form, Query},
};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info};
use validator::Validate;
use yatube_common::model::{
    auth::{AuthToken, Authentication, PasswordHash},
    user::{CreateUser, User, Username},
};
use yatube_db::client::DbClient;

const DUPLICATE_USERNAME_MESSAGE: &str = "A user with that username already exists.";
const INVALID_LOGIN_MESSAGE: &str = "Please enter a correct username and password. \
    Note that both fields may be case-sensitive.";

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(signup_form_page)
        .typed_post(signup)
        .typed_get(login_form_page)
        .typed_post(login)
        .typed_post(logout)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/signup/", rejection(ServerError))]
pub struct SignupPath();

#[derive(Serialize)]
struct SignupContext {
    form: FormContext<SignupValues>,
}

fn render_signup(values: SignupValues, errors: FormErrors) -> Render<SignupContext> {
    Render::new(
        "users/signup.html",
        SignupContext {
            form: signup_form(values, errors),
        },
    )
}

async fn signup_form_page(SignupPath(): SignupPath) -> Render<SignupContext> {
    render_signup(SignupValues::default(), FormErrors::default())
}

async fn signup(
    SignupPath(): SignupPath,
    State(db): State<Arc<DbClient>>,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    let (username, password) = match form.clean() {
        Ok(cleaned) => cleaned,
        Err((values, errors)) => return Ok(render_signup(values, errors).into_response()),
    };

    let password_hash = PasswordHash::generate(&password)?;
    let created = db
        .create_user(&CreateUser {
            username: username.clone(),
            password_hash,
        })
        .await?;

    let Some(user) = created else {
        debug!(%username, "Rejected signup for taken username");
        let mut errors = FormErrors::default();
        errors.add("username", DUPLICATE_USERNAME_MESSAGE);
        let values = SignupValues {
            username: username.into_inner(),
        };
        return Ok(render_signup(values, errors).into_response());
    };

    info!(user = %user.id, username = %user.username, "Signed up user");
    Ok(Found::to("/").into_response())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/login/", rejection(ServerError))]
pub struct LoginPath();

/// Where to send the client after logging in.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct NextQuery {
    next: Option<String>,
}

#[derive(Serialize)]
struct LoginContext {
    form: FormContext<LoginValues>,
    next: Option<String>,
}

#[derive(Serialize)]
struct LoginSuccessContext {
    user: User,
    token: String,
    #[serde(with = "time::serde::rfc3339::option")]
    expires_at: Option<OffsetDateTime>,
    next: Option<String>,
}

fn render_login(
    values: LoginValues,
    errors: FormErrors,
    next: Option<String>,
) -> Render<LoginContext> {
    Render::new(
        "users/login.html",
        LoginContext {
            form: login_form(values, errors),
            next,
        },
    )
}

async fn login_form_page(
    LoginPath(): LoginPath,
    Query(NextQuery { next }): Query<NextQuery>,
) -> Render<LoginContext> {
    render_login(LoginValues::default(), FormErrors::default(), next)
}

async fn login(
    LoginPath(): LoginPath,
    State(db): State<Arc<DbClient>>,
    State(auth_settings): State<AuthSettings>,
    Query(NextQuery { next }): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let values = LoginValues {
        username: form.username.trim().to_owned(),
    };

    if let Err(errors) = form.validate() {
        return Ok(render_login(values, errors.into(), next).into_response());
    }

    let credentials = match Username::new(values.username.clone()) {
        Ok(username) => db.fetch_credentials(&username).await?,
        Err(_) => None,
    };
    let Some(credentials) =
        credentials.filter(|credentials| credentials.password_hash.verify(&form.password))
    else {
        debug!(username = %values.username, "Rejected login");
        let mut errors = FormErrors::default();
        errors.add(NON_FIELD_ERRORS, INVALID_LOGIN_MESSAGE);
        return Ok(render_login(values, errors, next).into_response());
    };

    let user = credentials.user;
    let token = AuthToken::generate_random(user.id);
    let authentication = Authentication {
        user: user.id,
        token_hash: token.hash()?,
        created_at: OffsetDateTime::now_utc(),
        expires_after: auth_settings.token_lifetime,
    };
    db.create_auth(&authentication).await?;

    info!(user = %user.id, "Issued auth token");

    let context = LoginSuccessContext {
        token: token.as_token_str(),
        expires_at: authentication.expires_at(),
        user,
        next,
    };
    Ok(Render::new("users/login_success.html", context).into_response())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/logout/", rejection(ServerError))]
pub struct LogoutPath();

#[derive(Serialize)]
struct LoggedOutContext {}

async fn logout(
    LogoutPath(): LogoutPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Render<LoggedOutContext>> {
    if db.delete_auth(user.token_hash()).await? {
        info!(user = %user.user_id(), "Revoked auth token");
    }

    Ok(Render::new("users/logged_out.html", LoggedOutContext {}))
}
