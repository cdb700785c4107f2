use crate::errors::AppError;
use crate::models::{LoginForm, NewUser, NextQuery, RegisterForm};
use crate::state::AppState;
use crate::storage::StoreError;
use crate::ui::{render_login, render_register};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Query, Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::{Duration, Local, NaiveDateTime};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use tracing::{error, info};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";

/// Identity of the logged-in user, attached to every gated request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub email: String,
    pub display_name: String,
}

pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            error!(error = %err, "argon2 hash_password error");
            AppError::internal(err)
        })
}

/// A malformed stored hash never authenticates.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            error!(error = %err, "argon2 parse hash error");
            false
        }
    }
}

pub fn sign_token(secret: &str, token: &str) -> String {
    let digest = Sha256::digest(format!("{secret}:{token}").as_bytes());
    format!("{digest:x}")
}

/// Splits `<token>.<signature>` and returns the token when the signature
/// matches.
pub fn verify_cookie_value<'a>(secret: &str, value: &'a str) -> Option<&'a str> {
    let (token, signature) = value.split_once('.')?;
    let expected = sign_token(secret, token);
    let matches = expected.len() == signature.len()
        && expected
            .bytes()
            .zip(signature.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0;
    matches.then_some(token)
}

pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Only local absolute paths are accepted as post-login targets.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

fn normalize_email(email: Option<String>) -> String {
    email.unwrap_or_default().trim().to_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn session_token<'a>(state: &AppState, headers: &'a HeaderMap) -> Option<&'a str> {
    let value = cookie_value(headers, SESSION_COOKIE)?;
    verify_cookie_value(&state.config.secret_key, value)
}

pub async fn current_user(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<CurrentUser>, AppError> {
    let Some(token) = session_token(state, headers).map(str::to_string) else {
        return Ok(None);
    };
    let now = Local::now().naive_local();
    state
        .with_store(move |store| {
            let Some(email) = store.session_email(&token, now)? else {
                return Ok(None);
            };
            let display_name = store
                .find_user_by_email(&email)?
                .map(|user| user.display_name().to_string())
                .unwrap_or_else(|| email.clone());
            Ok(Some(CurrentUser {
                email,
                display_name,
            }))
        })
        .await
}

async fn start_session(state: &AppState, email: &str) -> Result<String, AppError> {
    let token = Uuid::new_v4().to_string();
    let now = Local::now().naive_local();
    let (ttl, expires_at) = session_expiry(now, state.config.session_ttl_hours)?;

    let email = email.to_string();
    let stored = token.clone();
    state
        .with_store(move |store| {
            store.purge_expired_sessions(now)?;
            store.create_session(&stored, &email, expires_at)
        })
        .await?;

    let signature = sign_token(&state.config.secret_key, &token);
    Ok(format!(
        "{SESSION_COOKIE}={token}.{signature}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.num_seconds()
    ))
}

fn session_expiry(now: NaiveDateTime, hours: i64) -> Result<(Duration, NaiveDateTime), AppError> {
    Duration::try_hours(hours)
        .and_then(|ttl| now.checked_add_signed(ttl).map(|expires_at| (ttl, expires_at)))
        .ok_or_else(|| AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("session lifetime of {hours} hours is out of range"),
        })
}

fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn is_public(path: &str) -> bool {
    path == "/login" || path == "/register" || path.starts_with("/static/")
}

/// Login URL carrying `target` (path plus query) as an encoded `next`.
fn login_redirect(target: &str) -> String {
    match serde_urlencoded::to_string(&[("next", target)]) {
        Ok(query) => format!("/login?{query}"),
        Err(err) => {
            error!(error = %err, "failed to encode login next");
            "/login".to_string()
        }
    }
}

/// Redirects anonymous requests to the login page, remembering the path.
pub async fn require_login(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_public(request.uri().path()) {
        return next.run(request).await;
    }

    let headers = request.headers().clone();
    match current_user(&state, &headers).await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => {
            let uri = request.uri();
            let target = uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or_else(|| uri.path());
            Redirect::to(&login_redirect(target)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn login_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    if current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(render_login(None, query.next.as_deref())).into_response())
}

pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let next = non_blank(form.next).or(non_blank(query.next));
    let email = normalize_email(form.email);
    let password = form.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        let page = render_login(Some("E-posta ve şifre gerekli."), next.as_deref());
        return Ok(Html(page).into_response());
    }

    let lookup = email.clone();
    let user = state
        .with_store(move |store| store.find_user_by_email(&lookup))
        .await?;
    let authenticated = user
        .as_ref()
        .is_some_and(|user| verify_password(&password, &user.password_hash));
    if !authenticated {
        info!(%email, "login rejected");
        let page = render_login(Some("E-posta veya şifre hatalı."), next.as_deref());
        return Ok(Html(page).into_response());
    }

    let cookie = start_session(&state, &email).await?;
    info!(%email, "logged in");
    Ok((
        [(SET_COOKIE, cookie)],
        Redirect::to(&safe_next(next.as_deref())),
    )
        .into_response())
}

pub async fn register_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(render_register(None)).into_response())
}

pub async fn register_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let email = normalize_email(form.email);
    let password = form.password.unwrap_or_default();
    let confirm = form.password_confirm.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Ok(Html(render_register(Some("E-posta ve şifre gerekli."))).into_response());
    }
    if password != confirm {
        return Ok(Html(render_register(Some("Şifreler eşleşmiyor."))).into_response());
    }

    let new_user = NewUser {
        email: email.clone(),
        password_hash: hash_password(&password)?,
        first_name: non_blank(form.first_name),
        last_name: non_blank(form.last_name),
    };
    let created = state
        .with_store(move |store| {
            if store.find_user_by_email(&new_user.email)?.is_some() {
                return Ok(None);
            }
            match store.insert_user(&new_user) {
                Ok(user) => Ok(Some(user)),
                Err(StoreError::DuplicateEmail(_)) => Ok(None),
                Err(err) => Err(err),
            }
        })
        .await?;

    let Some(user) = created else {
        info!(%email, "registration for existing account");
        return Ok(Redirect::to("/login").into_response());
    };

    let cookie = start_session(&state, &user.email).await?;
    info!(email = %user.email, "registered");
    Ok(([(SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    if let Some(token) = session_token(&state, &headers).map(str::to_string) {
        state
            .with_store(move |store| store.delete_session(&token))
            .await?;
    }
    Ok(([(SET_COOKIE, clear_cookie())], Redirect::to("/login")).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("gizli-şifre").expect("hashing should succeed");
        assert!(verify_password("gizli-şifre", &hash));
        assert!(!verify_password("yanlış", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
    }

    #[test]
    fn signed_cookie_rejects_tampering() {
        let value = format!("abc.{}", sign_token("secret", "abc"));
        assert_eq!(verify_cookie_value("secret", &value), Some("abc"));
        assert_eq!(verify_cookie_value("other", &value), None);
        let forged = format!("abd.{}", sign_token("secret", "abc"));
        assert_eq!(verify_cookie_value("secret", &forged), None);
        assert_eq!(verify_cookie_value("secret", "no-signature"), None);
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; session=tok.sig"));
        assert_eq!(cookie_value(&headers, "session"), Some("tok.sig"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn safe_next_only_allows_local_paths() {
        assert_eq!(safe_next(Some("/calendar")), "/calendar");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn session_expiry_rejects_out_of_range_lifetimes() {
        let now = chrono::NaiveDate::from_ymd_opt(2025, 12, 3)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let (ttl, expires_at) = session_expiry(now, 24).unwrap();
        assert_eq!(ttl.num_seconds(), 24 * 3600);
        assert_eq!(expires_at, now + Duration::hours(24));

        let err = session_expiry(now, 10_000_000_000).unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(session_expiry(now, i64::MAX).is_err());
    }

    #[test]
    fn login_redirect_keeps_the_query_encoded() {
        assert_eq!(login_redirect("/tasks"), "/login?next=%2Ftasks");
        assert_eq!(
            login_redirect("/calendar?year=2025&month=3"),
            "/login?next=%2Fcalendar%3Fyear%3D2025%26month%3D3"
        );
    }

    #[test]
    fn public_paths_skip_the_gate() {
        assert!(is_public("/login"));
        assert!(is_public("/register"));
        assert!(is_public("/static/app.css"));
        assert!(!is_public("/tasks"));
        assert!(!is_public("/api/upcoming"));
    }
}
