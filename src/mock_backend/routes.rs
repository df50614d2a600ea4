//! HTTP route handlers of the development backend.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::api::models::{ChatReply, Citation, PdfType, RobotMessages, RobotPdf, User};

use super::state::MockState;

const CSRF_COOKIE: &str = "csrftoken";
const CSRF_HEADER: &str = "x-csrftoken";
const SESSION_COOKIE: &str = "sessionid";

/// Create the router with every mock endpoint.
pub fn create_router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/csrf/", get(csrf))
        .route("/api/rest-auth/login/", post(login))
        .route("/api/rest-auth/logout/", post(logout))
        .route("/api/rest-auth/user/", get(current_user))
        .route("/api/rest-auth/registration/", post(register))
        .route("/api/robots/", get(list_robots))
        .route("/api/robots/{key}/", get(robot))
        .route(
            "/api/robots/{key}/messages/",
            get(robot_messages).put(update_robot_messages),
        )
        .route("/api/robots/{key}/pdf_dosyalari/", get(robot_pdfs))
        .route("/api/robots/{key}/aktif_pdf_dosyalari/", get(robot_active_pdfs))
        .route("/api/robots/{key}/chat/", get(robot).post(chat))
        .route("/api/robot-pdfs/", get(list_pdfs))
        .route("/api/robot-pdfs/{id}/toggle_active/", post(toggle_pdf))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "sidrex-mock-backend",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn body(key: &str, value: Value) -> Json<Value> {
    let mut map = Map::new();
    let _ = map.insert(key.to_string(), value);
    Json(Value::Object(map))
}

fn error(status: StatusCode, key: &str, message: &str) -> Response {
    (status, body(key, json!(message))).into_response()
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(str::trim)
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}

/// Double-submit check: the header must echo the cookie.
fn check_csrf(headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = cookie(headers, CSRF_COOKIE) else {
        return Err(error(
            StatusCode::FORBIDDEN,
            "detail",
            "CSRF Failed: CSRF cookie not set.",
        ));
    };
    let sent = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    if sent != Some(expected.as_str()) {
        tracing::warn!("rejected request with bad CSRF token");
        return Err(error(
            StatusCode::FORBIDDEN,
            "detail",
            "CSRF Failed: CSRF token missing or incorrect.",
        ));
    }
    Ok(())
}

fn session_user(state: &MockState, headers: &HeaderMap) -> Result<User, Response> {
    cookie(headers, SESSION_COOKIE)
        .and_then(|session| state.session_user(&session))
        .ok_or_else(|| {
            error(
                StatusCode::FORBIDDEN,
                "detail",
                "Authentication credentials were not provided.",
            )
        })
}

/// Issue a fresh CSRF cookie.
async fn csrf() -> Response {
    let token = uuid::Uuid::new_v4().simple().to_string();
    (
        [(SET_COOKIE, format!("{CSRF_COOKIE}={token}; Path=/"))],
        Json(json!({ "detail": "CSRF cookie set" })),
    )
        .into_response()
}

async fn login(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if let Err(response) = check_csrf(&headers) {
        return response;
    }

    let mut username = String::new();
    let mut password = String::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let name = field.name().unwrap_or_default().to_string();
                let Ok(value) = field.text().await else {
                    return error(StatusCode::BAD_REQUEST, "detail", "Malformed form.");
                };
                match name.as_str() {
                    "username" => username = value,
                    "password" => password = value,
                    _ => {}
                }
            }
            Ok(None) => break,
            Err(_) => return error(StatusCode::BAD_REQUEST, "detail", "Malformed form."),
        }
    }

    let valid = state
        .accounts
        .get(&username)
        .is_some_and(|account| account.password == password && account.user.is_active);
    if !valid {
        tracing::info!(%username, "login rejected");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "non_field_errors": ["Unable to log in with provided credentials."]
            })),
        )
            .into_response();
    }

    let session = state.open_session(&username);
    tracing::info!(%username, "logged in");
    (
        [(
            SET_COOKIE,
            format!("{SESSION_COOKIE}={session}; HttpOnly; Path=/"),
        )],
        Json(json!({ "key": session })),
    )
        .into_response()
}

async fn logout(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Err(response) = check_csrf(&headers) {
        return response;
    }
    if let Some(session) = cookie(&headers, SESSION_COOKIE) {
        let _ = state.sessions.remove(&session);
    }
    (
        [(
            SET_COOKIE,
            format!("{SESSION_COOKIE}=; Max-Age=0; Path=/"),
        )],
        Json(json!({ "detail": "Successfully logged out." })),
    )
        .into_response()
}

async fn current_user(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    match session_user(&state, &headers) {
        Ok(user) => Json(user).into_response(),
        Err(response) => response,
    }
}

#[derive(Debug, Deserialize)]
struct RegistrationForm {
    username: String,
    #[serde(default)]
    email: String,
    password1: String,
    password2: String,
}

async fn register(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Form(form): Form<RegistrationForm>,
) -> Response {
    if let Err(response) = check_csrf(&headers) {
        return response;
    }
    if state.accounts.contains_key(&form.username) {
        return field_error("username", "A user with that username already exists.");
    }
    if form.password1 != form.password2 {
        return field_error("non_field_errors", "The two password fields didn't match.");
    }
    if form.password1.chars().count() < 8 {
        return field_error(
            "password1",
            "This password is too short. It must contain at least 8 characters.",
        );
    }
    if form.password1.chars().all(|c| c.is_ascii_digit()) {
        return field_error("password1", "This password is entirely numeric.");
    }

    let email = form.email;
    let user = state.add_account(&form.username, &form.password1, |user| {
        if !email.is_empty() {
            user.email = email;
        }
    });
    let session = state.open_session(&user.username);
    tracing::info!(username = %user.username, "registered");
    (
        StatusCode::CREATED,
        [(
            SET_COOKIE,
            format!("{SESSION_COOKIE}={session}; HttpOnly; Path=/"),
        )],
        Json(json!({ "key": session })),
    )
        .into_response()
}

fn field_error(field: &str, message: &str) -> Response {
    (StatusCode::BAD_REQUEST, body(field, json!([message]))).into_response()
}

async fn list_robots(State(state): State<Arc<MockState>>) -> Response {
    Json(state.list_robots()).into_response()
}

async fn robot(State(state): State<Arc<MockState>>, Path(key): Path<String>) -> Response {
    match state.robot(&key) {
        Some(robot) => Json(robot).into_response(),
        None => error(StatusCode::NOT_FOUND, "error", "Robot bulunamadı!"),
    }
}

async fn robot_messages(State(state): State<Arc<MockState>>, Path(key): Path<String>) -> Response {
    let Some(robot) = state.robot(&key) else {
        return error(StatusCode::NOT_FOUND, "error", "Robot bulunamadı!");
    };
    let messages = state
        .robot_messages
        .get(&robot.id)
        .map(|entry| entry.value().clone())
        .unwrap_or_default();
    Json(RobotMessages { messages }).into_response()
}

async fn update_robot_messages(
    State(state): State<Arc<MockState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    Json(body): Json<RobotMessages>,
) -> Response {
    if let Err(response) = check_csrf(&headers) {
        return response;
    }
    if let Err(response) = session_user(&state, &headers) {
        return response;
    }
    let Some(robot) = state.robot(&key) else {
        return error(StatusCode::NOT_FOUND, "error", "Robot bulunamadı!");
    };
    let _ = state.robot_messages.insert(robot.id, body.messages.clone());
    Json(body).into_response()
}

fn pdfs_matching(state: &MockState, keep: impl Fn(&RobotPdf) -> bool) -> Vec<RobotPdf> {
    let mut pdfs: Vec<RobotPdf> = state
        .pdfs
        .iter()
        .filter(|entry| keep(entry.value()))
        .map(|entry| entry.value().clone())
        .collect();
    pdfs.sort_by_key(|pdf| pdf.id);
    pdfs
}

async fn robot_pdfs(State(state): State<Arc<MockState>>, Path(key): Path<String>) -> Response {
    let Some(robot) = state.robot(&key) else {
        return error(StatusCode::NOT_FOUND, "error", "Robot bulunamadı!");
    };
    Json(pdfs_matching(&state, |pdf| pdf.robot == Some(robot.id))).into_response()
}

async fn robot_active_pdfs(
    State(state): State<Arc<MockState>>,
    Path(key): Path<String>,
) -> Response {
    let Some(robot) = state.robot(&key) else {
        return error(StatusCode::NOT_FOUND, "error", "Robot bulunamadı!");
    };
    Json(pdfs_matching(&state, |pdf| {
        pdf.robot == Some(robot.id) && pdf.is_active
    }))
    .into_response()
}

#[derive(Debug, Default, Deserialize)]
struct PdfQuery {
    robot_id: Option<u64>,
    is_active: Option<bool>,
    pdf_type: Option<PdfType>,
}

async fn list_pdfs(
    State(state): State<Arc<MockState>>,
    Query(query): Query<PdfQuery>,
) -> Response {
    Json(pdfs_matching(&state, |pdf| {
        query.robot_id.is_none_or(|id| pdf.robot == Some(id))
            && query.is_active.is_none_or(|active| pdf.is_active == active)
            && query.pdf_type.is_none_or(|kind| pdf.pdf_type == kind)
    }))
    .into_response()
}

async fn toggle_pdf(
    State(state): State<Arc<MockState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = check_csrf(&headers) {
        return response;
    }
    if let Err(response) = session_user(&state, &headers) {
        return response;
    }
    let Some(mut pdf) = state.pdfs.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, "detail", "Not found.");
    };
    pdf.is_active = !pdf.is_active;
    Json(pdf.clone()).into_response()
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    conversation_id: Option<String>,
}

/// Canned robot reply after the configured delay.
async fn chat(
    State(state): State<Arc<MockState>>,
    Path(key): Path<String>,
    Json(body): Json<ChatBody>,
) -> Response {
    let calls = state.count_chat_call();
    let Some(robot) = state.robot(&key) else {
        return error(StatusCode::NOT_FOUND, "error", "Robot bulunamadı!");
    };
    let message = body.message.trim();
    if message.is_empty() {
        return error(StatusCode::BAD_REQUEST, "error", "Mesaj boş olamaz!");
    }
    tracing::debug!(
        robot = %key,
        conversation = body.conversation_id.as_deref().unwrap_or_default(),
        calls,
        "chat message received"
    );

    let delay = tokio::time::sleep(state.config.chat_delay);
    if tokio::time::timeout(state.config.gateway_timeout, delay)
        .await
        .is_err()
    {
        tracing::warn!(robot = %key, "chat reply timed out");
        return StatusCode::GATEWAY_TIMEOUT.into_response();
    }

    let citations: Vec<Citation> = pdfs_matching(&state, |pdf| {
        pdf.robot == Some(robot.id) && pdf.is_active
    })
    .into_iter()
    .take(1)
    .map(|pdf| Citation {
        source: pdf.file_name,
        content: format!("{} hakkında bilgi.", robot.name),
        similarity: 0.87,
        chunk_index: 0,
        pdf_type: Some(pdf.pdf_type),
    })
    .collect();
    let reply = ChatReply {
        robot_response: Some(format!("{}: {message}", robot.name)),
        context_used: !citations.is_empty(),
        citations,
        error: None,
    };
    Json(reply).into_response()
}
