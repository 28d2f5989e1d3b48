use std::collections::HashSet;

use axum::extract::{Extension, Path, Query, State};
use axum::{
    Json, Router, middleware,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use memoir_domain::identity::ActorIdentity;
use memoir_domain::notifications::{
    NotificationService, NotificationSettings, NotificationSettingsInput,
};
use memoir_domain::questions::{
    AnswerInput, GlobalQuestion, GlobalQuestionCreate, Question, QuestionService, QuestionStatus,
};

use crate::{
    error::ApiError, middleware as app_middleware, observability, state::AppState, validation,
};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/questions/global", get(list_global_questions))
        .route(
            "/questions/new",
            get(get_new_question).post(create_custom_question),
        )
        .route("/questions", get(list_questions_for_user))
        .route("/questions/:question_id", patch(patch_answer))
        .route("/questions/newGlobalQuestion", post(create_global_question))
        .route(
            "/notifications/settings/:user_id",
            post(save_notification_settings).get(get_notification_settings),
        )
        .route_layer(middleware::from_fn(app_middleware::require_auth_middleware));

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .merge(protected)
        .layer(app_middleware::timeout_layer())
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::set_request_id_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(app_middleware::metrics_layer))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::auth_middleware,
        ))
        .layer(middleware::from_fn(
            app_middleware::correlation_id_middleware,
        ));

    if !state.config.app_env.eq_ignore_ascii_case("test") {
        app = app.layer(app_middleware::rate_limit_layer());
    }

    app.with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app_env.clone(),
    })
}

async fn render_metrics() -> String {
    observability::render_metrics().unwrap_or_default()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GlobalQuestionDto {
    id: String,
    title: String,
    category_id: String,
}

impl From<GlobalQuestion> for GlobalQuestionDto {
    fn from(global: GlobalQuestion) -> Self {
        Self {
            id: global.global_question_id,
            title: global.title,
            category_id: global.category_id,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GlobalQuestionsDto {
    global_questions: Vec<GlobalQuestionDto>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionDto {
    id: String,
    global_question_id: Option<String>,
    title: String,
    category_id: String,
    user_id: String,
    status: QuestionStatus,
    answer: Option<String>,
}

impl From<Question> for QuestionDto {
    fn from(question: Question) -> Self {
        Self {
            id: question.question_id,
            global_question_id: question.global_question_id,
            title: question.title,
            category_id: question.category_id,
            user_id: question.user_id,
            status: question.status,
            answer: question.answer,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionsDto {
    questions: Vec<QuestionDto>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationSettingsDto {
    email: String,
    telegram_name: String,
    period_in_days: i64,
}

impl From<NotificationSettings> for NotificationSettingsDto {
    fn from(settings: NotificationSettings) -> Self {
        Self {
            email: settings.email,
            telegram_name: settings.telegram_name,
            period_in_days: settings.period_in_days,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlobalQuestionsQuery {
    user_id: Option<String>,
    /// Comma-separated category ids; absent or empty means no filter.
    categories: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserQuery {
    user_id: String,
}

async fn list_global_questions(
    State(state): State<AppState>,
    Query(query): Query<GlobalQuestionsQuery>,
) -> Result<Json<GlobalQuestionsDto>, ApiError> {
    let categories: HashSet<String> = query
        .categories
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|category| !category.is_empty())
        .map(str::to_string)
        .collect();

    let service = question_service(&state);
    let globals = service
        .list_global(query.user_id.as_deref(), &categories)
        .await?;

    Ok(Json(GlobalQuestionsDto {
        global_questions: globals.into_iter().map(GlobalQuestionDto::from).collect(),
    }))
}

async fn get_new_question(
    State(state): State<AppState>,
    Extension(auth): Extension<app_middleware::AuthContext>,
    Query(query): Query<UserQuery>,
) -> Result<Json<QuestionDto>, ApiError> {
    let actor = ensure_owner(&auth, &query.user_id)?;
    let service = question_service(&state);
    let question = service.assign_next(&actor).await?;
    Ok(Json(QuestionDto::from(question)))
}

async fn list_questions_for_user(
    State(state): State<AppState>,
    Extension(auth): Extension<app_middleware::AuthContext>,
    Query(query): Query<UserQuery>,
) -> Result<Json<QuestionsDto>, ApiError> {
    let actor = ensure_owner(&auth, &query.user_id)?;
    let service = question_service(&state);
    let questions = service.list_for_user(&actor.user_id).await?;
    Ok(Json(QuestionsDto {
        questions: questions.into_iter().map(QuestionDto::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerRequestDto {
    answer: String,
    new_status: Option<QuestionStatus>,
}

async fn patch_answer(
    State(state): State<AppState>,
    Extension(auth): Extension<app_middleware::AuthContext>,
    Path(question_id): Path<String>,
    Json(payload): Json<AnswerRequestDto>,
) -> Result<Json<QuestionDto>, ApiError> {
    let actor = actor_identity(&auth)?;
    let service = question_service(&state);
    let question = service
        .answer(
            &actor,
            &question_id,
            AnswerInput {
                answer: payload.answer,
                new_status: payload.new_status,
            },
        )
        .await?;
    Ok(Json(QuestionDto::from(question)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateGlobalQuestionRequestDto {
    #[validate(length(min = 1, max = 500))]
    title: String,
    category_id: Option<String>,
}

async fn create_global_question(
    State(state): State<AppState>,
    Extension(auth): Extension<app_middleware::AuthContext>,
    Json(payload): Json<CreateGlobalQuestionRequestDto>,
) -> Result<Json<GlobalQuestionDto>, ApiError> {
    validation::validate(&payload)?;
    require_admin(&auth)?;
    let service = question_service(&state);
    let global = service
        .create_global(GlobalQuestionCreate {
            title: payload.title,
            category_id: payload.category_id,
        })
        .await?;
    Ok(Json(GlobalQuestionDto::from(global)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct AddQuestionRequestDto {
    #[validate(length(min = 1))]
    user_id: String,
    #[validate(length(min = 1, max = 500))]
    title: String,
}

async fn create_custom_question(
    State(state): State<AppState>,
    Extension(auth): Extension<app_middleware::AuthContext>,
    Json(payload): Json<AddQuestionRequestDto>,
) -> Result<Json<QuestionDto>, ApiError> {
    validation::validate(&payload)?;
    let actor = ensure_owner(&auth, &payload.user_id)?;
    let service = question_service(&state);
    let question = service.create_custom(&actor, &payload.title).await?;
    Ok(Json(QuestionDto::from(question)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct NotificationSettingsRequestDto {
    #[validate(email)]
    email: String,
    #[validate(length(max = 64))]
    telegram_name: String,
    period_in_days: i64,
}

async fn save_notification_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<app_middleware::AuthContext>,
    Path(user_id): Path<String>,
    Json(payload): Json<NotificationSettingsRequestDto>,
) -> Result<Json<NotificationSettingsDto>, ApiError> {
    validation::validate(&payload)?;
    ensure_owner(&auth, &user_id)?;
    let service = notification_service(&state);
    let saved = service
        .save(
            &user_id,
            NotificationSettingsInput {
                email: payload.email,
                telegram_name: payload.telegram_name,
                period_in_days: payload.period_in_days,
            },
        )
        .await?;

    observability::register_confirmation_email(saved.email_sent);
    if !saved.email_sent {
        tracing::warn!(user_id = %user_id, "confirmation email was not delivered");
    }

    Ok(Json(NotificationSettingsDto::from(saved.settings)))
}

async fn get_notification_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<app_middleware::AuthContext>,
    Path(user_id): Path<String>,
) -> Result<Json<Option<NotificationSettingsDto>>, ApiError> {
    ensure_owner(&auth, &user_id)?;
    let service = notification_service(&state);
    let settings = service.get(&user_id).await?;
    Ok(Json(settings.map(NotificationSettingsDto::from)))
}

fn question_service(state: &AppState) -> QuestionService {
    QuestionService::new(
        state.global_question_repo.clone(),
        state.question_repo.clone(),
    )
}

fn notification_service(state: &AppState) -> NotificationService {
    NotificationService::new(
        state.notification_settings_repo.clone(),
        state.email_sender.clone(),
        state.config.public_app_url.clone(),
    )
}

fn actor_identity(auth: &app_middleware::AuthContext) -> Result<ActorIdentity, ApiError> {
    if !auth.is_authenticated {
        return Err(ApiError::Unauthorized);
    }
    let user_id = auth.user_id.clone().ok_or(ApiError::Unauthorized)?;
    let username = auth.username.clone().unwrap_or_else(|| user_id.clone());
    Ok(ActorIdentity { user_id, username })
}

/// Single ownership gate for user-scoped routes: the authenticated caller must
/// be the user named by the request.
fn ensure_owner(
    auth: &app_middleware::AuthContext,
    user_id: &str,
) -> Result<ActorIdentity, ApiError> {
    let actor = actor_identity(auth)?;
    if actor.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(actor)
}

fn require_admin(auth: &app_middleware::AuthContext) -> Result<ActorIdentity, ApiError> {
    let actor = actor_identity(auth)?;
    if !auth.role.is_admin() {
        return Err(ApiError::Forbidden);
    }
    Ok(actor)
}
