//! REST API, mounted under `/api`.
//!
//! Endpoints:
//!
//! - `POST /users/register`                Create an account, get a session token
//! - `POST /users/login`                   Get a session token
//! - `GET|PUT /users/profile`              Read or update the profile
//! - `POST /users/change-password`         Change the password
//! - `GET|POST /conversations`             List / create conversations
//! - `GET|PUT|DELETE /conversations/{id}`  Read / update / delete one
//! - `POST /conversations/{id}/messages`   Append a single message
//! - `GET|POST /relationships`             List / create relationship profiles
//! - `GET|PUT|DELETE /relationships/{id}`  Read / update / delete one
//! - `POST /responses/generate`            One reply in one tone
//! - `POST /responses/generate-multiple`   One reply per tone
//! - `POST /responses/generate-and-save`   Reply and append to a conversation
//! - `GET|POST /tones`                     List / create tones
//! - `PUT|DELETE /tones/{id}`              Update / delete a custom tone
//! - `GET|PUT /tones/preferred`            The caller's default tones

use axum::{
    Extension, Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use toneshift_core::{Conversation, Error, Message, Relationship, Tone, User};
use toneshift_engine::accounts;
use toneshift_engine::catalog::{self, NewTone, ToneUpdate};
use toneshift_engine::conversations::{self, ConversationUpdate, NewConversation, NewMessage};
use toneshift_engine::relationships::{self, NewRelationship, RelationshipUpdate};
use toneshift_engine::{Exchange, ProfileUpdate, Registration};

use crate::error::{ApiError, ApiJson};
use crate::{CurrentUser, SharedState};

type ApiResult<T> = Result<T, ApiError>;
type Created<T> = (StatusCode, Json<T>);

// ── Routers ───────────────────────────────────────────────────────────────

/// Routes reachable without a session.
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/users/register", post(register_handler))
        .route("/users/login", post(login_handler))
}

/// Routes behind the session middleware.
pub fn protected_router() -> Router<SharedState> {
    Router::new()
        .route("/users/profile", get(profile_handler).put(update_profile_handler))
        .route("/users/change-password", post(change_password_handler))
        .route(
            "/conversations",
            get(list_conversations_handler).post(create_conversation_handler),
        )
        .route(
            "/conversations/{id}",
            get(get_conversation_handler)
                .put(update_conversation_handler)
                .delete(delete_conversation_handler),
        )
        .route("/conversations/{id}/messages", post(add_message_handler))
        .route(
            "/relationships",
            get(list_relationships_handler).post(create_relationship_handler),
        )
        .route(
            "/relationships/{id}",
            get(get_relationship_handler)
                .put(update_relationship_handler)
                .delete(delete_relationship_handler),
        )
        .route("/responses/generate", post(generate_handler))
        .route("/responses/generate-multiple", post(generate_multiple_handler))
        .route("/responses/generate-and-save", post(generate_and_save_handler))
        .route("/tones", get(list_tones_handler).post(create_tone_handler))
        .route(
            "/tones/preferred",
            get(preferred_tones_handler).put(set_preferred_tones_handler),
        )
        .route("/tones/{id}", put(update_tone_handler).delete(delete_tone_handler))
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct AuthResponse {
    message: &'static str,
    token: String,
    user: User,
}

#[derive(Serialize)]
struct UserResponse {
    user: User,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
}

#[derive(Serialize)]
struct ConversationResponse {
    conversation: Conversation,
}

#[derive(Serialize)]
struct ConversationListResponse {
    conversations: Vec<Conversation>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewMessageResponse {
    new_message: Message,
}

#[derive(Serialize)]
struct RelationshipResponse {
    relationship: Relationship,
}

#[derive(Serialize)]
struct RelationshipListResponse {
    relationships: Vec<Relationship>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    tone: String,
    #[serde(default)]
    conversation_id: Option<String>,
}

#[derive(Serialize)]
struct GenerateResponse {
    tone: String,
    response: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateMultipleRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    tones: Option<Vec<String>>,
    #[serde(default)]
    conversation_id: Option<String>,
}

#[derive(Serialize)]
struct GenerateMultipleResponse {
    responses: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAndSaveRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    tone: String,
    #[serde(default)]
    conversation_id: String,
}

#[derive(Serialize)]
struct ExchangeResponse {
    message: &'static str,
    #[serde(flatten)]
    exchange: Exchange,
}

#[derive(Serialize)]
struct ToneResponse {
    tone: Tone,
}

#[derive(Serialize)]
struct ToneListResponse {
    tones: Vec<Tone>,
}

#[derive(Deserialize)]
struct PreferredTonesRequest {
    #[serde(default)]
    tones: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PreferredTonesResponse {
    preferred_tones: Vec<String>,
}

// ── Users ─────────────────────────────────────────────────────────────────

async fn register_handler(
    State(state): State<SharedState>,
    ApiJson(body): ApiJson<Registration>,
) -> ApiResult<Created<AuthResponse>> {
    let user = accounts::register(state.store(), &state.credentials, body).await?;
    let token = state.sessions.issue(&user.id).await;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            token,
            user,
        }),
    ))
}

async fn login_handler(
    State(state): State<SharedState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = accounts::login(state.store(), &state.credentials, &body.email, &body.password).await?;
    let token = state.sessions.issue(&user.id).await;
    info!(user_id = %user.id, "User logged in");
    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user,
    }))
}

async fn profile_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<UserResponse>> {
    let user = accounts::profile(state.store(), &user_id).await?;
    Ok(Json(UserResponse { user }))
}

async fn update_profile_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<UserResponse>> {
    let user = accounts::update_profile(state.store(), &user_id, body).await?;
    Ok(Json(UserResponse { user }))
}

async fn change_password_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    accounts::change_password(
        state.store(),
        &state.credentials,
        &user_id,
        &body.current_password,
        &body.new_password,
    )
    .await?;
    Ok(MessageResponse::new("Password changed successfully"))
}

// ── Conversations ─────────────────────────────────────────────────────────

async fn list_conversations_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<ConversationListResponse>> {
    let conversations = conversations::list_conversations(state.store(), &user_id).await?;
    Ok(Json(ConversationListResponse { conversations }))
}

async fn create_conversation_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<NewConversation>,
) -> ApiResult<Created<ConversationResponse>> {
    let conversation = conversations::create_conversation(state.store(), &user_id, body).await?;
    Ok((StatusCode::CREATED, Json(ConversationResponse { conversation })))
}

async fn get_conversation_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConversationResponse>> {
    let conversation = conversations::get_conversation(state.store(), &user_id, &id).await?;
    Ok(Json(ConversationResponse { conversation }))
}

async fn update_conversation_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ConversationUpdate>,
) -> ApiResult<Json<ConversationResponse>> {
    let conversation = conversations::update_conversation(state.store(), &user_id, &id, body).await?;
    Ok(Json(ConversationResponse { conversation }))
}

async fn delete_conversation_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    conversations::delete_conversation(state.store(), &user_id, &id).await?;
    Ok(MessageResponse::new("Conversation deleted successfully"))
}

async fn add_message_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<NewMessage>,
) -> ApiResult<Json<NewMessageResponse>> {
    let new_message = conversations::add_message(state.store(), &user_id, &id, body).await?;
    Ok(Json(NewMessageResponse { new_message }))
}

// ── Relationships ─────────────────────────────────────────────────────────

async fn list_relationships_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<RelationshipListResponse>> {
    let relationships = relationships::list_relationships(state.store(), &user_id).await?;
    Ok(Json(RelationshipListResponse { relationships }))
}

async fn create_relationship_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<NewRelationship>,
) -> ApiResult<Created<RelationshipResponse>> {
    let relationship = relationships::create_relationship(state.store(), &user_id, body).await?;
    Ok((StatusCode::CREATED, Json(RelationshipResponse { relationship })))
}

async fn get_relationship_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<RelationshipResponse>> {
    let relationship = relationships::get_relationship(state.store(), &user_id, &id).await?;
    Ok(Json(RelationshipResponse { relationship }))
}

async fn update_relationship_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<RelationshipUpdate>,
) -> ApiResult<Json<RelationshipResponse>> {
    let relationship = relationships::update_relationship(state.store(), &user_id, &id, body).await?;
    Ok(Json(RelationshipResponse { relationship }))
}

async fn delete_relationship_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    relationships::delete_relationship(state.store(), &user_id, &id).await?;
    Ok(MessageResponse::new("Relationship profile deleted successfully"))
}

// ── Responses ─────────────────────────────────────────────────────────────

async fn generate_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<GenerateRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    let response = state
        .service
        .generate_tone_response(&user_id, &body.message, &body.tone, body.conversation_id.as_deref())
        .await?;
    Ok(Json(GenerateResponse {
        tone: body.tone.trim().to_string(),
        response,
    }))
}

async fn generate_multiple_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<GenerateMultipleRequest>,
) -> ApiResult<Json<GenerateMultipleResponse>> {
    let responses = state
        .service
        .generate_multiple_tone_responses(
            &user_id,
            &body.message,
            body.tones.as_deref(),
            body.conversation_id.as_deref(),
        )
        .await?;
    Ok(Json(GenerateMultipleResponse { responses }))
}

async fn generate_and_save_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<GenerateAndSaveRequest>,
) -> ApiResult<Json<ExchangeResponse>> {
    let exchange = state
        .service
        .generate_and_append_response(&user_id, &body.message, &body.tone, &body.conversation_id)
        .await?;
    Ok(Json(ExchangeResponse {
        message: "Response generated and saved successfully",
        exchange,
    }))
}

// ── Tones ─────────────────────────────────────────────────────────────────

async fn list_tones_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<ToneListResponse>> {
    let tones = catalog::list_tones(state.store(), &user_id).await?;
    Ok(Json(ToneListResponse { tones }))
}

async fn create_tone_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<NewTone>,
) -> ApiResult<Created<ToneResponse>> {
    let tone = catalog::create_tone(state.store(), &user_id, body).await?;
    Ok((StatusCode::CREATED, Json(ToneResponse { tone })))
}

async fn update_tone_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ToneUpdate>,
) -> ApiResult<Json<ToneResponse>> {
    let tone = catalog::update_tone(state.store(), &user_id, &id, body).await?;
    Ok(Json(ToneResponse { tone }))
}

async fn delete_tone_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    catalog::delete_tone(state.store(), &user_id, &id).await?;
    Ok(MessageResponse::new("Custom tone deleted successfully"))
}

async fn preferred_tones_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
) -> ApiResult<Json<PreferredTonesResponse>> {
    let preferred_tones = accounts::preferred_tones(state.store(), &user_id).await?;
    Ok(Json(PreferredTonesResponse { preferred_tones }))
}

async fn set_preferred_tones_handler(
    State(state): State<SharedState>,
    Extension(CurrentUser(user_id)): Extension<CurrentUser>,
    ApiJson(body): ApiJson<PreferredTonesRequest>,
) -> ApiResult<Json<PreferredTonesResponse>> {
    let tones = body
        .tones
        .ok_or_else(|| Error::InvalidInput("Tones must be an array".into()))?;
    let preferred_tones = accounts::set_preferred_tones(state.store(), &user_id, tones).await?;
    Ok(Json(PreferredTonesResponse { preferred_tones }))
}
