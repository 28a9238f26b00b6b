//! # Handlers
//!
//! Thin translation between HTTP and the services: deserialize input,
//! resolve the caller, call one service method, wrap the result in the
//! envelope. No business rules live here.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::Json;
use domains::{
    AppError, CommunityAppearance, CommunityDetail, ContentDetail, ContentItem, ContentStatus,
    FeedPage, FeedSort, NewImage, Topic, TopWindow, UserProfile, VoteRecord,
};
use serde::Deserialize;
use serde_json::{json, Value};
use services::content::{CreateCommentInput, CreateImagePostInput, CreateTextPostInput};
use services::communities::CreateCommunityInput;
use services::users::{LoginInput, RegisterInput};
use uuid::Uuid;

use crate::envelope::{ApiError, ApiResult, Data};
use crate::extract::{CurrentUser, MaybeUser, SESSION_COOKIE};
use crate::AppState;

// ── Auth ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username_or_email: String,
    pub password: String,
}

fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax")
}

fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0")
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .users
        .register(RegisterInput {
            username: input.username,
            email: input.email,
            password: input.password,
        })
        .await?;
    let token = state.sessions.issue(user.id).await?;
    Ok((
        [(SET_COOKIE, session_cookie(&token))],
        Data(UserProfile::from(&user)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .users
        .login(LoginInput {
            username_or_email: input.username_or_email,
            password: input.password,
        })
        .await?;
    let token = state.sessions.issue(user.id).await?;
    Ok((
        [(SET_COOKIE, session_cookie(&token))],
        Data(UserProfile::from(&user)),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    parts: axum::http::request::Parts,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = crate::extract::session_token(&parts) {
        state.sessions.revoke(&token).await?;
    }
    Ok(([(SET_COOKIE, clear_session_cookie())], Data(true)))
}

pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<UserProfile> {
    let profile = state
        .users
        .find_by_id(user.user_id)
        .await?
        .map(|u| UserProfile::from(&u))
        .ok_or_else(|| AppError::not_found("user", user.user_id))?;
    Ok(Data(profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvatarRequest {
    pub avatar: String,
}

pub async fn update_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<UpdateAvatarRequest>,
) -> ApiResult<bool> {
    state.users.update_avatar(user.user_id, &input.avatar).await?;
    Ok(Data(true))
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(input): Json<ForgotPasswordRequest>,
) -> ApiResult<bool> {
    state.users.forgot_password(&input.email).await?;
    Ok(Data(true))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordRequest>,
) -> ApiResult<bool> {
    state.users.reset_password(&input.token, &input.password).await?;
    Ok(Data(true))
}

// ── Topics ──────────────────────────────────────────────────────────────────

pub async fn list_topics(State(state): State<AppState>) -> ApiResult<Vec<Topic>> {
    Ok(Data(state.topics.list().await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateTopicRequest {
    pub title: String,
}

pub async fn create_topic(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<CreateTopicRequest>,
) -> ApiResult<Topic> {
    Ok(Data(state.topics.create(&user.ctx, input.title).await?))
}

// ── Communities ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommunityRequest {
    pub name: String,
    pub description: String,
    pub topic_ids: Vec<Uuid>,
}

pub async fn create_community(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<CreateCommunityRequest>,
) -> ApiResult<CommunityDetail> {
    let detail = state
        .communities
        .create(
            &user.ctx,
            CreateCommunityInput {
                name: input.name,
                description: input.description,
                topic_ids: input.topic_ids,
            },
        )
        .await?;
    Ok(Data(detail))
}

pub async fn get_community(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Option<CommunityDetail>> {
    Ok(Data(state.communities.find_by_name(&name).await?))
}

pub async fn my_communities(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<domains::Community>> {
    Ok(Data(state.communities.joined(&user.ctx).await?))
}

pub async fn join_community(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<domains::Membership> {
    Ok(Data(state.roles.join(&user.ctx, id).await?))
}

pub async fn leave_community(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<bool> {
    state.roles.leave(&user.ctx, id).await?;
    Ok(Data(true))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDescriptionRequest {
    pub description: String,
}

pub async fn update_description(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateDescriptionRequest>,
) -> ApiResult<bool> {
    state
        .communities
        .edit_description(&user.ctx, id, input.description)
        .await?;
    Ok(Data(true))
}

pub async fn update_appearance(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CommunityAppearance>,
) -> ApiResult<bool> {
    state.communities.set_appearance(&user.ctx, id, input).await?;
    Ok(Data(true))
}

// ── Posts & comments ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTextPostRequest {
    pub title: String,
    pub text: String,
    pub community_id: Uuid,
    pub parent_id: Option<Uuid>,
}

pub async fn create_text_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<CreateTextPostRequest>,
) -> ApiResult<ContentDetail> {
    let detail = state
        .content
        .create_text_post(
            &user.ctx,
            CreateTextPostInput {
                title: input.title,
                body: input.text,
                community_id: input.community_id,
                parent_id: input.parent_id,
            },
        )
        .await?;
    Ok(Data(detail))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    pub path: String,
    pub caption: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateImagePostRequest {
    pub title: String,
    pub images: Vec<ImageInput>,
    pub community_id: Uuid,
    pub parent_id: Option<Uuid>,
}

pub async fn create_image_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<CreateImagePostRequest>,
) -> ApiResult<ContentDetail> {
    let detail = state
        .content
        .create_image_post(
            &user.ctx,
            CreateImagePostInput {
                title: input.title,
                images: input
                    .images
                    .into_iter()
                    .map(|img| NewImage {
                        path: img.path,
                        caption: img.caption,
                        link: img.link,
                    })
                    .collect(),
                community_id: input.community_id,
                parent_id: input.parent_id,
            },
        )
        .await?;
    Ok(Data(detail))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub text: String,
    pub community_id: Uuid,
    pub parent_id: Uuid,
    pub ancestor_id: Uuid,
}

pub async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<CreateCommentRequest>,
) -> ApiResult<ContentDetail> {
    let detail = state
        .content
        .create_comment(
            &user.ctx,
            CreateCommentInput {
                body: input.text,
                community_id: input.community_id,
                parent_id: input.parent_id,
                ancestor_id: input.ancestor_id,
            },
        )
        .await?;
    Ok(Data(detail))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Option<ContentDetail>> {
    Ok(Data(state.content.find_by_id(id).await?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<u64> {
    Ok(Data(state.content.remove(&user.ctx, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ContentStatus,
}

pub async fn update_post_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateStatusRequest>,
) -> ApiResult<u64> {
    Ok(Data(
        state.content.update_status(&user.ctx, id, input.status).await?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadCommentsParams {
    pub creator: Option<Uuid>,
}

pub async fn post_comments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ThreadCommentsParams>,
) -> ApiResult<Vec<ContentItem>> {
    Ok(Data(
        state.content.thread_comments(id, params.creator).await?,
    ))
}

// ── Feeds ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedParams {
    pub sort: Option<String>,
    pub window: Option<String>,
    pub community: Option<Uuid>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

fn parse_sort(params: &FeedParams) -> Result<FeedSort, ApiError> {
    match params.sort.as_deref().unwrap_or("new") {
        "new" => Ok(FeedSort::New),
        "top" => {
            let window = match params.window.as_deref().unwrap_or("all") {
                "day" => TopWindow::Day,
                "week" => TopWindow::Week,
                "month" => TopWindow::Month,
                "year" => TopWindow::Year,
                "all" => TopWindow::AllTime,
                _ => {
                    return Err(ApiError(AppError::validation(
                        "window",
                        "Expected day, week, month, year or all.",
                    )))
                }
            };
            Ok(FeedSort::Top(window))
        }
        _ => Err(ApiError(AppError::validation(
            "sort",
            "Expected new or top.",
        ))),
    }
}

pub async fn home_feed(
    State(state): State<AppState>,
    MaybeUser(ctx): MaybeUser,
    Query(params): Query<FeedParams>,
) -> ApiResult<FeedPage> {
    let sort = parse_sort(&params)?;
    let page = state
        .feed
        .home_feed(&ctx, sort, params.community, params.limit, params.cursor)
        .await?;
    Ok(Data(page))
}

pub async fn user_feed(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<FeedParams>,
) -> ApiResult<FeedPage> {
    let sort = parse_sort(&params)?;
    let page = state
        .feed
        .user_feed(user_id, sort, params.limit, params.cursor)
        .await?;
    Ok(Data(page))
}

pub async fn moderation_feed(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(community_id): Path<Uuid>,
    Query(params): Query<FeedParams>,
) -> ApiResult<FeedPage> {
    let sort = parse_sort(&params)?;
    let page = state
        .feed
        .moderation_feed(&user.ctx, community_id, sort, params.limit, params.cursor)
        .await?;
    Ok(Data(page))
}

/// Thread roots the caller has commented under, for the profile page.
pub async fn my_commented_posts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<Uuid>> {
    Ok(Data(state.content.commented_ancestors(&user.ctx).await?))
}

// ── Votes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub post_id: Uuid,
    pub value: i32,
}

pub async fn vote(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<VoteRequest>,
) -> ApiResult<i32> {
    Ok(Data(
        state.votes.vote(&user.ctx, input.post_id, input.value).await?,
    ))
}

pub async fn get_vote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Option<VoteRecord>> {
    Ok(Data(state.votes.find_vote(&user.ctx, post_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct VotedPostsParams {
    pub value: i16,
}

/// Posts the caller currently up- or downvotes (`?value=1` or `?value=-1`).
pub async fn my_voted_posts(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<VotedPostsParams>,
) -> ApiResult<Vec<Uuid>> {
    Ok(Data(
        state.votes.voted_post_ids(&user.ctx, params.value).await?,
    ))
}

// ── Media ───────────────────────────────────────────────────────────────────

/// Accepts a multipart `file` field, stores it through the media port and
/// returns the stored path plus its public URL.
pub async fn upload_media(
    State(state): State<AppState>,
    _user: CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Value> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::validation("file", "Malformed multipart payload."))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = match field.content_type() {
            Some(ct) => ct.to_string(),
            None => mime_guess::from_path(field.file_name().unwrap_or_default())
                .first_or_octet_stream()
                .to_string(),
        };
        let data = field
            .bytes()
            .await
            .map_err(|_| AppError::validation("file", "Upload was interrupted."))?;

        let path = state.media.save_upload(data.to_vec(), &content_type).await?;
        let url = state.media.public_url(&path);
        return Ok(Data(json!({ "path": path, "url": url })));
    }
    Err(ApiError(AppError::validation(
        "file",
        "A multipart field named 'file' is required.",
    )))
}
