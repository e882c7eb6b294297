use std::sync::Arc;

use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::domain::{CollegeChanges, CollegeDraft, CollegeId};
use super::repository::ListingStore;
use super::service::{ListingError, ListingService, ModerationInput};
use super::validate::invalid;
use crate::workflows::identity::{PrincipalDirectory, TokenKeys};
use crate::workflows::media::{ImageStore, ImageUpload};

/// Body cap for the multipart endpoints: two full image groups plus the
/// JSON payload part.
const UPLOAD_BODY_LIMIT: usize = 220 * 1024 * 1024;

impl IntoResponse for ListingError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": self.to_string(),
        });
        (self.fault().status(), axum::Json(payload)).into_response()
    }
}

/// Shared state of the listings router: the workflow service plus the
/// token material used to authenticate bearer requests at the boundary.
pub struct ListingState<S, D, I> {
    service: Arc<ListingService<S, D, I>>,
    keys: TokenKeys,
}

impl<S, D, I> Clone for ListingState<S, D, I> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            keys: self.keys.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<usize>,
}

/// Router builder exposing the catalogue, submission, and moderation
/// endpoints.
pub fn listing_router<S, D, I>(
    service: Arc<ListingService<S, D, I>>,
    keys: TokenKeys,
) -> Router
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    let state = ListingState { service, keys };
    Router::new()
        .route(
            "/api/v1/colleges",
            get(list_handler::<S, D, I>).post(submit_handler::<S, D, I>),
        )
        .route(
            "/api/v1/colleges/:id",
            get(detail_handler::<S, D, I>)
                .put(edit_handler::<S, D, I>)
                .delete(delete_handler::<S, D, I>),
        )
        .route(
            "/api/v1/colleges/:id/review",
            post(moderate_handler::<S, D, I>),
        )
        .route("/api/v1/search", get(search_handler::<S, D, I>))
        .route("/api/v1/review/queue", get(queue_handler::<S, D, I>))
        .route(
            "/api/v1/submissions/mine",
            get(my_submissions_handler::<S, D, I>),
        )
        .route(
            "/api/v1/dashboard/report",
            get(report_handler::<S, D, I>),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .with_state(state)
}

pub(crate) async fn submit_handler<S, D, I>(
    State(state): State<ListingState<S, D, I>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    let actor = match state.keys.authenticate(&headers) {
        Ok(actor) => actor,
        Err(error) => return ListingError::from(error).into_response(),
    };
    let parts = match read_upload_parts(&mut multipart).await {
        Ok(parts) => parts,
        Err(error) => return error.into_response(),
    };
    let draft: CollegeDraft = match required_payload(parts.payload) {
        Ok(draft) => draft,
        Err(error) => return error.into_response(),
    };
    match state
        .service
        .submit(&actor, draft, parts.campus, parts.accommodation)
    {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn edit_handler<S, D, I>(
    State(state): State<ListingState<S, D, I>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    let actor = match state.keys.authenticate(&headers) {
        Ok(actor) => actor,
        Err(error) => return ListingError::from(error).into_response(),
    };
    let parts = match read_upload_parts(&mut multipart).await {
        Ok(parts) => parts,
        Err(error) => return error.into_response(),
    };
    // A bare image upload is a valid edit, so the payload part is optional
    // here.
    let changes: CollegeChanges = match parts.payload {
        Some(bytes) => match parse_payload(&bytes) {
            Ok(changes) => changes,
            Err(error) => return error.into_response(),
        },
        None => CollegeChanges::default(),
    };
    match state.service.edit(
        &actor,
        &CollegeId(id),
        changes,
        parts.campus,
        parts.accommodation,
    ) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn moderate_handler<S, D, I>(
    State(state): State<ListingState<S, D, I>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    axum::Json(input): axum::Json<ModerationInput>,
) -> Response
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    let result = state
        .keys
        .authenticate(&headers)
        .map_err(ListingError::from)
        .and_then(|actor| state.service.moderate(&actor, &CollegeId(id), input));
    match result {
        Ok(ticket) => (StatusCode::OK, axum::Json(ticket)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn delete_handler<S, D, I>(
    State(state): State<ListingState<S, D, I>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    let result = state
        .keys
        .authenticate(&headers)
        .map_err(ListingError::from)
        .and_then(|actor| state.service.delete(&actor, &CollegeId(id)));
    match result {
        Ok(()) => {
            let payload = json!({
                "status": "deleted",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn list_handler<S, D, I>(
    State(state): State<ListingState<S, D, I>>,
) -> Response
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    match state.service.public_list() {
        Ok(cards) => (StatusCode::OK, axum::Json(cards)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn detail_handler<S, D, I>(
    State(state): State<ListingState<S, D, I>>,
    Path(id): Path<String>,
) -> Response
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    match state.service.public_detail(&CollegeId(id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn search_handler<S, D, I>(
    State(state): State<ListingState<S, D, I>>,
    Query(query): Query<SearchQuery>,
) -> Response
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    match state.service.search(query.q.as_deref().unwrap_or_default()) {
        Ok(hits) => (StatusCode::OK, axum::Json(hits)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn queue_handler<S, D, I>(
    State(state): State<ListingState<S, D, I>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    let result = state
        .keys
        .authenticate(&headers)
        .map_err(ListingError::from)
        .and_then(|actor| state.service.review_queue(&actor, query.page));
    match result {
        Ok(page) => (StatusCode::OK, axum::Json(page)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn my_submissions_handler<S, D, I>(
    State(state): State<ListingState<S, D, I>>,
    headers: HeaderMap,
) -> Response
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    let result = state
        .keys
        .authenticate(&headers)
        .map_err(ListingError::from)
        .and_then(|actor| state.service.my_submissions(&actor));
    match result {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn report_handler<S, D, I>(
    State(state): State<ListingState<S, D, I>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response
where
    S: ListingStore + 'static,
    D: PrincipalDirectory + 'static,
    I: ImageStore + 'static,
{
    let result = state
        .keys
        .authenticate(&headers)
        .map_err(ListingError::from)
        .and_then(|actor| state.service.activity_report(&actor, query.page));
    match result {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error.into_response(),
    }
}

struct UploadParts {
    payload: Option<Vec<u8>>,
    campus: Vec<ImageUpload>,
    accommodation: Vec<ImageUpload>,
}

/// Walks the multipart body once, collecting the JSON payload part and the
/// two image groups. Unknown parts are skipped.
async fn read_upload_parts(multipart: &mut Multipart) -> Result<UploadParts, ListingError> {
    let mut parts = UploadParts {
        payload: None,
        campus: Vec::new(),
        accommodation: Vec::new(),
    };
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return Err(invalid("upload", "malformed multipart body").into()),
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("payload") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| invalid("payload", "unreadable payload part"))?;
                parts.payload = Some(bytes.to_vec());
            }
            Some("images") => parts.campus.push(upload_from_field(field).await?),
            Some("accommodation_images") => {
                parts.accommodation.push(upload_from_field(field).await?);
            }
            _ => {}
        }
    }
    Ok(parts)
}

async fn upload_from_field(field: Field<'_>) -> Result<ImageUpload, ListingError> {
    let filename = field.file_name().unwrap_or("upload").to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|_| invalid("images", "unreadable image part"))?;
    Ok(ImageUpload {
        filename,
        content_type,
        bytes: bytes.to_vec(),
    })
}

fn required_payload<T: DeserializeOwned>(payload: Option<Vec<u8>>) -> Result<T, ListingError> {
    match payload {
        Some(bytes) => parse_payload(&bytes),
        None => Err(invalid("payload", "payload part is required").into()),
    }
}

fn parse_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ListingError> {
    serde_json::from_slice(bytes)
        .map_err(|_| invalid("payload", "payload must be valid JSON").into())
}
