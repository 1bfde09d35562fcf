use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{OfferForm, OfferResponse};
use super::query::{SearchParams, SearchPlan};
use super::repo::{self, Offer};
use super::services;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{ApiMultipart, IdPath};
use crate::state::AppState;
use crate::storage::UploadItem;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/offers", get(list))
        .route("/offers/publish", post(publish))
        .route("/offers/:id", get(get_by_id).put(edit).delete(remove))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}

async fn read_offer_form(mut mp: Multipart) -> Result<OfferForm, ApiError> {
    let mut form = OfferForm::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::validation(e.to_string()))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("title") => form.title = Some(field.text().await.map_err(bad_part)?),
            Some("description") => form.description = Some(field.text().await.map_err(bad_part)?),
            Some("price") => form.price = Some(field.text().await.map_err(bad_part)?),
            Some("brand") => form.brand = Some(field.text().await.map_err(bad_part)?),
            Some("size") => form.size = Some(field.text().await.map_err(bad_part)?),
            Some("condition") => form.condition = Some(field.text().await.map_err(bad_part)?),
            Some("color") => form.color = Some(field.text().await.map_err(bad_part)?),
            Some("city") => form.city = Some(field.text().await.map_err(bad_part)?),
            Some("picture") => form.picture = Some(read_file(field).await?),
            Some("product_pictures") | Some("product_pictures[]") => {
                form.pictures.push(read_file(field).await?)
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn read_file(field: axum::extract::multipart::Field<'_>) -> Result<UploadItem, ApiError> {
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".into());
    let body = field.bytes().await.map_err(bad_part)?;
    Ok(UploadItem { body, content_type })
}

fn bad_part(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::validation(e.to_string())
}

async fn offer_response(state: &AppState, id: Uuid) -> Result<OfferResponse, ApiError> {
    let row = Offer::find_with_owner(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Offer not found"))?;
    let pictures = repo::pictures(&state.db, id).await?;
    Ok(OfferResponse::from_row(row, pictures))
}

#[instrument(skip(state, user, mp))]
pub async fn publish(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiMultipart(mp): ApiMultipart,
) -> Result<(StatusCode, Json<OfferResponse>), ApiError> {
    let form = read_offer_form(mp).await?;
    let fields = form.validate()?;

    // Images are keyed under the offer id before the row exists, the same
    // namespace the row will point at once inserted.
    let offer_id = Uuid::new_v4();
    let (image, pictures) =
        services::upload_images(&state, offer_id, form.picture.as_ref(), &form.pictures).await?;

    let offer = Offer::create(&state.db, offer_id, user.id, fields, image.as_ref()).await?;
    repo::set_pictures(&state.db, offer.id, &pictures).await?;

    info!(offer_id = %offer.id, owner_id = %user.id, "offer published");
    let response = offer_response(&state, offer.id).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state, user, mp))]
pub async fn edit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath,
    ApiMultipart(mp): ApiMultipart,
) -> Result<Json<OfferResponse>, ApiError> {
    let offer = Offer::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Offer not found"))?;

    let form = read_offer_form(mp).await?;
    let fields = form.validate()?;
    let new_primary = form
        .picture
        .as_ref()
        .ok_or_else(|| ApiError::validation("Please provide a picture"))?;

    let old_pictures = repo::pictures(&state.db, offer.id).await?;
    let (image, pictures) =
        services::replace_images(&state, &offer, &old_pictures, new_primary, &form.pictures)
            .await?;

    let updated = Offer::update(&state.db, offer.id, fields, &image).await?;
    repo::set_pictures(&state.db, updated.id, &pictures).await?;

    info!(offer_id = %updated.id, editor_id = %user.id, "offer updated");
    let response = offer_response(&state, updated.id).await?;
    Ok(Json(response))
}

#[instrument(skip(state, user))]
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath,
) -> Result<Json<Offer>, ApiError> {
    let pictures = repo::pictures(&state.db, id).await?;
    let offer = Offer::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Offer not found"))?;

    services::delete_images(&state, &offer, &pictures).await?;

    info!(offer_id = %offer.id, deleter_id = %user.id, "offer deleted");
    Ok(Json(offer))
}

#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<OfferResponse>>, ApiError> {
    let plan = SearchPlan::from_params(&params);
    let rows = Offer::search(&state.db, &plan).await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.offer.id).collect();
    let mut pictures = repo::pictures_for(&state.db, &ids).await?;

    let page = rows
        .into_iter()
        .map(|row| {
            let pics = pictures.remove(&row.offer.id).unwrap_or_default();
            OfferResponse::from_row(row, pics)
        })
        .collect();
    Ok(Json(page))
}

#[instrument(skip(state))]
pub async fn get_by_id(
    State(state): State<AppState>,
    IdPath(id): IdPath,
) -> Result<Json<OfferResponse>, ApiError> {
    let response = offer_response(&state, id).await?;
    Ok(Json(response))
}
