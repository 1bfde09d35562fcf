use tracing::{debug, instrument};
use uuid::Uuid;

use super::repo::Offer;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{object_key, object_url, ImageRef, UploadItem};

/// Upload one image under the offer's namespace and return its stored
/// reference. Any failure aborts the request; there is no partial-success
/// suppression.
async fn upload_one(
    state: &AppState,
    offer_id: Uuid,
    item: &UploadItem,
) -> Result<ImageRef, ApiError> {
    let key = object_key(&format!("offers/{}", offer_id), Uuid::new_v4());
    state
        .storage
        .put_object(&key, item.body.clone(), &item.content_type)
        .await?;
    debug!(%offer_id, key = %key, "image uploaded");
    Ok(ImageRef {
        secure_url: object_url(&state.config.storage, &key),
        public_id: key,
    })
}

/// Publish-time upload: optional primary plus any number of secondaries, all
/// keyed under the not-yet-persisted offer id.
#[instrument(skip(state, primary, secondaries))]
pub async fn upload_images(
    state: &AppState,
    offer_id: Uuid,
    primary: Option<&UploadItem>,
    secondaries: &[UploadItem],
) -> Result<(Option<ImageRef>, Vec<ImageRef>), ApiError> {
    let image = match primary {
        Some(item) => Some(upload_one(state, offer_id, item).await?),
        None => None,
    };
    let mut pictures = Vec::with_capacity(secondaries.len());
    for item in secondaries {
        pictures.push(upload_one(state, offer_id, item).await?);
    }
    Ok((image, pictures))
}

/// Edit-time replacement, as four sequential steps:
///   1. delete the old primary object (if any),
///   2. upload the new primary,
///   3. delete every old secondary object,
///   4. upload the new secondaries.
///
/// The steps are not transactional with persistence: a failure after step 1
/// or 3 leaves the media host and the offer store inconsistent. Atomicity
/// here is an accepted non-goal; the request surfaces the failure as a 500.
#[instrument(skip(state, offer, old_pictures, new_primary, new_secondaries))]
pub async fn replace_images(
    state: &AppState,
    offer: &Offer,
    old_pictures: &[ImageRef],
    new_primary: &UploadItem,
    new_secondaries: &[UploadItem],
) -> Result<(ImageRef, Vec<ImageRef>), ApiError> {
    if let Some(old) = offer.image() {
        state.storage.delete_object(&old.public_id).await?;
        debug!(offer_id = %offer.id, key = %old.public_id, "old primary image deleted");
    }
    let image = upload_one(state, offer.id, new_primary).await?;

    for old in old_pictures {
        state.storage.delete_object(&old.public_id).await?;
        debug!(offer_id = %offer.id, key = %old.public_id, "old secondary image deleted");
    }
    let mut pictures = Vec::with_capacity(new_secondaries.len());
    for item in new_secondaries {
        pictures.push(upload_one(state, offer.id, item).await?);
    }
    Ok((image, pictures))
}

/// Cascade deletion of all of an offer's objects, after the row is gone.
#[instrument(skip(state, offer, pictures))]
pub async fn delete_images(
    state: &AppState,
    offer: &Offer,
    pictures: &[ImageRef],
) -> Result<(), ApiError> {
    let mut count = 0usize;
    if let Some(image) = offer.image() {
        state.storage.delete_object(&image.public_id).await?;
        count += 1;
    }
    for pic in pictures {
        state.storage.delete_object(&pic.public_id).await?;
        count += 1;
    }
    debug!(offer_id = %offer.id, count, "offer images deleted");
    Ok(())
}
