use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::query::{SearchPlan, PAGE_SIZE};
use crate::storage::ImageRef;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub condition: Option<String>,
    pub color: Option<String>,
    pub city: Option<String>,
    pub image_public_id: Option<String>,
    pub image_url: Option<String>,
    pub created_at: OffsetDateTime,
}

/// One search-result row: the offer plus its owner's account summary.
#[derive(Debug, Clone, FromRow)]
pub struct OfferWithOwner {
    #[sqlx(flatten)]
    pub offer: Offer,
    pub owner_username: String,
    pub owner_avatar_url: Option<String>,
}

pub struct OfferFields<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub price: f64,
    pub brand: Option<&'a str>,
    pub size: Option<&'a str>,
    pub condition: Option<&'a str>,
    pub color: Option<&'a str>,
    pub city: Option<&'a str>,
}

const OFFER_COLUMNS: &str = "o.id, o.owner_id, o.title, o.description, o.price, \
                             o.brand, o.size, o.condition, o.color, o.city, \
                             o.image_public_id, o.image_url, o.created_at";

impl Offer {
    pub fn image(&self) -> Option<ImageRef> {
        match (&self.image_public_id, &self.image_url) {
            (Some(public_id), Some(secure_url)) => Some(ImageRef {
                public_id: public_id.clone(),
                secure_url: secure_url.clone(),
            }),
            _ => None,
        }
    }

    /// Insert with a caller-supplied id; images were already uploaded under
    /// that id.
    pub async fn create(
        db: &PgPool,
        id: Uuid,
        owner_id: Uuid,
        fields: OfferFields<'_>,
        image: Option<&ImageRef>,
    ) -> anyhow::Result<Offer> {
        let offer = sqlx::query_as::<_, Offer>(&format!(
            "INSERT INTO offers AS o \
                 (id, owner_id, title, description, price, \
                  brand, size, condition, color, city, image_public_id, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {OFFER_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.price)
        .bind(fields.brand)
        .bind(fields.size)
        .bind(fields.condition)
        .bind(fields.color)
        .bind(fields.city)
        .bind(image.map(|i| i.public_id.as_str()))
        .bind(image.map(|i| i.secure_url.as_str()))
        .fetch_one(db)
        .await?;
        Ok(offer)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Offer>> {
        let offer = sqlx::query_as::<_, Offer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers o WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(offer)
    }

    pub async fn find_with_owner(db: &PgPool, id: Uuid) -> anyhow::Result<Option<OfferWithOwner>> {
        let row = sqlx::query_as::<_, OfferWithOwner>(&format!(
            "SELECT {OFFER_COLUMNS}, \
                    u.username AS owner_username, u.avatar_url AS owner_avatar_url \
             FROM offers o \
             JOIN users u ON u.id = o.owner_id \
             WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Overwrite text, price, the five detail fields and the primary image
    /// reference in one statement.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        fields: OfferFields<'_>,
        image: &ImageRef,
    ) -> anyhow::Result<Offer> {
        let offer = sqlx::query_as::<_, Offer>(&format!(
            "UPDATE offers AS o SET \
                 title = $2, description = $3, price = $4, \
                 brand = $5, size = $6, condition = $7, color = $8, city = $9, \
                 image_public_id = $10, image_url = $11 \
             WHERE id = $1 \
             RETURNING {OFFER_COLUMNS}"
        ))
        .bind(id)
        .bind(fields.title)
        .bind(fields.description)
        .bind(fields.price)
        .bind(fields.brand)
        .bind(fields.size)
        .bind(fields.condition)
        .bind(fields.color)
        .bind(fields.city)
        .bind(&image.public_id)
        .bind(&image.secure_url)
        .fetch_one(db)
        .await?;
        Ok(offer)
    }

    /// Remove the row; returns the deleted offer so its images can still be
    /// cleaned off the media host afterwards.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Offer>> {
        let offer = sqlx::query_as::<_, Offer>(&format!(
            "DELETE FROM offers AS o WHERE id = $1 RETURNING {OFFER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(offer)
    }

    /// One page of matching offers with owner summaries, per the plan.
    pub async fn search(db: &PgPool, plan: &SearchPlan) -> anyhow::Result<Vec<OfferWithOwner>> {
        let rows = sqlx::query_as::<_, OfferWithOwner>(&format!(
            "SELECT {OFFER_COLUMNS}, \
                    u.username AS owner_username, u.avatar_url AS owner_avatar_url \
             FROM offers o \
             JOIN users u ON u.id = o.owner_id \
             WHERE o.title ILIKE $1 AND o.price >= $2 AND o.price <= $3 \
             ORDER BY {} \
             LIMIT $4 OFFSET $5",
            plan.order_by()
        ))
        .bind(plan.title_pattern())
        .bind(plan.price_min)
        .bind(plan.price_max_bound())
        .bind(PAGE_SIZE)
        .bind(plan.offset())
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

#[derive(Debug, Clone, FromRow)]
struct PictureRow {
    offer_id: Uuid,
    public_id: String,
    secure_url: String,
}

/// Secondary images of one offer, in display order.
pub async fn pictures(db: &PgPool, offer_id: Uuid) -> anyhow::Result<Vec<ImageRef>> {
    let rows = sqlx::query_as::<_, PictureRow>(
        "SELECT offer_id, public_id, secure_url \
         FROM offer_pictures WHERE offer_id = $1 ORDER BY position ASC",
    )
    .bind(offer_id)
    .fetch_all(db)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| ImageRef {
            public_id: r.public_id,
            secure_url: r.secure_url,
        })
        .collect())
}

/// Secondary images for a page of offers, grouped by offer id.
pub async fn pictures_for(
    db: &PgPool,
    offer_ids: &[Uuid],
) -> anyhow::Result<HashMap<Uuid, Vec<ImageRef>>> {
    let rows = sqlx::query_as::<_, PictureRow>(
        "SELECT offer_id, public_id, secure_url \
         FROM offer_pictures WHERE offer_id = ANY($1) ORDER BY position ASC",
    )
    .bind(offer_ids)
    .fetch_all(db)
    .await?;
    let mut grouped: HashMap<Uuid, Vec<ImageRef>> = HashMap::new();
    for r in rows {
        grouped.entry(r.offer_id).or_default().push(ImageRef {
            public_id: r.public_id,
            secure_url: r.secure_url,
        });
    }
    Ok(grouped)
}

/// Replace the stored secondary-image references in one transaction.
pub async fn set_pictures(
    db: &PgPool,
    offer_id: Uuid,
    pictures: &[ImageRef],
) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;
    sqlx::query("DELETE FROM offer_pictures WHERE offer_id = $1")
        .bind(offer_id)
        .execute(&mut *tx)
        .await?;
    for (position, pic) in pictures.iter().enumerate() {
        sqlx::query(
            "INSERT INTO offer_pictures (offer_id, public_id, secure_url, position) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(offer_id)
        .bind(&pic.public_id)
        .bind(&pic.secure_url)
        .bind(position as i32)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}
