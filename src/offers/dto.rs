use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{OfferFields, OfferWithOwner};
use crate::error::ApiError;
use crate::storage::{ImageRef, UploadItem};

pub const TITLE_MAX_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const PRICE_MAX: f64 = 100_000.0;

/// Fields collected from the multipart publish/edit form.
#[derive(Debug, Default)]
pub struct OfferForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub condition: Option<String>,
    pub color: Option<String>,
    pub city: Option<String>,
    pub picture: Option<UploadItem>,
    pub pictures: Vec<UploadItem>,
}

impl OfferForm {
    /// Boundary validation: bounded title/description, numeric bounded price.
    pub fn validate(&self) -> Result<OfferFields<'_>, ApiError> {
        let title = self
            .title
            .as_deref()
            .ok_or_else(|| ApiError::validation("Please provide a title"))?;
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(ApiError::validation(
                "The title must be at most 50 characters long",
            ));
        }
        let description = self
            .description
            .as_deref()
            .ok_or_else(|| ApiError::validation("Please provide a description"))?;
        if description.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(ApiError::validation(
                "The description must be at most 500 characters long",
            ));
        }
        let price = self
            .price
            .as_deref()
            .ok_or_else(|| ApiError::validation("Please provide a price"))?
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or_else(|| ApiError::validation("The price must be numeric"))?;
        if price > PRICE_MAX {
            return Err(ApiError::validation(
                "The price must be at most 100 000",
            ));
        }
        Ok(OfferFields {
            title,
            description,
            price,
            brand: self.brand.as_deref(),
            size: self.size.as_deref(),
            condition: self.condition.as_deref(),
            color: self.color.as_deref(),
            city: self.city.as_deref(),
        })
    }
}

/// Fixed ordered detail set attached to every offer.
#[derive(Debug, Serialize)]
pub struct OfferDetails {
    pub brand: Option<String>,
    pub size: Option<String>,
    pub condition: Option<String>,
    pub color: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OwnerSummary {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub details: OfferDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    pub pictures: Vec<ImageRef>,
    pub owner: OwnerSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl OfferResponse {
    pub fn from_row(row: OfferWithOwner, pictures: Vec<ImageRef>) -> Self {
        let image = row.offer.image();
        let o = row.offer;
        Self {
            id: o.id,
            title: o.title,
            description: o.description,
            price: o.price,
            details: OfferDetails {
                brand: o.brand,
                size: o.size,
                condition: o.condition,
                color: o.color,
                city: o.city,
            },
            image,
            pictures,
            owner: OwnerSummary {
                username: row.owner_username,
                avatar: row.owner_avatar_url,
            },
            created_at: o.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, description: &str, price: &str) -> OfferForm {
        OfferForm {
            title: Some(title.into()),
            description: Some(description.into()),
            price: Some(price.into()),
            ..Default::default()
        }
    }

    #[test]
    fn fifty_char_title_passes_fifty_one_fails() {
        let ok = form(&"t".repeat(50), "desc", "10");
        assert!(ok.validate().is_ok());
        let too_long = form(&"t".repeat(51), "desc", "10");
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn five_hundred_char_description_passes_longer_fails() {
        let ok = form("title", &"d".repeat(500), "10");
        assert!(ok.validate().is_ok());
        let too_long = form("title", &"d".repeat(501), "10");
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn price_bound_is_inclusive() {
        assert!(form("t", "d", "100000").validate().is_ok());
        assert!(form("t", "d", "100001").validate().is_err());
    }

    #[test]
    fn non_numeric_price_fails() {
        assert!(form("t", "d", "cheap").validate().is_err());
        assert!(form("t", "d", "NaN").validate().is_err());
        assert!(form("t", "d", "inf").validate().is_err());
    }

    #[test]
    fn missing_required_fields_fail() {
        let mut f = form("t", "d", "10");
        f.title = None;
        assert!(f.validate().is_err());
        let mut f = form("t", "d", "10");
        f.description = None;
        assert!(f.validate().is_err());
        let mut f = form("t", "d", "10");
        f.price = None;
        assert!(f.validate().is_err());
    }

    #[test]
    fn title_length_counts_characters_not_bytes() {
        // 50 two-byte characters still fit the 50-character bound.
        let ok = form(&"é".repeat(50), "desc", "10");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn validated_fields_carry_the_detail_set() {
        let mut f = form("t", "d", "42.5");
        f.brand = Some("acme".into());
        f.city = Some("Lyon".into());
        let fields = f.validate().unwrap();
        assert_eq!(fields.price, 42.5);
        assert_eq!(fields.brand, Some("acme"));
        assert_eq!(fields.size, None);
        assert_eq!(fields.city, Some("Lyon"));
    }
}
