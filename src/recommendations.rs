//! Recommendation job trigger after a settled reservation
//!
//! The trigger is detached: callers get nothing back and never wait on it.
//! Its outcome only shows up in the logs.

use std::sync::Arc;

use serde::Serialize;

use crate::api::ApiClient;
use crate::types::PropertyContext;

/// Payload for `/recommendations/generate`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationRequest {
    pub property_id: Option<String>,
    pub preferences: Preferences,
    pub budget_min: Option<i64>,
    pub budget_max: Option<i64>,
    pub location: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
}

/// Preference hints, only the known ones are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_range: Option<[i64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_title: Option<String>,
}

impl RecommendationRequest {
    /// Build the payload for a reserved property.
    ///
    /// The budget window is the price plus or minus 20%, capped at `i64::MAX`.
    /// Returns `None` when the property has no URL.
    pub fn from_property(ctx: &PropertyContext) -> Option<Self> {
        ctx.url.as_deref().filter(|u| !u.is_empty())?;

        let budget = ctx
            .price
            .filter(|p| *p > 0)
            .map(|price| {
                let offset = price / 5;
                [price - offset, price.saturating_add(offset)]
            });

        let location = Some(ctx.location.clone()).filter(|l| !l.is_empty());
        let title = Some(ctx.title.clone()).filter(|t| !t.is_empty());

        Some(Self {
            property_id: ctx.id.clone(),
            preferences: Preferences {
                price_range: budget,
                location: location.clone(),
                bedrooms: ctx.bedrooms,
                bathrooms: ctx.bathrooms,
                reference_title: title,
            },
            budget_min: budget.map(|b| b[0]),
            budget_max: budget.map(|b| b[1]),
            location,
            bedrooms: ctx.bedrooms,
            bathrooms: ctx.bathrooms,
        })
    }
}

/// Fire off recommendation generation for `ctx` without waiting for it.
///
/// Errors are logged and swallowed. Must be called from within a tokio
/// runtime.
pub fn spawn_generate(api: Arc<ApiClient>, ctx: PropertyContext) {
    let Some(request) = RecommendationRequest::from_property(&ctx) else {
        tracing::warn!("Reservation has no property URL, skipping recommendations");
        return;
    };

    tokio::spawn(async move {
        match api.generate_recommendations(&request).await {
            Ok(job) => match job.job_id {
                Some(id) => tracing::info!("Recommendation job triggered: {}", id),
                None => tracing::debug!("Recommendation request accepted without job id"),
            },
            Err(e) => tracing::warn!("Failed to trigger recommendations: {}", e),
        }
    });
}
