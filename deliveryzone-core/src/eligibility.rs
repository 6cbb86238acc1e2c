//! Delivery decisions for a single store and destination.

use chrono::{DateTime, Utc};

use crate::geo_math::distance_km;
use crate::{Coordinate, Store, StoreId};

/// Fixed minutes added to every estimate for order handling.
pub const HANDLING_MINUTES: u32 = 10;

/// Assumed courier speed used for travel estimates.
pub const AVERAGE_SPEED_KMH: f64 = 20.0;

/// Why a store declined to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum DeclineReason {
    /// The destination lies beyond the store's delivery radius.
    OutOfRange,
    /// The store is outside its opening hours.
    StoreClosed,
}

/// Outcome of an eligibility check.
///
/// `reason` is `None` exactly when `can_deliver` is true.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DeliveryDecision {
    /// Store the decision applies to.
    pub store_id: StoreId,
    /// Whether the store can deliver right now.
    pub can_deliver: bool,
    /// Great-circle distance from the store to the destination.
    pub distance_km: f64,
    /// The store's delivery radius.
    pub store_radius_km: f64,
    /// Whether the store is within its opening hours.
    pub is_open: bool,
    /// Estimated minutes until delivery.
    pub eta_minutes: u32,
    /// Why delivery was declined, if it was.
    pub reason: Option<DeclineReason>,
}

/// Estimated delivery time for `distance_km`.
///
/// Ten minutes of handling plus travel at 20 km/h, rounded up to the next
/// whole minute. Non-decreasing in distance.
///
/// # Examples
///
/// ```
/// use deliveryzone_core::eligibility::eta_minutes;
///
/// assert_eq!(eta_minutes(0.0), 10);
/// assert_eq!(eta_minutes(1.0), 13);
/// assert_eq!(eta_minutes(1.01), 14);
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "travel minutes are a non-negative float bounded by half the Earth's circumference"
)]
pub fn eta_minutes(distance_km: f64) -> u32 {
    let travel = (distance_km / AVERAGE_SPEED_KMH * 60.0).ceil().max(0.0);
    HANDLING_MINUTES.saturating_add(travel as u32)
}

/// Decide whether `store` can deliver to `destination` at `now`.
///
/// The radius check is inclusive. When the store is both closed and out of
/// range the reason reported is [`DeclineReason::StoreClosed`].
#[must_use]
pub fn assess(store: &Store, destination: Coordinate, now: DateTime<Utc>) -> DeliveryDecision {
    let distance = distance_km(store.location, destination);
    let within_radius = distance <= store.delivery_radius_km;
    let is_open = store.hours.is_open_at(store.timezone, now);

    let reason = if !is_open {
        Some(DeclineReason::StoreClosed)
    } else if !within_radius {
        Some(DeclineReason::OutOfRange)
    } else {
        None
    };

    DeliveryDecision {
        store_id: store.id,
        can_deliver: reason.is_none(),
        distance_km: distance,
        store_radius_km: store.delivery_radius_km,
        is_open,
        eta_minutes: eta_minutes(distance),
        reason,
    }
}
