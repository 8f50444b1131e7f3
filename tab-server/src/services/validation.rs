//! Input validation helpers
//!
//! Everything here runs before a store transaction opens, so a rejected
//! request never writes anything.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{BillOrderCreate, TabSettings};
use shared::util::normalize_email;
use std::collections::BTreeSet;

// ── Limits ──────────────────────────────────────────────────────────

/// Organization and display names
pub const MAX_NAME_LEN: usize = 64;

/// Free-form payment details (chartstring, billing contact)
pub const MAX_PAYMENT_DETAILS_LEN: usize = 255;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

pub const MAX_BILLING_INTERVAL_DAYS: i32 = 365;

/// Per line, per submission
pub const MAX_ORDER_QUANTITY: i32 = 10_000;

/// Bit 0 = Sunday ... bit 6 = Saturday
pub const ALL_DAYS_MASK: i16 = 0b111_1111;

// ── Text ────────────────────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_field(field, format!("{field} must not be empty")));
    }
    validate_text_len(value, field, max_len)
}

pub fn validate_text_len(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len > max_len {
        return Err(AppError::invalid_field(
            field,
            format!("{field} is too long ({len} chars, max {max_len})"),
        ));
    }
    Ok(())
}

// ── Tab settings ────────────────────────────────────────────────────

pub fn validate_settings(s: &TabSettings) -> Result<(), AppError> {
    validate_required_text(&s.organization, "organization", MAX_NAME_LEN)?;
    validate_required_text(&s.display_name, "display_name", MAX_NAME_LEN)?;
    validate_text_len(&s.payment_details, "payment_details", MAX_PAYMENT_DETAILS_LEN)?;

    if s.start_date > s.end_date {
        return Err(AppError::new(ErrorCode::TabInvalidDateRange)
            .with_detail("start_date", s.start_date.to_string())
            .with_detail("end_date", s.end_date.to_string()));
    }
    if s.daily_start_time >= s.daily_end_time {
        return Err(AppError::invalid_field(
            "daily_start_time",
            "daily_start_time must be before daily_end_time",
        ));
    }
    if !(1..=ALL_DAYS_MASK).contains(&s.active_days_of_wk) {
        return Err(AppError::invalid_field(
            "active_days_of_wk",
            "active_days_of_wk must select at least one day of the week",
        ));
    }
    if s.dollar_limit_per_order < Decimal::ZERO {
        return Err(AppError::invalid_field(
            "dollar_limit_per_order",
            "dollar_limit_per_order must not be negative",
        ));
    }
    if !(1..=MAX_BILLING_INTERVAL_DAYS).contains(&s.billing_interval_days) {
        return Err(AppError::new(ErrorCode::TabInvalidBillingInterval)
            .with_detail("billing_interval_days", s.billing_interval_days));
    }
    Ok(())
}

// ── Membership lists ────────────────────────────────────────────────

fn is_plausible_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Normalize, validate and de-duplicate a verification list
pub fn normalize_verification_list(emails: &[String]) -> Result<Vec<String>, AppError> {
    let mut seen = BTreeSet::new();
    for raw in emails {
        let email = normalize_email(raw);
        if !is_plausible_email(&email) {
            return Err(AppError::new(ErrorCode::TabInvalidVerificationEmail)
                .with_detail("email", raw.as_str()));
        }
        seen.insert(email);
    }
    Ok(seen.into_iter().collect())
}

/// De-duplicate location ids, rejecting non-positive ids
pub fn normalize_location_ids(ids: &[i64]) -> Result<Vec<i64>, AppError> {
    if let Some(bad) = ids.iter().find(|id| **id < 1) {
        return Err(AppError::invalid_field(
            "location_ids",
            format!("invalid location id {bad}"),
        ));
    }
    let unique: BTreeSet<i64> = ids.iter().copied().collect();
    Ok(unique.into_iter().collect())
}

// ── Orders ──────────────────────────────────────────────────────────

fn validate_quantity(quantity: i32) -> bool {
    (1..=MAX_ORDER_QUANTITY).contains(&quantity)
}

pub fn validate_order(order: &BillOrderCreate) -> Result<(), AppError> {
    if order.items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty));
    }
    for item in &order.items {
        if !validate_quantity(item.quantity) {
            return Err(AppError::new(ErrorCode::OrderInvalidQuantity)
                .with_detail("item_id", item.id)
                .with_detail("quantity", item.quantity));
        }
        for variant in &item.variants {
            if !validate_quantity(variant.quantity) {
                return Err(AppError::new(ErrorCode::OrderInvalidQuantity)
                    .with_detail("item_id", item.id)
                    .with_detail("variant_id", variant.id)
                    .with_detail("quantity", variant.quantity));
            }
        }
    }
    Ok(())
}
