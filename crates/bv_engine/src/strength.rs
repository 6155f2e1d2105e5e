//! Deterministic secret strength scoring.
//!
//! Five additive 20-point rules (length, lowercase, uppercase, digit,
//! symbol) plus a 10-point bonus when the secret is mostly distinct
//! characters, capped at 100. Labels: >= 80 strong, >= 50 medium, else
//! weak.
//!
//! Pure and deterministic: the same secret always yields the same report.
//! The engine recomputes it on every save rather than trusting a stored
//! value, so the label can never go stale against an edited secret.

use std::collections::HashSet;

use bv_proto::{Strength, StrengthReport};

pub fn score(secret: &str) -> StrengthReport {
    let mut feedback = Vec::new();
    let mut score: u32 = 0;

    let length = secret.chars().count();
    if length >= 12 {
        score += 20;
    } else if length >= 8 {
        score += 10;
    } else {
        feedback.push("Password should be at least 12 characters".to_string());
    }

    if secret.chars().any(|c| c.is_ascii_lowercase()) {
        score += 20;
    } else {
        feedback.push("Add lowercase letters".to_string());
    }

    if secret.chars().any(|c| c.is_ascii_uppercase()) {
        score += 20;
    } else {
        feedback.push("Add uppercase letters".to_string());
    }

    if secret.chars().any(|c| c.is_ascii_digit()) {
        score += 20;
    } else {
        feedback.push("Add numbers".to_string());
    }

    if secret.chars().any(|c| !c.is_ascii_alphanumeric()) {
        score += 20;
    } else {
        feedback.push("Add symbols".to_string());
    }

    // Repetition check: a secret made of mostly distinct characters earns a
    // bonus; "aaaaaaaaaaaa" does not.
    if length > 0 {
        let distinct = secret.chars().collect::<HashSet<_>>().len();
        if distinct as f64 / length as f64 > 0.7 {
            score += 10;
        }
    }

    let score = score.min(100) as u8;
    let label = if score >= 80 {
        Strength::Strong
    } else if score >= 50 {
        Strength::Medium
    } else {
        Strength::Weak
    };

    StrengthReport {
        score,
        label,
        feedback,
    }
}
