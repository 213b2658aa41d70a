// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Bus Ring Payment Simulator - Epoch Refund Distribution
//
// Splits the per-epoch refundable deposit among ring members in proportion to
// observed collaboration. A member whose score is `s` (always <= -1) carries
// weight `-1/s`: a member who never refused keeps `s = -1` and weight 1.

use serde::{Deserialize, Serialize};

use crate::types::ParticipantId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefundError {
    #[error("no participants to refund")]
    NoParticipants,

    #[error("participant {participant} has non-negative score {score}")]
    InvalidScore { participant: ParticipantId, score: i64 },
}

// ---------------------------------------------------------------------------
// Distribution results
// ---------------------------------------------------------------------------

/// One participant's share of an epoch refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundShare {
    pub participant: ParticipantId,
    pub weight: f64,
    pub amount: f64,
}

/// Aggregate result of one epoch refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundDistribution {
    pub total_refund: f64,
    pub shares: Vec<RefundShare>,
}

impl RefundDistribution {
    pub fn weight_sum(&self) -> f64 {
        self.shares.iter().map(|s| s.weight).sum()
    }
}

// ---------------------------------------------------------------------------
// Core distribution logic
// ---------------------------------------------------------------------------

/// Normalised collaboration weights, one per score, in input order.
pub fn collaboration_weights(scores: &[i64]) -> Result<Vec<f64>, RefundError> {
    if scores.is_empty() {
        return Err(RefundError::NoParticipants);
    }
    let raw: Vec<f64> = scores
        .iter()
        .enumerate()
        .map(|(participant, &score)| {
            if score >= 0 {
                Err(RefundError::InvalidScore { participant, score })
            } else {
                Ok(-1.0 / score as f64)
            }
        })
        .collect::<Result<_, _>>()?;

    let total: f64 = raw.iter().sum();
    Ok(raw.into_iter().map(|w| w / total).collect())
}

/// Distribute `refund` across participants by collaboration weight.
///
/// `scores[i]` belongs to participant `i`.
///
/// # Errors
/// - `NoParticipants` if `scores` is empty.
/// - `InvalidScore` if any score is `>= 0`.
pub fn distribute_refund(refund: f64, scores: &[i64]) -> Result<RefundDistribution, RefundError> {
    let weights = collaboration_weights(scores)?;

    let shares = weights
        .into_iter()
        .enumerate()
        .map(|(participant, weight)| RefundShare {
            participant,
            weight,
            amount: refund * weight,
        })
        .collect();

    Ok(RefundDistribution { total_refund: refund, shares })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
