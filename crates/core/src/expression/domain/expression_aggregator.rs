//! Running totals of expression confidence across a capture session.
//!
//! Percentages are normalised by the total confidence mass over all labels
//! and frames, not by the number of frames.
use std::collections::BTreeMap;

use super::expression::{Expression, ExpressionBreakdown, ExpressionScores};

#[derive(Clone, Debug, Default)]
pub struct ExpressionAggregator {
    totals: BTreeMap<Expression, f64>,
    frame_count: usize,
}

impl ExpressionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all totals and the frame counter.
    pub fn reset(&mut self) {
        self.totals.clear();
        self.frame_count = 0;
    }

    /// Add one frame's scores to the running totals.
    pub fn accumulate(&mut self, scores: &ExpressionScores) {
        for (expression, value) in scores.iter() {
            *self.totals.entry(expression).or_insert(0.0) += value;
        }
        self.frame_count += 1;
    }

    /// Percentage of total confidence mass per label, in canonical order.
    ///
    /// Empty when nothing (or only zero mass) was accumulated.
    pub fn summarize(&self) -> ExpressionBreakdown {
        let grand_total: f64 = self.totals.values().sum();
        if grand_total == 0.0 || !grand_total.is_finite() {
            return ExpressionBreakdown::default();
        }
        ExpressionBreakdown::new(
            self.totals
                .iter()
                .map(|(e, total)| (*e, 100.0 * total / grand_total))
                .collect(),
        )
    }

    pub fn totals(&self) -> &BTreeMap<Expression, f64> {
        &self.totals
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }
}
