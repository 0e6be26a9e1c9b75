pub mod expression;
pub mod expression_aggregator;
pub mod expression_classifier;
