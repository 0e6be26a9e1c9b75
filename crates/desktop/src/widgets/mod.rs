pub mod drop_zone;
pub mod expression_bars;
