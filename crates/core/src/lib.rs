pub mod analysis;
pub mod capture;
pub mod detection;
pub mod expression;
pub mod shared;
