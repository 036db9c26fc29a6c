pub mod expression;
pub mod select;
