pub mod input;
pub mod money;
