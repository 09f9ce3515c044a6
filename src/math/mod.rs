pub mod integer_basis;
pub mod lll;
