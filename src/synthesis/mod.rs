pub mod assembler;
pub mod builder;
pub mod plane;
pub mod slab;
