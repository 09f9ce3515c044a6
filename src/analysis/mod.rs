pub mod clustering;
pub mod layers;
