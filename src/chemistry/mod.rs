pub mod adsorption;
