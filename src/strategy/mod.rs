pub mod allocation;
pub mod demand;
pub mod market;
pub mod math;
pub mod pricing;
pub mod repatriation;
