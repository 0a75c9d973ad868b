// handlers/mod.rs - Public (no token) and protected (token gate) tiers

pub mod protected;
pub mod public;
