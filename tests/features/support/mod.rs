//! Scenario support types


pub use world::TestWorld;
