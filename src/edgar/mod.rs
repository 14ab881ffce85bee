// src/edgar/mod.rs
pub mod client;
pub mod feed;
pub mod index;
pub mod models;
pub mod normalize;
