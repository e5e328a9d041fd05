#![recursion_limit = "256"]

//! Two-stage purchase recommender built on Burn.
//!
//! A two-tower retrieval model picks candidate items for a user
//! from a brute-force index over the catalog; a ranking model
//! re-scores those candidates by predicted purchase amount.
//! [`application::engine::RecommendationEngine`] ties the two
//! together behind `fit` / `eval` / `infer` / `save` / `load`.

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;
