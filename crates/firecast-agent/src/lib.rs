//! Fire predictor agent: HTTP surface over the prediction pipeline

pub mod api;
pub mod config;
