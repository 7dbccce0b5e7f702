//! Oráculo: an authenticated chat backend that answers astrology questions.
//!
//! Each question goes through [`services::QueryResolver`]: an in-memory cache,
//! a durable per-user cache, then a live call to the primary LLM provider with
//! fallback to a secondary provider on rate limits and a single continuation
//! request when an answer is cut off. Live answers are stored in libSQL.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod ephemeris;
pub mod error;
pub mod llm;
pub mod models;
pub mod services;
