//! Explore landing pages, geo sitemap and cache invalidation for a local
//! business directory.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
