//! Application services layer.

pub mod directory;
pub mod editorial;
pub mod error;
pub mod explore;
pub mod loader;
pub mod map;
pub mod pagination;
pub mod repos;
pub mod router;
pub mod sitemap;
