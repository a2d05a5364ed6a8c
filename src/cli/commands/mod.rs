pub mod sitemap;
pub mod tags;
pub mod thumbnail;
