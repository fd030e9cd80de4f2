mod crawl;
mod geocode;

pub use crawl::crawl;
pub use geocode::geocode;
