pub mod fetcher;
pub mod image;

pub use fetcher::ReqwestFetcher;
pub use image::ReqwestImageLoader;
