pub mod db;
pub mod feed;
pub mod gemini;
pub mod youtube;

pub use db::DbAdapter;
pub use feed::SolutionFeed;
pub use gemini::GeminiAdapter;
pub use youtube::YouTubeAdapter;
