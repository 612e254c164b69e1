pub mod prompt;
pub mod scrape;
