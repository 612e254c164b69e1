pub mod date;
pub mod rating;
pub mod text;
