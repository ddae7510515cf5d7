pub mod file_query;
pub mod space;
