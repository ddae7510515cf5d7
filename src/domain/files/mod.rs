pub mod file;
pub mod file_type;
pub mod size;
pub mod space;
