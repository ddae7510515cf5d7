pub mod document_store;
pub mod object_store;
pub mod revalidation_port;
pub mod user_directory;
