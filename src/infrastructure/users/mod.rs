mod document_user_directory;

pub use document_user_directory::DocumentUserDirectory;
