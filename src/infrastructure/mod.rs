pub mod appwrite;
pub mod db;
pub mod memory;
pub mod revalidation;
pub mod storage;
pub mod users;
