pub mod delete_file;
pub mod get_total_space_used;
pub mod list_files;
pub mod rename_file;
pub mod update_file_users;
pub mod upload_file;

#[cfg(test)]
pub(crate) mod fakes;

use uuid::Uuid;

use crate::application::ports::user_directory::{Session, UserDirectory};
use crate::domain::users::user::UserRecord;

#[derive(thiserror::Error, Debug)]
pub enum FileActionError {
    #[error("user not found")]
    Unauthenticated,
    #[error("missing {0} for file document")]
    MissingField(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub(crate) async fn require_user<U>(users: &U, session: &Session) -> Result<UserRecord, FileActionError>
where
    U: UserDirectory + ?Sized,
{
    users
        .current_user(session)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, account_id = %session.account_id, "current_user_failed");
            err
        })?
        .ok_or(FileActionError::Unauthenticated)
}

/// Fresh backend id: 32 lowercase hex chars, valid for document and object ids.
pub(crate) fn unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}
