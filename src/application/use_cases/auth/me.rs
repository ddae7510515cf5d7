use crate::application::ports::user_directory::{Session, UserDirectory};
use crate::domain::users::user::UserRecord;

pub struct GetMe<'a, U: UserDirectory + ?Sized> {
    pub users: &'a U,
}

impl<'a, U: UserDirectory + ?Sized> GetMe<'a, U> {
    pub async fn execute(&self, session: &Session) -> anyhow::Result<Option<UserRecord>> {
        self.users.current_user(session).await
    }
}
