use crate::application::ports::document_store::{
    Collection, DocumentList, DocumentStore, is_missing_fulltext_index,
};
use crate::application::ports::user_directory::{Session, UserDirectory};
use crate::application::services::file_query::{
    DEFAULT_SORT, build_file_queries, candidate_query, merge_shared_fallback, owned_query,
};
use crate::domain::files::file::FileRecord;
use crate::domain::files::file_type::FileType;
use crate::domain::users::user::UserRecord;

use super::{FileActionError, require_user};

#[derive(Debug, Clone)]
pub struct ListFilesParams {
    pub types: Vec<FileType>,
    pub search_text: String,
    pub sort: String,
    pub limit: Option<u32>,
}

impl Default for ListFilesParams {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            search_text: String::new(),
            sort: DEFAULT_SORT.to_string(),
            limit: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileList {
    pub total: u64,
    pub documents: Vec<FileRecord>,
}

pub struct ListFiles<'a, D, U>
where
    D: DocumentStore + ?Sized,
    U: UserDirectory + ?Sized,
{
    pub store: &'a D,
    pub users: &'a U,
    /// Candidate pool size for the unindexed fallback when no limit is given.
    pub candidate_limit: u32,
}

impl<'a, D, U> ListFiles<'a, D, U>
where
    D: DocumentStore + ?Sized,
    U: UserDirectory + ?Sized,
{
    pub async fn execute(
        &self,
        session: &Session,
        params: &ListFilesParams,
    ) -> Result<FileList, FileActionError> {
        let user = require_user(self.users, session).await?;
        let queries = build_file_queries(
            &user,
            &params.types,
            &params.search_text,
            &params.sort,
            params.limit,
        );

        let list = match self.store.list_documents(Collection::Files, &queries).await {
            Ok(list) => list,
            Err(err) if is_missing_fulltext_index(&err) => {
                tracing::warn!(
                    error = %err,
                    user_id = %user.id,
                    "shared_search_unindexed_using_fallback"
                );
                self.shared_fallback(&user, params.limit).await?
            }
            Err(err) => {
                tracing::error!(error = ?err, user_id = %user.id, "get_files_failed");
                return Err(err.into());
            }
        };

        let documents = list
            .documents
            .into_iter()
            .map(FileRecord::from_document)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = %user.id, "get_files_decode_failed");
                err
            })?;
        Ok(FileList {
            total: list.total,
            documents,
        })
    }

    // Owned files plus whatever shared files appear in a capped candidate pool.
    // Shared files outside the pool are not returned.
    async fn shared_fallback(
        &self,
        user: &UserRecord,
        limit: Option<u32>,
    ) -> anyhow::Result<DocumentList> {
        let owned_q = owned_query(user);
        let candidates_q = candidate_query(limit, self.candidate_limit);
        let (owned, candidates) = tokio::try_join!(
            self.store.list_documents(Collection::Files, &owned_q),
            self.store.list_documents(Collection::Files, &candidates_q),
        )
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %user.id, "get_files_fallback_failed");
            err
        })?;
        let documents = merge_shared_fallback(owned.documents, candidates.documents, &user.email);
        Ok(DocumentList {
            total: documents.len() as u64,
            documents,
        })
    }
}
