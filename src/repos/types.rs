use super::error::Error;

pub type RepoResult<T> = Result<T, Error>;
