use thiserror::Error;

/// Failures of the dependency graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error(
        "Could not find information for {0}. Aborting.\n\
         If this package is from a new tap, run 'bfm refresh' to use info from the new tap.\n\
         With manually added taps the full name format should be used: 'github_user/repo/package'."
    )]
    MetadataNotFound(String),

    #[error("Nothing to remove: {0} is not tracked in the Brewfile.")]
    NothingToRemove(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
