use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest parse error in {path}: {source}")]
    ManifestParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("{0}")]
    Other(String),
}
