use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cascade stream truncated while reading {reading} at offset {offset}")]
    TruncatedStream {
        reading: &'static str,
        offset: usize,
    },

    #[error("invalid cascade shape: {0}")]
    InvalidShape(String),
}

pub type Result<T> = std::result::Result<T, Error>;
