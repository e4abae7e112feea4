use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authorization error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn auth<S: Into<String>>(msg: S) -> Self {
        Self::Auth(msg.into())
    }

    pub fn fetch<S: Into<String>>(msg: S) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
