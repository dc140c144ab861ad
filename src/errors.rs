use axum::{
    extract::multipart::MultipartError,
    http::{header::WWW_AUTHENTICATE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::io;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("You're not authorized.")]
    Unauthorized,
    #[error("You're not authorized.")]
    BasicAuthRequired,
    #[error("This file is password protected.")]
    PasswordRequired,
    #[error("We couldn't find this file! Please re-check the link and try again.")]
    FileNotFound,
    #[error("Oops, that file name is invalid.")]
    InvalidFileName,
    #[error("You need to upload at least one file.")]
    EmptyUpload,
    #[error("That expiration doesn't look right. Try something like `30m`, `2h` or `7d`.")]
    InvalidExpiration,

    #[error("Something went wrong on our side! Please try again later.")]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = match self {
            Self::Unauthorized | Self::BasicAuthRequired | Self::PasswordRequired => {
                StatusCode::UNAUTHORIZED
            }
            Self::FileNotFound => StatusCode::NOT_FOUND,
            Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };

        let error_code = match self {
            AppError::Unauthorized | AppError::BasicAuthRequired => "unauthorized",
            AppError::PasswordRequired => "password-required",
            AppError::FileNotFound => "file-not-found",
            AppError::InvalidFileName => "invalid-file-name",
            AppError::EmptyUpload => "empty-upload",
            AppError::InvalidExpiration => "invalid-expiration",
            AppError::Other(_) => "other",
        };

        if code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("{self:?}");
        }

        let challenge = matches!(self, AppError::BasicAuthRequired);
        let res = ErrorResponse {
            error_code: error_code.to_string(),
            error: self.to_string(),
        };

        let mut response = (code, Json(res)).into_response();
        if challenge {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                "Basic realm=\"restricted\", charset=\"UTF-8\""
                    .parse()
                    .expect("static header value"),
            );
        }
        response
    }
}

impl From<io::Error> for AppError {
    fn from(value: io::Error) -> Self {
        Self::Other(value.into())
    }
}

impl From<MultipartError> for AppError {
    fn from(value: MultipartError) -> Self {
        Self::Other(value.into())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(value: toml::de::Error) -> Self {
        Self::Other(value.into())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Other(value.into())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(value: bcrypt::BcryptError) -> Self {
        Self::Other(value.into())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    error_code: String,
    error: String,
}
