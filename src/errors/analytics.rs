use actix_web::{HttpResponse, ResponseError, http::StatusCode};

#[derive(serde::Serialize)]
struct ErrorMessage {
    error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum AnalyticsError {
    #[error("Failed to fetch analytics data")]
    QueryFailed(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl AnalyticsError {
    // callers only ever see a generic message for server faults
    fn to_message_error(&self) -> ErrorMessage {
        let error = match self {
            Self::QueryFailed(_) => self.to_string(),
            Self::UnexpectedError(_) => "An unexpected error occurred".to_string(),
        };
        ErrorMessage { error }
    }
}

impl ResponseError for AnalyticsError {
    fn status_code(&self) -> StatusCode {
        // nothing a caller sends can fail the request: bad parameters fall back
        // to defaults, so every error here is ours
        match self {
            Self::QueryFailed(_) | Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.to_message_error())
    }
}
