use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use outbreak_core::error::GameError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unauthorized(String),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Unauthorized(m)
            | Self::Internal(m) => {
                write!(f, "{m}")
            },
        }
    }
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        let message = err.to_string();
        match err {
            GameError::PlayerNotFound(_) => Self::NotFound(message),
            GameError::WrongStage { .. }
            | GameError::WrongState { .. }
            | GameError::AlreadyEntered
            | GameError::RegistrationClosed
            | GameError::NoOriginalZombie
            | GameError::NoCandidates
            | GameError::TagSpaceExhausted => Self::Conflict(message),
            GameError::InvalidTime(_)
            | GameError::InvalidTagLength(_)
            | GameError::InvalidWeekday(_)
            | GameError::InvalidTimezoneOffset(_)
            | GameError::AllDaysIgnored => Self::BadRequest(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            Self::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            Self::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_core::entry::PlayerState;
    use outbreak_core::game::GameStage;

    #[test]
    fn stage_errors_map_to_conflict() {
        let err = GameError::WrongStage {
            current: GameStage::Created,
            needed: GameStage::OpenRegistration,
            reason: "too early".to_string(),
        };
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[test]
    fn state_errors_map_to_conflict() {
        let err = GameError::WrongState {
            current: PlayerState::Human,
            needed: PlayerState::Zombie,
            reason: "killer must be a zombie".to_string(),
        };
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[test]
    fn lookup_errors_map_to_not_found() {
        let err = GameError::PlayerNotFound("ABCD".to_string());
        assert!(matches!(AppError::from(err), AppError::NotFound(_)));
    }

    #[test]
    fn time_errors_map_to_bad_request() {
        let err = GameError::InvalidTime("kill is not within the report window".to_string());
        assert!(matches!(AppError::from(err), AppError::BadRequest(_)));
    }

    #[test]
    fn tag_errors_map_by_kind() {
        assert!(matches!(
            AppError::from(GameError::InvalidTagLength(1)),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(GameError::TagSpaceExhausted),
            AppError::Conflict(_)
        ));
    }
}
