use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use straffic_core::error_body;
use straffic_sql::SQLError;

/// Why a parking operation was refused.
///
/// Everything except `Persistence` and `Internal` is caused by the request
/// and maps to 400.
/// Messages are shown to the attendant as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParkingError {
    #[error("차량 번호를 입력하세요")]
    MissingPlate,

    #[error("주차 구역을 선택하세요")]
    MissingSpot,

    #[error("존재하지 않는 구역입니다 ({0})")]
    UnknownSpot(String),

    #[error("유효하지 않은 구역 번호입니다 ({0})")]
    InvalidSpotId(String),

    #[error("이미 주차된 구역입니다 ({plate})")]
    AlreadyOccupied { spot: String, plate: String },

    #[error("주차된 차량이 없습니다 ({0})")]
    NotOccupied(String),

    #[error("잘못된 시간 형식입니다 ({0})")]
    InvalidTimestamp(String),

    #[error("출차 시간이 입차 시간보다 빠릅니다")]
    InvalidInterval,

    /// Body or query string could not be read.
    #[error("잘못된 요청입니다: {0}")]
    InvalidRequest(String),

    #[error("DB 저장 중 오류 발생: {0}")]
    Persistence(String),

    /// Server fault outside storage (response encoding, worker crash).
    #[error("서버 내부 오류: {0}")]
    Internal(String),
}

impl ParkingError {
    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ParkingError::MissingPlate => "MISSING_PLATE",
            ParkingError::MissingSpot => "MISSING_SPOT",
            ParkingError::UnknownSpot(_) => "UNKNOWN_SPOT",
            ParkingError::InvalidSpotId(_) => "INVALID_SPOT_ID",
            ParkingError::AlreadyOccupied { .. } => "ALREADY_OCCUPIED",
            ParkingError::NotOccupied(_) => "NOT_OCCUPIED",
            ParkingError::InvalidTimestamp(_) => "INVALID_TIMESTAMP",
            ParkingError::InvalidInterval => "INVALID_INTERVAL",
            ParkingError::InvalidRequest(_) => "INVALID_REQUEST",
            ParkingError::Persistence(_) => "PERSISTENCE_ERROR",
            ParkingError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ParkingError::Persistence(_) | ParkingError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<SQLError> for ParkingError {
    fn from(e: SQLError) -> Self {
        ParkingError::Persistence(e.to_string())
    }
}

impl IntoResponse for ParkingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = error_body(self.error_code(), &self.to_string());
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_are_client_errors() {
        let errs = [
            ParkingError::MissingPlate,
            ParkingError::MissingSpot,
            ParkingError::UnknownSpot("A-99".into()),
            ParkingError::InvalidSpotId("B-1".into()),
            ParkingError::AlreadyOccupied { spot: "A-1".into(), plate: "X".into() },
            ParkingError::NotOccupied("A-1".into()),
            ParkingError::InvalidRequest("missing field".into()),
        ];
        for e in errs {
            assert_eq!(e.status_code(), StatusCode::BAD_REQUEST, "{e:?}");
        }
        assert_eq!(
            ParkingError::Persistence("disk".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let e = ParkingError::Internal("encode".into());
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.error_code(), "INTERNAL");
    }

    #[test]
    fn already_occupied_names_the_plate() {
        let e = ParkingError::AlreadyOccupied { spot: "A-1".into(), plate: "12가3456".into() };
        assert!(e.to_string().contains("12가3456"));
        assert_eq!(e.error_code(), "ALREADY_OCCUPIED");
    }

    #[test]
    fn sql_errors_become_persistence() {
        let e: ParkingError = SQLError::Execution("disk I/O error".into()).into();
        assert_eq!(e.error_code(), "PERSISTENCE_ERROR");
        assert!(e.to_string().contains("disk I/O error"));
    }
}
