//! Error responses sent to clients

use filedrop_common::ErrorKind;
use filedrop_common::protocol::ServerMessage;

use crate::service::ServiceError;

/// Build an `Error` message
pub fn error_response(kind: ErrorKind, message: &str, command: Option<&str>) -> ServerMessage {
    ServerMessage::Error {
        kind,
        message: message.to_string(),
        command: command.map(str::to_string),
    }
}

/// Build the `Error` message for a failed service operation
///
/// Internal errors are reported without storage details.
pub fn service_error_response(err: &ServiceError, command: &str) -> ServerMessage {
    let message = match err {
        ServiceError::Internal(_) => "internal storage error".to_string(),
        other => other.to_string(),
    };
    ServerMessage::Error {
        kind: err.kind(),
        message,
        command: Some(command.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::OperationClass;
    use std::io;

    #[test]
    fn test_service_error_response() {
        let msg = service_error_response(
            &ServiceError::ResourceExhausted(OperationClass::Upload),
            "UploadFile",
        );
        assert_eq!(
            msg,
            ServerMessage::Error {
                kind: ErrorKind::ResourceExhausted,
                message: "too many concurrent upload requests, try again later".to_string(),
                command: Some("UploadFile".to_string()),
            }
        );
    }

    #[test]
    fn test_internal_error_hides_details() {
        let msg = service_error_response(
            &ServiceError::Internal(io::Error::other("/srv/files/.staging: EIO")),
            "DownloadFile",
        );
        let ServerMessage::Error { kind, message, .. } = msg else {
            panic!("expected Error");
        };
        assert_eq!(kind, ErrorKind::Internal);
        assert!(!message.contains("/srv"));
    }
}
