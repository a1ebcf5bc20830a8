//! GetFileList message handler

use std::io;

use tokio::io::AsyncWrite;
use tracing::debug;

use filedrop_common::protocol::ServerMessage;

use super::HandlerContext;

const COMMAND: &str = "GetFileList";

/// Handle a file list request
pub async fn handle_get_file_list<W>(ctx: &mut HandlerContext<'_, W>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match ctx.service.list() {
        Ok(files) => {
            debug!(peer = %ctx.peer_addr, count = files.len(), "file list");
            ctx.send_message(&ServerMessage::FileListResponse { files })
                .await
        }
        Err(e) => ctx.send_service_error(&e, COMMAND).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::OperationClass;
    use crate::handlers::testing::{TestPipe, test_peer_addr};
    use crate::service::testing::{service, service_with};
    use crate::service::ServiceConfig;
    use filedrop_common::ErrorKind;
    use filedrop_common::framing::MessageId;
    use filedrop_common::io::ServerFrame;

    #[tokio::test]
    async fn test_list_empty() {
        let (service, _dir) = service();
        let mut pipe = TestPipe::new();
        let id = MessageId::new();

        let mut ctx = HandlerContext {
            writer: &mut pipe.writer,
            peer_addr: test_peer_addr(),
            service: &service,
            message_id: id,
        };
        handle_get_file_list(&mut ctx).await.unwrap();

        let ServerFrame::Message(received) = pipe.next_frame().await else {
            panic!("expected message");
        };
        assert_eq!(received.message_id, id);
        assert_eq!(
            received.message,
            ServerMessage::FileListResponse { files: Vec::new() }
        );
    }

    #[tokio::test]
    async fn test_list_after_upload() {
        let (service, _dir) = service();
        service.upload("a.bin", b"abc").await.unwrap();
        let mut pipe = TestPipe::new();

        let mut ctx = HandlerContext {
            writer: &mut pipe.writer,
            peer_addr: test_peer_addr(),
            service: &service,
            message_id: MessageId::new(),
        };
        handle_get_file_list(&mut ctx).await.unwrap();

        let ServerFrame::Message(received) = pipe.next_frame().await else {
            panic!("expected message");
        };
        let ServerMessage::FileListResponse { files } = received.message else {
            panic!("expected FileListResponse");
        };
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.bin");
    }

    #[tokio::test]
    async fn test_list_exhausted_keeps_connection() {
        let (service, _dir) = service_with(ServiceConfig {
            list_capacity: 1,
            ..ServiceConfig::default()
        });
        let _held = service.admission().try_acquire(OperationClass::List).unwrap();
        let mut pipe = TestPipe::new();

        let mut ctx = HandlerContext {
            writer: &mut pipe.writer,
            peer_addr: test_peer_addr(),
            service: &service,
            message_id: MessageId::new(),
        };
        assert!(handle_get_file_list(&mut ctx).await.is_ok());

        let ServerFrame::Message(received) = pipe.next_frame().await else {
            panic!("expected message");
        };
        assert!(matches!(
            received.message,
            ServerMessage::Error {
                kind: ErrorKind::ResourceExhausted,
                ..
            }
        ));
    }
}
