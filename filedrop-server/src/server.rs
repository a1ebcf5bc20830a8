//! TCP accept loop

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::connection::handle_connection;
use crate::service::FileService;

/// Accept connections until `shutdown` resolves
///
/// Each connection runs on its own task; distinct connections are served in
/// parallel. Tasks still running when this returns are left to finish or be
/// dropped with the runtime.
pub async fn serve<F>(listener: TcpListener, service: Arc<FileService>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received, no longer accepting connections");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((socket, peer_addr)) => {
                    // Chunks are small; send them without delay
                    let _ = socket.set_nodelay(true);
                    let service = service.clone();

                    tokio::spawn(async move {
                        debug!(peer = %peer_addr, "connection opened");
                        if let Err(e) = handle_connection(socket, peer_addr, &service).await {
                            warn!(peer = %peer_addr, error = %e, "connection error");
                        }
                        debug!(peer = %peer_addr, "connection closed");
                    });
                }
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                }
            },
        }
    }

    Ok(())
}
