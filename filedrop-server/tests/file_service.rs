//! End-to-end tests over TCP using the client library

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinSet;

use filedrop_client::{Client, ClientError};
use filedrop_common::ErrorKind;
use filedrop_common::framing::{FrameReader, FrameWriter, MessageId};
use filedrop_common::io::{ServerFrame, read_server_frame, send_client_message, send_file_data};
use filedrop_common::protocol::{ClientMessage, ServerMessage};
use filedrop_server::{FileService, OperationClass, ServiceConfig, Storage, serve};

/// Running server plus the handles tests inspect
struct TestServer {
    addr: SocketAddr,
    service: Arc<FileService>,
    _dir: TempDir,
}

impl TestServer {
    async fn start(config: ServiceConfig) -> Self {
        let dir = TempDir::new().unwrap();
        let (storage, _) = Storage::open_root(dir.path()).unwrap();
        let service = Arc::new(FileService::new(storage, config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, service.clone(), std::future::pending()));

        Self {
            addr,
            service,
            _dir: dir,
        }
    }

    async fn client(&self) -> Client {
        Client::connect(self.addr)
            .await
            .unwrap()
            .with_response_timeout(Duration::from_secs(10))
    }

    /// Wait until `class` has exactly `expected` slots in use
    async fn wait_for_in_use(&self, class: OperationClass, expected: usize) {
        let admission = self.service.admission();
        tokio::time::timeout(Duration::from_secs(10), async {
            while admission.in_use(class) != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!(
                "{class} slots in use stayed at {} instead of {expected}",
                admission.in_use(class)
            )
        });
    }
}

/// Frame-level connection for driving requests step by step
struct RawConnection {
    reader: FrameReader<BufReader<OwnedReadHalf>>,
    writer: FrameWriter<OwnedWriteHalf>,
}

impl RawConnection {
    async fn connect(addr: SocketAddr) -> Self {
        let (read, write) = TcpStream::connect(addr).await.unwrap().into_split();
        Self {
            reader: FrameReader::new(BufReader::new(read)),
            writer: FrameWriter::new(write),
        }
    }

    async fn next_message(&mut self) -> ServerMessage {
        match read_server_frame(&mut self.reader).await.unwrap() {
            Some(ServerFrame::Message(received)) => received.message,
            other => panic!("expected message, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_small_file_scenario() {
    let server = TestServer::start(ServiceConfig::default()).await;
    let mut client = server.client().await;

    client.upload_file("a.bin", &[0x01, 0x02, 0x03]).await.unwrap();

    let files = client.get_file_list().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "a.bin");

    let mut download = client.download_file("a.bin").await.unwrap();
    assert_eq!(
        download.next_chunk().await.unwrap(),
        Some(vec![0x01, 0x02, 0x03])
    );
    assert_eq!(download.next_chunk().await.unwrap(), None);
    assert_eq!(download.chunks(), 1);
}

#[tokio::test]
async fn test_large_file_chunking() {
    let server = TestServer::start(ServiceConfig::default()).await;
    let mut client = server.client().await;
    let content: Vec<u8> = (0..2500u32).map(|i| (i * 7 % 256) as u8).collect();

    client.upload_file("big.bin", &content).await.unwrap();

    let mut download = client.download_file("big.bin").await.unwrap();
    let mut chunks = Vec::new();
    while let Some(chunk) = download.next_chunk().await.unwrap() {
        chunks.push(chunk);
    }

    let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![1024, 1024, 452]);
    assert_eq!(chunks.concat(), content);
}

#[tokio::test]
async fn test_round_trip_various_sizes() {
    let server = TestServer::start(ServiceConfig::default()).await;
    let mut client = server.client().await;

    for len in [0usize, 1, 1023, 1024, 1025, 4096, 10_000] {
        let name = format!("file-{len}.bin");
        let content: Vec<u8> = (0..len).map(|i| (i % 253) as u8).collect();
        client.upload_file(&name, &content).await.unwrap();

        let mut download = client.download_file(&name).await.unwrap();
        let mut received = Vec::new();
        while let Some(chunk) = download.next_chunk().await.unwrap() {
            assert!(chunk.len() <= 1024);
            received.extend(chunk);
        }
        assert_eq!(download.chunks(), len.div_ceil(1024) as u64, "len {len}");
        assert_eq!(received, content, "len {len}");
    }
}

#[tokio::test]
async fn test_download_unknown_name_not_found() {
    let server = TestServer::start(ServiceConfig::default()).await;
    let mut client = server.client().await;

    let err = client.download_file("never-uploaded.bin").await.err().unwrap();
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));

    // Connection remains usable and the slot was returned
    assert!(client.get_file_list().await.unwrap().is_empty());
    assert_eq!(server.service.admission().in_use(OperationClass::Download), 0);
}

#[tokio::test]
async fn test_list_empty() {
    let server = TestServer::start(ServiceConfig::default()).await;
    let mut client = server.client().await;

    assert!(client.get_file_list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reupload_preserves_created_at() {
    let server = TestServer::start(ServiceConfig::default()).await;
    let mut client = server.client().await;

    client.upload_file("doc.txt", b"first version").await.unwrap();
    let before = client.get_file_list().await.unwrap();

    // Timestamps have one-second resolution
    tokio::time::sleep(Duration::from_millis(1100)).await;
    client.upload_file("doc.txt", b"second").await.unwrap();
    let after = client.get_file_list().await.unwrap();

    assert_eq!(after.len(), 1);
    assert_eq!(after[0].created_at, before[0].created_at);
    assert!(after[0].updated_at > before[0].updated_at);
    assert_eq!(client.download_to_vec("doc.txt").await.unwrap(), b"second");
}

#[tokio::test]
async fn test_upload_admission_limit() {
    const CAPACITY: usize = 3;
    const EXTRA: usize = 4;

    let server = TestServer::start(ServiceConfig {
        upload_capacity: CAPACITY,
        ..ServiceConfig::default()
    })
    .await;

    // Hold every upload slot: send the request header but not the data yet
    let mut holders = Vec::new();
    for i in 0..CAPACITY {
        let mut conn = RawConnection::connect(server.addr).await;
        let request = ClientMessage::UploadFile {
            name: format!("held-{i}.bin"),
            size: 4,
        };
        let id = send_client_message(&mut conn.writer, &request).await.unwrap();
        holders.push((conn, id));
    }
    server
        .wait_for_in_use(OperationClass::Upload, CAPACITY)
        .await;

    // Everything beyond capacity is rejected immediately
    let mut rejected = JoinSet::new();
    for i in 0..EXTRA {
        let addr = server.addr;
        rejected.spawn(async move {
            let mut client = Client::connect(addr).await.unwrap();
            client.upload_file(&format!("extra-{i}.bin"), b"data").await
        });
    }
    while let Some(result) = rejected.join_next().await {
        let err = result.unwrap().unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ResourceExhausted));
    }
    assert_eq!(server.service.admission().in_use(OperationClass::Upload), CAPACITY);

    // Release the holders by completing their uploads
    for (conn, id) in &mut holders {
        send_file_data(&mut conn.writer, *id, b"data").await.unwrap();
        assert!(matches!(
            conn.next_message().await,
            ServerMessage::UploadFileResponse { .. }
        ));
    }

    server.wait_for_in_use(OperationClass::Upload, 0).await;
    assert_eq!(
        server.service.admission().available(OperationClass::Upload),
        CAPACITY
    );
    assert_eq!(server.service.index().len(), CAPACITY);
}

#[tokio::test]
async fn test_list_admission_independent_of_uploads() {
    let server = TestServer::start(ServiceConfig {
        upload_capacity: 1,
        ..ServiceConfig::default()
    })
    .await;

    let mut holder = RawConnection::connect(server.addr).await;
    let request = ClientMessage::UploadFile {
        name: "slow.bin".to_string(),
        size: 1,
    };
    let id = send_client_message(&mut holder.writer, &request).await.unwrap();
    server.wait_for_in_use(OperationClass::Upload, 1).await;

    // Uploads are full, listing still works
    let mut client = server.client().await;
    assert!(client.get_file_list().await.unwrap().is_empty());

    send_file_data(&mut holder.writer, id, b"x").await.unwrap();
    assert!(matches!(
        holder.next_message().await,
        ServerMessage::UploadFileResponse { .. }
    ));
}

#[tokio::test]
async fn test_parallel_clients() {
    let server = TestServer::start(ServiceConfig::default()).await;

    let mut clients = JoinSet::new();
    for i in 0..8usize {
        let addr = server.addr;
        clients.spawn(async move {
            let mut client = Client::connect(addr).await.unwrap();
            let content = vec![i as u8; 1500 + i];
            client.upload_file(&format!("p-{i}.bin"), &content).await?;
            let received = client.download_to_vec(&format!("p-{i}.bin")).await?;
            assert_eq!(received, content);
            Ok::<_, ClientError>(())
        });
    }
    while let Some(result) = clients.join_next().await {
        result.unwrap().unwrap();
    }

    let mut client = server.client().await;
    assert_eq!(client.get_file_list().await.unwrap().len(), 8);
    assert_eq!(server.service.admission().in_use(OperationClass::Upload), 0);
    assert_eq!(server.service.admission().in_use(OperationClass::Download), 0);
}

#[tokio::test]
async fn test_invalid_name_rejected() {
    let server = TestServer::start(ServiceConfig::default()).await;
    let mut client = server.client().await;

    for name in ["", "..", "dir/file", "back\\slash", ".staging"] {
        let err = client.upload_file(name, b"x").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Invalid), "name {name:?}");
    }

    // Rejected payloads were skipped; the connection is still in sync
    client.upload_file("ok.bin", b"x").await.unwrap();
    assert_eq!(client.get_file_list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_frame_closes_connection() {
    let server = TestServer::start(ServiceConfig::default()).await;
    let mut conn = RawConnection::connect(server.addr).await;

    conn.writer
        .write(MessageId::new(), "GetFileList", b"not json")
        .await
        .unwrap();

    assert!(matches!(
        conn.next_message().await,
        ServerMessage::Error {
            kind: ErrorKind::ProtocolError,
            ..
        }
    ));
    assert!(read_server_frame(&mut conn.reader).await.unwrap().is_none());
}
