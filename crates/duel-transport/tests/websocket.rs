//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use duel_transport::{
        Connection, PendingConnection, Transport, TransportError, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(addr: &str, path: &str) -> ClientWs {
        let url = format!("ws://{addr}{path}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_records_target_and_exchanges_frames() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().unwrap().to_string();

        let server_handle = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("should upgrade")
        });

        let mut client_ws =
            connect_client(&addr, "/relay/ab12cd?name=alice").await;
        let server_conn = server_handle.await.expect("task should complete");

        assert!(server_conn.id().to_string().starts_with("conn-"));
        assert_eq!(server_conn.target(), "/relay/ab12cd?name=alice");

        // UTF-8 goes out as a text frame.
        server_conn
            .send(br#"{"type":"joined"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_data().as_ref(), br#"{"type":"joined"}"#);

        // Non UTF-8 goes out as binary.
        server_conn.send(&[0xff, 0x00]).await.unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_binary());

        client_ws
            .send(Message::Text("hello from client".to_string().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"hello from client");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().unwrap().to_string();

        let server_handle = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("should upgrade")
        });
        let mut client_ws = connect_client(&addr, "/").await;
        let server_conn =
            std::sync::Arc::new(server_handle.await.unwrap());

        // One task parks in recv() while another sends on the same
        // connection; the split halves must not block each other.
        let reader = std::sync::Arc::clone(&server_conn);
        let pending = tokio::spawn(async move { reader.recv().await });

        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            server_conn.send(b"while reading"),
        )
        .await
        .expect("send must not wait for recv")
        .unwrap();

        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"while reading");

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = pending.await.unwrap().expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_accept_returns_before_handshake_completes() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind")
            .with_handshake_timeout(std::time::Duration::from_millis(100));
        let addr = transport.local_addr().unwrap().to_string();

        // A peer that opens TCP and never sends the upgrade request.
        let _stalled = tokio::net::TcpStream::connect(&addr).await.unwrap();
        let stalled = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            transport.accept(),
        )
        .await
        .expect("accept must not wait for the handshake")
        .unwrap();

        let client = tokio::spawn(async move { connect_client(&addr, "/actions").await });
        let pending = transport.accept().await.expect("should accept");
        let conn = pending.upgrade().await.expect("should upgrade");
        assert_eq!(conn.target(), "/actions");
        client.await.unwrap();

        let err = stalled.upgrade().await.err().expect("stalled upgrade must fail");
        assert!(matches!(err, TransportError::UpgradeFailed(_)));
    }
}
