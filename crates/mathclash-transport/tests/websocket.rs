//! Integration tests for the WebSocket listener and split connection.

use futures_util::{SinkExt, StreamExt};
use mathclash_transport::WsListener;
use tokio_tungstenite::tungstenite::Message;

async fn bind_listener() -> (WsListener, String) {
    let listener = WsListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    (listener, addr)
}

#[tokio::test]
async fn test_accept_assigns_unique_ids() {
    let (mut listener, addr) = bind_listener().await;

    let url = format!("ws://{addr}");
    let client_a =
        tokio::spawn(
            async move { tokio_tungstenite::connect_async(url).await },
        );
    let conn_a = listener.accept().await.unwrap();

    let url = format!("ws://{addr}");
    let client_b =
        tokio::spawn(
            async move { tokio_tungstenite::connect_async(url).await },
        );
    let conn_b = listener.accept().await.unwrap();

    assert_ne!(conn_a.id(), conn_b.id());
    client_a.await.unwrap().unwrap();
    client_b.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_binary_frames_round_trip() {
    let (mut listener, addr) = bind_listener().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();
        ws.send(Message::Binary(b"ping".to_vec().into()))
            .await
            .unwrap();
        let echoed = ws.next().await.unwrap().unwrap();
        assert_eq!(echoed.into_data().as_ref(), b"pong");
    });

    let conn = listener.accept().await.unwrap();
    let (mut tx, mut rx) = conn.split();

    let frame = rx.recv().await.unwrap().unwrap();
    assert_eq!(frame, b"ping");
    tx.send(b"pong").await.unwrap();

    client.await.unwrap();
}

#[tokio::test]
async fn test_text_frames_arrive_as_bytes() {
    let (mut listener, addr) = bind_listener().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();
        ws.send(Message::text(r#"{"event":"leave-room"}"#))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
    });

    let conn = listener.accept().await.unwrap();
    let (_tx, mut rx) = conn.split();

    let frame = rx.recv().await.unwrap().unwrap();
    assert_eq!(frame, br#"{"event":"leave-room"}"#);

    client.await.unwrap();
}

#[tokio::test]
async fn test_clean_close_yields_none() {
    let (mut listener, addr) = bind_listener().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();
        ws.close(None).await.unwrap();
    });

    let conn = listener.accept().await.unwrap();
    let (_tx, mut rx) = conn.split();

    assert_eq!(rx.recv().await.unwrap(), None);
    client.await.unwrap();
}

#[tokio::test]
async fn test_sender_close_ends_client_stream() {
    let (mut listener, addr) = bind_listener().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .unwrap();
        // Server closes first; the client stream should terminate.
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(_)) => break,
            }
        }
    });

    let conn = listener.accept().await.unwrap();
    let (mut tx, _rx) = conn.split();
    tx.close().await.unwrap();

    client.await.unwrap();
}
