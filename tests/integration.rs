// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end websocket tests against a real in-process server, grounded on
//! the cli crate's real-TCP-plus-`tokio-tungstenite` integration style.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use ftbroker::auth::{AuthManager, Lock};
use ftbroker::controller::ControllerClient;
use ftbroker::protocol::{
    self, AccessMessage, ApplicationClientMessage, ConnectMessage, HeartbeatClientMessage, Message,
};
use ftbroker::router::heartbeat::{run_eviction_listener, run_heartbeat_ticker};
use ftbroker::router::Router;
use ftbroker::transport::build_router;

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsTx = futures_util::stream::SplitSink<WsStream, WsMessage>;
type WsRx = futures_util::stream::SplitStream<WsStream>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_broker(auth_timeout: Duration) -> anyhow::Result<(SocketAddr, Arc<Router>)> {
    let shutdown = CancellationToken::new();
    let auth = AuthManager::spawn(
        "http://localhost:3000".to_owned(),
        ControllerClient::new("http://127.0.0.1:1"),
        auth_timeout,
        shutdown.clone(),
    )
    .await;
    let router = Router::new(auth, Arc::new(ControllerClient::new("http://127.0.0.1:1")), 16);

    tokio::spawn(run_heartbeat_ticker(Arc::clone(&router), shutdown.clone()));
    tokio::spawn(run_eviction_listener(Arc::clone(&router), shutdown.clone()));

    let app = build_router(Arc::clone(&router));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((addr, router))
}

async fn ws_connect(addr: &SocketAddr, path: &str) -> anyhow::Result<(WsTx, WsRx)> {
    let url = format!("ws://{addr}{path}");
    let (stream, _) =
        tokio_tungstenite::connect_async(&url).await.map_err(|e| anyhow::anyhow!("ws connect: {e}"))?;
    Ok(stream.split())
}

async fn ws_send(tx: &mut WsTx, msg: &Message) -> anyhow::Result<()> {
    let text = protocol::encode(msg).map_err(|e| anyhow::anyhow!("encode: {e}"))?;
    tx.send(WsMessage::Text(text.into())).await.map_err(|e| anyhow::anyhow!("ws send: {e}"))?;
    Ok(())
}

async fn ws_recv(rx: &mut WsRx, timeout: Duration) -> anyhow::Result<Message> {
    let msg = tokio::time::timeout(timeout, rx.next())
        .await
        .map_err(|_| anyhow::anyhow!("ws recv timeout"))?
        .ok_or_else(|| anyhow::anyhow!("ws stream closed"))?
        .map_err(|e| anyhow::anyhow!("ws recv: {e}"))?;
    match msg {
        WsMessage::Text(text) => protocol::decode(&text).map_err(|e| anyhow::anyhow!("decode: {e}")),
        other => anyhow::bail!("expected a text frame, got {other:?}"),
    }
}

/// Wait for the next frame on `rx` to be a close (or the stream to end).
async fn ws_expect_close(rx: &mut WsRx, timeout: Duration) -> anyhow::Result<()> {
    let next = tokio::time::timeout(timeout, rx.next()).await.map_err(|_| anyhow::anyhow!("expected close, timed out"))?;
    match next {
        None | Some(Ok(WsMessage::Close(_))) => Ok(()),
        Some(Ok(other)) => anyhow::bail!("expected close, got {other:?}"),
        Some(Err(e)) => anyhow::bail!("ws error while waiting for close: {e}"),
    }
}

// ---------------------------------------------------------------------------
// S1: happy path — client connects on next_code, binds to an app, exchanges
// an application-level message.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn s1_client_binds_to_app_and_exchanges_messages() -> anyhow::Result<()> {
    let (addr, router) = spawn_broker(Duration::from_secs(900)).await?;
    let next = router.auth().next_code().await.ok_or_else(|| anyhow::anyhow!("next code present"))?;

    let (mut client_tx, mut client_rx) = ws_connect(&addr, &format!("/messaging/in/{next}")).await?;
    let (mut app_tx, mut app_rx) = ws_connect(&addr, "/messaging/out/demo").await?;

    ws_send(&mut client_tx, &Message::Connect(ConnectMessage { app: "demo".to_owned(), client: None })).await?;

    let client_id = match ws_recv(&mut app_rx, RECV_TIMEOUT).await? {
        Message::Connect(c) => c.client.ok_or_else(|| anyhow::anyhow!("router did not stamp a client id"))?,
        other => anyhow::bail!("expected connect, got {other:?}"),
    };
    assert!(router.auth().check(&next).await, "next_code became current after first use");

    ws_send(&mut app_tx, &Message::Access(AccessMessage { client: client_id.clone(), accepted: true, reason: None }))
        .await?;

    match ws_recv(&mut client_rx, RECV_TIMEOUT).await? {
        Message::Access(access) => assert!(access.accepted),
        other => anyhow::bail!("expected access, got {other:?}"),
    }

    ws_send(
        &mut client_tx,
        &Message::ApplicationClient(ApplicationClientMessage { client: None, payload: serde_json::json!({"ping": 1}) }),
    )
    .await?;

    match ws_recv(&mut app_rx, RECV_TIMEOUT).await? {
        Message::ApplicationClient(m) => assert_eq!(m.client.as_deref(), Some(client_id.as_str())),
        other => anyhow::bail!("expected app-client, got {other:?}"),
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// S2: auto-rotation evicts a client holding the code that got rotated out.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn s2_auto_rotation_evicts_stale_client() -> anyhow::Result<()> {
    let (addr, router) = spawn_broker(Duration::from_millis(300)).await?;
    let current = router.auth().current_code().await;

    let (_client_tx, mut client_rx) = ws_connect(&addr, &format!("/messaging/in/{current}")).await?;

    tokio::time::sleep(Duration::from_millis(700)).await;

    match ws_recv(&mut client_rx, RECV_TIMEOUT).await? {
        Message::Access(access) => assert!(!access.accepted),
        other => anyhow::bail!("expected access, got {other:?}"),
    }
    ws_expect_close(&mut client_rx, RECV_TIMEOUT).await
}

// ---------------------------------------------------------------------------
// S3: a closed lock rejects new connections but leaves an already-bound
// client alone.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn s3_closed_lock_rejects_new_clients_but_keeps_existing() -> anyhow::Result<()> {
    let (addr, router) = spawn_broker(Duration::from_secs(900)).await?;
    let current = router.auth().current_code().await;

    let (_bound_tx, _bound_rx) = ws_connect(&addr, &format!("/messaging/in/{current}")).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(router.client_snapshot().await.len(), 1);

    router.auth().set_lock(Lock::Closed).await;
    assert!(router.auth().next_code().await.is_none());

    let (_new_tx, mut new_rx) = ws_connect(&addr, "/messaging/in/whatever-code").await?;
    match ws_recv(&mut new_rx, RECV_TIMEOUT).await? {
        Message::Access(access) => assert!(!access.accepted),
        other => anyhow::bail!("expected access, got {other:?}"),
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(router.client_snapshot().await.len(), 1, "existing client survives the lock closure");
    Ok(())
}

// ---------------------------------------------------------------------------
// S4: a capacity lock pins next_code to current_code and does not itself
// limit how many connections are admitted.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn s4_capacity_lock_pins_next_to_current_and_keeps_admitting() -> anyhow::Result<()> {
    let (addr, router) = spawn_broker(Duration::from_secs(900)).await?;
    let current = router.auth().current_code().await;

    router.auth().set_lock(Lock::Capacity(2)).await;
    let next = router.auth().next_code().await.ok_or_else(|| anyhow::anyhow!("next code present under capacity"))?;
    assert!(ftbroker::code::equal(&current, &next));

    let (_t1, _r1) = ws_connect(&addr, &format!("/messaging/in/{current}")).await?;
    let (_t2, _r2) = ws_connect(&addr, &format!("/messaging/in/{current}")).await?;
    let (_t3, _r3) = ws_connect(&addr, &format!("/messaging/in/{current}")).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(router.client_snapshot().await.len(), 3, "admission itself is not capacity-limited");
    Ok(())
}

// ---------------------------------------------------------------------------
// S5: an app disconnecting tells every client it was bound to, and drops
// out of the registry.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn s5_app_disconnect_notifies_bound_clients() -> anyhow::Result<()> {
    let (addr, router) = spawn_broker(Duration::from_secs(900)).await?;
    let current = router.auth().current_code().await;

    let (mut client_tx, mut client_rx) = ws_connect(&addr, &format!("/messaging/in/{current}")).await?;
    {
        let (mut app_tx, mut app_rx) = ws_connect(&addr, "/messaging/out/demo").await?;
        ws_send(&mut client_tx, &Message::Connect(ConnectMessage { app: "demo".to_owned(), client: None })).await?;
        let client_id = match ws_recv(&mut app_rx, RECV_TIMEOUT).await? {
            Message::Connect(c) => c.client.ok_or_else(|| anyhow::anyhow!("missing client id"))?,
            other => anyhow::bail!("expected connect, got {other:?}"),
        };
        ws_send(&mut app_tx, &Message::Access(AccessMessage { client: client_id, accepted: true, reason: None }))
            .await?;
        let _bound = ws_recv(&mut client_rx, RECV_TIMEOUT).await?;
        // app_tx/app_rx drop here, closing the app's socket.
    }

    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut saw_down = false;
    for _ in 0..4 {
        match ws_recv(&mut client_rx, Duration::from_millis(800)).await {
            Ok(Message::HeartbeatApp(hb)) if !hb.up => {
                saw_down = true;
                break;
            }
            Ok(_) => continue,
            Err(_) => break,
        }
    }
    assert!(saw_down, "client should be told its app went down");
    assert!(router.app("demo").await.is_none());
    Ok(())
}

// ---------------------------------------------------------------------------
// S6: a forbidden frame from a client closes its socket with a negative
// access reply.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn s6_forbidden_client_frame_closes_the_socket() -> anyhow::Result<()> {
    let (addr, router) = spawn_broker(Duration::from_secs(900)).await?;
    let current = router.auth().current_code().await;

    let (mut client_tx, mut client_rx) = ws_connect(&addr, &format!("/messaging/in/{current}")).await?;
    ws_send(&mut client_tx, &Message::HeartbeatClient(HeartbeatClientMessage { up: true, clients: vec![] })).await?;

    match ws_recv(&mut client_rx, RECV_TIMEOUT).await? {
        Message::Access(access) => assert!(!access.accepted),
        other => anyhow::bail!("expected access, got {other:?}"),
    }
    ws_expect_close(&mut client_rx, RECV_TIMEOUT).await
}
