//! End-to-end presence flow over live TCP sockets.
//!
//! Exercises the full join/notify path a real client sees: handshake in,
//! acknowledgment back, pushes to existing namespace members, silent
//! drops for malformed records, and teardown on disconnect.

use std::{net::SocketAddr, time::Duration};

use rollcall_server::{Server, ServerRuntimeConfig};
use serde_json::Value;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a stream must stay quiet before we call it silent.
const QUIET: Duration = Duration::from_millis(300);

async fn start_server() -> SocketAddr {
    start_server_with(ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        ..Default::default()
    })
    .await
}

async fn start_server_with(config: ServerRuntimeConfig) -> SocketAddr {
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

fn handshake(user_id: &str, namespace: &str, connection_type: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "Protocol": "rollcall/1",
        "ConnectionType": connection_type,
        "Namespace": namespace,
        "DateEstablished": "0",
        "UserId": user_id,
        "Payload": { "Data": null },
    }))
    .unwrap()
}

async fn connect(addr: SocketAddr, user_id: &str, namespace: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&handshake(user_id, namespace, "connect")).await.unwrap();
    stream
}

/// Read the records available on the stream. Responses have no framing
/// and may coalesce into one segment, so parse the bytes as a JSON
/// stream.
async fn read_records(stream: &mut TcpStream) -> Vec<Value> {
    let mut buf = vec![0u8; 4096];
    let n = timeout(READ_TIMEOUT, stream.read(&mut buf)).await.expect("read timed out").unwrap();
    assert!(n > 0, "connection closed by server");

    serde_json::Deserializer::from_slice(&buf[..n])
        .into_iter::<Value>()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

async fn read_one(stream: &mut TcpStream) -> Value {
    let mut records = read_records(stream).await;
    assert_eq!(records.len(), 1, "expected exactly one record, got {records:?}");
    records.remove(0)
}

/// Assert the stream stays open but carries no data for a quiet period.
async fn assert_silent(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    let result = timeout(QUIET, stream.read(&mut buf)).await;
    assert!(result.is_err(), "expected silence, stream produced data or closed");
}

/// Assert the server closed the connection.
async fn assert_closed(stream: &mut TcpStream) {
    let mut buf = [0u8; 16];
    let n = timeout(READ_TIMEOUT, stream.read(&mut buf)).await.expect("read timed out").unwrap();
    assert_eq!(n, 0, "expected the server to close the connection");
}

#[tokio::test]
async fn lobby_join_acks_and_notifies_existing_member() {
    let addr = start_server().await;

    // A joins an empty namespace: one ack, no push anywhere.
    let mut a = connect(addr, "a", "lobby").await;
    let ack_a = read_one(&mut a).await;
    assert_eq!(ack_a["ConnectionType"], "connect");
    assert_eq!(ack_a["Status"], "OK");
    assert_eq!(ack_a["Namespace"], "lobby");
    assert!(ack_a["ConnectionId"].as_str().is_some_and(|id| !id.is_empty()));

    // B joins the same namespace.
    let mut b = connect(addr, "b", "lobby").await;
    let ack_b = read_one(&mut b).await;
    assert_eq!(ack_b["ConnectionType"], "connect");
    assert_eq!(ack_b["Status"], "OK");
    let b_connection = ack_b["ConnectionId"].as_str().unwrap().to_string();

    // A receives exactly one push referencing B's connection id.
    let push = read_one(&mut a).await;
    assert_eq!(push["ConnectionType"], "push");
    assert_eq!(push["Namespace"], "lobby");
    assert_eq!(push["Status"], "OK");
    assert_eq!(push["ConnectionId"], Value::String(b_connection));

    // B is never notified about its own join, and A gets nothing more.
    assert_silent(&mut b).await;
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn joins_in_other_namespaces_are_not_broadcast() {
    let addr = start_server().await;

    let mut a = connect(addr, "a", "lobby").await;
    read_one(&mut a).await;

    let mut c = connect(addr, "c", "ops").await;
    read_one(&mut c).await;

    assert_silent(&mut a).await;
}

#[tokio::test]
async fn malformed_handshake_drops_connection_silently() {
    let addr = start_server().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"this is not a record").await.unwrap();

    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn slow_handshake_is_dropped_after_timeout() {
    let addr = start_server_with(ServerRuntimeConfig {
        bind_address: "127.0.0.1:0".to_string(),
        handshake_timeout: Duration::from_millis(200),
        ..Default::default()
    })
    .await;

    // Connect and send nothing.
    let mut stream = TcpStream::connect(addr).await.unwrap();

    assert_closed(&mut stream).await;
}

#[tokio::test]
async fn unknown_connection_type_joins_without_ack() {
    let addr = start_server().await;

    let mut relay = TcpStream::connect(addr).await.unwrap();
    relay.write_all(&handshake("r", "lobby", "relay")).await.unwrap();

    // No ack for an unhandled connection type.
    assert_silent(&mut relay).await;

    // Membership was still recorded: the relay client is notified when a
    // member joins.
    let mut b = connect(addr, "b", "lobby").await;
    let ack_b = read_one(&mut b).await;
    let b_connection = ack_b["ConnectionId"].as_str().unwrap().to_string();

    let push = read_one(&mut relay).await;
    assert_eq!(push["ConnectionType"], "push");
    assert_eq!(push["ConnectionId"], Value::String(b_connection));
}

#[tokio::test]
async fn reconnect_closes_superseded_connection() {
    let addr = start_server().await;

    let mut first = connect(addr, "a", "lobby").await;
    let first_ack = read_one(&mut first).await;

    let mut second = connect(addr, "a", "lobby").await;
    let second_ack = read_one(&mut second).await;

    // A fresh connection id is minted per physical connection.
    assert_ne!(first_ack["ConnectionId"], second_ack["ConnectionId"]);

    // The displaced connection is closed by the server.
    assert_closed(&mut first).await;

    // Exactly one live entry remains: a new joiner produces one push, to
    // the replacement connection.
    let mut b = connect(addr, "b", "lobby").await;
    let ack_b = read_one(&mut b).await;
    let b_connection = ack_b["ConnectionId"].as_str().unwrap().to_string();

    let push = read_one(&mut second).await;
    assert_eq!(push["ConnectionType"], "push");
    assert_eq!(push["ConnectionId"], Value::String(b_connection));
}

#[tokio::test]
async fn remaining_members_are_notified_after_peer_disconnects() {
    let addr = start_server().await;

    let mut a = connect(addr, "a", "lobby").await;
    read_one(&mut a).await;

    let mut b = connect(addr, "b", "lobby").await;
    read_one(&mut b).await;
    read_one(&mut a).await; // push for B

    // B drops its connection; give the server a moment to tear it down.
    drop(b);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // A new join still reaches A - one departed peer never blocks
    // delivery to the rest.
    let mut c = connect(addr, "c", "lobby").await;
    let ack_c = read_one(&mut c).await;
    let c_connection = ack_c["ConnectionId"].as_str().unwrap().to_string();

    let push = read_one(&mut a).await;
    assert_eq!(push["ConnectionType"], "push");
    assert_eq!(push["ConnectionId"], Value::String(c_connection));
    assert_silent(&mut a).await;
}
