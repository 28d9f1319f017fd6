//! End-to-end tests against a server on a loopback port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use irhub::{FrameServer, ServerConfig};

struct Client {
    lines: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let (read, writer) = TcpStream::connect(addr).await.unwrap().into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    async fn send(&mut self, request: &Value) {
        let mut line = request.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("response in time")
            .unwrap()
            .expect("connection open");
        serde_json::from_str(&line).unwrap()
    }

    async fn call(&mut self, request: Value) -> Value {
        self.send(&request).await;
        self.recv().await
    }
}

async fn start(config: ServerConfig) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(FrameServer::new(config));

    tokio::spawn(async move {
        server
            .serve_until(listener, std::future::pending())
            .await
            .unwrap();
    });

    addr
}

fn nec_insert(collector: &str, value: u32) -> Value {
    let mut data = vec![json!([452, 226])];
    for bit in (0..32).rev() {
        data.push(if value & (1 << bit) != 0 { json!([29, 84]) } else { json!([29, 28]) });
    }
    data.push(json!([29, 0]));
    json!({
        "op": "insert",
        "collectorId": collector,
        "frame": { "resolution": 20, "data": data },
    })
}

#[tokio::test]
async fn test_ingest_and_query() {
    let addr = start(ServerConfig::default()).await;
    let mut client = Client::connect(addr).await;

    for _ in 0..3 {
        let stored = client.call(nec_insert("A", 0x00FF_00FF)).await;
        assert_eq!(stored, json!({"status": "ok", "protocolID": "NEC", "value": "00FF00FF"}));
    }

    let protocols = client.call(json!({"op": "protocols", "collectorId": "A"})).await;
    assert_eq!(protocols["protocols"], json!(["NEC"]));

    let values = client
        .call(json!({"op": "values", "collectorId": "A", "protocolID": "NEC"}))
        .await;
    assert_eq!(values["values"], json!(["00FF00FF"]));

    let frames = client
        .call(json!({"op": "frames", "collectorId": "A", "protocolID": "NEC", "value": "00FF00FF"}))
        .await;
    let frames = frames["frames"].as_array().unwrap();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0][0], json!([9040, 4520]));
}

#[tokio::test]
async fn test_errors_keep_connection_usable() {
    let addr = start(ServerConfig::default()).await;
    let mut client = Client::connect(addr).await;

    let missing = client.call(json!({"op": "protocols", "collectorId": "ghost"})).await;
    assert_eq!(missing["status"], "error");
    assert_eq!(missing["kind"], "not_found");

    let mut short = nec_insert("A", 1);
    short["frame"]["data"].as_array_mut().unwrap().truncate(12);
    let rejected = client.call(short).await;
    assert_eq!(rejected["kind"], "decode");

    client.writer.write_all(b"not json\n").await.unwrap();
    let bad = client.recv().await;
    assert_eq!(bad["kind"], "bad_request");

    let frames = client
        .call(json!({"op": "frames", "collectorId": "A", "protocolID": "NEC", "value": "00000001"}))
        .await;
    assert_eq!(frames["kind"], "not_found");

    let collectors = client.call(json!({"op": "collectors"})).await;
    assert_eq!(collectors, json!({"status": "ok", "collectors": []}));
}

#[tokio::test]
async fn test_subscribers_receive_new_frames() {
    let addr = start(ServerConfig::default()).await;

    let mut first = Client::connect(addr).await;
    let mut second = Client::connect(addr).await;
    for subscriber in [&mut first, &mut second] {
        let ack = subscriber.call(json!({"op": "subscribe"})).await;
        assert_eq!(ack["status"], "ok");
        assert_eq!(ack["subscriber"].as_str().unwrap().len(), 64);
    }

    let mut collector = Client::connect(addr).await;
    collector.call(nec_insert("kitchen", 0x20DF_10EF)).await;

    let a = first.recv().await;
    let b = second.recv().await;
    assert_eq!(a, b);
    assert_eq!(a["collectorId"], "kitchen");
    assert_eq!(a["protocolID"], "NEC");
    assert_eq!(a["value"], "20DF10EF");
    assert_eq!(a["frame"].as_array().unwrap().len(), 34);

    let stats = collector.call(json!({"op": "stats"})).await;
    assert_eq!(stats["stats"]["subscribers"], 2);
    assert_eq!(stats["stats"]["events_delivered"], 2);
}

#[tokio::test]
async fn test_subscription_expires() {
    let config = ServerConfig::default().idle_timeout(Duration::from_millis(100));
    let addr = start(config).await;

    let mut subscriber = Client::connect(addr).await;
    subscriber.call(json!({"op": "subscribe"})).await;

    let closed = tokio::time::timeout(Duration::from_secs(5), subscriber.lines.next_line())
        .await
        .unwrap()
        .unwrap();
    assert!(closed.is_none());

    let mut client = Client::connect(addr).await;
    let stats = client.call(json!({"op": "stats"})).await;
    assert_eq!(stats["stats"]["subscribers"], 0);
}
