//! Line protocol messages
//!
//! Each request is one JSON object on its own line, selected by `op`.
//! Each response is one JSON object on its own line carrying `status`.

use serde::{Deserialize, Serialize};

use crate::frame::{FrameRecord, TaggedFrame};
use crate::protocol::ProtocolId;
use crate::store::{AccessCoordinator, Dump, FrameRepository, StoreError, StoreStats, Summary};

/// A client request
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Store a captured frame
    Insert(TaggedFrame),
    /// List collectors
    Collectors,
    /// List protocols seen by a collector
    Protocols {
        #[serde(rename = "collectorId")]
        collector_id: String,
    },
    /// List values seen by a collector under a protocol
    Values {
        #[serde(rename = "collectorId")]
        collector_id: String,
        #[serde(rename = "protocolID")]
        protocol: ProtocolId,
    },
    /// Full history of one value
    Frames {
        #[serde(rename = "collectorId")]
        collector_id: String,
        #[serde(rename = "protocolID")]
        protocol: ProtocolId,
        value: String,
    },
    /// Frame counts for the whole store
    Summary,
    /// Every stored frame, optionally for one collector only
    Dump {
        #[serde(rename = "collectorId", default)]
        collector_id: Option<String>,
    },
    /// Store counters
    Stats,
    /// Turn this connection into a new-frame event stream
    Subscribe,
}

/// Payload of a successful response
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Stored {
        #[serde(rename = "protocolID")]
        protocol_id: String,
        value: String,
    },
    Collectors {
        collectors: Vec<String>,
    },
    Protocols {
        protocols: Vec<ProtocolId>,
    },
    Values {
        values: Vec<String>,
    },
    Frames {
        frames: Vec<FrameRecord>,
    },
    Summary {
        summary: Summary,
    },
    Dump {
        history: Dump,
    },
    Stats {
        stats: StoreStats,
    },
    Subscribed {
        subscriber: String,
    },
}

/// Failure category reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Decode,
    Subscription,
    BadRequest,
}

/// A response line
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok(Reply),
    Error { kind: ErrorKind, message: String },
}

impl Response {
    /// Response for a malformed request line
    pub fn bad_request(message: impl Into<String>) -> Self {
        Response::Error {
            kind: ErrorKind::BadRequest,
            message: message.into(),
        }
    }
}

impl From<StoreError> for Response {
    fn from(err: StoreError) -> Self {
        let kind = match err {
            StoreError::Decode(_) => ErrorKind::Decode,
            StoreError::Lookup(_) => ErrorKind::NotFound,
            StoreError::Subscription(_) => ErrorKind::Subscription,
        };
        Response::Error {
            kind,
            message: err.to_string(),
        }
    }
}

impl<E: Into<StoreError>> From<Result<Reply, E>> for Response {
    fn from(result: Result<Reply, E>) -> Self {
        match result {
            Ok(reply) => Response::Ok(reply),
            Err(e) => Response::from(e.into()),
        }
    }
}

/// Run a non-streaming request against the store
///
/// The store is held only for the duration of the operation.
pub async fn execute(coordinator: &AccessCoordinator, request: Request) -> Response {
    let mut store = coordinator.acquire().await;

    match request {
        Request::Insert(tagged) => store
            .insert(tagged)
            .await
            .map(|event| Reply::Stored {
                protocol_id: event.protocol_id,
                value: event.value,
            })
            .into(),
        Request::Collectors => Response::Ok(Reply::Collectors {
            collectors: store.collector_ids(),
        }),
        Request::Protocols { collector_id } => store
            .protocol_ids(&collector_id)
            .map(|protocols| Reply::Protocols { protocols })
            .into(),
        Request::Values {
            collector_id,
            protocol,
        } => store
            .values(&collector_id, protocol)
            .map(|values| Reply::Values { values })
            .into(),
        Request::Frames {
            collector_id,
            protocol,
            value,
        } => store
            .frames(&collector_id, protocol, &value)
            .map(|frames| Reply::Frames {
                frames: frames.to_vec(),
            })
            .into(),
        Request::Summary => Response::Ok(Reply::Summary {
            summary: store.summary(),
        }),
        Request::Dump { collector_id } => store
            .dump(collector_id.as_deref())
            .map(|history| Reply::Dump { history })
            .into(),
        Request::Stats => Response::Ok(Reply::Stats {
            stats: store.stats(),
        }),
        Request::Subscribe => Response::bad_request("subscribe is handled by the session"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::store::FrameStore;

    use super::*;

    fn nec_line(value: u32) -> String {
        let mut data = vec![json!([450, 225])];
        for bit in (0..32).rev() {
            data.push(if value & (1 << bit) != 0 { json!([28, 84]) } else { json!([28, 28]) });
        }
        json!({
            "op": "insert",
            "collectorId": "living-room",
            "frame": { "resolution": 20, "data": data },
        })
        .to_string()
    }

    async fn run(coordinator: &AccessCoordinator, line: &str) -> Value {
        let request: Request = serde_json::from_str(line).unwrap();
        serde_json::to_value(execute(coordinator, request).await).unwrap()
    }

    #[test]
    fn test_parse_requests() {
        let request: Request = serde_json::from_str(r#"{"op":"collectors"}"#).unwrap();
        assert_eq!(request, Request::Collectors);

        let request: Request = serde_json::from_str(
            r#"{"op":"frames","collectorId":"A","protocolID":"NEC","value":"00FF00FF"}"#,
        )
        .unwrap();
        assert_eq!(
            request,
            Request::Frames {
                collector_id: "A".to_string(),
                protocol: ProtocolId::Nec,
                value: "00FF00FF".to_string(),
            }
        );

        let request: Request = serde_json::from_str(r#"{"op":"dump"}"#).unwrap();
        assert_eq!(request, Request::Dump { collector_id: None });

        assert!(serde_json::from_str::<Request>(r#"{"op":"drop_table"}"#).is_err());
    }

    #[tokio::test]
    async fn test_insert_then_query() {
        let coordinator = AccessCoordinator::new(FrameStore::new());

        let stored = run(&coordinator, &nec_line(0x00FF_00FF)).await;
        assert_eq!(
            stored,
            json!({"status": "ok", "protocolID": "NEC", "value": "00FF00FF"})
        );

        let collectors = run(&coordinator, r#"{"op":"collectors"}"#).await;
        assert_eq!(collectors, json!({"status": "ok", "collectors": ["living-room"]}));

        let frames = run(
            &coordinator,
            r#"{"op":"frames","collectorId":"living-room","protocolID":"NEC","value":"00FF00FF"}"#,
        )
        .await;
        assert_eq!(frames["frames"].as_array().unwrap().len(), 1);
        assert_eq!(frames["frames"][0][0], json!([9000, 4500]));

        let summary = run(&coordinator, r#"{"op":"summary"}"#).await;
        assert_eq!(
            summary["summary"]["living-room"]["NEC"],
            json!([{"value": "00FF00FF", "length": 1}])
        );
    }

    #[tokio::test]
    async fn test_dump() {
        let coordinator = AccessCoordinator::new(FrameStore::new());
        run(&coordinator, &nec_line(0x00FF_00FF)).await;
        run(&coordinator, &nec_line(0x00FF_00FF)).await;

        let all = run(&coordinator, r#"{"op":"dump"}"#).await;
        assert_eq!(all["status"], "ok");
        let frames = &all["history"]["living-room"]["NEC"]["00FF00FF"];
        assert_eq!(frames.as_array().unwrap().len(), 2);
        assert_eq!(frames[1][0], json!([9000, 4500]));

        let one = run(&coordinator, r#"{"op":"dump","collectorId":"living-room"}"#).await;
        assert_eq!(one["history"], all["history"]);

        let missing = run(&coordinator, r#"{"op":"dump","collectorId":"attic"}"#).await;
        assert_eq!(missing["status"], "error");
        assert_eq!(missing["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_error_kinds() {
        let coordinator = AccessCoordinator::new(FrameStore::new());

        let missing = run(&coordinator, r#"{"op":"protocols","collectorId":"nope"}"#).await;
        assert_eq!(missing["status"], "error");
        assert_eq!(missing["kind"], "not_found");

        let short = json!({
            "op": "insert",
            "collectorId": "A",
            "frame": { "resolution": 20, "data": [[450, 225], [28, 28]] },
        })
        .to_string();
        let rejected = run(&coordinator, &short).await;
        assert_eq!(rejected["kind"], "decode");

        let stats = run(&coordinator, r#"{"op":"stats"}"#).await;
        assert_eq!(stats["stats"]["decode_failures"], 1);
    }
}
