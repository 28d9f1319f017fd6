//! Frame history, subscriber fan-out and single-writer access
//!
//! One [`FrameStore`] lives for the whole process. It keeps the decoded frame
//! history and the registry of live subscribers, and it is only ever touched
//! through a [`StoreGuard`] obtained from the [`AccessCoordinator`].
//!
//! # Architecture
//!
//! ```text
//!                     AccessCoordinator (Arc<Mutex<_>>)
//!                     ┌──────────────────────────────┐
//!                     │ FrameStore {                 │
//!                     │   index: collector           │
//!                     │     → protocol → value       │
//!                     │     → [FrameRecord],         │
//!                     │   notifier: id → mpsc::Tx,   │
//!                     │ }                            │
//!                     └──────────────┬───────────────┘
//!                                    │ acquire() / drop(guard)
//!         ┌──────────────────────────┼──────────────────────────┐
//!         │                          │                          │
//!         ▼                          ▼                          ▼
//!    [Collector]                [Query]                   [Subscriber]
//!    insert(frame)              frames(..)                sub.recv()
//!         │                                                     ▲
//!         └────── decode ─► append ─► broadcast(event) ─────────┘
//! ```
//!
//! The store is reached through two traits: [`FrameRepository`] for the
//! history and [`FrameNotifier`] for subscriptions. `FrameStore` implements
//! both, so callers pick the one they need without any runtime casting.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod notifier;
pub mod repository;
pub mod stats;

pub use config::{DeliveryPolicy, StoreConfig};
pub use coordinator::{AccessCoordinator, StoreGuard};
pub use error::{LookupError, StoreError, SubscriptionError};
pub use notifier::{FrameNotifier, SubscriberRegistry, Subscription};
pub use repository::{CollectorDump, Dump, FrameRepository, FrameStore, Summary, ValueLength};
pub use stats::StoreStats;
