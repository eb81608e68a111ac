//! # Graph Service
//!
//! An authenticated HTTP façade over a temporal knowledge-graph engine.
//!
//! Clients post text, conversations and documents as episodes, and query
//! facts, nodes and recent episodes. Every episode write is queued on a
//! single serial worker so the engine never ingests two episodes at once.
//!
//! ## Architecture
//!
//! ```text
//!  HTTP ──▶ auth gate ──▶ ingest ──▶ transform ──▶ SerialWorker ──▶ ┌──────────────┐
//!                    │                                             │ GraphEngine  │
//!                    └──▶ retrieve ──────────────────────────────▶ └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`auth`] | Bearer-token middleware |
//! | [`error`] | HTTP error contract |
//! | [`models`] | Request and response types |
//! | [`conversation`] | Message flattening |
//! | [`chunk`] | Document chunking |
//! | [`recipes`] | Named search configurations |
//! | [`worker`] | Serial write queue |
//! | [`engine`] | Graph engine abstraction and in-memory engine |
//! | [`ingest`] | Ingestion routes |
//! | [`retrieve`] | Retrieval routes |
//! | [`server`] | Router and server lifecycle |

pub mod auth;
pub mod chunk;
pub mod config;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod models;
pub mod recipes;
pub mod retrieve;
pub mod server;
pub mod worker;
