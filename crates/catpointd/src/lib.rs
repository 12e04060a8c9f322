//! Catpoint runtime - engine actor, persistence, classifier and console
//!
//! This crate wires the `catpoint-core` engine to the outside world:
//! - `engine` - actor that owns the `SecurityService`, plus its handle
//! - `store` - JSON file implementation of `SensorStore`
//! - `classifier` - external-program and disabled `CatClassifier`s
//! - `config` - TOML configuration
//! - `console` - line-oriented operator console
//! - `display` - status descriptions and colours
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         catpoint                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │     console     │────▶│        EngineActor          │   │
//! │  │ (stdin/stdout)  │     │  SecurityService<S, C>      │   │
//! │  └────────┬────────┘     └──────┬───────────────┬──────┘   │
//! │           │ events              │               │           │
//! │           │              ┌──────▼──────┐ ┌──────▼──────┐   │
//! │  broadcast::Receiver     │JsonFileStore│ │ Classifier  │   │
//! │                          └─────────────┘ └─────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod classifier;
pub mod config;
pub mod console;
pub mod display;
pub mod engine;
pub mod store;
