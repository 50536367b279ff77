//! JBake - a static site baker.
//!
//! Sources are crawled into a content store, then rendered through template
//! engines with a lazily extracted model:
//!
//! ```text
//! content/ ──► Parser ──► Document ──► ContentStore ──► Renderer ──► output/
//!               │                                          │
//!        markup engines                     template engines + model extractors
//! ```
//!
//! All three engine families are looked up in descriptor-driven registries
//! ([`engine::EngineRegistry`]), so plugin folders can add or remap keys.

pub mod assets;
pub mod cli;
pub mod config;
pub mod crawler;
pub mod document;
pub mod engine;
pub mod logger;
pub mod model;
pub mod oven;
pub mod parser;
pub mod render;
pub mod store;
pub mod template;
pub mod utils;
