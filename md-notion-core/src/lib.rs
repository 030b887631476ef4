#![doc = "md-notion-core: core logic library for md-notion."]

//! This crate contains the Markdown-to-block mapping, the content fingerprint
//! store and the sync orchestration. Network access to the remote document
//! store lives behind the [`contract::DocumentStore`] trait and is implemented
//! outside of this crate.
//!
//! # Usage
//! Add this as a dependency for tokenizing, mapping, change detection and sync.

pub mod block;
pub mod contract;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod mapper;
pub mod synchronise;
pub mod token;
