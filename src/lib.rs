//! Backend and client-side support library for a real-estate listings site
//! fronting a headless-CMS GraphQL API.
//!
//! The crate is organised around four components: the GraphQL gateway
//! client ([`gateway`]), the property filter pipeline and infinite-scroll
//! feed ([`pipeline`]), the view/share tracking batcher ([`tracker`]), and
//! the HTTP API surface that exposes them ([`server`]).

pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod tracker;
