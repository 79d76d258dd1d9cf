//! Exhibitly - A social art-sharing gallery
//!
//! This library provides the server-rendered front-end: pages, forms and
//! the adapters to the hosted backend and media CDN.

pub mod api;
pub mod backend;
pub mod config;
pub mod demo;
pub mod media;
pub mod models;
pub mod services;
pub mod theme;
