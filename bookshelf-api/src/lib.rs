//! # Bookshelf API Server Library
//!
//! HTTP layer of the Bookshelf service: users sign up, add books and review
//! them, and every book carries an average rating kept in step with its
//! reviews.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request body extraction
//! - `middleware`: Authentication extractor and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
