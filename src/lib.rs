//! Pin Server
//!
//! A pinning-service daemon sitting between HTTP clients and a
//! content-addressed storage backend. Clients submit pin requests; the
//! daemon persists them, schedules asynchronous work against the backend,
//! tracks lifecycle status, and exposes CRUD endpoints over HTTP.

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod db;
pub mod pin;
