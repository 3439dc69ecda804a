//! Wire types shared between the appointments backend and its clients.
//!
//! `models` mirrors the calendar provider's event list payload, `api` holds
//! the request/response bodies of the HTTP surface.

pub mod api;
pub mod models;
