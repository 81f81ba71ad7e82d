//! # User Interface Module
//!
//! This module encapsulates the web-facing surface of the prediction service.
//! It serves as a container for the `routes` submodule, which defines the
//! endpoints and their handlers, and carries the static page served at `/`.

pub mod routes;
