// src/lib.rs

//! TWINS announcement crawler library.
//!
//! Extracts announcements from the portal's listing and detail pages,
//! appends only new ones to a JSON snapshot and republishes the corpus
//! as RSS, Atom and JSON Feed.

pub mod error;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
