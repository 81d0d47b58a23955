//! Embedded HTTP/1.1 subset.
//!
//! Just enough HTTP for the portal: one request per connection, a handful
//! of recognised headers, bodies streamed through fixed-size buffers.
//!
//! # Architecture
//!
//! - **`reader`**: bounded CRLF line reads
//! - **`parser`**: request line + header allow-list into a [`request::RequestDescriptor`]
//! - **`request`**: method, descriptor and per-connection context
//! - **`response`**: status codes and the response head
//! - **`writer`**: status line / header emission and sliced body sends
//! - **`mime`**: the fixed extension → content-type table
//! - **`error`**: failure taxonomy and its status mapping
//! - **`connection`**: the per-connection supervisor
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← request line + headers
//!        └──────┬──────┘
//!               │ descriptor parsed        parse failure ──┐
//!               ▼                                          │
//!        ┌──────────────────┐                              │
//!        │   Processing     │ ← classify, ingest, route    │
//!        └──────┬───────────┘                              │
//!               │ response written (or error translated)   │
//!               ▼                                          │
//!        ┌──────────────────┐                              │
//!        │     Closed       │ ◄────────────────────────────┘
//!        └──────────────────┘
//! ```
//!
//! There is no keep-alive: every path ends in `Closed`.

pub mod connection;
pub mod error;
pub mod mime;
pub mod parser;
pub mod reader;
pub mod request;
pub mod response;
pub mod writer;
