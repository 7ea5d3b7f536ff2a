//! REST API module
//!
//! Thin HTTP surface over the node. Peers read each other's chains through
//! `GET /chain`, so the shape of that response is part of the protocol.
//!
//! # Endpoints
//!
//! ## Transactions
//! - `POST /transactions/new` - Pool a transaction (`{sender, recipient, amount}`)
//! - `GET /transactions/pending` - List pending transactions
//!
//! ## Mining
//! - `GET /mine` - Mine a new block
//!
//! ## Chain
//! - `GET /chain` - Full chain and length
//! - `GET /chain/blocks/{index}` - Get block by index
//! - `GET /chain/validate` - Validate chain
//!
//! ## Nodes
//! - `GET /nodes` - Known peers
//! - `POST /nodes/register` - Register peers (`{nodes: [...]}`)
//! - `GET /nodes/resolve` - Adopt the longest valid peer chain

pub mod handlers;
pub mod routes;

pub use handlers::ApiState;
pub use routes::create_router;
