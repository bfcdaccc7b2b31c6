//! # Crypto Market Proxy - REST API Server
//!
//! A caching proxy in front of a cryptocurrency market-data API. Built with
//! [Axum](https://crates.io/crates/axum) for async HTTP handling and provides
//! OpenAPI/Swagger documentation via [utoipa](https://crates.io/crates/utoipa).
//!
//! ## Key Features
//!
//! - **Key Rotation**: Every upstream call takes the least-used key from a
//!   JSON key file; usage counters reset on a schedule.
//!
//! - **Response Cache**: The top-fifty summary is cached in memory for five
//!   minutes.
//!
//! - **Activity Log**: Each successful market-data request is recorded with
//!   the client IP and its parameters, queryable with filters and statistics.
//!
//! - **Feedback Inbox**: Sanitized user feedback with a simple status workflow.
//!
//! - **Rate Limiting**: Sliding-window limit per client IP on `/api/*`.
//!
//! - **Uniform Errors**: Every failure is `{success: false, message}`; internal
//!   detail is added in development mode only.
//!
//! ## Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | Route handlers, extractors and router configuration |
//! | [`cache`] | TTL response cache |
//! | [`config`] | TOML configuration with environment overrides |
//! | [`db`] | Activity and feedback stores (PostgreSQL or in-memory) |
//! | [`error`] | API error types with `IntoResponse` implementation |
//! | [`models`] | Request/response DTOs with OpenAPI schemas |
//! | [`rate_limit`] | Per-client sliding-window rate limiter |
//! | [`state`] | Application state management |
//!
//! ## API Endpoints
//!
//! ### Market Data
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/crypto/listings/latest` | Latest listings |
//! | GET | `/api/crypto/info/{id}` | Quote for one coin |
//! | GET | `/api/crypto/search` | Search by symbol, then by name |
//! | GET | `/api/crypto/historical/{id}` | Historical quotes |
//! | GET | `/api/crypto/top-movers` | Top gainers and losers |
//! | GET | `/api/crypto/top-fifty` | Cached top fifty summary |
//!
//! ### Activity
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/activity/logs` | Paginated, filtered activity |
//! | GET | `/api/activity/stats` | Aggregates over a time range |
//! | DELETE | `/api/activity/logs/clear` | Delete entries older than `days` |
//!
//! ### Feedback
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/feedback/submit` | Submit feedback |
//! | GET | `/api/feedback` | List feedback |
//! | PATCH | `/api/feedback/{id}/status` | Change status |
//! | DELETE | `/api/feedback/{id}` | Delete feedback |
//!
//! ### API Keys
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/keys/add` | Add an upstream key |
//! | POST | `/api/keys/remove` | Remove an upstream key |
//! | GET | `/api/keys/list` | List masked keys |
//! | POST | `/api/keys/reset-usage` | Zero usage counters |
//!
//! ## Example Usage
//!
//! ```bash
//! # In-memory stores, key bootstrapped from the environment
//! COINMARKETCAP_API_KEY=... cargo run
//!
//! # With PostgreSQL
//! DATABASE_URL=postgres://localhost/crypto cargo run
//!
//! # Key administration
//! cargo run --bin manage-keys -- list
//! ```
//!
//! ```bash
//! curl "http://localhost:5000/api/crypto/search?query=btc"
//! curl http://localhost:5000/api/crypto/top-fifty
//! curl -X POST http://localhost:5000/api/feedback/submit \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Ada", "email": "ada@example.com", "subject": "Hi", "message": "Nice"}'
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod state;
