//! # Harness Web
//!
//! The event harness web application. Wires browser login, the message
//! broker console, and the RDF console into one axum app.
//!
//! ## Overview
//!
//! - **Auth routes**: `/login` redirects to the identity provider,
//!   `/token` completes the callback and sets the session cookie,
//!   `/logout` clears it, and `/` reports the signed-in principal next to
//!   the redacted configuration.
//! - **Broker routes**: `/produce`, `/peek`, and `/consume` drive the
//!   configured topic and subscription. Consumed `rdf` messages are
//!   relayed into the patch log before the message is completed.
//! - **RDF routes**: `/query` (CSV), `/update`, and `/log` talk to the
//!   SPARQL endpoints and the patch log server.
//!
//! Broker and RDF routes require a session whose roles pass the
//! configured admin gate and answer
//! `401 {"error": "Unauthorized access"}` otherwise.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use harness_web::config::HarnessConfig;
//! use harness_web::routes;
//! use harness_web::state::AppState;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HarnessConfig::from_env()?;
//!     let addr = format!("{}:{}", config.host, config.port);
//!     let app = routes::router(AppState::from_config(config)?);
//!     let listener = tokio::net::TcpListener::bind(&addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::HarnessConfig;
pub use error::ApiError;
pub use routes::SESSION_COOKIE;
pub use state::AppState;
