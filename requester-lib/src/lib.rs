//! # Requester Library
//!
//! A bounded-concurrency dispatcher that sends batches of independent HTTP
//! requests in parallel and reports every outcome through callbacks.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use requester_lib::{Dispatcher, DispatcherConfig, Request};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DispatcherConfig::default()
//!         .with_worker_count(5)
//!         .on_success(|request, body| println!("{} {}", request.target(), body.len()));
//!
//!     let dispatcher = Dispatcher::new(config)?;
//!     dispatcher.submit(vec![Request::get("example.com")?]).await?;
//!     dispatcher.wait().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Fixed worker pool**: at most `worker_count` requests in flight
//! - **Backpressure**: submission suspends while the bounded queue is full
//! - **One outcome per request**: exactly one of the two handlers fires
//! - **Completion barrier**: `wait()` resolves once all submitted work is done
//! - **Graceful shutdown**: `close()` drains the queue and joins the workers

// Re-export main public API types and functions
// This makes them available as requester_lib::TypeName
pub use barrier::{CompletionBarrier, CompletionGuard};
pub use config::{
    load_env_config, ConfigManager, DefaultsConfig, DispatcherConfig, EnvConfig, FailureHandler,
    FileConfig, SuccessHandler, DEFAULT_QUEUE_CAPACITY, DEFAULT_USER_AGENT, DEFAULT_WORKER_COUNT,
};
pub use dispatcher::Dispatcher;
pub use error::RequesterError;
pub use request::Request;
pub use utils::{has_http_scheme, is_blank};

// Internal modules - these are not part of the public API
mod barrier;
mod config;
mod dispatcher;
mod error;
mod request;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, RequesterError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
