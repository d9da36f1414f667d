//! Request body content negotiation and parameter merging.
//!
//! [`Parsers`] walks an ordered list of body [`parser`]s until one claims the
//! request's media type, then merges query, body and path parameters into
//! [`Request::params`].
//!
//! ```no_run
//! use body_parsers::{Parsers, Request};
//!
//! # async fn app(mut req: Request) -> Result<(), Box<dyn std::error::Error>> {
//! let parsers = Parsers::builder()
//!     .parser("urlencoded")
//!     .parser("multipart")
//!     .parser("json")
//!     .pass(["text/*"])
//!     .build()?;
//!
//! if let Err(err) = parsers.call(&mut req).await {
//!     let _status = err.status();
//! }
//! # Ok(())
//! # }
//! ```
#![warn(missing_debug_implementations)]

mod log;

pub mod body;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod media;
pub mod options;
pub mod params;
pub mod parser;
pub mod registry;
pub mod request;

pub use config::ParsersConfig;
pub use dispatch::{Builder, Parsers};
pub use error::{ConfigError, Error, ParseError};
pub use media::MediaType;
pub use options::Options;
pub use params::{ParamMap, ParamValue, Upload};
pub use parser::{Outcome, Parser};
pub use request::{Fetch, Request};
