//! Client SDK for the Vilocify Vulnerability Intelligence APIv2.
//!
//! The API speaks JSON:API over HTTPS. This crate maps its resources onto
//! plain Rust structs with typed accessors, tracks attribute changes locally
//! and writes back only what changed, and resolves relationships lazily
//! through proxy handles. Requests are blocking; instances are cheap handles
//! onto a shared record and are not `Send`.
//!
//! # Quick start
//!
//! ```no_run
//! use vilocify::models::MonitoringList;
//! use vilocify::{Api, Resource};
//!
//! fn main() -> vilocify::Result<()> {
//!     let api = Api::from_env()?;
//!
//!     let list = MonitoringList::get(&api, "1337")?;
//!     println!("{}", list.name().unwrap_or_default());
//!     for component in list.components().get(&api)? {
//!         println!("- {}", component.name().unwrap_or_default());
//!     }
//!
//!     for list in MonitoringList::filter("active", "eq", "true").asc("name")?.iter(&api) {
//!         let list = list?;
//!         println!("{}", list.name().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod document;
mod error;
mod http;
mod macros;
pub mod model;
pub mod models;
pub mod purl;
mod query;
pub mod relationship;

pub use client::Api;
pub use config::{ApiConfig, EmptyUpdate};
pub use error::{Error, ErrorObject, ErrorSource, Result};
pub use http::{HttpTransport, Method, Request, Response, Transport, MEDIA_TYPE};
pub use model::Resource;
pub use query::{FilterValue, Pages, Query};
pub use relationship::{ToMany, ToOne};

#[doc(hidden)]
pub use paste;
