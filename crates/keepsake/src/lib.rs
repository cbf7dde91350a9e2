// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Time-based caching and async function memoization over pluggable key-value stores.
//!
//! This crate provides:
//! - A [`Cache`] with `get`/`has`/`set`/`delete` over any [`Store`]
//! - Absolute, structured expiry through [`Period`] and [`Expiry`]
//! - Memoization of async functions with stale-while-revalidate refreshes
//! - Deduplication of concurrent recomputations for the same arguments
//! - Structured `tracing` events for every cache decision
//!
//! Every value is stored as `{"data": <value>, "expiresAt": <unix millis>}` under a key of the
//! form `cache:<key>` or, for memoized functions, `cache:<name>:<arguments>`.
//!
//! # Examples
//!
//! The examples use `Clock::new_frozen()` from `tick`'s `test-util` feature. Applications pass a
//! live clock such as `Clock::new_tokio()` instead.
//!
//! ## Direct Access
//!
//! ```
//! use keepsake::{Cache, Expiry, Period};
//! use tick::Clock;
//! # futures::executor::block_on(async {
//!
//! let cache = Cache::builder(Clock::new_frozen()).memory().build();
//!
//! cache.set_with("token", Some("abc"), Expiry::new(Period::minutes(30))).await?;
//! assert_eq!(cache.get::<String>("token").await?, Some("abc".to_string()));
//!
//! // Writing `None` deletes the entry.
//! cache.set::<String>("token", None).await?;
//! assert!(!cache.has("token").await?);
//! # Ok::<(), keepsake::Error>(())
//! # });
//! ```
//!
//! ## Memoization
//!
//! ```
//! use std::convert::Infallible;
//!
//! use keepsake::{Cache, Period};
//! use tick::Clock;
//! # futures::executor::block_on(async {
//!
//! let cache = Cache::builder(Clock::new_frozen()).memory().build();
//! let lookup = cache
//!     .function("lookup", |(region, id): (String, u32)| async move {
//!         Ok::<_, Infallible>(format!("{region}/{id}"))
//!     })
//!     .max_age(Period::hours(1))
//!     .stale_while_revalidate(Period::days(1))
//!     .build();
//!
//! assert_eq!(lookup.call(("eu".to_string(), 7)).await?, "eu/7");
//! assert!(cache.has(r#"lookup:["eu",7]"#).await?);
//! # Ok::<(), keepsake::Error>(())
//! # });
//! ```

mod builder;
mod cache;
mod error;
mod expiry;
mod flight;
mod item;
mod key;
mod memoize;
mod period;
mod policy;
mod record;
mod runtime;
mod telemetry;

#[doc(inline)]
pub use builder::CacheBuilder;
#[doc(inline)]
pub use cache::Cache;
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use expiry::Expiry;
#[doc(inline)]
pub use item::CacheItem;
#[doc(inline)]
pub use key::{KeyStrategy, derive_args_key};
#[cfg(feature = "fs")]
#[doc(inline)]
pub use keepsake_store::FileStore;
#[doc(inline)]
pub use keepsake_store::{MemoryStore, Store};
#[doc(inline)]
pub use memoize::{MemoizeBuilder, Memoized};
#[doc(inline)]
pub use period::Period;
#[doc(inline)]
pub use policy::{Freshness, MissReason, RevalidatePredicate, classify};
#[doc(inline)]
pub use record::CacheRecord;

#[cfg(any(feature = "test-util", test))]
#[doc(inline)]
pub use keepsake_store::testing::{MockStore, StoreOp};
