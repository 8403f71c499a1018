//! Membership operations for a supporters club whose member records live in
//! a hosted wallet-pass service: deduplicated enrollment, bulk status
//! transitions and metadata broadcasts, plus a thin JSON API over them.

pub mod api;
pub mod config;
pub mod directory;
pub mod domain;
pub mod error;
pub mod service;
pub mod telemetry;
