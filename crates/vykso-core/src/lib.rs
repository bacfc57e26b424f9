//! Core domain types for Vykso's account and job ledger.
//!
//! This crate holds the rules shared by the service and the SDK:
//!
//! - **Identifiers**: [`AccountId`], [`JobId`], [`TransactionId`]
//! - **Tier classification**: [`Tier`], [`AspectRatio`], duration policy
//! - **Accounts**: [`Account`]
//! - **Credits**: [`CreditTransaction`], [`TransactionKind`]
//! - **Jobs**: [`VideoJob`], [`JobStatus`], [`GenerationModel`]
//!
//! # Credit unit
//!
//! **1 credit = 1 second of generated video.** A job reserves exactly
//! `duration_seconds` credits when it is created and gets them back if
//! generation fails. Balances are stored as `i64` and never go negative.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod credits;
pub mod error;
pub mod ids;
pub mod job;
pub mod plan;

pub use account::Account;
pub use credits::{CreditTransaction, TransactionKind};
pub use error::{CoreError, Result};
pub use ids::{AccountId, IdError, JobId, TransactionId};
pub use job::{
    GenerationModel, JobStatus, VideoJob, MAX_PROMPT_CHARS, MAX_REFERENCE_IMAGES,
};
pub use plan::{
    monthly_grant, AspectRatio, DurationRule, Tier, FREE_PLAN, PROFESSIONAL_MAX_SECONDS,
    PROFESSIONAL_MIN_SECONDS,
};
