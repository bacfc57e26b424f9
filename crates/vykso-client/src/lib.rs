//! Vykso Client SDK.
//!
//! A thin typed client over the Vykso REST API, used by the dashboard's
//! backend-for-frontend and by internal tools.
//!
//! # Example
//!
//! ```no_run
//! use vykso_client::{CreateVideoRequest, VyksoClient};
//! use vykso_core::GenerationModel;
//!
//! # async fn example() -> Result<(), vykso_client::ClientError> {
//! let client = VyksoClient::new("https://api.vykso.app", "user-token");
//!
//! let created = client
//!     .create_video(CreateVideoRequest {
//!         model: GenerationModel::Veo3Fast,
//!         prompt: "Golden hour rooftop timelapse".into(),
//!         duration_seconds: None,
//!         reference_image_urls: vec![],
//!     })
//!     .await?;
//!
//! println!("job {} - {} credits left", created.job.id, created.credits);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, VyksoClient};
pub use error::ClientError;
pub use types::*;
