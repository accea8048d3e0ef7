//! # kvar-triage
//!
//! Decision layer of the kvar issue triage engine.
//!
//! This crate provides:
//! - [`TriageCoordinator`]: picks the analysis path for a report and runs the
//!   vision → text → deterministic fallback chain
//! - [`TriageSession`]: one issue draft, with its image description cache and
//!   supersession of stale results
//! - The deterministic keyword classifier, the response normalizer, and the
//!   text specificity heuristic
//! - [`TriageConfig`] / [`KvarConfig`] loaded from TOML or the environment
//!
//! # Example
//!
//! ```rust,no_run
//! use kvar_triage::{ClassificationRequest, KvarConfig, TriageCoordinator, TriageSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = KvarConfig::from_env();
//!     let analyzers = config.inference.build()?;
//!     let session = TriageSession::new(TriageCoordinator::from_analyzers(
//!         analyzers,
//!         &config.triage,
//!     ));
//!
//!     let request = ClassificationRequest::new()
//!         .with_title("Curi voda")
//!         .with_description("Ispod sudopera u kuhinji je lokva");
//!     if let Some(outcome) = session.submit(&request).await?.into_outcome() {
//!         println!("{} / {}", outcome.result.category, outcome.result.priority);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod fallback;
pub mod normalize;
pub mod session;
pub mod specificity;

pub use kvar_core::*;

pub use cache::{CacheEntry, ImageDescriptionCache};
pub use config::{KvarConfig, TriageConfig};
pub use coordinator::{deterministic_outcome, derive_image_description, TriageCoordinator};
pub use normalize::normalize;
pub use session::{SessionOutcome, TriageSession};
pub use specificity::SpecificityConfig;
