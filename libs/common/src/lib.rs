//! Common library for the VideoJá studio
//!
//! This crate provides the generation core shared by the studio service:
//! the job orchestrator that drives remote video synthesis, the optimistic
//! credit ledger, the in-memory gallery, the client for the hosted
//! generative API and the session that ties them together.

pub mod capability;
pub mod error;
pub mod gallery;
pub mod genai;
pub mod ledger;
pub mod models;
pub mod orchestrator;
pub mod remote;
pub mod script;
pub mod session;
pub mod settings;

/// Example usage of the generation session
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use common::capability::{ApiKeyStore, CapabilityGate};
/// use common::genai::GenAiClient;
/// use common::ledger::CreditLedger;
/// use common::models::{AspectRatio, GenerationRequest, Resolution};
/// use common::orchestrator::JobOrchestrator;
/// use common::script::ScriptAssist;
/// use common::session::StudioSession;
/// use common::settings::StudioConfig;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = StudioConfig::from_env()?;
///     let keys = ApiKeyStore::from_env();
///     let client = Arc::new(GenAiClient::new(config.genai_config(), keys.clone())?);
///
///     let session = StudioSession::new(
///         CreditLedger::new(config.initial_credits),
///         JobOrchestrator::new(client.clone(), config.poll_policy()),
///         CapabilityGate::new(Arc::new(keys), config.retry_policy()),
///         ScriptAssist::new(client),
///     );
///
///     let request = GenerationRequest::new(
///         "A drone shot over a misty forest",
///         AspectRatio::Landscape,
///         Resolution::Hd,
///         None,
///     )?;
///     let video = session.generate(request).await?;
///     println!("Video ready: {}", video.uri);
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
