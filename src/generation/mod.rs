//! Creative generation flow.
//!
//! A request is collected by the [`wizard::Wizard`], sent by the
//! [`submitter::JobSubmitter`] and answered asynchronously through the tenant's result
//! collection. [`session::GenerationSession`] ties these together with the progress
//! indicator, the local history and the contact-info gate.
//!
//! # Examples
//!
//! ```rust,no_run
//! # use creative_ai_client::CreativeApp;
//! # use creative_ai_client::config::ClientConfig;
//! # use creative_ai_client::generation::{encode_file, GenerationKind};
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let app = CreativeApp::new(ClientConfig::from_env()?, "id-token");
//! let (mut session, _events) = app.session("shop-1", GenerationKind::Image, true);
//!
//! session.wizard_mut().add_attachments(vec![encode_file("shoe.png").await?])?;
//! session.advance().await?; // settings
//! session.advance().await?; // concept, drafts a brief
//! session.advance().await?; // review
//!
//! let result = session.run().await?;
//! println!("{:?}", result.standard_urls());
//! # Ok(())
//! # }
//! ```

pub mod attachment;
pub mod backend;
pub mod error;
pub mod gate;
pub mod history;
pub mod listener;
pub mod progress;
pub mod session;
pub mod store;
pub mod submitter;
pub mod types;
pub mod wizard;


pub use attachment::{encode_file, encode_files, Attachment};
pub use backend::{FunctionsBackend, GenerationBackend};
pub use error::{GenerationError, ValidationError};
pub use gate::GatingResolver;
pub use history::History;
pub use listener::ResultRecord;
pub use progress::ProgressSimulator;
pub use session::{GenerationSession, SessionEvent};
pub use store::{FirestoreResults, ResultStore};
pub use submitter::JobSubmitter;
pub use types::{
    GenerationKind, GenerationRequest, GenerationResult, GenerationSettings, HistoryItem,
    ImageSettings, JobHandle, ModelTier, UrlPair, VideoSettings,
};
pub use wizard::{Wizard, WizardStep};
