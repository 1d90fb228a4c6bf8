//! Data contracts shared by the cover engine and its front ends.

pub mod artifact;
pub mod chat;
pub mod errors;
pub mod events;
pub mod history;
pub mod image;
pub mod models;
pub mod phase;

pub use artifact::{Artifact, ArtifactOrigin};
pub use errors::{GatewayError, SessionError};
pub use history::HistoryStore;
pub use image::ImageData;
pub use phase::Phase;
