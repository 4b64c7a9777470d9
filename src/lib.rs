pub mod api;
mod client;
pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod errors;
mod refresh;
pub mod session;
pub mod telemetry;
pub mod token;

pub use api::{LoginRequest, TokenClaims};
pub use client::SessionClient;
pub use config::Config;
pub use descriptor::RequestDescriptor;
pub use errors::Error;
pub use session::{MemorySession, SessionEvent, SessionStore};
pub use token::AccessToken;
