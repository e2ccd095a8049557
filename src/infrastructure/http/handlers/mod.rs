//! HTTP Handlers

mod chapter;
mod job;
mod note;
mod ping;
mod project;
mod websocket;

pub use chapter::*;
pub use job::*;
pub use note::*;
pub use ping::*;
pub use project::*;
pub use websocket::*;
