//! Malik - voice and text personal assistant
//!
//! One request pipeline shared by three front-ends:
//! - a desktop chat window (feature `desktop`)
//! - a passive wake-word listen loop
//! - a web server with a chat page and generated reply audio
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Front-ends                        │
//! │     Desktop window  │  Listen loop  │  Web server    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Assistant                          │
//! │   Command router  │  Listener (STT)  │  Speaker (TTS)│
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               External services                      │
//! │   Chat completion  │  Secret store  │  STT  │  TTS   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod assistant;
pub mod brain;
pub mod config;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod error;
pub mod listen;
pub mod secrets;
pub mod voice;

pub use assistant::{Assistant, Services};
pub use brain::{CommandRouter, Intent, Reply};
pub use config::Config;
pub use error::{Error, Result};
