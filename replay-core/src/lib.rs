//! # replay-core: interactive console over one-shot execution
//!
//! Makes a stateless compile-and-run backend feel like a live terminal. Each
//! line of input re-runs the program from scratch with the whole stdin
//! history, and the transcript is re-derived from the newest full output.
//!
//! ## Round trip
//!
//! ```text
//! start_session(program)
//!      ↓
//! backend(stdin = "")            ──→ "Enter a number:\n"
//!      ↓
//! Revealer                       ──→ ["Enter a number:"], waiting
//!      ↓
//! submit_input("5")
//!      ↓
//! backend(stdin = "5")           ──→ "Enter a number:\nYou entered: 5\n"
//!      ↓
//! Revealer (1 answered prompt)   ──→ ["Enter a number:", "You entered: 5"], done
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use replay_core::{Console, ConsoleConfig, PistonClient, Program};
//!
//! let config = ConsoleConfig::from_env()?;
//! let console = Console::with_config(PistonClient::from_config(&config), &config);
//!
//! console.start_session(Program::new("python", "3.10.0", source)).await;
//! if console.snapshot().await.waiting {
//!     console.submit_input("5").await;
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod revealer;
pub mod session;

#[cfg(feature = "piston")]
pub mod piston;

pub use backend::{ExecutionBackend, ExecutionRequest, ExecutionResult, Program, ResourceLimits};
pub use config::ConsoleConfig;
pub use error::{BackendError, BackendResult, ConfigError, ConfigResult};
pub use orchestrator::{Console, Dispatch};
pub use revealer::{MarkerSet, RevealDecision, Revealer};
pub use session::{ConsoleSnapshot, InputRejected, Phase, Session, Termination};

#[cfg(feature = "piston")]
pub use piston::PistonClient;
