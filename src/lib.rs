//! # tokensim — Deterministic Timed-Token Simulation
//!
//! A discrete-event simulation kernel over timed token nets, plus a
//! single-queue service model built on it. No async, no threads, no
//! wall-clock time: places hold timestamped tokens, guarded events move
//! them, and a virtual clock jumps to the earliest enabled binding.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │       QueueModel          │ ← arrivals, service, reneging, breaks
//! │  ┌────────────────────┐  │
//! │  │        Net          │  │ ← select → advance → fire → report
//! │  │  ┌──────────────┐  │  │
//! │  │  │  Scheduler   │  │  │ ← earliest binding, then declaration order
//! │  │  └──────────────┘  │  │
//! │  │  ┌──────────────┐  │  │
//! │  │  │ Events/Guards│  │  │ ← pure functions of bound values
//! │  │  └──────────────┘  │  │
//! │  │  ┌──────────────┐  │  │
//! │  │  │Places/Tokens │  │  │ ← timed multisets, FIFO on ties
//! │  │  └──────────────┘  │  │
//! │  │  ┌──────────────┐  │  │
//! │  │  │ VTime / Rng  │  │  │ ← virtual clock, seeded ChaCha8
//! │  │  └──────────────┘  │  │
//! │  └────────────────────┘  │
//! └──────────────────────────┘
//! ```

pub mod binding;
pub mod error;
pub mod event;
pub mod eventlog;
pub mod model;
pub mod place;
pub mod report;
pub mod rng;
pub mod scheduler;
pub mod simulation;
pub mod time;
pub mod token;
pub mod visual;

// Re-exports for convenience.
pub use binding::Binding;
pub use error::{SimError, SimResult};
pub use event::{Event, EventBuilder, EventId, FireContext, Produce, Rearm};
pub use eventlog::{logs_match, FiringLog};
pub use model::{ModelConfig, QueueModel, RenegePolicy, Summary};
pub use place::{Place, PlaceId};
pub use report::{Deposit, Firing, NullReporter, PrintReporter, Reporter, Tee, TracingReporter};
pub use rng::{Dist, SimRng};
pub use scheduler::Scheduler;
pub use simulation::{Net, RunSummary, StopReason};
pub use time::VirtualTime;
pub use token::{Token, TokenId, TokenValue};
pub use visual::{DotVisualizer, Topology, Visualizer};
