//! Detour Machine (detour-machine)
//!
//! Hierarchical state machine behind detour authoring: a dispatcher picks a
//! route pattern, draws a detour around a disrupted segment, and shares it.
//!
//! Layered design:
//! 1. **Reducer** ([`machine::transition`]): pure `(state, context, event)`
//!    to `(state, context, effects)`
//! 2. **Machine** ([`DetourMachine`]): owns one state + context, applies
//!    events, snapshots and restores
//! 3. **Session** ([`DetourSession`]): carries out effects on Tokio, the
//!    lookup debounce and the route pattern lookup itself
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use detour_machine::prelude::*;
//!
//! let lookup = Arc::new(InMemoryRoutePatternLookup::new());
//! let mut session = DetourSession::start(DetourInput::Blank, lookup, DetourConfig::default());
//!
//! session.send(DetourEvent::SelectRoute { route: Route::new("66", "Route 66") });
//! session.settle().await;
//! session.send(DetourEvent::RoutePatternDone);
//!
//! let snapshot = session.snapshot();
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod lookup;
pub mod machine;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod types;

// Re-exports
pub use config::DetourConfig;
pub use error::{DetourError, LookupError, SnapshotError};
pub use event::{DetourEvent, FetchTicket, MachineEvent};
pub use lookup::{InMemoryRoutePatternLookup, RoutePatternLookup};
pub use machine::{DetourMachine, Effect, Outcome};
pub use session::DetourSession;
pub use snapshot::DetourSnapshot;
pub use state::{DetourState, EditingState, PickRouteIdState, PickRoutePatternState};
pub use types::*;

/// Common imports for driving a detour
pub mod prelude {
    pub use crate::{
        DetourConfig, DetourContext, DetourEvent, DetourInput, DetourMachine, DetourSession,
        DetourSnapshot, DetourState, InMemoryRoutePatternLookup, Route, RoutePattern,
        RoutePatternLookup, ShapePoint,
    };
    pub use std::sync::Arc;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
