/*!
# GL ICD Dispatch

Rendering-context registry and driver dispatch for OpenGL installable
client drivers (ICDs).

Applications ask for a context bound to a drawing surface; the context is
served by one of several interchangeable driver modules discovered at
runtime. This crate enumerates and loads those modules, keeps the registry
of live contexts, enforces "one current context per thread", and routes
every client call to the driver that owns the context.

## Architecture

- **Dispatcher**: the operation set (create, delete, make-current, copy,
  share, swap, proc lookup)
- **Icd**: process-wide dispatcher and logger for exported entry points
- **IcdDriver**: operation table every driver module exposes
- **DriverLoader**: loads driver modules by name and caches them
- **ContextRegistry**: live contexts keyed by versioned handles

Drivers are either shared libraries exporting the `Drv*` entry points or
in-process implementations registered with a `PluginModuleSource`.
*/

// Internal modules
mod error;
mod icd;
mod config;
mod handles;
mod dispatcher;
pub mod log;
pub mod driver;
pub mod context;

// Main glicd namespace module
pub mod glicd {
    // Error types
    pub use crate::error::{Error, Result};

    // Process-wide facade
    pub use crate::icd::Icd;

    // Configuration
    pub use crate::config::{IcdConfig, SEARCH_PATH_ENV_VAR};

    // Dispatcher
    pub use crate::dispatcher::{Dispatcher, ProcNamespace};

    // Context handles and snapshots
    pub use crate::context::{ContextHandle, ContextInfo, ContextState, PIXEL_FORMAT_UNSET};

    // Opaque handle types
    pub mod handles {
        pub use crate::handles::{AttribMask, NativeContext, ProcAddress, Surface};
    }

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{
            DefaultLogger, LogEntry, LogSeverity, Logger, DEFAULT_MIN_SEVERITY, LOG_ENV_VAR,
        };
    }

    // Driver sub-module
    pub mod driver {
        pub use crate::driver::*;
    }
}
