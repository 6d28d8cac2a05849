// Library exports for the snake arena
// The server binary, the replay tool and the simulator all build on these modules

pub mod arena;
pub mod config;
pub mod debug_logger;
pub mod error;
pub mod handler;
pub mod interop;
pub mod replay;
pub mod rng;
pub mod rules;
pub mod scheduler;
pub mod types;
