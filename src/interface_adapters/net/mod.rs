// Network adapter modules split by external client sockets vs internal HTTP routes.

pub mod client;
pub mod internal;

pub use client::{spawn_delta_serializer, ws_handler};
pub use internal::{
    create_session_handler, health_handler, join_session_handler, list_sessions_handler,
    start_session_handler,
};
