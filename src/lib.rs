pub mod config;
pub mod constants;
pub mod frame;
pub mod landmarks;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;
