/// Greeting served by `GET /`
pub const GREETING: &str = "Welcome to the focus tracking WebSocket service!";

/// Prefix of a data URL carrying the frame (`data:image/jpeg;base64,...`)
pub const DATA_URL_PREFIX: &str = "data:";

/// Default cap on concurrently open focus sessions
pub const DEFAULT_MAX_WS_CONNECTIONS: usize = 256;

/// Default largest accepted WebSocket message, 8 MiB
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Default per-request timeout for the remote landmark detector
pub const DEFAULT_LANDMARK_TIMEOUT_SECS: u64 = 5;
