//! Well-known endpoints and defaults for snapd and the Snap Store

/// snapd's API socket on a standard install
pub const SNAPD_SOCKET: &str = "/run/snapd.socket";

/// Host used in request URLs sent over the UNIX socket
pub const SOCKET_BASE_URL: &str = "http://localhost";

pub const DAEMON_API_VERSION: &str = "v2";

pub const STORE_BASE_URL: &str = "https://api.snapcraft.io";
pub const STORE_API_VERSION: &str = "v2";

/// Device series both store headers advertise
pub const STORE_SERIES: &str = "16";

/// Delay between change polls, tuned for a local daemon
pub const POLL_INTERVAL_MS: u64 = 10;
