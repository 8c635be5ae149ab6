//! Mock HTTP servers for tests running in sandboxes without loopback sockets.
//!
//! When 127.0.0.1 cannot be bound, tests that need a server return early.
//! Setting `IMGHARVEST_REQUIRE_SOCKET_TESTS=1` turns that early return into
//! a test failure, for CI where the servers must run.

use std::net::TcpListener;

use wiremock::MockServer;

const STRICT_ENV: &str = "IMGHARVEST_REQUIRE_SOCKET_TESTS";

fn strict() -> bool {
    std::env::var(STRICT_ENV).is_ok_and(|value| {
        ["1", "true", "yes"]
            .iter()
            .any(|on| value.eq_ignore_ascii_case(on))
    })
}

fn loopback_bindable() -> bool {
    TcpListener::bind(("127.0.0.1", 0)).is_ok()
}

/// Starts a mock server, or returns `None` when loopback is unavailable.
///
/// # Panics
///
/// Panics instead of returning `None` when strict mode is on.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if loopback_bindable() {
        return Some(MockServer::start().await);
    }

    // libtest names each test thread after its test.
    let test = std::thread::current()
        .name()
        .unwrap_or("<unnamed>")
        .to_string();
    assert!(
        !strict(),
        "{test}: no loopback socket for the mock server and {STRICT_ENV} is set"
    );
    eprintln!("{test}: skipped, loopback socket unavailable (set {STRICT_ENV}=1 to fail instead)");
    None
}
