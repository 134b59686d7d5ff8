use std::sync::LazyLock;
use std::time::Duration;

const FEED_USER: &str = "ASFinfo";
pub const IP_ECHO_URL: &str = "https://httpbin.org/ip";

pub const PLUGIN_NAME: &str = "FreeGames";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

// Upper bound for one scheduled collection cycle.
pub const COLLECT_GAMES_TIMEOUT: Duration = Duration::from_secs(3 * 60);
pub const TIMER_INITIAL_DELAY: Duration = Duration::from_secs(30);
pub const CYCLE_GATE_WAIT: Duration = Duration::from_millis(100);
pub const FEED_RATE_LIMIT_DELAY: Duration = Duration::from_millis(500);
pub const OPTIONS_SAVE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DAY_IN_SECONDS: i64 = 24 * 60 * 60;

pub fn feed_url() -> String {
    format!("https://www.reddit.com/user/{}.json?sort=new", FEED_USER)
}

pub static USER_AGENT: LazyLock<String> = LazyLock::new(|| {
    let agent = format!(
        "{}/{} {}/{}",
        PLUGIN_NAME.to_ascii_lowercase(),
        PLUGIN_VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    tracing::debug!(user_agent = %agent, "User-Agent initialized");
    agent
});
