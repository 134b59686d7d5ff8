use async_trait::async_trait;

use crate::models::GameIdentifier;

/// The host's handle on one managed account.
#[async_trait]
pub trait BotRuntime: Send + Sync {
    fn name(&self) -> &str;

    fn is_connected_and_logged_on(&self) -> bool;

    /// Keys/licenses the host is still redeeming on its own for this account.
    fn pending_background_redemptions(&self) -> usize;

    /// Runs a host command for this account and returns its textual reply.
    /// `None` means the command produced no reply (transport failure included).
    async fn execute_command(&self, command: &str) -> Option<String>;
}

pub fn add_license_command(bot_name: &str, gid: &GameIdentifier) -> String {
    format!("ADDLICENSE {} {}", bot_name, gid)
}
