use std::time::Duration;

/// What happens to a user record once it holds no room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MembershipPolicy {
    /// Leaving the last room removes the user; it must reconnect to join again.
    #[default]
    ReleaseOnLastLeave,
    /// The user record lives exactly as long as its transport connection.
    RetainWhileConnected,
}

impl MembershipPolicy {
    pub fn releases_homeless(self) -> bool {
        matches!(self, MembershipPolicy::ReleaseOnLastLeave)
    }
}

/// Relay access-control and timing settings.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Reject joins that carry no password, even for rooms not yet created.
    pub require_password: bool,
    /// How long a `Connect` waits for the addressed peer's answer.
    pub answer_timeout: Duration,
    pub membership: MembershipPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            require_password: false,
            answer_timeout: Duration::from_secs(30),
            membership: MembershipPolicy::default(),
        }
    }
}
