use crate::domain::{ResetPolicy, RoleList, Timer, TimerError, DEFAULT_DURATION_SECS};

/// Defaults applied to every newly created session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Role list a new session starts with
    pub default_roles: RoleList,

    /// Countdown length of a new session, in seconds
    pub default_duration: u32,

    /// Whether a reset also stops a running countdown
    pub reset_policy: ResetPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_roles: RoleList::default(),
            default_duration: DEFAULT_DURATION_SECS,
            reset_policy: ResetPolicy::default(),
        }
    }
}

impl SessionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_roles(mut self, roles: RoleList) -> Self {
        self.default_roles = roles;
        self
    }

    pub fn with_default_duration(mut self, seconds: u32) -> Result<Self, TimerError> {
        self.default_duration = Timer::validate_duration(seconds)?;
        Ok(self)
    }

    pub fn with_reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.reset_policy = policy;
        self
    }
}
