use std::time::Duration;

use mongodb::options::{Acknowledgment, ClientOptions, WriteConcern};
use plant_core::config::DbProfile;

/// Driver tunables applied once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub max_pool_size: u32,
    pub server_selection_timeout: Duration,
    /// Upper bound on a single store operation.
    pub socket_timeout: Duration,
    pub connect_timeout: Duration,
    /// When false, operations fail immediately unless the handle is connected.
    pub buffer_commands: bool,
    pub retry_writes: Option<bool>,
    pub majority_write_concern: bool,
}

impl ConnectionOptions {
    pub fn for_profile(profile: DbProfile) -> Self {
        let base = Self {
            max_pool_size: 1,
            server_selection_timeout: Duration::from_millis(5_000),
            socket_timeout: Duration::from_millis(45_000),
            connect_timeout: Duration::from_millis(10_000),
            buffer_commands: false,
            retry_writes: None,
            majority_write_concern: false,
        };

        match profile {
            DbProfile::Minimal => base,
            DbProfile::Standard => Self {
                max_pool_size: 10,
                retry_writes: Some(true),
                majority_write_concern: true,
                ..base
            },
        }
    }

    /// Copy these tunables onto parsed driver options.
    pub fn apply(&self, client_options: &mut ClientOptions) {
        client_options.max_pool_size = Some(self.max_pool_size);
        client_options.server_selection_timeout = Some(self.server_selection_timeout);
        client_options.connect_timeout = Some(self.connect_timeout);
        if let Some(retry) = self.retry_writes {
            client_options.retry_writes = Some(retry);
        }
        if self.majority_write_concern {
            client_options.write_concern =
                Some(WriteConcern::builder().w(Acknowledgment::Majority).build());
        }
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self::for_profile(DbProfile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_profile_matches_single_connection_settings() {
        let opts = ConnectionOptions::for_profile(DbProfile::Minimal);
        assert_eq!(opts.max_pool_size, 1);
        assert_eq!(opts.server_selection_timeout, Duration::from_secs(5));
        assert_eq!(opts.socket_timeout, Duration::from_secs(45));
        assert_eq!(opts.connect_timeout, Duration::from_secs(10));
        assert!(!opts.buffer_commands);
        assert_eq!(opts.retry_writes, None);
        assert!(!opts.majority_write_concern);
    }

    #[test]
    fn standard_profile_enables_write_flags() {
        let opts = ConnectionOptions::for_profile(DbProfile::Standard);
        assert_eq!(opts.max_pool_size, 10);
        assert_eq!(opts.retry_writes, Some(true));
        assert!(opts.majority_write_concern);
        assert!(!opts.buffer_commands);
    }

    #[test]
    fn apply_sets_driver_fields() {
        let mut client_options = ClientOptions::default();
        ConnectionOptions::for_profile(DbProfile::Standard).apply(&mut client_options);

        assert_eq!(client_options.max_pool_size, Some(10));
        assert_eq!(
            client_options.server_selection_timeout,
            Some(Duration::from_secs(5))
        );
        assert_eq!(client_options.connect_timeout, Some(Duration::from_secs(10)));
        assert_eq!(client_options.retry_writes, Some(true));
        assert_eq!(
            client_options.write_concern.and_then(|wc| wc.w),
            Some(Acknowledgment::Majority)
        );
    }
}
