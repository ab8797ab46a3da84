//! Registry for the notification channels available to a run.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::Method;
use crate::ports::{DispatchError, NotificationChannel};

/// Registry that resolves channels by recipient method.
pub struct ChannelRegistry {
    channels: HashMap<Method, Arc<dyn NotificationChannel>>,
}

impl ChannelRegistry {
    /// Build a registry from the provided channel list.
    ///
    /// A later channel for the same method replaces an earlier one.
    #[must_use]
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        let channels_map = channels
            .into_iter()
            .map(|channel| (channel.method(), channel))
            .collect();
        Self {
            channels: channels_map,
        }
    }

    /// Methods that have a registered channel.
    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.channels.keys().copied()
    }

    /// Look up the channel for the given method.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ChannelUnavailable`] when no channel is registered.
    pub fn channel(&self, method: Method) -> Result<&Arc<dyn NotificationChannel>, DispatchError> {
        self.channels
            .get(&method)
            .ok_or(DispatchError::ChannelUnavailable(method))
    }
}
