//! Device connectivity polling.

use std::sync::Arc;

use tracing::{debug, info, warn};

use biomonitor_types::DeviceStatus;

use crate::app::SharedState;
use crate::events::{NavigationIntent, Navigator};
use crate::source::{decode, ClientError, ResourceClient, STATUS};

/// Polls the server for device connectivity.
///
/// There is no retry or backoff here; call [`check_status`] on a timer.
///
/// [`check_status`]: DeviceStatusMonitor::check_status
#[derive(Debug, Clone)]
pub struct DeviceStatusMonitor {
    client: Arc<dyn ResourceClient>,
    state: SharedState,
    navigator: Navigator,
}

impl DeviceStatusMonitor {
    pub fn new(client: Arc<dyn ResourceClient>, state: SharedState, navigator: Navigator) -> Self {
        Self {
            client,
            state,
            navigator,
        }
    }

    /// Query the device status and replace the stored status with it.
    ///
    /// With exactly one available device the console attaches to it. If the
    /// query fails the stored status becomes [`DeviceStatus::unreachable`].
    /// Whenever the resulting status is disconnected, a
    /// [`NavigationIntent::Root`] is emitted.
    pub async fn check_status(&self) -> DeviceStatus {
        let status = match self.fetch().await {
            Ok(mut status) => {
                if let Some(device) = status.sole_device().cloned() {
                    debug!(device = %device, "attaching to the only available device");
                    status.device_port = Some(device);
                }
                status
            }
            Err(e) => {
                warn!(error = %e, "status query failed, using fallback status");
                DeviceStatus::unreachable()
            }
        };

        let connected = status.is_connected;
        let changed = {
            let mut state = self.state.lock();
            let changed = state.device_status().is_connected != connected;
            state.set_device_status(status.clone());
            changed
        };

        if changed {
            info!(connected, message = %status.status_message, "device status changed");
        }
        if !connected {
            self.navigator.emit(NavigationIntent::Root);
        }
        status
    }

    async fn fetch(&self) -> Result<DeviceStatus, ClientError> {
        let value = self.client.get_static(STATUS).await?;
        decode(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ConsoleState;
    use crate::events::{drain, NavigationReceiver};
    use crate::source::MemoryClient;
    use biomonitor_types::{ChannelConfig, DeviceDescriptor};

    fn monitor(client: Arc<MemoryClient>) -> (DeviceStatusMonitor, SharedState, NavigationReceiver) {
        let state = ConsoleState::shared(ChannelConfig::default_catalog());
        let (navigator, receiver) = Navigator::channel();
        (
            DeviceStatusMonitor::new(client, state.clone(), navigator),
            state,
            receiver,
        )
    }

    fn status(connected: bool, devices: &[&str]) -> DeviceStatus {
        DeviceStatus {
            is_connected: connected,
            status_message: "test".to_string(),
            available_devices: devices.iter().map(|d| DeviceDescriptor::new(*d)).collect(),
            device_port: None,
        }
    }

    #[tokio::test]
    async fn attaches_single_device() {
        let client = Arc::new(MemoryClient::new());
        client.set_status(status(true, &["/dev/ttyUSB0"]));
        let (monitor, state, mut intents) = monitor(client);

        let result = monitor.check_status().await;

        assert_eq!(result.device_port, Some(DeviceDescriptor::new("/dev/ttyUSB0")));
        assert_eq!(state.lock().device_status(), &result);
        assert!(drain(&mut intents).is_empty());
    }

    #[tokio::test]
    async fn does_not_attach_with_zero_or_many_devices() {
        let client = Arc::new(MemoryClient::new());
        let (monitor, _state, _intents) = monitor(client.clone());

        client.set_status(status(true, &[]));
        assert!(monitor.check_status().await.device_port.is_none());

        client.set_status(status(true, &["/dev/ttyUSB0", "/dev/ttyUSB1"]));
        assert!(monitor.check_status().await.device_port.is_none());
    }

    #[tokio::test]
    async fn disconnected_status_navigates_to_root() {
        let client = Arc::new(MemoryClient::new());
        client.set_status(status(false, &[]));
        let (monitor, _state, mut intents) = monitor(client);

        monitor.check_status().await;

        assert_eq!(drain(&mut intents), vec![NavigationIntent::Root]);
    }

    #[tokio::test]
    async fn failure_replaces_status_with_fallback() {
        let client = Arc::new(MemoryClient::new());
        client.set_status(status(true, &["/dev/ttyUSB0"]));
        let (monitor, state, mut intents) = monitor(client.clone());
        monitor.check_status().await;
        assert!(state.lock().device_status().is_connected);

        client.fail("GET status");
        let result = monitor.check_status().await;

        assert_eq!(result, DeviceStatus::unreachable());
        assert_eq!(state.lock().device_status(), &DeviceStatus::unreachable());
        assert_eq!(drain(&mut intents), vec![NavigationIntent::Root]);
    }
}
