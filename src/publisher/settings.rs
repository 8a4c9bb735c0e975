use rumqttc::{MqttOptions, Transport};

use std::time::Duration;

use crate::publisher::backoff::Backoff;

/// Delay before the first reconnection attempt
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Reconnection delay ceiling
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Settings {
    /// Broker host name
    pub broker: String,

    /// Broker port
    pub port: u16,

    /// Client identifier, should be unique per device
    pub client_id: String,

    /// Topic we publish to, and subscribe to
    pub topic: String,

    pub username: Option<String>,

    pub password: Option<String>,

    /// TLS transport
    pub tls: bool,

    /// Keep alive interval
    pub keepalive: Duration,

    /// Number of consecutive failed connection attempts before giving up
    pub max_reconnect: u32,
}

impl Settings {
    pub fn to_mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.broker, self.port);

        options.set_keep_alive(self.keepalive);

        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }

        if self.tls {
            options.set_transport(Transport::tls_with_default_config());
        }

        options
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(INITIAL_BACKOFF, MAX_BACKOFF, self.max_reconnect)
    }
}

#[cfg(test)]
mod test {
    use super::Settings;
    use std::time::Duration;

    fn settings() -> Settings {
        Settings {
            broker: "mqtt.mediumone.com".to_string(),
            port: 1883,
            client_id: "tracker-01".to_string(),
            topic: "cold_storage_asset_tracking".to_string(),
            username: None,
            password: None,
            tls: false,
            keepalive: Duration::from_secs(60),
            max_reconnect: 8,
        }
    }

    #[test]
    fn test_mqtt_options() {
        let options = settings().to_mqtt_options();

        assert_eq!(options.client_id(), "tracker-01");
        assert_eq!(
            options.broker_address(),
            ("mqtt.mediumone.com".to_string(), 1883)
        );
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
        assert!(options.credentials().is_none());
    }

    #[test]
    fn test_credentials() {
        let mut settings = settings();
        settings.username = Some("user".to_string());

        let options = settings.to_mqtt_options();
        assert_eq!(
            options.credentials(),
            Some(("user".to_string(), "".to_string()))
        );

        settings.password = Some("secret".to_string());
        let options = settings.to_mqtt_options();
        assert_eq!(
            options.credentials(),
            Some(("user".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_backoff_budget() {
        let mut backoff = settings().backoff();
        let delays = std::iter::from_fn(|| backoff.next_delay()).collect::<Vec<_>>();
        assert_eq!(delays.len(), 8);
        assert_eq!(delays[0], Duration::from_secs(1));
        assert_eq!(delays[7], Duration::from_secs(60));
    }
}
