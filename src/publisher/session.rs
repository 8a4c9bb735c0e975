use log::{debug, error, info, warn};

use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, Outgoing, Packet, QoS};

use tokio::{sync::watch, task::JoinHandle, time::sleep};

use crate::{
    error::Error,
    publisher::{backoff::Backoff, settings::Settings},
};

/// Capacity of the client request queue
const REQUEST_CAPACITY: usize = 16;

/// MQTT link state, as seen by the publisher
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum LinkState {
    Connected,
    /// Connection lost, reconnection in progress
    Disconnected,
    /// Reconnection budget exhausted
    Failed,
}

/// Established MQTT session
pub struct Session {
    pub client: AsyncClient,
    pub state: watch::Receiver<LinkState>,
    /// Event loop driver, terminates on graceful disconnection
    pub driver: JoinHandle<()>,
}

impl Session {
    /// Connects to the broker, retrying with bounded exponential backoff,
    /// subscribes to the topic and deploys the event loop.
    /// `on_message` is invoked with (topic, message) for every inbound publication.
    pub async fn connect<F>(settings: &Settings, on_message: F) -> Result<Self, Error>
    where
        F: Fn(&str, &str) + Send + 'static,
    {
        let (client, mut eventloop) =
            AsyncClient::new(settings.to_mqtt_options(), REQUEST_CAPACITY);

        let mut backoff = settings.backoff();

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    debug!("CONNACK: {:?}", ack.code);
                    break;
                },
                Ok(_) => {},
                Err(e) => match backoff.next_delay() {
                    Some(delay) => {
                        warn!(
                            "failed to connect to {}: {} - retrying in {:?}",
                            settings.broker, e, delay
                        );
                        sleep(delay).await;
                    },
                    None => {
                        error!("failed to connect to {}: {}", settings.broker, e);
                        return Err(Error::ReconnectExhausted(backoff.attempts()));
                    },
                },
            }
        }

        backoff.reset();
        info!("connected to {}:{}", settings.broker, settings.port);

        client.subscribe(&settings.topic, QoS::AtMostOnce).await?;
        info!("subscribed to \"{}\"", settings.topic);

        let (state_tx, state) = watch::channel(LinkState::Connected);

        let driver = tokio::spawn(drive(
            eventloop,
            client.clone(),
            settings.topic.clone(),
            backoff,
            state_tx,
            on_message,
        ));

        Ok(Self {
            client,
            state,
            driver,
        })
    }
}

/// Polls the event loop until graceful disconnection or exhaustion of the reconnection budget.
/// rumqttc reconnects on the next poll that follows an error.
async fn drive<F>(
    mut eventloop: EventLoop,
    client: AsyncClient,
    topic: String,
    mut backoff: Backoff,
    state: watch::Sender<LinkState>,
    on_message: F,
) where
    F: Fn(&str, &str),
{
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                backoff.reset();

                if *state.borrow() != LinkState::Connected {
                    info!("reconnected");

                    // clean session: subscription is lost
                    if let Err(e) = client.try_subscribe(&topic, QoS::AtMostOnce) {
                        error!("failed to subscribe to \"{}\": {}", topic, e);
                    }

                    state.send_replace(LinkState::Connected);
                }
            },
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = String::from_utf8_lossy(&publish.payload);
                on_message(&publish.topic, &message);
            },
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("disconnected");
                state.send_replace(LinkState::Disconnected);
                return;
            },
            Ok(_) => {},
            Err(ConnectionError::RequestsDone) => {
                debug!("all client handles dropped");
                return;
            },
            Err(e) => {
                state.send_replace(LinkState::Disconnected);

                match backoff.next_delay() {
                    Some(delay) => {
                        warn!("connection error: {} - reconnecting in {:?}", e, delay);
                        sleep(delay).await;
                    },
                    None => {
                        error!(
                            "connection error: {} - giving up after {} attempts",
                            e,
                            backoff.attempts()
                        );
                        state.send_replace(LinkState::Failed);
                        return;
                    },
                }
            },
        }
    }
}
