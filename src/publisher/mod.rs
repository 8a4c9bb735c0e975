use log::{debug, error, info, warn};

use rumqttc::{AsyncClient, QoS};

use std::time::Duration;

use tokio::{
    sync::{mpsc::Receiver, watch},
    task::JoinHandle,
    time::timeout,
};

pub mod backoff;
pub mod report;
pub mod session;
pub mod settings;

use report::Report;
use session::{LinkState, Session};

use crate::error::Error;

/// Time granted to the session to flush pending requests on shutdown
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub enum Message {
    /// New sampling cycle to publish
    Report(Report),
    /// Graceful exit
    Shutdown,
}

/// What woke the publisher up
enum Event {
    Message(Option<Message>),
    LinkChanged,
    /// Session driver is gone, last [LinkState] persists
    LinkClosed,
}

pub struct Publisher {
    /// Publication topic
    topic: String,

    /// MQTT client handle
    client: AsyncClient,

    /// [LinkState] maintained by the session
    state: watch::Receiver<LinkState>,

    /// Session driver, awaited on shutdown
    driver: Option<JoinHandle<()>>,

    /// [Message]ing handle
    rx: Receiver<Message>,

    /// Number of reports published
    published: u64,

    /// Number of reports dropped while the broker was unreachable
    dropped: u64,
}

impl Publisher {
    /// Builds new [Publisher]
    pub fn new(session: Session, topic: &str, rx: Receiver<Message>) -> Self {
        Self {
            rx,
            topic: topic.to_string(),
            client: session.client,
            state: session.state,
            driver: Some(session.driver),
            published: 0,
            dropped: 0,
        }
    }

    /// Publishes incoming reports until [Message::Shutdown].
    /// Returns [Error::LinkFailed] as soon as the session gives up,
    /// whether reports are flowing or not.
    pub async fn run(&mut self) -> Result<(), Error> {
        let mut watching = true;

        loop {
            if *self.state.borrow() == LinkState::Failed {
                error!("mqtt link failed");
                return Err(Error::LinkFailed);
            }

            let event = tokio::select! {
                msg = self.rx.recv() => Event::Message(msg),
                changed = self.state.changed(), if watching => match changed {
                    Ok(_) => Event::LinkChanged,
                    Err(_) => Event::LinkClosed,
                },
            };

            match event {
                Event::Message(Some(Message::Report(report))) => {
                    self.publish(&report).await?;
                },
                Event::Message(Some(Message::Shutdown)) => {
                    self.shutdown().await;
                    return Ok(());
                },
                Event::Message(None) => return Ok(()),
                Event::LinkChanged => {
                    debug!("mqtt link: {:?}", *self.state.borrow_and_update());
                },
                Event::LinkClosed => {
                    watching = false;
                },
            }
        }
    }

    async fn shutdown(&mut self) {
        info!(
            "{} reports published, {} dropped",
            self.published, self.dropped
        );

        if let Err(e) = self.client.disconnect().await {
            error!("failed to disconnect: {}", e);
        }

        // let the session flush the DISCONNECT request
        if let Some(driver) = self.driver.take() {
            if timeout(FLUSH_TIMEOUT, driver).await.is_err() {
                warn!("session did not terminate in time");
            }
        }
    }

    async fn publish(&mut self, report: &Report) -> Result<(), Error> {
        let state = *self.state.borrow();

        match state {
            LinkState::Connected => {
                let payload = report.to_json()?;
                debug!("publishing {}", payload);

                self.client
                    .publish(&self.topic, QoS::AtLeastOnce, false, payload)
                    .await?;

                self.published += 1;
                info!("published to \"{}\"", self.topic);
            },
            LinkState::Disconnected => {
                self.dropped += 1;
                warn!("broker unreachable - report dropped");
            },
            LinkState::Failed => {
                return Err(Error::LinkFailed);
            },
        }
        Ok(())
    }
}
