// Tilt Guard: Publish Task
//
// Sole owner of the telemetry client. Everything that wants to publish (the
// detection task, the button) drops a request on the queue and returns
// immediately; this task performs the slow network call. Delivery is
// at-most-once: a failed publish is logged and forgotten.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::events::{Mode, PublishEvent, PublishRequest};
use crate::mode::ModeController;
use crate::peripherals::EventPublisher;
use crate::threshold::ThresholdStore;

/// Create the request queue. The queue end is cheap to clone.
pub fn queue() -> (PublishQueue, Receiver<PublishRequest>) {
    let (tx, rx) = mpsc::channel();
    (PublishQueue { tx }, rx)
}

#[derive(Debug, Clone)]
pub struct PublishQueue {
    tx: Sender<PublishRequest>,
}

impl PublishQueue {
    /// Never blocks.
    pub fn request(&self, request: PublishRequest) -> Result<()> {
        self.tx.send(request).map_err(|_| Error::QueueClosed)
    }

    pub fn request_threshold_report(&self) -> Result<()> {
        self.request(PublishRequest::ThresholdReport)
    }
}

impl EventPublisher for PublishQueue {
    fn publish(&mut self, event: PublishEvent) -> Result<()> {
        self.request(PublishRequest::Event(event))
    }
}

pub struct PublishTask<P> {
    backend: P,
    topic: String,
    threshold: Arc<ThresholdStore>,
    mode: Arc<ModeController>,
}

impl<P: EventPublisher> PublishTask<P> {
    pub fn new(
        backend: P,
        topic: impl Into<String>,
        threshold: Arc<ThresholdStore>,
        mode: Arc<ModeController>,
    ) -> Self {
        Self {
            backend,
            topic: topic.into(),
            threshold,
            mode,
        }
    }

    pub fn backend(&self) -> &P {
        &self.backend
    }

    pub fn handle(&mut self, request: PublishRequest) {
        match request {
            PublishRequest::Event(event) => self.send(event),
            PublishRequest::ThresholdReport => {
                let event = PublishEvent::threshold_report(&self.topic, self.threshold.current());
                self.send(event);
                self.mode.set(Mode::Idle);
            }
        }
    }

    fn send(&mut self, event: PublishEvent) {
        let payload = event.payload.clone();
        match self.backend.publish(event) {
            Ok(()) => log::info!("Published \"{}\"", payload),
            Err(e) => log::warn!("Publish of \"{}\" dropped: {}", payload, e),
        }
    }

    /// Drain the queue until every sender is gone.
    pub fn run(mut self, requests: Receiver<PublishRequest>) {
        log::info!("Publish task started");
        for request in requests {
            self.handle(request);
        }
        log::warn!("Publish queue closed, exiting publish task");
    }
}
