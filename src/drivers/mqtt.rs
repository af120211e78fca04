// Tilt Guard: MQTT Publisher
//
// Fire-and-forget publishing to the broker. The client also subscribes to
// its own topic and logs whatever arrives there, which makes round trips
// visible on the serial console.

use std::thread;
use std::time::Duration;

use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};

use tiltguard::config::{MQTT_BROKER_URL, MQTT_CLIENT_ID};
use tiltguard::events::Qos;
use tiltguard::peripherals::EventPublisher;
use tiltguard::{Error, PublishEvent, Result};

const SUBSCRIBE_ATTEMPTS: u32 = 10;
const SUBSCRIBE_RETRY: Duration = Duration::from_millis(500);

pub struct MqttPublisher {
    client: EspMqttClient<'static>,
}

impl MqttPublisher {
    pub fn connect(topic: &str) -> anyhow::Result<Self> {
        let conf = MqttClientConfiguration {
            client_id: Some(MQTT_CLIENT_ID),
            ..Default::default()
        };

        let mut client = EspMqttClient::new_cb(MQTT_BROKER_URL, &conf, |event| match event.payload() {
            EventPayload::Connected(_) => log::info!("MQTT connected"),
            EventPayload::Disconnected => log::warn!("MQTT disconnected"),
            EventPayload::Received { topic, data, .. } => log::info!(
                "Message arrived on {}: {}",
                topic.unwrap_or("?"),
                String::from_utf8_lossy(data)
            ),
            EventPayload::Error(e) => log::warn!("MQTT error: {:?}", e),
            _ => {}
        })?;
        log::info!("MQTT client created for {}", MQTT_BROKER_URL);

        // The subscription is only accepted once the session is up.
        let mut subscribed = false;
        for _ in 0..SUBSCRIBE_ATTEMPTS {
            if client.subscribe(topic, QoS::AtMostOnce).is_ok() {
                subscribed = true;
                break;
            }
            thread::sleep(SUBSCRIBE_RETRY);
        }
        if subscribed {
            log::info!("Subscribed to {}", topic);
        } else {
            log::warn!("Could not subscribe to {}, inbound messages will not be logged", topic);
        }

        Ok(Self { client })
    }
}

fn qos(q: Qos) -> QoS {
    match q {
        Qos::AtMostOnce => QoS::AtMostOnce,
    }
}

impl EventPublisher for MqttPublisher {
    fn publish(&mut self, event: PublishEvent) -> Result<()> {
        self.client
            .publish(&event.topic, qos(event.qos), false, event.payload.as_bytes())
            .map(|_| ())
            .map_err(|e| Error::Publish(e.code()))
    }
}
