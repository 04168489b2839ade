//! Controller polling and publishing.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{GatewayConfig, RegisterMap, RegisterSpec};
use crate::decode::{self, WordOrder};
use crate::error::{CycleError, DecodeError};
use crate::forwarder::Forwarders;
use crate::reading::{Reading, SharedState};
use crate::transport::{RegisterConnection, RegisterTransport};

/// Polls the controller on a fixed cadence and publishes complete readings.
///
/// The poller owns the register transport exclusively. A cycle either reads
/// and decodes every field or publishes nothing; a failed cycle leaves the
/// previously published reading untouched. The next attempt happens one
/// interval later whether the cycle succeeded or failed, so an unreachable
/// controller is retried at poll cadence rather than in a tight loop.
pub struct Poller<T: RegisterTransport> {
    transport: T,
    registers: RegisterMap,
    word_order: WordOrder,
    interval: Duration,
    state: SharedState,
    forwarders: Forwarders,
}

impl<T: RegisterTransport> Poller<T> {
    pub fn new(
        transport: T,
        config: &GatewayConfig,
        state: SharedState,
        forwarders: Forwarders,
    ) -> Self {
        Self {
            transport,
            registers: config.registers.clone(),
            word_order: config.controller.word_order,
            interval: Duration::from_secs(config.controller.poll_interval_secs),
            state,
            forwarders,
        }
    }

    /// Run the poll loop until the shutdown signal flips.
    ///
    /// The stop flag is honored once per iteration; an in-flight cycle
    /// completes or fails on its own timeout first.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting poller"
        );

        let mut conn: Option<T::Conn> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }

            if conn.is_none() {
                match self.transport.connect().await {
                    Ok(fresh) => {
                        info!("Connected to controller");
                        conn = Some(fresh);
                    }
                    Err(e) => {
                        warn!(error = %e, "Controller unreachable; retrying next interval");
                        self.sleep_or_stop(&mut shutdown).await;
                        continue;
                    }
                }
            }

            if let Some(active) = conn.as_mut() {
                match self.cycle(active).await {
                    Ok(()) => debug!("Published reading"),
                    Err(e) => {
                        warn!(error = %e, "Poll cycle failed; keeping last reading");
                        if e.is_transport() {
                            if let Some(stale) = conn.take() {
                                stale.close().await;
                            }
                        }
                    }
                }
            }

            self.sleep_or_stop(&mut shutdown).await;
        }

        if let Some(conn) = conn.take() {
            conn.close().await;
        }
        info!("Poller stopped");
    }

    /// One full pass: read every field in fixed order, decode, publish,
    /// then mirror to the sinks.
    async fn cycle(&self, conn: &mut T::Conn) -> Result<(), CycleError> {
        let map = &self.registers;

        let temperature = read_field(conn, "temperature", &map.temperature).await?;
        let humidity = read_field(conn, "humidity", &map.humidity).await?;
        let pressure = read_field(conn, "pressure", &map.pressure).await?;
        let latitude = read_field(conn, "latitude", &map.latitude).await?;
        let longitude = read_field(conn, "longitude", &map.longitude).await?;
        let key_operation = read_field(conn, "key_operation", &map.key_operation).await?;

        let reading = Reading {
            temperature: decode_field("temperature", decode::word_u16(&temperature))?,
            humidity: decode_field("humidity", decode::word_u16(&humidity))?,
            pressure: decode_field("pressure", decode::word_u16(&pressure))?,
            latitude: decode_field("latitude", decode::word_f32(&latitude, self.word_order))?,
            longitude: decode_field("longitude", decode::word_f32(&longitude, self.word_order))?,
            key_operation: decode_field("key_operation", decode::word_string(&key_operation))?,
        };

        debug!(?reading, "Publishing reading");
        self.state.publish(reading.clone());
        self.forwarders.dispatch(&reading).await;

        Ok(())
    }

    async fn sleep_or_stop(&self, shutdown: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = tokio::time::sleep(self.interval) => {}
            _ = shutdown.changed() => {}
        }
    }
}

async fn read_field<C: RegisterConnection>(
    conn: &mut C,
    field: &'static str,
    spec: &RegisterSpec,
) -> Result<Vec<u16>, CycleError> {
    conn.read_registers(spec.address, spec.count)
        .await
        .map_err(|source| CycleError::Read { field, source })
}

fn decode_field<V>(field: &'static str, result: Result<V, DecodeError>) -> Result<V, CycleError> {
    result.map_err(|source| CycleError::Decode { field, source })
}
