#![deny(unsafe_code)]
#![deny(warnings)]
//! Outer control loop
//!
//! [`SensorNode`] owns every component. Boards build the parts once at
//! startup, hand them over, call [`SensorNode::start`] and then
//! [`SensorNode::run`] (or [`SensorNode::step`] from their own loop).

use embedded_hal::delay::DelayNs;
use sensorunit_hal::{Clock, SensorReader, WifiRadio};

use crate::network::{ConnectionManager, RestApi};
use crate::readings::{ReadingBuffer, ReadingProcessor, ReadingsDispatcher, MAX_BUFFER_SIZE};
use crate::scheduler::{Schedule, Scheduler, SchedulerResult};
use crate::time::TimeSyncManager;

pub struct SensorNode<R, W, K, D, S, const N: usize = MAX_BUFFER_SIZE> {
    rest: R,
    connection: ConnectionManager<W, K, D>,
    time: TimeSyncManager<K>,
    scheduler: Scheduler<K>,
    processor: ReadingProcessor<S>,
    dispatcher: ReadingsDispatcher,
    buffer: ReadingBuffer<N>,
}

impl<R, W, K, D, S, const N: usize> SensorNode<R, W, K, D, S, N>
where
    R: RestApi,
    W: WifiRadio,
    K: Clock,
    D: DelayNs,
    S: SensorReader,
{
    pub fn new(
        rest: R,
        connection: ConnectionManager<W, K, D>,
        time: TimeSyncManager<K>,
        scheduler: Scheduler<K>,
        processor: ReadingProcessor<S>,
        dispatcher: ReadingsDispatcher,
    ) -> Self {
        Self {
            rest,
            connection,
            time,
            scheduler,
            processor,
            dispatcher,
            buffer: ReadingBuffer::new(),
        }
    }

    /// Initialize the radio, then try to pair and sync right away
    pub fn start(&mut self) {
        info!("Starting sensor node");
        self.connection.init();
        if self.connection.connect(&mut self.rest) {
            self.time.sync_time(&mut self.rest);
        }
        info!("Startup done");
    }

    /// One scheduler tick, running whatever it triggered
    pub fn step(&mut self) -> SchedulerResult {
        let triggers = self
            .scheduler
            .tick(self.connection.is_paired_with_control_unit(), &self.time);

        if triggers.connect_trigger {
            self.connection.connect(&mut self.rest);
        }
        if triggers.reading_trigger {
            self.processor.process(&self.time, &mut self.buffer);
        }
        if triggers.dispatch_trigger {
            let report = self.dispatcher.dispatch(&mut self.rest, &mut self.buffer);
            if !report.stay_connected {
                self.connection.disconnect();
            }
        }
        if triggers.resync_trigger {
            self.time.sync_time(&mut self.rest);
        }

        triggers
    }

    /// Step forever, pausing `tick_ms` between ticks
    pub fn run<P: DelayNs>(&mut self, pause: &mut P, tick_ms: u32) -> ! {
        loop {
            self.step();
            pause.delay_ms(tick_ms);
        }
    }

    pub fn connection(&self) -> &ConnectionManager<W, K, D> {
        &self.connection
    }

    pub fn time(&self) -> &TimeSyncManager<K> {
        &self.time
    }

    pub fn buffer(&self) -> &ReadingBuffer<N> {
        &self.buffer
    }

    pub fn rest(&self) -> &R {
        &self.rest
    }

    pub fn rest_mut(&mut self) -> &mut R {
        &mut self.rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, RestClientConfig, SchedulerConfig, TimeSyncConfig};
    use crate::network::RestClient;
    use crate::time::TimeSource;
    use sensorunit_hal::mock::{MockClock, MockConnector, MockRadio, MockReply, MockSensorReader};

    type TestNode<'a> = SensorNode<
        RestClient<MockConnector, &'a MockClock>,
        MockRadio,
        &'a MockClock,
        &'a MockClock,
        MockSensorReader,
    >;

    const START_MS: u32 = 10_000;
    const GATEWAY_TIME: u32 = 1_700_000_000;

    fn node(clock: &MockClock, radio: MockRadio, connector: MockConnector) -> TestNode<'_> {
        let connection_config = ConnectionConfig::default();
        let dispatcher = ReadingsDispatcher::new(connection_config.sensor_unit_id);
        SensorNode::new(
            RestClient::new(connector, clock, RestClientConfig::default()),
            ConnectionManager::new(radio, clock, clock, connection_config),
            TimeSyncManager::new(clock, TimeSyncConfig::default()),
            Scheduler::new(SchedulerConfig::default(), clock).unwrap(),
            ReadingProcessor::new(MockSensorReader::default()),
            dispatcher,
        )
    }

    fn run_seconds(node: &mut TestNode<'_>, clock: &MockClock, seconds: core::ops::RangeInclusive<u32>) {
        for s in seconds {
            clock.set(START_MS + s * 1000);
            node.step();
        }
    }

    #[test]
    fn test_pairs_syncs_samples_and_dispatches() {
        let clock = MockClock::new(START_MS);
        let mut radio = MockRadio::new();
        radio.add_network("CU-gateway", -45, true);
        radio.add_network("Neighbour", -30, true);
        let mut connector = MockConnector::new();
        connector.push_reply(MockReply::http(
            "HTTP/1.1 200 OK",
            "{\"status\":\"connected\",\"sensor_id\":4}",
        ));
        connector.push_reply(MockReply::http(
            "HTTP/1.1 200 OK",
            "{\"timestamp\":1700000000}",
        ));
        connector.push_reply(MockReply::http("HTTP/1.1 200 OK", "{\"status\":\"connected\"}"));
        let mut node = node(&clock, radio, connector);

        node.start();

        assert_eq!(node.connection().state().assigned_id, 4);
        assert!(node.time().is_time_synced());
        assert_eq!(node.time().unix_time_now(), GATEWAY_TIME);

        // Readings at +0, +5 and +10 s, dispatch at +11 s (Unix % 15 == 1)
        run_seconds(&mut node, &clock, 0..=11);

        assert!(node.buffer().is_empty());
        let connector = node.rest().connector();
        assert_eq!(connector.connects, 3);
        assert_eq!(connector.closes, 3);
        let request = connector.last_request();
        assert!(request.starts_with("POST /readings HTTP/1.1\r\n"));
        assert_eq!(request.matches("\"timestamp\"").count(), 3);
        assert!(request.contains("\"timestamp\":1700000010"));
        assert!(node.connection().is_paired_with_control_unit());
    }

    #[test]
    fn test_disconnect_instruction_unpairs() {
        let clock = MockClock::new(START_MS);
        let mut radio = MockRadio::new();
        radio.add_network("CU-gateway", -45, true);
        let mut connector = MockConnector::new();
        connector.push_reply(MockReply::http(
            "HTTP/1.1 200 OK",
            "{\"status\":\"connected\",\"sensor_id\":1}",
        ));
        connector.push_reply(MockReply::http(
            "HTTP/1.1 200 OK",
            "{\"timestamp\":1700000000}",
        ));
        connector.push_reply(MockReply::http(
            "HTTP/1.1 200 OK",
            "{\"status\":\"disconnected\"}",
        ));
        let mut node = node(&clock, radio, connector);
        node.start();

        run_seconds(&mut node, &clock, 0..=11);

        assert!(node.buffer().is_empty());
        assert!(!node.connection().is_paired_with_control_unit());
    }

    #[test]
    fn test_failed_upload_keeps_readings_for_next_round() {
        let clock = MockClock::new(START_MS);
        let mut radio = MockRadio::new();
        radio.add_network("CU-gateway", -45, true);
        let mut connector = MockConnector::new();
        connector.push_reply(MockReply::http(
            "HTTP/1.1 200 OK",
            "{\"status\":\"connected\",\"sensor_id\":1}",
        ));
        connector.push_reply(MockReply::http(
            "HTTP/1.1 200 OK",
            "{\"timestamp\":1700000000}",
        ));
        connector.push_reply(MockReply::http("HTTP/1.1 503 Service Unavailable", ""));
        let mut node = node(&clock, radio, connector);
        node.start();

        run_seconds(&mut node, &clock, 0..=11);
        assert_eq!(node.buffer().len(), 3);

        node.rest_mut()
            .connector_mut()
            .push_reply(MockReply::http("HTTP/1.1 200 OK", "{\"status\":\"connected\"}"));
        run_seconds(&mut node, &clock, 12..=26);

        assert!(node.buffer().is_empty());
        let request = node.rest().connector().last_request();
        assert_eq!(request.matches("\"timestamp\"").count(), 6);
    }

    #[test]
    fn test_unpaired_node_retries_connect() {
        let clock = MockClock::new(START_MS);
        let mut radio = MockRadio::new();
        radio.add_network("CU-gateway", -45, false);
        let mut node = node(&clock, radio, MockConnector::new());

        node.start();
        assert!(!node.connection().is_paired_with_control_unit());
        let attempts = node.connection().radio().attempts.len();

        clock.advance(SchedulerConfig::default().connect_interval_ms + 1);
        let triggers = node.step();

        assert!(triggers.connect_trigger);
        assert_eq!(node.connection().radio().attempts.len(), attempts + 1);
        assert_eq!(node.rest().connector().connects, 0);
    }
}
