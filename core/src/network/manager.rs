#![deny(unsafe_code)]
#![deny(warnings)]
//! Gateway discovery and pairing
//!
//! Gateways run their own access points with a common SSID prefix. Pairing is
//! a two step affair: associate with the strongest gateway AP, then `POST
//! /connect` with this unit's UUID. The gateway answers with the identity it
//! assigned, or declines.

use embedded_hal::delay::DelayNs;
use heapless::{String, Vec};
use sensorunit_hal::{Clock, LinkStatus, WifiRadio, SSID_MAX_LEN};

use super::client::RestApi;
use super::json::{compose_connect_request, parse_connect_response, ConnectResponse};
use super::CONNECT_PATH;
use crate::config::ConnectionConfig;

/// Gateways remembered from one scan
pub const MAX_CANDIDATES: usize = 8;

/// Pairing state, reset by [`ConnectionManager::disconnect`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionState {
    pub is_paired: bool,
    /// Identity assigned by the gateway; 0 until paired
    pub assigned_id: u8,
}

/// Gateway access point found by the last scan
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CandidateGateway {
    pub ssid: String<SSID_MAX_LEN>,
    pub rssi: i32,
}

/// Brings the unit from "no network" to "paired with a gateway"
pub struct ConnectionManager<W, K, D> {
    radio: W,
    clock: K,
    delay: D,
    config: ConnectionConfig,
    state: ConnectionState,
    radio_present: bool,
    firmware_outdated: bool,
    candidates: Vec<CandidateGateway, MAX_CANDIDATES>,
    last_scan_ms: Option<u32>,
}

impl<W, K, D> ConnectionManager<W, K, D>
where
    W: WifiRadio,
    K: Clock,
    D: DelayNs,
{
    /// Call [`ConnectionManager::init`] before the first connect
    pub fn new(radio: W, clock: K, delay: D, config: ConnectionConfig) -> Self {
        Self {
            radio,
            clock,
            delay,
            config,
            state: ConnectionState::default(),
            radio_present: false,
            firmware_outdated: false,
            candidates: Vec::new(),
            last_scan_ms: None,
        }
    }

    /// Reset pairing, check the radio and drop any association
    ///
    /// A missing radio is logged and leaves the manager inert; there is no
    /// way to recover from that without a reboot.
    pub fn init(&mut self) {
        info!("Initializing connection manager");
        self.state = ConnectionState::default();
        self.candidates.clear();
        self.last_scan_ms = None;

        if self.radio.link_status() == LinkStatus::NoModule {
            error!("Wi-Fi module missing");
            self.radio_present = false;
            return;
        }
        self.radio_present = true;

        self.firmware_outdated = self.check_firmware_version();
        self.radio.disconnect();
        info!("Connection manager initialized");
    }

    /// Try every candidate gateway, strongest first, until one pairs
    ///
    /// Returns whether the unit is paired afterwards. Exhausting the
    /// candidates is not an error: the scheduler retries later.
    pub fn connect<R: RestApi>(&mut self, rest: &mut R) -> bool {
        if self.state.is_paired {
            return true;
        }
        if !self.radio_present {
            error!("Cannot connect without a Wi-Fi module");
            return false;
        }
        info!("Looking for a gateway");

        let now = self.clock.now_ms();
        let scan_is_stale = self
            .last_scan_ms
            .map_or(true, |last| now.wrapping_sub(last) >= self.config.scan_interval_ms);
        if self.candidates.is_empty() || scan_is_stale {
            self.scan();
        }
        if self.candidates.is_empty() {
            warn!("No candidate gateways available");
            return false;
        }

        let payload = match compose_connect_request(self.config.sensor_unit_id) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Cannot build pairing request: {}", e);
                return false;
            }
        };

        for index in 0..self.candidates.len() {
            let ssid = self.candidates[index].ssid.clone();
            if let Some(assigned_id) = self.try_candidate(ssid.as_str(), rest, payload.as_str()) {
                self.state = ConnectionState {
                    is_paired: true,
                    assigned_id,
                };
                info!("Paired with {} as sensor {}", ssid.as_str(), assigned_id);
                return true;
            }
            self.radio.disconnect();
        }

        warn!(
            "Failed to pair with any of {} candidate gateways",
            self.candidates.len()
        );
        false
    }

    /// Drop the pairing and return to the freshly initialized state
    pub fn disconnect(&mut self) {
        info!("Leaving gateway");
        self.init();
    }

    pub fn is_paired_with_control_unit(&self) -> bool {
        self.state.is_paired
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// False after `init` found no radio
    pub fn radio_present(&self) -> bool {
        self.radio_present
    }

    /// True when `init` found radio firmware older than the configured release
    pub fn firmware_outdated(&self) -> bool {
        self.firmware_outdated
    }

    /// Candidates from the last scan, strongest first
    pub fn candidates(&self) -> &[CandidateGateway] {
        &self.candidates
    }

    pub fn radio(&self) -> &W {
        &self.radio
    }

    fn try_candidate<R: RestApi>(&mut self, ssid: &str, rest: &mut R, payload: &str) -> Option<u8> {
        info!("Trying gateway {}", ssid);
        if self.radio.begin(ssid, self.config.password).is_err() {
            warn!("Radio refused to associate with {}", ssid);
            return None;
        }
        if !self.wait_for_link() {
            warn!("Association with {} timed out", ssid);
            return None;
        }

        let response = rest.post_to(CONNECT_PATH, payload);
        if !response.is_ok() {
            warn!("Pairing with {} failed with status {}", ssid, response.status);
            return None;
        }
        match parse_connect_response(response.body()) {
            Ok(ConnectResponse {
                connected: true,
                sensor_id,
            }) => Some(sensor_id),
            Ok(_) => {
                warn!("Gateway {} declined pairing", ssid);
                None
            }
            Err(e) => {
                warn!("Unreadable pairing reply from {}: {}", ssid, e);
                None
            }
        }
    }

    fn wait_for_link(&mut self) -> bool {
        let started = self.clock.now_ms();
        loop {
            match self.radio.link_status() {
                LinkStatus::Connected => return true,
                LinkStatus::Failed | LinkStatus::NoModule => return false,
                _ => {}
            }
            if self.clock.elapsed_since(started) >= self.config.connect_timeout_ms {
                return false;
            }
            self.delay.delay_ms(self.config.link_poll_interval_ms);
        }
    }

    fn scan(&mut self) {
        info!("Scanning for gateways");
        self.last_scan_ms = Some(self.clock.now_ms());
        self.candidates.clear();

        let found = match self.radio.scan() {
            Ok(found) => found,
            Err(_) => {
                warn!("Wi-Fi scan failed");
                return;
            }
        };
        if found == 0 {
            warn!("No networks found");
            return;
        }
        debug!("{} networks found", found);

        for index in 0..found {
            let Some(ap) = self.radio.scanned(index) else {
                break;
            };
            if !ap.ssid.starts_with(self.config.ssid_prefix) {
                continue;
            }
            debug!("Candidate gateway {} (RSSI {})", ap.ssid.as_str(), ap.rssi);
            let candidate = CandidateGateway {
                ssid: ap.ssid,
                rssi: ap.rssi,
            };
            if let Err(dropped) = self.candidates.push(candidate) {
                warn!("Too many gateways, ignoring {}", dropped.ssid.as_str());
            }
        }

        sort_by_signal(&mut self.candidates);
    }

    fn check_firmware_version(&mut self) -> bool {
        let latest = self.config.latest_firmware;
        let current = self.radio.firmware_version();
        let outdated = parse_version(current) < parse_version(latest);
        if outdated {
            warn!("Radio firmware {} is outdated, please update to {}", current, latest);
        } else {
            info!("Radio firmware {}", current);
        }
        outdated
    }
}

/// Stable insertion sort, strongest signal first
fn sort_by_signal(candidates: &mut [CandidateGateway]) {
    for i in 1..candidates.len() {
        let mut j = i;
        while j > 0 && candidates[j - 1].rssi < candidates[j].rssi {
            candidates.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// `major.minor.patch`; missing or non-numeric parts count as 0
fn parse_version(version: &str) -> (u32, u32, u32) {
    let mut parts = version
        .trim()
        .split('.')
        .map(|part| part.parse::<u32>().unwrap_or(0));
    (
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
        parts.next().unwrap_or(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRestApi;
    use sensorunit_hal::mock::{MockClock, MockRadio};

    type TestManager<'a> = ConnectionManager<MockRadio, &'a MockClock, &'a MockClock>;

    fn manager(clock: &MockClock, radio: MockRadio) -> TestManager<'_> {
        let mut manager = ConnectionManager::new(radio, clock, clock, ConnectionConfig::default());
        manager.init();
        manager
    }

    fn ssid(name: &str) -> String<SSID_MAX_LEN> {
        let mut out = String::new();
        out.push_str(name).unwrap();
        out
    }

    const PAIRED: &str = "{\"status\":\"connected\",\"sensor_id\":3}";

    #[test]
    fn test_candidates_attempted_strongest_first() {
        let clock = MockClock::new(0);
        let mut radio = MockRadio::new();
        radio.add_network("CU-weak", -80, false);
        radio.add_network("CU-strong", -40, false);
        radio.add_network("CU-mid", -60, false);
        let mut manager = manager(&clock, radio);
        let mut rest = MockRestApi::new();

        assert!(!manager.connect(&mut rest));

        let attempts: std::vec::Vec<&str> =
            manager.radio().attempts.iter().map(|s| s.as_str()).collect();
        assert_eq!(attempts, ["CU-strong", "CU-mid", "CU-weak"]);
        assert!(rest.requests().is_empty());
    }

    #[test]
    fn test_sort_is_stable() {
        let mut candidates = [
            CandidateGateway {
                ssid: ssid("a"),
                rssi: -50,
            },
            CandidateGateway {
                ssid: ssid("b"),
                rssi: -30,
            },
            CandidateGateway {
                ssid: ssid("c"),
                rssi: -50,
            },
        ];
        sort_by_signal(&mut candidates);
        let order: std::vec::Vec<&str> = candidates.iter().map(|c| c.ssid.as_str()).collect();
        assert_eq!(order, ["b", "a", "c"]);
    }

    #[test]
    fn test_scan_filters_by_prefix_and_caps_list() {
        let clock = MockClock::new(0);
        let mut radio = MockRadio::new();
        radio.add_network("HomeNet", -20, true);
        for i in 0..10 {
            let mut ssid: String<SSID_MAX_LEN> = String::new();
            core::fmt::Write::write_fmt(&mut ssid, format_args!("CU-{}", i)).unwrap();
            radio.add_network(&ssid, -50 - i, false);
        }
        let mut manager = manager(&clock, radio);

        manager.connect(&mut MockRestApi::new());

        assert_eq!(manager.candidates().len(), MAX_CANDIDATES);
        assert!(manager
            .candidates()
            .iter()
            .all(|c| c.ssid.starts_with("CU-")));
        assert!(!manager
            .radio()
            .attempts
            .iter()
            .any(|s| s.as_str() == "HomeNet"));
    }

    #[test]
    fn test_pairing_success_records_identity() {
        let clock = MockClock::new(0);
        let mut radio = MockRadio::new();
        radio.add_network("CU-1", -50, true);
        let mut manager = manager(&clock, radio);
        let mut rest = MockRestApi::new();
        rest.push_response(200, PAIRED);

        assert!(manager.connect(&mut rest));

        assert_eq!(
            manager.state(),
            ConnectionState {
                is_paired: true,
                assigned_id: 3
            }
        );
        let request = &rest.requests()[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.path.as_str(), "/connect");
        assert!(request.body.contains("\"sensor_unit_id\""));
    }

    #[test]
    fn test_failed_pairing_disconnects_and_tries_next() {
        let clock = MockClock::new(0);
        let mut radio = MockRadio::new();
        radio.add_network("CU-1", -40, true);
        radio.add_network("CU-2", -70, true);
        let mut manager = manager(&clock, radio);
        let disconnects_after_init = manager.radio().disconnects;
        let mut rest = MockRestApi::new();
        rest.push_response(500, "");
        rest.push_response(200, PAIRED);

        assert!(manager.connect(&mut rest));

        assert_eq!(manager.radio().attempts.len(), 2);
        assert_eq!(manager.radio().disconnects, disconnects_after_init + 1);
        assert_eq!(rest.requests().len(), 2);
    }

    #[test]
    fn test_declined_or_malformed_reply_is_not_paired() {
        let clock = MockClock::new(0);
        let mut radio = MockRadio::new();
        radio.add_network("CU-1", -40, true);
        radio.add_network("CU-2", -50, true);
        let mut manager = manager(&clock, radio);
        let mut rest = MockRestApi::new();
        rest.push_response(200, "{\"status\":\"pending\"}");
        rest.push_response(200, "<html>");

        assert!(!manager.connect(&mut rest));
        assert!(!manager.is_paired_with_control_unit());
    }

    #[test]
    fn test_association_timeout_uses_delay() {
        let clock = MockClock::new(0);
        let mut radio = MockRadio::new();
        radio.add_network("CU-1", -40, false);
        let mut manager = manager(&clock, radio);

        assert!(!manager.connect(&mut MockRestApi::new()));
        assert!(clock.now_ms() >= ConnectionConfig::default().connect_timeout_ms);
    }

    #[test]
    fn test_rescans_only_when_stale() {
        let clock = MockClock::new(0);
        let mut radio = MockRadio::new();
        radio.add_network("CU-1", -40, false);
        let mut manager = manager(&clock, radio);
        let mut rest = MockRestApi::new();

        manager.connect(&mut rest);
        manager.connect(&mut rest);
        assert_eq!(manager.radio().scans, 1);

        clock.advance(ConnectionConfig::default().scan_interval_ms);
        manager.connect(&mut rest);
        assert_eq!(manager.radio().scans, 2);
    }

    #[test]
    fn test_missing_radio_is_inert() {
        let clock = MockClock::new(0);
        let mut radio = MockRadio::new();
        radio.present = false;
        radio.add_network("CU-1", -40, true);
        let mut manager = manager(&clock, radio);

        assert!(!manager.radio_present());
        assert!(!manager.connect(&mut MockRestApi::new()));
        assert_eq!(manager.radio().scans, 0);
    }

    #[test]
    fn test_failed_scan_leaves_no_candidates() {
        let clock = MockClock::new(0);
        let mut radio = MockRadio::new();
        radio.add_network("CU-1", -40, true);
        radio.fail_scan = true;
        let mut manager = manager(&clock, radio);
        let mut rest = MockRestApi::new();
        rest.push_response(200, PAIRED);

        assert!(!manager.connect(&mut rest));

        assert!(manager.candidates().is_empty());
        assert!(manager.radio().attempts.is_empty());
        assert_eq!(manager.radio().scans, 1);
        assert!(rest.requests().is_empty());
        assert!(!manager.is_paired_with_control_unit());
    }

    #[test]
    fn test_init_flags_outdated_firmware() {
        let clock = MockClock::new(0);
        let mut radio = MockRadio::new();
        radio.firmware = "0.5.0";
        let outdated = manager(&clock, radio);

        assert!(outdated.radio_present());
        assert!(outdated.firmware_outdated());
        assert_eq!(outdated.radio().disconnects, 1);

        let current = manager(&clock, MockRadio::new());
        assert!(!current.firmware_outdated());
    }

    #[test]
    fn test_disconnect_resets_pairing() {
        let clock = MockClock::new(0);
        let mut radio = MockRadio::new();
        radio.add_network("CU-1", -50, true);
        let mut manager = manager(&clock, radio);
        let mut rest = MockRestApi::new();
        rest.push_response(200, PAIRED);
        assert!(manager.connect(&mut rest));

        manager.disconnect();

        assert_eq!(manager.state(), ConnectionState::default());
        assert!(manager.candidates().is_empty());
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("1.5.0"), (1, 5, 0));
        assert_eq!(parse_version("0.6"), (0, 6, 0));
        assert_eq!(parse_version("garbage"), (0, 0, 0));
        assert!(parse_version("0.5.9") < parse_version("0.6.0"));
    }
}
