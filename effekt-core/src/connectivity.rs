//! ConnectivityController - Verbindungsaufbau zu WiFi + Broker als State Machine
//!
//! Die Zeit wird von außen eingespeist (Millisekunden), der eigentliche
//! Transport lebt im Firmware-Task. Hier wird nur entschieden *wann* ein
//! Versuch stattfindet und welcher [`StatusCode`] gilt.

use heapless::String;

use crate::status::StatusCode;

/// Mindestabstand zwischen zwei Verbindungsversuchen
pub const RETRY_BACKOFF_MS: u64 = 5_000;

/// Anzahl Bytes eines Trigger-Payloads die im Klartext gemerkt werden
pub const MAX_TRIGGER_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    RetryBackoff { since_ms: u64 },
}

/// Was der Netzwerk-Task als Nächstes tun soll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionAction {
    /// Jetzt verbinden
    Attempt,
    /// Noch so viele Millisekunden warten
    Wait(u64),
    /// Verbunden, nichts zu tun
    Idle,
}

/// Fehlerquelle eines gescheiterten Versuchs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkFault {
    /// WiFi-Assoziation oder DHCP fehlgeschlagen
    Link,
    /// DNS, TCP oder MQTT-Handshake fehlgeschlagen
    Broker,
}

impl LinkFault {
    pub fn status(self) -> StatusCode {
        match self {
            LinkFault::Link => StatusCode::LinkFailed,
            LinkFault::Broker => StatusCode::BrokerFailed,
        }
    }
}

impl core::fmt::Display for LinkFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LinkFault::Link => write!(f, "network link failed"),
            LinkFault::Broker => write!(f, "broker connection failed"),
        }
    }
}

pub struct ConnectivityController {
    state: ConnectionState,
    status: StatusCode,
    last_attempt_ms: Option<u64>,
    broker_failed: bool,
}

impl Default for ConnectivityController {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityController {
    pub const fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            status: StatusCode::Ok,
            last_attempt_ms: None,
            broker_failed: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn last_attempt_ms(&self) -> Option<u64> {
        self.last_attempt_ms
    }

    pub fn poll(&mut self, now_ms: u64) -> ConnectionAction {
        match self.state {
            ConnectionState::Disconnected => self.begin_attempt(now_ms),
            ConnectionState::RetryBackoff { since_ms } => {
                let waited = now_ms.saturating_sub(since_ms);
                if waited >= RETRY_BACKOFF_MS {
                    self.begin_attempt(now_ms)
                } else {
                    ConnectionAction::Wait(RETRY_BACKOFF_MS - waited)
                }
            }
            ConnectionState::Connecting => ConnectionAction::Wait(0),
            ConnectionState::Connected => ConnectionAction::Idle,
        }
    }

    fn begin_attempt(&mut self, now_ms: u64) -> ConnectionAction {
        self.state = ConnectionState::Connecting;
        self.last_attempt_ms = Some(now_ms);
        if self.broker_failed {
            self.status = StatusCode::BrokerRetrying;
        }
        ConnectionAction::Attempt
    }

    pub fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.status = StatusCode::Ok;
        self.broker_failed = false;
    }

    /// Versuch gescheitert, Backoff zählt ab dem Start des Versuchs
    pub fn on_failure(&mut self, fault: LinkFault, now_ms: u64) {
        self.enter_backoff(now_ms);
        self.status = fault.status();
        self.broker_failed = fault == LinkFault::Broker;
    }

    /// Bestehende Session abgebrochen
    pub fn on_session_lost(&mut self, now_ms: u64) {
        self.enter_backoff(now_ms);
        self.status = StatusCode::BrokerRetrying;
        self.broker_failed = true;
    }

    fn enter_backoff(&mut self, now_ms: u64) {
        let since_ms = self.last_attempt_ms.unwrap_or(now_ms);
        self.state = ConnectionState::RetryBackoff { since_ms };
    }
}

/// Topic-Filter für die Subscription: `<root>/#`
pub fn subscription_filter<const L: usize>(root: &str) -> Option<String<L>> {
    let mut filter = String::new();
    filter.push_str(root.trim_end_matches('/')).ok()?;
    filter.push_str("/#").ok()?;
    Some(filter)
}

/// Keep-Alive einer MQTT-Session
///
/// Der Ping richtet sich nach dem letzten *gesendeten* Paket. Eingehende
/// Nachrichten schieben ihn nicht hinaus, der Broker erwartet innerhalb
/// jedes Keep-Alive-Intervalls ein Paket vom Client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    interval_ms: u64,
    last_sent_ms: u64,
}

impl KeepAlive {
    /// `now_ms`: Zeitpunkt des letzten Pakets beim Aufbau (SUBSCRIBE)
    pub const fn new(interval_ms: u64, now_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent_ms: now_ms,
        }
    }

    /// Zeitpunkt, zu dem spätestens gepingt werden muss
    pub fn deadline_ms(&self) -> u64 {
        self.last_sent_ms.saturating_add(self.interval_ms)
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.deadline_ms()
    }

    /// Ein Paket wurde gesendet
    pub fn on_sent(&mut self, now_ms: u64) {
        self.last_sent_ms = now_ms;
    }
}

/// Entprellt `/event/trigger`: nur ein neuer Payload löst aus
///
/// Bis [`MAX_TRIGGER_LEN`] Bytes wird exakt verglichen, längere Payloads
/// zusätzlich über Länge und FNV-1a-Hash.
#[derive(Default)]
pub struct TriggerFilter {
    last: Option<TriggerToken>,
}

#[derive(PartialEq, Eq)]
struct TriggerToken {
    prefix: String<MAX_TRIGGER_LEN>,
    len: usize,
    hash: u64,
}

impl TriggerToken {
    fn of(payload: &str) -> Self {
        let mut cut = payload.len().min(MAX_TRIGGER_LEN);
        while !payload.is_char_boundary(cut) {
            cut -= 1;
        }
        let mut prefix = String::new();
        // passt immer, cut <= MAX_TRIGGER_LEN
        let _ = prefix.push_str(&payload[..cut]);
        Self {
            prefix,
            len: payload.len(),
            hash: fnv1a(payload.as_bytes()),
        }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ *b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

impl TriggerFilter {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// `true` wenn `payload` dem zuletzt gemerkten entspricht
    pub fn is_repeat(&self, payload: &str) -> bool {
        self.last.as_ref() == Some(&TriggerToken::of(payload))
    }

    /// `payload` als zuletzt ausgelösten merken
    pub fn remember(&mut self, payload: &str) {
        self.last = Some(TriggerToken::of(payload));
    }

    /// `true` wenn `payload` sich vom zuletzt gesehenen unterscheidet, merkt ihn dann
    pub fn accept(&mut self, payload: &str) -> bool {
        if self.is_repeat(payload) {
            return false;
        }
        self.remember(payload);
        true
    }
}
