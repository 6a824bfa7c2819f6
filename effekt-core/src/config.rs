//! Geräte-Konfiguration
//!
//! Rohwerte (z.B. aus `option_env!`) werden einmal beim Start geprüft.
//! Fehlende Pflichtwerte sind ein Laufzeit-Zustand, kein Build-Fehler.

use crate::status::StatusCode;

/// Ausgang für den Effekt-Strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StripPin {
    Gpio2,
    Gpio4,
    Gpio5,
    /// Onboard WS2812 (gleichzeitig Status-LED)
    Gpio8,
}

impl StripPin {
    /// `true` wenn der Strip die Status-LED ist
    pub fn is_onboard(self) -> bool {
        self == StripPin::Gpio8
    }
}

/// Erlaubte Pin-Namen
pub const STRIP_PINS: &[(&str, StripPin)] = &[
    ("GPIO2", StripPin::Gpio2),
    ("GPIO4", StripPin::Gpio4),
    ("GPIO5", StripPin::Gpio5),
    ("GPIO8", StripPin::Gpio8),
    ("ONBOARD", StripPin::Gpio8),
];

pub const DEFAULT_STRIP_PIN: StripPin = StripPin::Gpio2;
pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_CLIENT_ID: &str = "esp-effekt";
pub const DEFAULT_TOPIC_ROOT: &str = "effekt";

/// Pin per Name nachschlagen (Groß-/Kleinschreibung egal)
pub fn lookup_strip_pin(name: &str) -> Option<StripPin> {
    let name = name.trim();
    STRIP_PINS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, pin)| *pin)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    MissingWifiSsid,
    UnknownStripPin,
    InvalidStripLength,
    MissingBroker,
}

impl ConfigError {
    /// Farbe für den Alarm-Modus
    pub fn alert_status(self) -> StatusCode {
        match self {
            ConfigError::MissingBroker => StatusCode::BrokerFailed,
            _ => StatusCode::LinkFailed,
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::MissingWifiSsid => write!(f, "WIFI_SSID is not set"),
            ConfigError::UnknownStripPin => write!(f, "STRIP_PIN names no known output"),
            ConfigError::InvalidStripLength => write!(f, "STRIP_LENGTH is out of range"),
            ConfigError::MissingBroker => write!(f, "MQTT_BROKER is not set"),
        }
    }
}

/// Ungeprüfte Werte, `None` = nicht gesetzt
#[derive(Debug, Clone, Copy, Default)]
pub struct RawConfig<'a> {
    pub wifi_ssid: Option<&'a str>,
    pub wifi_password: Option<&'a str>,
    pub mqtt_broker: Option<&'a str>,
    pub mqtt_port: Option<&'a str>,
    pub mqtt_client_id: Option<&'a str>,
    pub mqtt_username: Option<&'a str>,
    pub mqtt_password: Option<&'a str>,
    pub topic_root: Option<&'a str>,
    pub strip_pin: Option<&'a str>,
    pub strip_length: Option<&'a str>,
}

/// Geprüfte Konfiguration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig<'a> {
    pub wifi_ssid: &'a str,
    pub wifi_password: &'a str,
    pub mqtt_broker: &'a str,
    pub mqtt_port: u16,
    pub mqtt_client_id: &'a str,
    pub mqtt_username: Option<&'a str>,
    pub mqtt_password: Option<&'a str>,
    pub topic_root: &'a str,
    pub strip_pin: StripPin,
    pub strip_length: usize,
}

/// Leere Strings zählen als nicht gesetzt
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl<'a> DeviceConfig<'a> {
    /// Prüft die Rohwerte, `max_length` ist die Kapazität des Strip-Puffers
    ///
    /// Ein ungültiger Port fällt auf [`DEFAULT_MQTT_PORT`] zurück.
    pub fn parse(raw: &RawConfig<'a>, max_length: usize) -> Result<Self, ConfigError> {
        let wifi_ssid = present(raw.wifi_ssid).ok_or(ConfigError::MissingWifiSsid)?;
        let mqtt_broker = present(raw.mqtt_broker).ok_or(ConfigError::MissingBroker)?;

        let strip_pin = match present(raw.strip_pin) {
            Some(name) => lookup_strip_pin(name).ok_or(ConfigError::UnknownStripPin)?,
            None => DEFAULT_STRIP_PIN,
        };

        let strip_length = match present(raw.strip_length) {
            Some(text) => text
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidStripLength)?,
            None => max_length,
        };
        if strip_length < 1 || strip_length > max_length {
            return Err(ConfigError::InvalidStripLength);
        }

        Ok(Self {
            wifi_ssid,
            wifi_password: raw.wifi_password.unwrap_or(""),
            mqtt_broker,
            mqtt_port: present(raw.mqtt_port)
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_MQTT_PORT),
            mqtt_client_id: present(raw.mqtt_client_id).unwrap_or(DEFAULT_CLIENT_ID),
            mqtt_username: present(raw.mqtt_username),
            mqtt_password: raw.mqtt_password.filter(|p| !p.is_empty()),
            topic_root: present(raw.topic_root)
                .map(|root| root.trim_end_matches('/'))
                .unwrap_or(DEFAULT_TOPIC_ROOT),
            strip_pin,
            strip_length,
        })
    }

    /// Status-LED und Strip sind dasselbe Gerät
    pub fn status_shared_with_strip(&self) -> bool {
        self.strip_pin.is_onboard()
    }
}

/// Strip-Einstellungen für den Offline-Betrieb nach einem Konfigurationsfehler
///
/// Ungültige Werte werden durch die Defaults ersetzt.
pub fn fallback_strip(raw: &RawConfig<'_>, max_length: usize) -> (StripPin, usize) {
    let pin = present(raw.strip_pin)
        .and_then(lookup_strip_pin)
        .unwrap_or(DEFAULT_STRIP_PIN);
    let length = present(raw.strip_length)
        .and_then(|text| text.parse::<usize>().ok())
        .filter(|n| (1..=max_length).contains(n))
        .unwrap_or(max_length);
    (pin, length)
}
