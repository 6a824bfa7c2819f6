// Projekt-Konfiguration: Konstanten und Hardware-Zuordnungen

use effekt_core::RawConfig;

// ============================================================================
// LED Konfiguration
// ============================================================================

/// Maximale Anzahl LEDs im Effekt-Strip (Puffer-Kapazität)
/// STRIP_LENGTH darf höchstens so groß sein
pub const STRIP_CAPACITY: usize = 100;

/// Start-Helligkeit des Effekt-Strips (0.0 - 1.0)
pub const STRIP_BRIGHTNESS: f32 = 1.0;

/// GPIO-Pin der Onboard RGB LED (WS2812), dient als Status-LED
pub const STATUS_LED_GPIO_PIN: u8 = 8;

/// GPIO-Pin des BOOT-Buttons (Low = gedrückt)
pub const BOOT_BUTTON_GPIO_PIN: u8 = 9;

/// RMT Taktfrequenz in MHz
/// 80 MHz ist optimal für WS2812 LED-Timing
pub const RMT_CLOCK_MHZ: u32 = 80;

// ============================================================================
// Effekt-Loop
// ============================================================================

/// Zeitbudget eines Loop-Durchlaufs in Millisekunden
pub const LOOP_PERIOD_MS: u64 = 1_000;

/// Kapazität der Queue Netzwerk → Effekt-Loop
/// Retained Messages kommen nach dem Subscribe gesammelt an
pub const INBOUND_QUEUE_SIZE: usize = 8;

/// Anzahl on/off-Zyklen im Alarm-Modus bevor aufgegeben wird
pub const ALERT_MAX_CYCLES: u32 = 30;

/// Abfrage-Intervall von Uhr und BOOT-Button im Alarm-Modus
pub const ALERT_POLL_MS: u64 = 50;

// ============================================================================
// Flash
// ============================================================================

/// Flash-Offset des Boot-Skript-Slots
/// Erster Sektor der Standard-NVS-Partition (0x9000, 24 KB)
pub const SCRIPT_FLASH_OFFSET: u32 = 0x9000;

// ============================================================================
// WiFi Konfiguration
// ============================================================================

/// Heap-Größe für WiFi (Bytes)
/// WiFi benötigt dynamischen Speicher für Pakete
pub const WIFI_HEAP_SIZE: usize = 65536; // 64 KB

/// Zusätzliche Heap-Größe (Bytes)
pub const EXTRA_HEAP_SIZE: usize = 36864; // 36 KB

// Gesamt-Heap: ~100 KB für WiFi-Stack

/// Timeout für die WLAN-Assoziation in Sekunden
pub const LINK_TIMEOUT_SECS: u64 = 20;

/// Timeout bis DHCP eine Adresse liefert, in Sekunden
pub const DHCP_TIMEOUT_SECS: u64 = 20;

// ============================================================================
// MQTT Konfiguration
// ============================================================================

/// MQTT Buffer-Größe in Bytes
/// Muss ein komplettes Skript (512 Bytes) plus Topic und Header fassen
pub const MQTT_BUFFER_SIZE: usize = 1024;

/// Maximale Länge des Subscription-Filters `<root>/#`
pub const MQTT_TOPIC_FILTER_LEN: usize = 128;

/// MQTT Keep-Alive in Sekunden
pub const MQTT_KEEP_ALIVE_SECS: u16 = 30;

/// Ping-Intervall wenn keine Nachrichten kommen, in Sekunden
pub const MQTT_PING_INTERVAL_SECS: u64 = 15;

/// DNS Query Timeout in Sekunden
pub const DNS_TIMEOUT_SECS: u64 = 10;

/// TCP Socket Timeout in Sekunden
pub const TCP_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Eingebackene Werte aus .env (siehe build.rs)
// ============================================================================

/// Ungeprüfte Konfiguration, geprüft wird beim Start mit `DeviceConfig::parse`
pub const RAW_CONFIG: RawConfig<'static> = RawConfig {
    wifi_ssid: option_env!("WIFI_SSID"),
    wifi_password: option_env!("WIFI_PASSWORD"),
    mqtt_broker: option_env!("MQTT_BROKER"),
    mqtt_port: option_env!("MQTT_PORT"),
    mqtt_client_id: option_env!("MQTT_CLIENT_ID"),
    mqtt_username: option_env!("MQTT_USERNAME"),
    mqtt_password: option_env!("MQTT_PASSWORD"),
    topic_root: option_env!("MQTT_TOPIC_ROOT"),
    strip_pin: option_env!("STRIP_PIN"),
    strip_length: option_env!("STRIP_LENGTH"),
};
