// Netzwerk Task - WLAN, MQTT-Session und Weiterleitung der Steuer-Nachrichten
use defmt::{Debug2Format, error, info, warn};
use embassy_futures::select::{Either, select};
use embassy_net::{IpAddress, Runner, Stack, dns::DnsQueryType, tcp::TcpSocket};
use embassy_time::{Duration, Instant, Timer, with_timeout};
use esp_radio::wifi::{ClientConfig as WifiClientConfig, ModeConfig, WifiController, WifiDevice};

use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::utils::rng_generator::CountingRng;
use rust_mqtt::utils::types::EncodedString;

use effekt_core::{
    ConnectionAction, ConnectivityController, ControlTopic, DeviceConfig, InboundMessage,
    KeepAlive, LinkFault, StatusCode, subscription_filter,
};
use heapless::String;

use crate::config::*;
use crate::{InboundSender, StatusSignal};

/// Netzwerk Task - läuft parallel zum Effekt-Loop
///
/// Dieser Task übernimmt die komplette Verbindungs-Verwaltung:
/// - WLAN verbinden und auf DHCP warten
/// - MQTT Session aufbauen und `<root>/#` abonnieren
/// - Nachrichten nach Topic routen und an den Effekt-Loop weiterreichen
/// - Fehler melden und nach Backoff erneut versuchen
///
/// Wann ein Versuch startet entscheidet der `ConnectivityController`,
/// der Task führt nur aus und meldet den Status an die Status-LED.
#[embassy_executor::task]
pub async fn network_task(
    mut controller: WifiController<'static>,
    stack: &'static Stack<'static>,
    config: DeviceConfig<'static>,
    inbound: InboundSender,
    status: &'static StatusSignal,
) {
    info!("WiFi: Starting network task");

    let mut ctrl = ConnectivityController::new();
    let mut reported = StatusCode::Ok;

    loop {
        match ctrl.poll(now_ms()) {
            ConnectionAction::Attempt => {
                report_status(&ctrl, &mut reported, status);

                if let Err(e) = establish_link(&mut controller, stack, &config).await {
                    error!("WiFi: {}", e);
                    ctrl.on_failure(LinkFault::Link, now_ms());
                    report_status(&ctrl, &mut reported, status);
                    continue;
                }

                match mqtt_session(stack, &config, inbound, &mut ctrl, &mut reported, status).await {
                    // Session lief und ist abgebrochen
                    Ok(()) => {
                        warn!("MQTT: Session closed");
                        ctrl.on_session_lost(now_ms());
                    }
                    Err(e) if e.is_link() => {
                        error!("MQTT: {}", e);
                        ctrl.on_failure(LinkFault::Link, now_ms());
                    }
                    Err(e) => {
                        error!("MQTT: {}", e);
                        ctrl.on_failure(LinkFault::Broker, now_ms());
                    }
                }
                report_status(&ctrl, &mut reported, status);
            }
            ConnectionAction::Wait(ms) => {
                info!("MQTT: Retrying in {} ms", ms);
                Timer::after(Duration::from_millis(ms.max(1))).await;
            }
            // Connected nur innerhalb von mqtt_session
            ConnectionAction::Idle => Timer::after(Duration::from_millis(100)).await,
        }
    }
}

/// Network Task
///
/// Überwacht den Netzwerk-Stack:
/// - Prozessiert Netzwerk-Pakete
/// - Managed TCP/IP Stack
#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

/// Status nur bei Änderung an die Status-LED melden
fn report_status(ctrl: &ConnectivityController, reported: &mut StatusCode, status: &StatusSignal) {
    let current = ctrl.status();
    if current != *reported {
        info!("Status: {}", current.as_str());
        *reported = current;
        status.signal(current);
    }
}

/// Stellt die WLAN-Verbindung her (falls nötig) und wartet auf eine IP
///
/// Assoziation und DHCP sind jeweils zeitlich begrenzt.
async fn establish_link(
    controller: &mut WifiController<'static>,
    stack: &'static Stack<'static>,
    config: &DeviceConfig<'static>,
) -> Result<(), NetError> {
    if matches!(controller.is_connected(), Ok(true)) && stack.config_v4().is_some() {
        return Ok(());
    }

    if !matches!(controller.is_started(), Ok(true)) {
        info!("WiFi: Configuring and starting...");
        let client_config = ModeConfig::Client(
            WifiClientConfig::default()
                .with_ssid(config.wifi_ssid.into())
                .with_password(config.wifi_password.into()),
        );
        controller.set_config(&client_config).map_err(|e| {
            warn!("WiFi: Failed to set configuration: {}", Debug2Format(&e));
            NetError::WifiConfig
        })?;
        controller.start_async().await.map_err(|e| {
            warn!("WiFi: Failed to start: {}", Debug2Format(&e));
            NetError::WifiStart
        })?;
        info!("WiFi: Started successfully");
    }

    info!("WiFi: Connecting to '{}'...", config.wifi_ssid);
    match with_timeout(
        Duration::from_secs(LINK_TIMEOUT_SECS),
        controller.connect_async(),
    )
    .await
    {
        Ok(Ok(())) => info!("WiFi: Connected"),
        Ok(Err(e)) => {
            warn!("WiFi: Connection failed: {}", Debug2Format(&e));
            return Err(NetError::Association);
        }
        Err(_) => return Err(NetError::AssociationTimeout),
    }

    with_timeout(
        Duration::from_secs(DHCP_TIMEOUT_SECS),
        wait_for_network(stack),
    )
    .await
    .map_err(|_| NetError::DhcpTimeout)?;

    if let Some(v4) = stack.config_v4() {
        info!("WiFi: Got IP address!");
        info!("  IP:      {}", Debug2Format(&v4.address.address()));
        info!("  Gateway: {}", Debug2Format(&v4.gateway));
    }
    Ok(())
}

/// Wartet bis Netzwerk-Verbindung verfügbar ist
///
/// Prüft kontinuierlich Link-Status und DHCP-Konfiguration.
async fn wait_for_network(stack: &'static Stack<'static>) {
    loop {
        if stack.is_link_up() && stack.config_v4().is_some() {
            break;
        }
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Baut die MQTT Session auf und leitet Nachrichten weiter
///
/// 1. DNS-Auflösung des Brokers
/// 2. TCP-Verbindung aufbauen
/// 3. MQTT CONNECT und SUBSCRIBE `<root>/#`
/// 4. Empfangen, routen, spätestens zur Keep-Alive-Frist pingen
///
/// `Err` heißt: Session kam nie zustande. `Ok(())` heißt: Session lief und
/// wurde unterbrochen.
async fn mqtt_session(
    stack: &'static Stack<'static>,
    config: &DeviceConfig<'static>,
    inbound: InboundSender,
    ctrl: &mut ConnectivityController,
    reported: &mut StatusCode,
    status: &StatusSignal,
) -> Result<(), NetError> {
    info!("MQTT: Resolving '{}'...", config.mqtt_broker);
    let broker_ip = resolve_hostname(stack, config.mqtt_broker).await?;
    info!("MQTT: Resolved to {}", Debug2Format(&broker_ip));

    // TCP Connect
    let mut rx_buffer = [0u8; 2048];
    let mut tx_buffer = [0u8; 2048];
    let mut socket = TcpSocket::new(*stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(Duration::from_secs(TCP_TIMEOUT_SECS)));

    socket
        .connect((broker_ip, config.mqtt_port))
        .await
        .map_err(|_| NetError::ConnectionFailed)?;
    info!("MQTT: TCP connected");

    // MQTT Client Configuration
    let rng = CountingRng(20000);
    let mut client_config = ClientConfig::<5, _>::new(MqttVersion::MQTTv5, rng);
    client_config.client_id = EncodedString {
        string: config.mqtt_client_id,
        len: config.mqtt_client_id.len() as u16,
    };
    if let Some(username) = config.mqtt_username {
        client_config.add_username(username);
    }
    if let Some(password) = config.mqtt_password {
        client_config.add_password(password);
    }
    client_config.keep_alive = MQTT_KEEP_ALIVE_SECS;
    client_config.max_packet_size = MQTT_BUFFER_SIZE as u32;

    // MQTT Buffer
    let mut send_buffer = [0u8; MQTT_BUFFER_SIZE];
    let mut recv_buffer = [0u8; MQTT_BUFFER_SIZE];

    let mut client = MqttClient::<_, 5, _>::new(
        socket,
        &mut send_buffer,
        MQTT_BUFFER_SIZE,
        &mut recv_buffer,
        MQTT_BUFFER_SIZE,
        client_config,
    );

    client
        .connect_to_broker()
        .await
        .map_err(|_| NetError::ProtocolError)?;
    info!("MQTT: Connected to broker");

    let filter: String<MQTT_TOPIC_FILTER_LEN> =
        subscription_filter(config.topic_root).ok_or(NetError::TopicTooLong)?;
    client
        .subscribe_to_topic(filter.as_str())
        .await
        .map_err(|_| NetError::SubscribeFailed)?;
    info!("MQTT: Subscribed to '{}'", filter.as_str());

    ctrl.on_connected();
    report_status(ctrl, reported, status);

    // Ping-Frist zählt ab dem letzten gesendeten Paket (hier: SUBSCRIBE)
    let mut keep_alive = KeepAlive::new(MQTT_PING_INTERVAL_SECS * 1000, now_ms());

    // Empfangs-Loop: Nachrichten weiterleiten, zur Frist Ping senden
    loop {
        match select(
            client.receive_message(),
            Timer::at(Instant::from_millis(keep_alive.deadline_ms())),
        )
        .await
        {
            Either::First(Ok((topic, payload))) => {
                forward_message(config.topic_root, topic, payload, inbound).await;
            }
            Either::First(Err(e)) => {
                warn!("MQTT: Receive failed: {}", Debug2Format(&e));
                return Ok(());
            }
            Either::Second(()) => {}
        }

        // Eingehender Verkehr verschiebt die Frist nicht
        if keep_alive.is_due(now_ms()) {
            if client.send_ping().await.is_err() {
                warn!("MQTT: Ping failed");
                return Ok(());
            }
            keep_alive.on_sent(now_ms());
        }
    }
}

/// Topic routen und als `InboundMessage` in die Queue stellen
///
/// Unbekannte Topics, ungültiges UTF-8 und zu lange Payloads werden
/// verworfen. Ist die Queue voll, wartet der Task (Backpressure).
async fn forward_message(root: &str, topic: &str, payload: &[u8], inbound: InboundSender) {
    let Some(control) = ControlTopic::parse(root, topic) else {
        return;
    };
    let Ok(text) = core::str::from_utf8(payload) else {
        warn!("MQTT: Payload on '{}' is not UTF-8", topic);
        return;
    };
    let Some(msg) = InboundMessage::new(control, text) else {
        warn!("MQTT: Payload on '{}' too large ({} bytes)", topic, payload.len());
        return;
    };
    inbound.send(msg).await;
}

/// Löst Hostname zu IPv4-Adresse auf
///
/// Nutzt embassy-net DNS-Stack mit konfigurierbarem Timeout.
async fn resolve_hostname(
    stack: &'static Stack<'static>,
    hostname: &str,
) -> Result<embassy_net::Ipv4Address, NetError> {
    let result = with_timeout(
        Duration::from_secs(DNS_TIMEOUT_SECS),
        stack.dns_query(hostname, DnsQueryType::A),
    )
    .await;

    match result {
        Ok(Ok(addrs)) => addrs
            .iter()
            .find_map(|addr| match addr {
                IpAddress::Ipv4(ipv4) => Some(*ipv4),
                #[allow(unreachable_patterns)]
                _ => None,
            })
            .ok_or(NetError::DnsResolutionFailed),
        Ok(Err(_)) => Err(NetError::DnsResolutionFailed),
        Err(_) => Err(NetError::DnsTimeout),
    }
}

/// Netzwerk Fehler-Typen
///
/// Alle Fehler die beim Verbindungsaufbau auftreten können.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NetError {
    WifiConfig,
    WifiStart,
    Association,
    AssociationTimeout,
    DhcpTimeout,
    DnsResolutionFailed,
    DnsTimeout,
    ConnectionFailed,
    ProtocolError,
    TopicTooLong,
    SubscribeFailed,
}

impl NetError {
    /// Fehler der WLAN-Ebene (rot), alles andere betrifft den Broker (orange)
    fn is_link(self) -> bool {
        matches!(
            self,
            NetError::WifiConfig
                | NetError::WifiStart
                | NetError::Association
                | NetError::AssociationTimeout
                | NetError::DhcpTimeout
        )
    }
}

impl defmt::Format for NetError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            NetError::WifiConfig => defmt::write!(fmt, "WiFi configuration rejected"),
            NetError::WifiStart => defmt::write!(fmt, "WiFi start failed"),
            NetError::Association => defmt::write!(fmt, "Association failed"),
            NetError::AssociationTimeout => defmt::write!(fmt, "Association timeout"),
            NetError::DhcpTimeout => defmt::write!(fmt, "DHCP timeout"),
            NetError::DnsResolutionFailed => defmt::write!(fmt, "DNS failed"),
            NetError::DnsTimeout => defmt::write!(fmt, "DNS timeout"),
            NetError::ConnectionFailed => defmt::write!(fmt, "Connection failed"),
            NetError::ProtocolError => defmt::write!(fmt, "Protocol error"),
            NetError::TopicTooLong => defmt::write!(fmt, "Topic root too long"),
            NetError::SubscribeFailed => defmt::write!(fmt, "Subscribe failed"),
        }
    }
}
