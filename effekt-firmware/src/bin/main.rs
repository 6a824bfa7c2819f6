// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
// Verbiete große Stack-Frames (Stack ist auf Embedded Systemen begrenzt)
#![deny(clippy::large_stack_frames)]

// Heap Allocator (WiFi benötigt dynamischen Speicher)
extern crate alloc;

use defmt::{Debug2Format, error, info};

// Embassy Async Runtime
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, Stack, StackResources};
use embassy_time::{Duration, Timer};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::gpio::Pin;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use esp_storage::FlashStorage;

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

// Projekt-Module und Konfiguration
use effekt_core::StripPin;
use effekt_core::config::fallback_strip;
use esp_effekt_steuerung::config::{EXTRA_HEAP_SIZE, RAW_CONFIG, STRIP_CAPACITY, WIFI_HEAP_SIZE};
use esp_effekt_steuerung::hal::BootButton;
use esp_effekt_steuerung::tasks::{EffectsResources, effects_task, net_task, network_task};
use esp_effekt_steuerung::{DeviceConfig, InboundChannel, StatusSignal};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
// Ohne diesen schlägt das Flashen mit "ESP-IDF App Descriptor missing" fehl
esp_bootloader_esp_idf::esp_app_desc!();

/// Main Entry Point
///
/// Prüft die Konfiguration, initialisiert Hardware und WiFi und spawnt
/// den Effekt-Loop und den Netzwerk-Task. Danach schläft main().
///
/// Bei ungültiger Konfiguration startet nur der Effekt-Loop: er zeigt
/// zuerst den Alarm-Modus und spielt danach das gespeicherte Boot-Skript.
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // ESP32-C6 Konfiguration: CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Heap Allocator initialisieren (WiFi braucht dynamischen Speicher!)
    // Zwei Bereiche: reclaimed RAM (64 KB) + extra (36 KB) = 100 KB total
    esp_alloc::heap_allocator!(
        #[esp_hal::ram(reclaimed)]
        size: WIFI_HEAP_SIZE
    );
    esp_alloc::heap_allocator!(size: EXTRA_HEAP_SIZE);

    // Embassy Runtime initialisieren (Timer + Software Interrupt)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt =
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    // Konfiguration prüfen (Werte aus .env, siehe build.rs)
    let device_config = DeviceConfig::parse(&RAW_CONFIG, STRIP_CAPACITY);
    let (strip_choice, strip_length, alert) = match &device_config {
        Ok(cfg) => {
            info!(
                "Config: broker {}:{}, topic root '{}'",
                cfg.mqtt_broker, cfg.mqtt_port, cfg.topic_root
            );
            (cfg.strip_pin, cfg.strip_length, None)
        }
        Err(e) => {
            error!("Config: {} - running offline", e);
            let (pin, length) = fallback_strip(&RAW_CONFIG, STRIP_CAPACITY);
            (pin, length, Some(e.alert_status()))
        }
    };

    info!("Config: strip on {} with {} LEDs", strip_choice, strip_length);

    // Strip-Ausgang wählen, GPIO8 ist sonst die Status-LED
    let onboard = peripherals.GPIO8.degrade();
    let (strip_pin, status_pin) = match strip_choice {
        StripPin::Gpio2 => (peripherals.GPIO2.degrade(), Some(onboard)),
        StripPin::Gpio4 => (peripherals.GPIO4.degrade(), Some(onboard)),
        StripPin::Gpio5 => (peripherals.GPIO5.degrade(), Some(onboard)),
        StripPin::Gpio8 => (onboard, None),
    };

    // Channel Netzwerk → Effekt-Loop und Status-Signal
    static INBOUND_CHANNEL: static_cell::StaticCell<InboundChannel> =
        static_cell::StaticCell::new();
    let inbound_channel = &*INBOUND_CHANNEL.init(InboundChannel::new());

    static STATUS_SIGNAL: static_cell::StaticCell<StatusSignal> = static_cell::StaticCell::new();
    let status_signal = &*STATUS_SIGNAL.init(StatusSignal::new());

    // Spawn Effekt Task
    let resources = EffectsResources {
        rmt: peripherals.RMT,
        strip_pin,
        status_pin,
        flash: FlashStorage::new(peripherals.FLASH),
        button: BootButton::new(peripherals.GPIO9),
    };
    spawner
        .spawn(effects_task(
            resources,
            strip_length,
            alert,
            inbound_channel.receiver(),
            status_signal,
        ))
        .expect("Failed to spawn effects task");

    // Ohne gültige Konfiguration kein Netzwerk
    let Ok(device_config) = device_config else {
        idle().await
    };

    // WiFi Hardware initialisieren
    static RADIO_INIT: static_cell::StaticCell<esp_radio::Controller> =
        static_cell::StaticCell::new();
    let radio = match esp_radio::init() {
        Ok(radio) => RADIO_INIT.init(radio),
        Err(e) => {
            error!("WiFi: Radio init failed: {} - running offline", Debug2Format(&e));
            idle().await
        }
    };

    let (wifi_controller, wifi_interface) =
        match esp_radio::wifi::new(radio, peripherals.WIFI, Default::default()) {
            Ok(wifi) => wifi,
            Err(e) => {
                error!("WiFi: Init failed: {} - running offline", Debug2Format(&e));
                idle().await
            }
        };

    // Netzwerk-Stack erstellen
    // Random seed für TCP/IP Stack (von Hardware RNG)
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    // Static resources für embassy-net: MQTT-Socket + DNS
    static RESOURCES: static_cell::StaticCell<StackResources<3>> = static_cell::StaticCell::new();
    let resources = RESOURCES.init(StackResources::new());

    // embassy-net erstellt Stack + Runner (nutzt STA interface für Client-Modus)
    let (stack, runner) = embassy_net::new(
        wifi_interface.sta,
        NetConfig::dhcpv4(Default::default()),
        resources,
        seed,
    );

    // Stack muss 'static sein für Tasks
    static STACK: static_cell::StaticCell<Stack<'static>> = static_cell::StaticCell::new();
    let stack = &*STACK.init(stack);

    // Spawn Netzwerk Tasks
    spawner
        .spawn(net_task(runner))
        .expect("Failed to spawn net task");
    spawner
        .spawn(network_task(
            wifi_controller,
            stack,
            device_config,
            inbound_channel.sender(),
            status_signal,
        ))
        .expect("Failed to spawn network task");

    idle().await
}

/// Main-Loop: schläft (alle Arbeit läuft in Tasks)
async fn idle() -> ! {
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
