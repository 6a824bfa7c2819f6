// Library-Root: Hardware-Adapter, Tasks und Konfiguration
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod tasks;

// Re-exports von effekt-core
pub use effekt_core::{
    DeviceConfig, DeviceContext, InboundMessage, LedError, PixelBuffer, ScriptStore,
    SmartLedWriter, StatusCode,
};

// Embassy Channel-Typen
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_sync::signal::Signal;

use crate::config::INBOUND_QUEUE_SIZE;

// ============================================================================
// Type-Aliase für Channel-Typen
// ============================================================================
//
// Diese Type-Aliase vereinfachen die Lesbarkeit der Funktionssignaturen.
// Statt:  Sender<'static, NoopRawMutex, InboundMessage, 8>
// Nutze:  InboundSender

/// Channel für Steuer-Nachrichten (Netzwerk-Task → Effekt-Loop)
/// - INBOUND_QUEUE_SIZE: Nachrichten-Kapazität
pub type InboundChannel = Channel<NoopRawMutex, InboundMessage, INBOUND_QUEUE_SIZE>;

/// Sender für Steuer-Nachrichten (Netzwerk-Task)
pub type InboundSender = Sender<'static, NoopRawMutex, InboundMessage, INBOUND_QUEUE_SIZE>;

/// Receiver für Steuer-Nachrichten (Effekt-Loop, max. DISPATCH_BATCH pro Durchlauf)
pub type InboundReceiver = Receiver<'static, NoopRawMutex, InboundMessage, INBOUND_QUEUE_SIZE>;

/// Verbindungsstatus (Netzwerk-Task → Status-LED)
/// Nur der letzte Wert zählt
pub type StatusSignal = Signal<NoopRawMutex, StatusCode>;
