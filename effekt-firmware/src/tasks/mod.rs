// Task-Modul: Enthält alle Embassy Tasks
//
// Jeder Task läuft asynchron und unabhängig.
// Netzwerk → Effekt-Loop über einen Channel (Steuer-Nachrichten)
// und ein Signal (Verbindungsstatus).

pub mod alert;
pub mod effects;
pub mod network;

// Re-export Tasks für einfachen Import
pub use effects::{EffectsResources, effects_task};
pub use network::{net_task, network_task};
