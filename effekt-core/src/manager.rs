//! ScriptManager - besitzt ein Skript, seinen Sequencer und die Start-Policy
//!
//! Zwei Varianten:
//! - [`BootScript`]: wird persistiert und beim Start wiederhergestellt
//! - [`EventScript`]: wird nur per [`EventScript::trigger`] (neu) gestartet

use heapless::String;
use rgb::RGB8;

use crate::parser::parse;
use crate::script::{MAX_SCRIPT_LEN, Script, ScriptSyntaxError};
use crate::sequencer::{LoopPolicy, Sequencer};
use crate::storage::{RECORD_CAPACITY, StoreError, decode_record, encode_record};
use crate::traits::ScriptStore;

/// Neutrales Boot-Skript wenn nichts gespeichert ist: alles aus
pub const DEFAULT_BOOT_SCRIPT: &str = "Fill #000000 1";

/// Ergebnis eines erfolgreichen `load()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadOutcome {
    /// Neues Skript ist aktiv
    Loaded,
    /// Identischer Quelltext, nichts geändert
    Unchanged,
    /// Neues Skript ist aktiv, konnte aber nicht gespeichert werden
    NotPersisted(StoreError),
}

/// Woher das Boot-Skript beim Start kam
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RestoreOutcome {
    Persisted,
    Default(StoreError),
}

/// Gemeinsamer Teil beider Varianten
pub struct ScriptManager<const N: usize> {
    script: Option<Script>,
    sequencer: Sequencer<N>,
    start_on_load: bool,
}

impl<const N: usize> ScriptManager<N> {
    pub fn new(policy: LoopPolicy, start_on_load: bool) -> Self {
        Self {
            script: None,
            sequencer: Sequencer::new(policy),
            start_on_load,
        }
    }

    pub fn script(&self) -> Option<&Script> {
        self.script.as_ref()
    }

    pub fn source(&self) -> Option<&str> {
        self.script.as_ref().map(Script::source)
    }

    pub fn sequencer(&self) -> &Sequencer<N> {
        &self.sequencer
    }

    pub fn frame(&self) -> &[RGB8] {
        self.sequencer.frame()
    }

    pub fn is_running(&self) -> bool {
        self.sequencer.is_running()
    }

    /// Parst `source` und tauscht das Skript atomar aus
    ///
    /// Bei einem Syntaxfehler bleibt der bisherige Zustand komplett erhalten.
    pub fn load(&mut self, source: &str) -> Result<LoadOutcome, ScriptSyntaxError> {
        if self.source() == Some(source) {
            return Ok(LoadOutcome::Unchanged);
        }
        let script = parse(source)?;
        self.script = Some(script);
        if self.start_on_load {
            self.sequencer.start();
        } else {
            self.sequencer.stop();
        }
        Ok(LoadOutcome::Loaded)
    }

    /// Startet das aktuelle Skript von vorne, `false` wenn keins geladen ist
    pub fn restart(&mut self) -> bool {
        if self.script.is_none() {
            return false;
        }
        self.sequencer.start();
        true
    }

    /// Delegiert an den Sequencer, `true` wenn sich der Frame geändert hat
    pub fn tick(&mut self, elapsed: f32, length: usize) -> bool {
        match &self.script {
            Some(script) => self.sequencer.tick(script, elapsed, length),
            None => false,
        }
    }
}

/// Boot-Skript: persistiert, startet automatisch
pub struct BootScript<S: ScriptStore, const N: usize> {
    manager: ScriptManager<N>,
    store: S,
    persisted: Option<String<MAX_SCRIPT_LEN>>,
}

impl<S: ScriptStore, const N: usize> BootScript<S, N> {
    pub fn new(store: S, policy: LoopPolicy) -> Self {
        Self {
            manager: ScriptManager::new(policy, true),
            store,
            persisted: None,
        }
    }

    pub fn manager(&self) -> &ScriptManager<N> {
        &self.manager
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn frame(&self) -> &[RGB8] {
        self.manager.frame()
    }

    pub fn is_running(&self) -> bool {
        self.manager.is_running()
    }

    pub fn tick(&mut self, elapsed: f32, length: usize) -> bool {
        self.manager.tick(elapsed, length)
    }

    /// Stellt das gespeicherte Skript wieder her, sonst [`DEFAULT_BOOT_SCRIPT`]
    pub fn load_persisted(&mut self) -> RestoreOutcome {
        let mut raw = [0u8; RECORD_CAPACITY];
        let restored = self
            .store
            .read(&mut raw)
            .and_then(|_| decode_record(&raw))
            .and_then(|text| {
                self.manager
                    .load(&text)
                    .map_err(|_| StoreError::Corrupt)?;
                Ok(text)
            });

        match restored {
            Ok(text) => {
                self.persisted = Some(text);
                RestoreOutcome::Persisted
            }
            Err(reason) => {
                // Default wird bewusst nicht gespeichert
                let _ = self.manager.load(DEFAULT_BOOT_SCRIPT);
                RestoreOutcome::Default(reason)
            }
        }
    }

    /// Lädt ein neues Boot-Skript und speichert es
    ///
    /// Geschrieben wird nur wenn sich der Text vom gespeicherten unterscheidet.
    pub fn load(&mut self, source: &str) -> Result<LoadOutcome, ScriptSyntaxError> {
        let outcome = self.manager.load(source)?;
        if outcome == LoadOutcome::Unchanged {
            return Ok(outcome);
        }
        match self.persist(source) {
            Ok(()) => Ok(LoadOutcome::Loaded),
            Err(e) => Ok(LoadOutcome::NotPersisted(e)),
        }
    }

    fn persist(&mut self, source: &str) -> Result<(), StoreError> {
        if self.persisted.as_deref() == Some(source) {
            return Ok(());
        }
        let mut raw = [0u8; RECORD_CAPACITY];
        let len = encode_record(source, &mut raw)?;
        self.store.write(&raw[..len])?;
        self.persisted = String::try_from(source).ok();
        Ok(())
    }
}

/// Event-Skript: nicht persistiert, läuft nur nach `trigger()`
pub struct EventScript<const N: usize> {
    manager: ScriptManager<N>,
}

impl<const N: usize> EventScript<N> {
    pub fn new(policy: LoopPolicy) -> Self {
        Self {
            manager: ScriptManager::new(policy, false),
        }
    }

    pub fn manager(&self) -> &ScriptManager<N> {
        &self.manager
    }

    pub fn frame(&self) -> &[RGB8] {
        self.manager.frame()
    }

    pub fn is_running(&self) -> bool {
        self.manager.is_running()
    }

    pub fn tick(&mut self, elapsed: f32, length: usize) -> bool {
        self.manager.tick(elapsed, length)
    }

    /// Ersetzt das Event-Skript, es läuft erst nach dem nächsten Trigger
    pub fn load(&mut self, source: &str) -> Result<LoadOutcome, ScriptSyntaxError> {
        self.manager.load(source)
    }

    /// Startet das Event-Skript von vorne, egal wo es gerade steht
    ///
    /// Doppelte Trigger müssen vom Aufrufer entprellt werden.
    pub fn trigger(&mut self) -> bool {
        self.manager.restart()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Slot im RAM
    struct RamStore {
        data: [u8; RECORD_CAPACITY],
        writes: usize,
    }

    impl RamStore {
        fn erased() -> Self {
            Self {
                data: [0xFF; RECORD_CAPACITY],
                writes: 0,
            }
        }
    }

    impl ScriptStore for RamStore {
        fn read(&mut self, buf: &mut [u8]) -> Result<(), StoreError> {
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            Ok(())
        }

        fn write(&mut self, data: &[u8]) -> Result<(), StoreError> {
            self.data[..data.len()].copy_from_slice(data);
            self.writes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_failed_load_keeps_previous_script() {
        let mut manager: ScriptManager<4> = ScriptManager::new(LoopPolicy::Hold, true);
        manager.load("Fill #FF0000 1").unwrap();
        assert!(manager.load("Fill #FF0000").is_err());
        assert_eq!(manager.source(), Some("Fill #FF0000 1"));
        assert!(manager.is_running());
    }

    #[test]
    fn test_identical_source_is_unchanged() {
        let mut manager: ScriptManager<4> = ScriptManager::new(LoopPolicy::Hold, true);
        assert_eq!(manager.load("Slide 1 1"), Ok(LoadOutcome::Loaded));
        assert_eq!(manager.load("Slide 1 1"), Ok(LoadOutcome::Unchanged));
    }

    #[test]
    fn test_boot_restores_default_from_erased_store() {
        let mut boot: BootScript<_, 4> = BootScript::new(RamStore::erased(), LoopPolicy::Hold);
        assert_eq!(
            boot.load_persisted(),
            RestoreOutcome::Default(StoreError::Empty)
        );
        assert_eq!(boot.manager().source(), Some(DEFAULT_BOOT_SCRIPT));
        assert_eq!(boot.store().writes, 0);
    }

    #[test]
    fn test_boot_persists_only_on_change() {
        let mut boot: BootScript<_, 4> = BootScript::new(RamStore::erased(), LoopPolicy::Hold);
        boot.load("Fill #00FF00 1").unwrap();
        boot.load("Fill #00FF00 1").unwrap();
        assert_eq!(boot.store().writes, 1);
    }

    #[test]
    fn test_event_waits_for_trigger() {
        let mut event: EventScript<4> = EventScript::new(LoopPolicy::Hold);
        assert!(!event.trigger());
        event.load("Fill #FF0000 1").unwrap();
        assert!(!event.is_running());
        event.tick(1.0, 4);
        assert_eq!(event.frame(), &[RGB8::default(); 4]);
        assert!(event.trigger());
        assert!(event.is_running());
    }
}
