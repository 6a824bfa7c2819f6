//! Core Types für die Fernsteuerung
//!
//! Datenstrukturen ohne Hardware-Dependencies

use heapless::String;

use crate::script::MAX_SCRIPT_LEN;

/// Steuer-Topic, relativ zur konfigurierten Topic-Root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlTopic {
    /// `/length` - Integer, aktive Pixel-Anzahl
    Length,
    /// `/brightness` - Float aus `[0, 1]`
    Brightness,
    /// `/script/init` - Boot-Skript ersetzen und speichern
    InitScript,
    /// `/script/event` - Event-Skript ersetzen
    EventScript,
    /// `/event/trigger` - Event-Skript neu starten (bei neuem Token)
    EventTrigger,
}

impl ControlTopic {
    pub const ALL: [ControlTopic; 5] = [
        ControlTopic::Length,
        ControlTopic::Brightness,
        ControlTopic::InitScript,
        ControlTopic::EventScript,
        ControlTopic::EventTrigger,
    ];

    pub fn suffix(self) -> &'static str {
        match self {
            ControlTopic::Length => "/length",
            ControlTopic::Brightness => "/brightness",
            ControlTopic::InitScript => "/script/init",
            ControlTopic::EventScript => "/script/event",
            ControlTopic::EventTrigger => "/event/trigger",
        }
    }

    /// Ordnet ein vollständiges Topic einem Steuer-Topic zu
    ///
    /// # Beispiele
    ///
    /// ```
    /// # use effekt_core::ControlTopic;
    /// assert_eq!(
    ///     ControlTopic::parse("home/strip", "home/strip/brightness"),
    ///     Some(ControlTopic::Brightness)
    /// );
    /// assert_eq!(ControlTopic::parse("home/strip", "home/other/length"), None);
    /// ```
    pub fn parse(root: &str, topic: &str) -> Option<Self> {
        let rest = topic.strip_prefix(root.trim_end_matches('/'))?;
        Self::ALL.into_iter().find(|t| t.suffix() == rest)
    }
}

/// Eingehende Steuer-Nachricht (Netzwerk-Task → Effekt-Loop)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: ControlTopic,
    pub payload: String<MAX_SCRIPT_LEN>,
}

impl InboundMessage {
    /// `None` wenn der Payload nicht in den Puffer passt
    pub fn new(topic: ControlTopic, payload: &str) -> Option<Self> {
        Some(Self {
            topic,
            payload: String::try_from(payload).ok()?,
        })
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for InboundMessage {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "InboundMessage {{ topic: {}, payload: '{}' }}",
            self.topic.suffix(),
            self.payload.as_str()
        )
    }
}
