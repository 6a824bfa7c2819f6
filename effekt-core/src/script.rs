//! Skript-Datenmodell
//!
//! Ein [`Script`] ist die geparste, unveränderliche Form eines Effekt-Skripts
//! zusammen mit seinem Quelltext.

use heapless::{String, Vec};
use rgb::RGB8;

/// Maximale Anzahl Kommandos pro Skript
pub const MAX_COMMANDS: usize = 16;

/// Maximale Anzahl `(Farbe, Anzahl)`-Paare pro Fill/SlowFill
pub const MAX_SEGMENTS: usize = 8;

/// Maximale Länge des Skript-Quelltexts in Bytes
pub const MAX_SCRIPT_LEN: usize = 512;

/// Maximale Länge des fehlerhaften Tokens in einem Syntaxfehler
pub const MAX_TOKEN_LEN: usize = 24;

/// Ein Abschnitt gleicher Farbe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub color: RGB8,
    pub count: u16,
}

impl Segment {
    pub const fn new(color: RGB8, count: u16) -> Self {
        Self { color, count }
    }
}

pub type Segments = Vec<Segment, MAX_SEGMENTS>;

/// Ein einzelnes Skript-Kommando
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Statischer Frame: das Segment-Muster wird zyklisch über den Buffer wiederholt
    Fill { segments: Segments },
    /// Segmente der Reihe nach, Pixel für Pixel über `duration` Sekunden eingeblendet
    SlowFill { duration: f32, segments: Segments },
    /// Rotiert den Frame alle `period` Sekunden um `offset` Pixel (endlos)
    Slide { period: f32, offset: i16 },
}

impl Command {
    /// Name des Verbs, wie er im Skript steht
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Fill { .. } => "Fill",
            Command::SlowFill { .. } => "SlowFill",
            Command::Slide { .. } => "Slide",
        }
    }

    /// Farbe für Pixel `index` eines zyklisch wiederholten Musters
    pub(crate) fn pattern_color(segments: &[Segment], index: usize) -> RGB8 {
        let period: usize = segments.iter().map(|s| s.count as usize).sum();
        let mut pos = index % period.max(1);
        for segment in segments {
            let count = segment.count as usize;
            if pos < count {
                return segment.color;
            }
            pos -= count;
        }
        RGB8::default()
    }

    /// Farbe für Pixel `index` bei aufeinanderfolgenden Segmenten ohne Wiederholung
    pub(crate) fn segment_color(segments: &[Segment], index: usize) -> Option<RGB8> {
        let mut pos = index;
        for segment in segments {
            let count = segment.count as usize;
            if pos < count {
                return Some(segment.color);
            }
            pos -= count;
        }
        None
    }

    pub(crate) fn segment_total(segments: &[Segment]) -> usize {
        segments.iter().map(|s| s.count as usize).sum()
    }
}

/// Geparstes Skript inklusive Original-Quelltext (für Persistenz und Replay)
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    commands: Vec<Command, MAX_COMMANDS>,
    source: String<MAX_SCRIPT_LEN>,
}

impl Script {
    pub(crate) fn new(commands: Vec<Command, MAX_COMMANDS>, source: String<MAX_SCRIPT_LEN>) -> Self {
        Self { commands, source }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Erstes SlowFill-Kommando, dessen Segmente nicht genau `length` Pixel abdecken
    ///
    /// Keine harte Fehlerbedingung: überzählige Segmente werden abgeschnitten,
    /// fehlende Pixel behalten den vorherigen Frame.
    pub fn coverage_mismatch(&self, length: usize) -> Option<CoverageMismatch> {
        self.commands
            .iter()
            .enumerate()
            .find_map(|(index, command)| match command {
                Command::SlowFill { segments, .. } => {
                    let covered = Command::segment_total(segments);
                    (covered != length).then_some(CoverageMismatch {
                        command_index: index,
                        covered,
                        length,
                    })
                }
                _ => None,
            })
    }
}

/// Warnung: SlowFill-Segmente passen nicht zur Buffer-Länge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoverageMismatch {
    pub command_index: usize,
    pub covered: usize,
    pub length: usize,
}

/// Art des Syntaxfehlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyntaxErrorKind {
    UnknownVerb,
    MissingArgument,
    UnexpectedArgument,
    InvalidColor,
    InvalidNumber,
    OutOfRange,
    TooManyCommands,
    TooManySegments,
    ScriptTooLong,
}

impl SyntaxErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SyntaxErrorKind::UnknownVerb => "unknown verb",
            SyntaxErrorKind::MissingArgument => "missing argument",
            SyntaxErrorKind::UnexpectedArgument => "unexpected argument",
            SyntaxErrorKind::InvalidColor => "invalid color",
            SyntaxErrorKind::InvalidNumber => "invalid number",
            SyntaxErrorKind::OutOfRange => "value out of range",
            SyntaxErrorKind::TooManyCommands => "too many commands",
            SyntaxErrorKind::TooManySegments => "too many segments",
            SyntaxErrorKind::ScriptTooLong => "script too long",
        }
    }
}

/// Fehler beim Parsen eines Skripts
///
/// `position` ist der Byte-Offset des fehlerhaften Tokens im Quelltext,
/// `token` sein (ggf. gekürzter) Text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSyntaxError {
    pub kind: SyntaxErrorKind,
    pub position: usize,
    pub token: String<MAX_TOKEN_LEN>,
}

impl ScriptSyntaxError {
    pub(crate) fn new(kind: SyntaxErrorKind, position: usize, token: &str) -> Self {
        let mut truncated = String::new();
        for c in token.chars() {
            if truncated.push(c).is_err() {
                break;
            }
        }
        Self {
            kind,
            position,
            token: truncated,
        }
    }
}

impl core::fmt::Display for ScriptSyntaxError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} at byte {}: '{}'",
            self.kind.as_str(),
            self.position,
            self.token.as_str()
        )
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ScriptSyntaxError {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "ScriptSyntaxError {{ kind: {}, position: {}, token: '{}' }}",
            self.kind,
            self.position,
            self.token.as_str()
        )
    }
}
