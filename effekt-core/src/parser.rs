//! Command Parser
//!
//! Wandelt einen Skript-Text in eine geordnete Folge von [`Command`]s um.
//! Pure Function ohne Seiteneffekte: entweder das ganze Skript ist gültig
//! oder es gibt einen [`ScriptSyntaxError`] mit Token und Position.
//!
//! Grammatik:
//! ```text
//! script   = command { ";" command }
//! command  = "Fill" pair { pair }
//!          | "SlowFill" duration pair { pair }
//!          | "Slide" duration offset
//!          | "#" ...            (Kommentar)
//! pair     = color count
//! color    = ["#"] hex hex hex hex hex hex
//! ```

use heapless::{String, Vec};

use crate::logic::parse_color;
use crate::script::{
    Command, MAX_SCRIPT_LEN, Script, ScriptSyntaxError, Segment, Segments, SyntaxErrorKind,
};

/// Parst einen kompletten Skript-Text
///
/// # Beispiele
///
/// ```
/// # use effekt_core::{parse, Command};
/// let script = parse("Fill #FF0000 1 ; Slide 0.5 1").unwrap();
/// assert_eq!(script.len(), 2);
/// assert!(matches!(script.commands()[1], Command::Slide { offset: 1, .. }));
/// ```
pub fn parse(source: &str) -> Result<Script, ScriptSyntaxError> {
    let stored: String<MAX_SCRIPT_LEN> = String::try_from(source)
        .map_err(|_| ScriptSyntaxError::new(SyntaxErrorKind::ScriptTooLong, MAX_SCRIPT_LEN, ""))?;

    let mut commands = Vec::new();
    let mut offset = 0;

    for chunk in source.split(';') {
        let mut tokens = Tokens::new(chunk, offset);
        offset += chunk.len() + 1;

        // Leere Kommandos (z.B. nach abschließendem ';') überspringen
        let Some((verb_pos, verb)) = tokens.next() else {
            continue;
        };
        if verb.starts_with('#') {
            continue;
        }

        let command = if verb.eq_ignore_ascii_case("fill") {
            Command::Fill {
                segments: parse_segments(&mut tokens, verb_pos, verb)?,
            }
        } else if verb.eq_ignore_ascii_case("slowfill") {
            let duration = parse_duration(&mut tokens, verb_pos, verb, 0.0, true)?;
            Command::SlowFill {
                duration,
                segments: parse_segments(&mut tokens, verb_pos, verb)?,
            }
        } else if verb.eq_ignore_ascii_case("slide") {
            let period = parse_duration(&mut tokens, verb_pos, verb, 0.0, false)?;
            let (pos, token) = tokens
                .next()
                .ok_or_else(|| ScriptSyntaxError::new(SyntaxErrorKind::MissingArgument, verb_pos, verb))?;
            let shift = token
                .parse::<i16>()
                .map_err(|_| ScriptSyntaxError::new(SyntaxErrorKind::InvalidNumber, pos, token))?;
            if let Some((pos, extra)) = tokens.next() {
                return Err(ScriptSyntaxError::new(
                    SyntaxErrorKind::UnexpectedArgument,
                    pos,
                    extra,
                ));
            }
            Command::Slide {
                period,
                offset: shift,
            }
        } else {
            return Err(ScriptSyntaxError::new(
                SyntaxErrorKind::UnknownVerb,
                verb_pos,
                verb,
            ));
        };

        commands
            .push(command)
            .map_err(|_| ScriptSyntaxError::new(SyntaxErrorKind::TooManyCommands, verb_pos, verb))?;
    }

    Ok(Script::new(commands, stored))
}

/// Liest `(Farbe, Anzahl)`-Paare bis zum Ende des Kommandos
fn parse_segments(
    tokens: &mut Tokens<'_>,
    verb_pos: usize,
    verb: &str,
) -> Result<Segments, ScriptSyntaxError> {
    let mut segments = Segments::new();

    while let Some((color_pos, color_token)) = tokens.next() {
        let color = parse_color(color_token).ok_or_else(|| {
            ScriptSyntaxError::new(SyntaxErrorKind::InvalidColor, color_pos, color_token)
        })?;

        let (count_pos, count_token) = tokens.next().ok_or_else(|| {
            ScriptSyntaxError::new(SyntaxErrorKind::MissingArgument, color_pos, color_token)
        })?;
        let count = count_token.parse::<u16>().map_err(|_| {
            ScriptSyntaxError::new(SyntaxErrorKind::InvalidNumber, count_pos, count_token)
        })?;
        if count == 0 {
            return Err(ScriptSyntaxError::new(
                SyntaxErrorKind::OutOfRange,
                count_pos,
                count_token,
            ));
        }

        segments
            .push(Segment::new(color, count))
            .map_err(|_| {
                ScriptSyntaxError::new(SyntaxErrorKind::TooManySegments, color_pos, color_token)
            })?;
    }

    if segments.is_empty() {
        return Err(ScriptSyntaxError::new(
            SyntaxErrorKind::MissingArgument,
            verb_pos,
            verb,
        ));
    }
    Ok(segments)
}

/// Liest eine Dauer in Sekunden (`min` inklusiv oder exklusiv)
fn parse_duration(
    tokens: &mut Tokens<'_>,
    verb_pos: usize,
    verb: &str,
    min: f32,
    inclusive: bool,
) -> Result<f32, ScriptSyntaxError> {
    let (pos, token) = tokens
        .next()
        .ok_or_else(|| ScriptSyntaxError::new(SyntaxErrorKind::MissingArgument, verb_pos, verb))?;
    let value = token
        .parse::<f32>()
        .map_err(|_| ScriptSyntaxError::new(SyntaxErrorKind::InvalidNumber, pos, token))?;

    let in_range = value.is_finite() && if inclusive { value >= min } else { value > min };
    if !in_range {
        return Err(ScriptSyntaxError::new(
            SyntaxErrorKind::OutOfRange,
            pos,
            token,
        ));
    }
    Ok(value)
}

/// Whitespace-getrennte Tokens mit absolutem Byte-Offset im Skript
struct Tokens<'a> {
    rest: &'a str,
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn new(chunk: &'a str, base: usize) -> Self {
        Self {
            rest: chunk,
            pos: base,
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let trimmed = self.rest.trim_start();
        self.pos += self.rest.len() - trimmed.len();
        if trimmed.is_empty() {
            self.rest = trimmed;
            return None;
        }

        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let token = &trimmed[..end];
        let pos = self.pos;
        self.rest = &trimmed[end..];
        self.pos += end;
        Some((pos, token))
    }
}
