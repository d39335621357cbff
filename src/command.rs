//! Intent classification for free text and button payloads.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    DriverStandings,
    Calendar,
    NextRace,
    ConstructorStandingsFull,
    ConstructorStandings,
    LastRaceResult,
    LastQualifyingResult,
    LastSprintResult,
    Help,
    Hello,
    DaysAfterRace,
    DaysAfterRaceShort,
    Stream,
    LastGrandPrix,
    GrandPrixList,
    RaceResult,
    QualifyingResult,
    SprintResult,
    CloseKeyboard,
    GrandPrixInfo,
    GrandPrixListPage,
    Unknown,
}

/// Patterns in priority order; the first match wins.
///
/// `кк` sits after the full constructor-cup phrase and also matches inside
/// unrelated words, so reordering changes which intent a message gets.
const PATTERNS: &[(&str, Command)] = &[
    (r"личн.*зач[её]т", Command::DriverStandings),
    (r"календар.*сезона", Command::Calendar),
    (r"следующ.*гонк", Command::NextRace),
    (r"куб.*конструктор", Command::ConstructorStandingsFull),
    (r"кк", Command::ConstructorStandings),
    (r"результат.?\sгонк", Command::LastRaceResult),
    (r"результат.?\sквалы", Command::LastQualifyingResult),
    (r"результат.?\sспринта", Command::LastSprintResult),
    (r"что умеешь", Command::Help),
    (r"начать", Command::Hello),
    (r"дней без (формулы|f1)", Command::DaysAfterRace),
    (r"дбф", Command::DaysAfterRaceShort),
    (r"strstart", Command::Stream),
    (r"ласт гп", Command::LastGrandPrix),
    (r"этапы", Command::GrandPrixList),
    (r"raceres_\d{1,2}", Command::RaceResult),
    (r"qualres_\d{1,2}", Command::QualifyingResult),
    (r"sprres_\d{1,2}", Command::SprintResult),
    (r"выклкб", Command::CloseKeyboard),
    (r"gppage_\d{1,2}", Command::GrandPrixInfo),
    (r"gplistpage_\d{1,2}", Command::GrandPrixListPage),
];

static TABLE: LazyLock<Vec<(Regex, Command)>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .map(|(pattern, command)| {
            let re = Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern {pattern}: {e}"));
            (re, *command)
        })
        .collect()
});

/// Classify message text or a payload command string.
pub fn classify(text: &str) -> Command {
    let text = text.to_lowercase();
    TABLE
        .iter()
        .find(|(re, _)| re.is_match(&text))
        .map(|(_, command)| *command)
        .unwrap_or(Command::Unknown)
}

#[derive(Deserialize)]
struct Payload {
    #[serde(default)]
    command: String,
}

/// Extract the `command` field from a button payload.
///
/// Returns `Ok(None)` for an absent payload so callers fall back to the
/// message text.
pub fn extract_command(payload: &str) -> Result<Option<String>, serde_json::Error> {
    if payload.trim().is_empty() {
        return Ok(None);
    }
    let payload: Payload = serde_json::from_str(payload)?;
    Ok(Some(payload.command).filter(|c| !c.is_empty()))
}

/// Same as [`extract_command`] for payloads already decoded as JSON.
pub fn extract_command_value(payload: &serde_json::Value) -> Result<Option<String>, serde_json::Error> {
    match payload {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => extract_command(s),
        other => {
            let payload: Payload = serde_json::from_value(other.clone())?;
            Ok(Some(payload.command).filter(|c| !c.is_empty()))
        }
    }
}

/// The id after the first underscore: `raceRes_5` -> `5`.
pub fn command_arg(command: &str) -> Option<&str> {
    command
        .split_once('_')
        .map(|(_, arg)| arg.trim())
        .filter(|arg| !arg.is_empty())
}
