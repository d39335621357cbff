//! Reply text for standings, calendars and results.
//!
//! Upstream dates are `YYYY-MM-DD` with times in UTC (`HH:MM:SSZ`).
//! [`localize`] rewrites a race into display form ("2 марта 2024", "18:00"
//! in the display zone); the text formatters expect localized races.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::ergast::{ConstructorStanding, DriverStanding, Race, RaceResult, Session};
use crate::keyboard::{Button, Card};

const MONTHS: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

pub const UNKNOWN_TIME: &str = "неизвестно";

fn ru_date(date: NaiveDate) -> String {
    format!("{} {} {}", date.day(), MONTHS[date.month0() as usize], date.year())
}

/// `2024-03-02` -> `2 марта 2024`.
pub fn localize_date(date: &str) -> Result<String, chrono::ParseError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map(ru_date)
}

/// Start of a session in UTC. A missing time means midnight.
pub fn parse_session(date: &str, time: Option<&str>) -> Result<DateTime<Utc>, chrono::ParseError> {
    let naive = match time {
        Some(time) => {
            NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%SZ")?
        }
        None => NaiveDate::parse_from_str(date, "%Y-%m-%d")?.and_time(NaiveTime::MIN),
    };
    Ok(Utc.from_utc_datetime(&naive))
}

fn localize_session(session: &Session, tz: Tz) -> Result<Session, chrono::ParseError> {
    if session.date.is_empty() {
        return Ok(session.clone());
    }
    match session.time.as_deref() {
        Some(time) => {
            let local = parse_session(&session.date, Some(time))?.with_timezone(&tz);
            Ok(Session {
                date: ru_date(local.date_naive()),
                time: Some(local.format("%H:%M").to_string()),
            })
        }
        None => Ok(Session {
            date: localize_date(&session.date)?,
            time: Some(UNKNOWN_TIME.to_string()),
        }),
    }
}

fn localize_opt(session: &Option<Session>, tz: Tz) -> Result<Option<Session>, chrono::ParseError> {
    session.as_ref().map(|s| localize_session(s, tz)).transpose()
}

/// Copy of `race` with every session date and time in display form.
pub fn localize(race: &Race, tz: Tz) -> Result<Race, chrono::ParseError> {
    let start = localize_session(&race.start(), tz)?;
    Ok(Race {
        date: start.date,
        time: start.time,
        first_practice: localize_opt(&race.first_practice, tz)?,
        second_practice: localize_opt(&race.second_practice, tz)?,
        third_practice: localize_opt(&race.third_practice, tz)?,
        qualifying: localize_opt(&race.qualifying, tz)?,
        sprint_qualifying: localize_opt(&race.sprint_qualifying, tz)?,
        sprint: localize_opt(&race.sprint, tz)?,
        ..race.clone()
    })
}

/// Whole days between the last race start and `now`, rounded down.
pub fn days_since(last_race: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last_race).num_hours().div_euclid(24)
}

/// True once the final race of the calendar has started.
pub fn season_finished(races: &[Race], now: DateTime<Utc>) -> Result<bool, chrono::ParseError> {
    match races.last() {
        Some(last) => Ok(now >= parse_session(&last.date, last.time.as_deref())?),
        None => Ok(true),
    }
}

/// First race starting strictly after `now`.
pub fn find_next_race(races: &[Race], now: DateTime<Utc>) -> Result<Option<&Race>, chrono::ParseError> {
    for race in races {
        if parse_session(&race.date, race.time.as_deref())? > now {
            return Ok(Some(race));
        }
    }
    Ok(None)
}

pub fn driver_standings(drivers: &[DriverStanding]) -> String {
    drivers
        .iter()
        .map(|d| format!("{:>2} | {:<3} - {:<3} \n", d.position_text, d.driver.code, d.points))
        .collect()
}

pub fn constructor_standings(constructors: &[ConstructorStanding]) -> String {
    constructors
        .iter()
        .map(|c| format!("{:>2} | {} - {:<3} \n", c.position, c.constructor.name, c.points))
        .collect()
}

fn session_text(session: Option<&Session>) -> String {
    match session {
        Some(s) if !s.date.is_empty() => {
            format!("{} {}", s.date, s.time.as_deref().unwrap_or(UNKNOWN_TIME))
        }
        _ => UNKNOWN_TIME.to_string(),
    }
}

/// One calendar entry of a localized race.
pub fn race_summary(race: &Race) -> String {
    format!(
        "Номер этапа: {},\nНазвание этапа: {},\nДата этапа: {},\nВремя этапа: {}.\n\n",
        race.round,
        race.race_name,
        race.date,
        race.time.as_deref().unwrap_or(UNKNOWN_TIME)
    )
}

pub fn calendar(races: &[Race]) -> String {
    races.iter().map(race_summary).collect()
}

/// Weekend schedule of a localized race; sprint weekends list the sprint
/// sessions instead of the second and third practice.
pub fn race_full_info(race: &Race) -> String {
    let start = session_text(Some(&race.start()));
    if race.has_sprint() {
        // Seasons before the SprintQualifying block reported it as the second practice.
        let sprint_qualifying = race.sprint_qualifying.as_ref().or(race.second_practice.as_ref());
        format!(
            "Номер этапа: {},\nНазвание этапа: {},\nВремя гонки: {},\n\nПрактика: {},\nКвалификация: {},\n\nКвалификация спринта: {}, \nСпринт: {}.\n\n",
            race.round,
            race.race_name,
            start,
            session_text(race.first_practice.as_ref()),
            session_text(race.qualifying.as_ref()),
            session_text(sprint_qualifying),
            session_text(race.sprint.as_ref()),
        )
    } else {
        format!(
            "Номер этапа: {},\nНазвание этапа: {},\nВремя гонки: {},\n\nПервая практика: {},\nВторая практика: {}, \nТретья практика: {},\nКвалификация: {}.\n",
            race.round,
            race.race_name,
            start,
            session_text(race.first_practice.as_ref()),
            session_text(race.second_practice.as_ref()),
            session_text(race.third_practice.as_ref()),
            session_text(race.qualifying.as_ref()),
        )
    }
}

/// Right-align the leading cells of each row into columns, then append
/// the row's free-form tail.
fn align_rows(rows: &[(Vec<String>, String)]) -> Vec<String> {
    let columns = rows.iter().map(|(cells, _)| cells.len()).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            let widest = rows
                .iter()
                .filter_map(|(cells, _)| cells.get(i))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            (widest + 1).max(2)
        })
        .collect();

    rows.iter()
        .map(|(cells, tail)| {
            let mut line: String = cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:>width$}"))
                .collect();
            line.push_str(tail);
            line
        })
        .collect()
}

/// `pos | code | time - points`, or `pos | code | - status` for drivers who
/// did not finish. Zero-point finishes drop the points.
pub fn results_table(results: &[RaceResult]) -> String {
    let rows: Vec<(Vec<String>, String)> = results
        .iter()
        .map(|r| {
            let cells = vec![format!("{} |", r.position), format!("{} |", r.driver.code)];
            let time = r.time.as_ref().map(|t| t.time.as_str()).unwrap_or("");
            let tail = if !r.finished() {
                format!(" - {}", r.status)
            } else if r.points != "0" {
                format!(" {} - {}", time, r.points)
            } else {
                format!(" {}", time)
            };
            (cells, tail)
        })
        .collect();

    align_rows(&rows).into_iter().map(|line| line + "\n").collect()
}

/// Each driver followed by the qualifying segments they reached.
pub fn qualifying_table(results: &[RaceResult]) -> String {
    let rows: Vec<(Vec<String>, String)> = results
        .iter()
        .map(|r| (vec![format!("{} |", r.position), format!("{} |", r.driver.code)], String::new()))
        .collect();

    let mut out = String::new();
    for (line, r) in align_rows(&rows).into_iter().zip(results) {
        out.push_str(&line);
        out.push('\n');
        for (name, time) in [("Q1", &r.q1), ("Q2", &r.q2), ("Q3", &r.q3)] {
            if let Some(time) = time.as_deref().filter(|t| !t.is_empty()) {
                out.push_str(&format!(" {name}: {time}\n"));
            }
        }
        out.push('\n');
    }
    out
}

/// Carousel card for a localized race, with result buttons for each
/// session the weekend has.
pub fn grand_prix_card(race: &Race) -> Card {
    let mut buttons = vec![
        Button::new("Результат гонки", format!("raceRes_{}", race.round)),
        Button::new("Результат квалификации", format!("qualRes_{}", race.round)),
    ];
    if race.has_sprint() {
        buttons.push(Button::new("Результат спринта", format!("sprRes_{}", race.round)));
    }

    Card {
        title: race.race_name.clone(),
        description: format!(
            "{}\n{}, {}",
            race.circuit.circuit_name,
            race.date,
            race.time.as_deref().unwrap_or(UNKNOWN_TIME)
        ),
        link: race.url.clone(),
        buttons,
    }
}
