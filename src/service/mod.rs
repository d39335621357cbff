//! F1 replies: fetches from an [`F1Storage`] and formats the answer.
//!
//! An empty upstream table is never an error here. Depending on the
//! request it falls back to an earlier round or the previous season, and
//! otherwise turns into a "not available yet" text.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::ergast::{self, F1Storage, Race, Round};
use crate::format;
use crate::keyboard::Card;


pub const DRIVER_STANDINGS_EMPTY: &str = "Личный зачёт еще не сформирован.";
pub const CONSTRUCTOR_STANDINGS_EMPTY: &str = "Кубок конструкторов еще не сформирован.";
pub const CALENDAR_EMPTY: &str = "Календарь еще не сформирован.";
pub const SEASON_FINISHED: &str = "Сезон закончился!";
pub const RACE_NOT_AVAILABLE: &str =
    "Информации о результатах данной гонки нет. Возможно она появится в будущем :)";
pub const QUALIFYING_NOT_AVAILABLE: &str =
    "Информации о результатах данной квалификации нет. Возможно она появится в будущем :)";
pub const SPRINT_NOT_AVAILABLE: &str =
    "Информации о результатах данной спринт-гонки нет. Возможно она появится в будущем :)";
pub const NO_PAST_RACES: &str = "Информации о прошедших гонках пока нет.";

#[derive(Debug)]
pub enum Error {
    Upstream(ergast::Error),
    Date(chrono::ParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Upstream(e) => write!(f, "upstream: {e}"),
            Error::Date(e) => write!(f, "bad date in upstream data: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Upstream(e) => Some(e),
            Error::Date(e) => Some(e),
        }
    }
}

impl From<ergast::Error> for Error {
    fn from(e: ergast::Error) -> Self {
        Error::Upstream(e)
    }
}

impl From<chrono::ParseError> for Error {
    fn from(e: chrono::ParseError) -> Self {
        Error::Date(e)
    }
}

/// Maps the empty-list sentinel to `None`, keeps real failures.
fn found<T>(result: Result<T, ergast::Error>) -> Result<Option<T>, Error> {
    match result {
        Ok(items) => Ok(Some(items)),
        Err(ergast::Error::EmptyList) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct F1Service<S> {
    storage: S,
    tz: Tz,
}

impl<S: F1Storage> F1Service<S> {
    pub fn new(storage: S, tz: Tz) -> Self {
        Self { storage, tz }
    }

    pub async fn driver_standings_message(&self, year: i32) -> Result<String, Error> {
        match found(self.storage.driver_standings(year).await)? {
            Some(drivers) => Ok(format!(
                "Личный зачёт F1, сезон {year}: \n{}",
                format::driver_standings(&drivers)
            )),
            None => Ok(DRIVER_STANDINGS_EMPTY.to_string()),
        }
    }

    pub async fn constructor_standings_message(&self, year: i32) -> Result<String, Error> {
        match found(self.storage.constructor_standings(year).await)? {
            Some(teams) => Ok(format!(
                "Кубок конструкторов F1, сезон {year}:\n{}",
                format::constructor_standings(&teams)
            )),
            None => Ok(CONSTRUCTOR_STANDINGS_EMPTY.to_string()),
        }
    }

    pub async fn calendar_message(&self, year: i32) -> Result<String, Error> {
        let Some(races) = found(self.storage.calendar(year).await)? else {
            return Ok(CALENDAR_EMPTY.to_string());
        };
        let localized = races
            .iter()
            .map(|race| format::localize(race, self.tz))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("Календарь F1, сезон {year}:\n{}", format::calendar(&localized)))
    }

    pub async fn next_race_message(&self, now: DateTime<Utc>) -> Result<String, Error> {
        let Some(races) = found(self.storage.calendar(now.year()).await)? else {
            return Ok(CALENDAR_EMPTY.to_string());
        };
        if format::season_finished(&races, now)? {
            return Ok(SEASON_FINISHED.to_string());
        }
        match format::find_next_race(&races, now)? {
            Some(race) => Ok(format!(
                "Следующий гран-при:\n{}",
                format::race_full_info(&format::localize(race, self.tz)?)
            )),
            None => Ok(SEASON_FINISHED.to_string()),
        }
    }

    /// Results of `round`. A numbered round without results falls back to
    /// the round before it; `last` falls back to the previous season.
    pub async fn race_results_message(&self, year: i32, round: Round) -> Result<String, Error> {
        let mut current = round;
        let race = loop {
            if let Some(races) = found(self.storage.race_results(year, current).await)? {
                break races.into_iter().next();
            }
            match current {
                Round::Number(n) if n > 1 => {
                    info!("No results for {year} round {n}, trying round {}", n - 1);
                    current = Round::Number(n - 1);
                }
                Round::Number(_) => break None,
                Round::Last => {
                    info!("No results for {year} yet, using {}", year - 1);
                    break found(self.storage.race_results(year - 1, Round::Last).await)?
                        .and_then(|races| races.into_iter().next());
                }
            }
        };

        let Some(race) = race else {
            return Ok(RACE_NOT_AVAILABLE.to_string());
        };
        let title = match round {
            Round::Last => "Последняя гонка F1",
            Round::Number(_) => "Результаты гонки",
        };
        Ok(format!("{title} {}:\n{}", race.race_name, format::results_table(&race.results)))
    }

    /// Qualifying of `round`, or of the same round a season earlier.
    pub async fn qualifying_results_message(&self, year: i32, round: Round) -> Result<String, Error> {
        let race = match found(self.storage.qualifying_results(year, round).await)? {
            Some(races) => races.into_iter().next(),
            None => found(self.storage.qualifying_results(year - 1, round).await)?
                .and_then(|races| races.into_iter().next()),
        };

        let Some(race) = race else {
            return Ok(QUALIFYING_NOT_AVAILABLE.to_string());
        };
        let title = match round {
            Round::Last => "Последняя квалификация",
            Round::Number(_) => "Результаты квалификации",
        };
        Ok(format!(
            "{title} {}:\n{}",
            race.race_name,
            format::qualifying_table(&race.qualifying_results)
        ))
    }

    pub async fn sprint_results_message(&self, year: i32, round: Round) -> Result<String, Error> {
        if round == Round::Last {
            return Ok(SPRINT_NOT_AVAILABLE.to_string());
        }
        let race = found(self.storage.sprint_results(year, round).await)?
            .and_then(|races| races.into_iter().next());
        match race {
            Some(race) => Ok(format!(
                "Результаты спринт-гонки {}:\n{}",
                race.race_name,
                format::results_table(&race.sprint_results)
            )),
            None => Ok(SPRINT_NOT_AVAILABLE.to_string()),
        }
    }

    async fn race_or_previous_season(&self, year: i32, round: Round) -> Result<Option<Race>, Error> {
        if let Some(races) = found(self.storage.race_info(year, round).await)? {
            return Ok(races.into_iter().next());
        }
        Ok(found(self.storage.race_info(year - 1, round).await)?.and_then(|races| races.into_iter().next()))
    }

    /// Carousel card for a grand prix, `None` when neither this nor the
    /// previous season has it.
    pub async fn grand_prix_card(&self, year: i32, round: Round) -> Result<Option<Card>, Error> {
        match self.race_or_previous_season(year, round).await? {
            Some(race) => Ok(Some(format::grand_prix_card(&format::localize(&race, self.tz)?))),
            None => {
                warn!("No grand prix {round} in {year} or {}", year - 1);
                Ok(None)
            }
        }
    }

    pub async fn days_after_race_message(&self, now: DateTime<Utc>) -> Result<String, Error> {
        let Some(race) = self.race_or_previous_season(now.year(), Round::Last).await? else {
            return Ok(NO_PAST_RACES.to_string());
        };
        let start = format::parse_session(&race.date, race.time.as_deref())?;
        Ok(format!("Дней без F1 - {} :(\n", format::days_since(start, now)))
    }

    /// Number of grand prix in the season, zero before the calendar is out.
    pub async fn count_of_races(&self, year: i32) -> Result<usize, Error> {
        Ok(found(self.storage.calendar(year).await)?.map_or(0, |races| races.len()))
    }
}
