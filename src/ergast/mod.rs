//! Client for the Ergast-compatible F1 statistics API.

pub mod models;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

pub use models::{ConstructorStanding, DriverStanding, Race, RaceResult, Session};

/// A race weekend within a season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Round {
    Last,
    Number(u32),
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Round::Last => write!(f, "last"),
            Round::Number(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Round {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "last" => Ok(Round::Last),
            other => other.parse().map(Round::Number),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    Api(String),
    Parse(String),
    /// The request succeeded but the table has no entries yet.
    EmptyList,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api(e) => write!(f, "API error: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::EmptyList => write!(f, "Empty list"),
        }
    }
}

impl std::error::Error for Error {}

/// Source of F1 data. Every operation returns [`Error::EmptyList`] rather
/// than an empty vector.
pub trait F1Storage: Send + Sync {
    fn driver_standings(&self, year: i32) -> impl Future<Output = Result<Vec<DriverStanding>, Error>> + Send;

    fn constructor_standings(
        &self,
        year: i32,
    ) -> impl Future<Output = Result<Vec<ConstructorStanding>, Error>> + Send;

    fn calendar(&self, year: i32) -> impl Future<Output = Result<Vec<Race>, Error>> + Send;

    fn race_info(&self, year: i32, round: Round) -> impl Future<Output = Result<Vec<Race>, Error>> + Send;

    fn race_results(&self, year: i32, round: Round) -> impl Future<Output = Result<Vec<Race>, Error>> + Send;

    fn qualifying_results(
        &self,
        year: i32,
        round: Round,
    ) -> impl Future<Output = Result<Vec<Race>, Error>> + Send;

    fn sprint_results(&self, year: i32, round: Round) -> impl Future<Output = Result<Vec<Race>, Error>> + Send;
}

pub struct ErgastClient {
    base_url: String,
    http: reqwest::Client,
}

impl ErgastClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    async fn get(&self, path: &str) -> Result<models::MrData, Error> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {url}");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let parsed: models::Response = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;
        Ok(parsed.data)
    }

    async fn races(&self, path: &str) -> Result<Vec<Race>, Error> {
        races_of(self.get(path).await?)
    }

    async fn standings(&self, path: &str) -> Result<models::StandingsList, Error> {
        standings_of(self.get(path).await?)
    }
}

/// Races of a response; a missing or empty table is [`Error::EmptyList`].
fn races_of(data: models::MrData) -> Result<Vec<Race>, Error> {
    non_empty(data.race_table.map(|t| t.races).unwrap_or_default())
}

/// First standings list of a response. Before the first race the table
/// has no lists at all.
fn standings_of(data: models::MrData) -> Result<models::StandingsList, Error> {
    data.standings_table
        .and_then(|t| t.standings_lists.into_iter().next())
        .ok_or(Error::EmptyList)
}

fn driver_standings_of(list: models::StandingsList) -> Result<Vec<DriverStanding>, Error> {
    non_empty(list.driver_standings)
}

fn constructor_standings_of(list: models::StandingsList) -> Result<Vec<ConstructorStanding>, Error> {
    non_empty(list.constructor_standings)
}

fn non_empty<T>(items: Vec<T>) -> Result<Vec<T>, Error> {
    if items.is_empty() {
        Err(Error::EmptyList)
    } else {
        Ok(items)
    }
}

impl F1Storage for ErgastClient {
    async fn driver_standings(&self, year: i32) -> Result<Vec<DriverStanding>, Error> {
        driver_standings_of(self.standings(&format!("{year}/driverStandings.json")).await?)
    }

    async fn constructor_standings(&self, year: i32) -> Result<Vec<ConstructorStanding>, Error> {
        constructor_standings_of(self.standings(&format!("{year}/constructorStandings.json")).await?)
    }

    async fn calendar(&self, year: i32) -> Result<Vec<Race>, Error> {
        self.races(&format!("{year}.json")).await
    }

    async fn race_info(&self, year: i32, round: Round) -> Result<Vec<Race>, Error> {
        self.races(&format!("{year}/{round}.json")).await
    }

    async fn race_results(&self, year: i32, round: Round) -> Result<Vec<Race>, Error> {
        self.races(&format!("{year}/{round}/results.json")).await
    }

    async fn qualifying_results(&self, year: i32, round: Round) -> Result<Vec<Race>, Error> {
        self.races(&format!("{year}/{round}/qualifying.json")).await
    }

    async fn sprint_results(&self, year: i32, round: Round) -> Result<Vec<Race>, Error> {
        self.races(&format!("{year}/{round}/sprint.json")).await
    }
}
