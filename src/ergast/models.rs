//! Response types of the Ergast-compatible API.
//!
//! The API reports every scalar as a string, and older seasons omit most
//! session blocks, so nearly every field defaults.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(rename = "MRData")]
    pub data: MrData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MrData {
    #[serde(rename = "RaceTable", default)]
    pub race_table: Option<RaceTable>,
    #[serde(rename = "StandingsTable", default)]
    pub standings_table: Option<StandingsTable>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RaceTable {
    #[serde(default)]
    pub season: String,
    #[serde(rename = "Races", default)]
    pub races: Vec<Race>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StandingsTable {
    #[serde(default)]
    pub season: String,
    #[serde(rename = "StandingsLists", default)]
    pub standings_lists: Vec<StandingsList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StandingsList {
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub round: String,
    #[serde(rename = "DriverStandings", default)]
    pub driver_standings: Vec<DriverStanding>,
    #[serde(rename = "ConstructorStandings", default)]
    pub constructor_standings: Vec<ConstructorStanding>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverStanding {
    pub position: String,
    pub position_text: String,
    pub points: String,
    pub wins: String,
    #[serde(rename = "Driver")]
    pub driver: Driver,
    #[serde(rename = "Constructors")]
    pub constructors: Vec<Constructor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConstructorStanding {
    pub position: String,
    pub position_text: String,
    pub points: String,
    pub wins: String,
    #[serde(rename = "Constructor")]
    pub constructor: Constructor,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Driver {
    pub driver_id: String,
    pub permanent_number: String,
    pub code: String,
    pub url: String,
    pub given_name: String,
    pub family_name: String,
    pub nationality: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constructor {
    pub constructor_id: String,
    pub url: String,
    pub name: String,
    pub nationality: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    pub lat: String,
    pub long: String,
    pub locality: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Circuit {
    pub circuit_id: String,
    pub url: String,
    pub circuit_name: String,
    #[serde(rename = "Location")]
    pub location: Location,
}

/// Date and optional UTC time of a session, e.g. `2024-03-02` / `15:00:00Z`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Session {
    pub date: String,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LapTime {
    pub millis: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaceResult {
    pub number: String,
    pub position: String,
    pub position_text: String,
    pub points: String,
    #[serde(rename = "Driver")]
    pub driver: Driver,
    #[serde(rename = "Constructor")]
    pub constructor: Constructor,
    pub grid: String,
    pub laps: String,
    pub status: String,
    #[serde(rename = "Time")]
    pub time: Option<LapTime>,
    #[serde(rename = "Q1")]
    pub q1: Option<String>,
    #[serde(rename = "Q2")]
    pub q2: Option<String>,
    #[serde(rename = "Q3")]
    pub q3: Option<String>,
}

impl RaceResult {
    pub fn finished(&self) -> bool {
        self.status == "Finished"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Race {
    pub season: String,
    pub round: String,
    pub url: String,
    pub race_name: String,
    #[serde(rename = "Circuit")]
    pub circuit: Circuit,
    pub date: String,
    pub time: Option<String>,
    #[serde(rename = "FirstPractice")]
    pub first_practice: Option<Session>,
    #[serde(rename = "SecondPractice")]
    pub second_practice: Option<Session>,
    #[serde(rename = "ThirdPractice")]
    pub third_practice: Option<Session>,
    #[serde(rename = "Qualifying")]
    pub qualifying: Option<Session>,
    #[serde(rename = "SprintQualifying", alias = "SprintShootout")]
    pub sprint_qualifying: Option<Session>,
    #[serde(rename = "Sprint")]
    pub sprint: Option<Session>,
    #[serde(rename = "Results")]
    pub results: Vec<RaceResult>,
    #[serde(rename = "QualifyingResults")]
    pub qualifying_results: Vec<RaceResult>,
    #[serde(rename = "SprintResults")]
    pub sprint_results: Vec<RaceResult>,
}

impl Race {
    pub fn start(&self) -> Session {
        Session {
            date: self.date.clone(),
            time: self.time.clone(),
        }
    }

    pub fn has_sprint(&self) -> bool {
        self.sprint.as_ref().is_some_and(|s| !s.date.is_empty())
    }
}
