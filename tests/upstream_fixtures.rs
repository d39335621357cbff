use std::path::PathBuf;

use chrono::{DateTime, Utc};

use racebot::ergast::models::Response;
use racebot::ergast::{ConstructorStanding, DriverStanding, Error, F1Storage, Race, Round};
use racebot::format;
use racebot::router::{self, Reply};
use racebot::service::F1Service;

fn fixture(name: &str) -> Response {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let raw = std::fs::read_to_string(&path).unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn races(name: &str) -> Vec<Race> {
    fixture(name).data.race_table.unwrap().races
}

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

/// Serves the recorded 2024 responses; every other season is empty.
struct Recorded;

fn season_2024<T>(year: i32, load: impl FnOnce() -> Vec<T>) -> Result<Vec<T>, Error> {
    if year == 2024 { Ok(load()) } else { Err(Error::EmptyList) }
}

impl F1Storage for Recorded {
    async fn driver_standings(&self, year: i32) -> Result<Vec<DriverStanding>, Error> {
        season_2024(year, || {
            fixture("driver_standings.json").data.standings_table.unwrap().standings_lists[0]
                .driver_standings
                .clone()
        })
    }

    async fn constructor_standings(&self, _: i32) -> Result<Vec<ConstructorStanding>, Error> {
        Err(Error::EmptyList)
    }

    async fn calendar(&self, year: i32) -> Result<Vec<Race>, Error> {
        season_2024(year, || races("calendar.json"))
    }

    async fn race_info(&self, year: i32, _: Round) -> Result<Vec<Race>, Error> {
        season_2024(year, || races("results.json"))
    }

    async fn race_results(&self, year: i32, _: Round) -> Result<Vec<Race>, Error> {
        season_2024(year, || races("results.json"))
    }

    async fn qualifying_results(&self, _: i32, _: Round) -> Result<Vec<Race>, Error> {
        Err(Error::EmptyList)
    }

    async fn sprint_results(&self, _: i32, _: Round) -> Result<Vec<Race>, Error> {
        Err(Error::EmptyList)
    }
}

fn service() -> F1Service<Recorded> {
    F1Service::new(Recorded, chrono_tz::Europe::Moscow)
}

#[test]
fn test_driver_standings_fixture() {
    let data = fixture("driver_standings.json").data;
    let table = data.standings_table.unwrap();
    assert_eq!(table.season, "2024");
    let drivers = &table.standings_lists[0].driver_standings;
    assert_eq!(drivers[1].driver.family_name, "Pérez");
    assert_eq!(drivers[0].constructors[0].name, "Red Bull");
    assert_eq!(format::driver_standings(drivers), " 1 | VER - 51  \n 2 | PER - 36  \n");
}

#[test]
fn test_results_fixture() {
    let race = &races("results.json")[0];
    assert_eq!(race.circuit.location.country, "Bahrain");
    assert!(!race.results[2].finished());
    assert!(race.results[2].time.is_none());
    assert_eq!(
        format::results_table(&race.results),
        "  1 | VER | 1:31:44.742 - 26\n  2 | PER | +22.457 - 18\n 20 | SAR | - Retired\n"
    );
}

#[test]
fn test_calendar_fixture() {
    let calendar = races("calendar.json");
    assert!(!calendar[0].has_sprint());
    assert!(calendar[1].has_sprint());

    let bahrain = format::localize(&calendar[0], chrono_tz::Europe::Moscow).unwrap();
    assert_eq!(
        format::race_summary(&bahrain),
        "Номер этапа: 1,\nНазвание этапа: Bahrain Grand Prix,\nДата этапа: 2 марта 2024,\nВремя этапа: 18:00.\n\n"
    );
}

#[tokio::test]
async fn test_next_race_is_sprint_weekend() {
    let text = service().next_race_message(at("2024-04-01T00:00:00Z")).await.unwrap();
    assert_eq!(
        text,
        "Следующий гран-при:\nНомер этапа: 5,\nНазвание этапа: Chinese Grand Prix,\nВремя гонки: 21 апреля 2024 10:00,\n\n\
         Практика: 19 апреля 2024 06:30,\nКвалификация: 20 апреля 2024 10:00,\n\n\
         Квалификация спринта: 19 апреля 2024 10:30, \nСпринт: 20 апреля 2024 06:00.\n\n"
    );
}

#[tokio::test]
async fn test_route_with_recorded_data() {
    let svc = service();
    let sent_at = at("2024-03-12T14:00:00Z");

    let Reply::Table(results) = router::route(&svc, racebot::command::classify("результат гонки"), None, sent_at)
        .await
        .unwrap()
    else {
        panic!("expected table");
    };
    assert!(results.starts_with("Последняя гонка F1 Bahrain Grand Prix:\n"));
    assert!(results.ends_with(" 20 | SAR | - Retired\n"));

    assert_eq!(
        router::route(&svc, racebot::command::classify("дбф"), None, sent_at).await.unwrap(),
        Reply::Text("Дней без F1 - 9 :(\n".to_string())
    );

    let Reply::Card { card, .. } = router::route(&svc, racebot::command::classify("gpPage_1"), Some("1"), sent_at)
        .await
        .unwrap()
    else {
        panic!("expected card");
    };
    assert_eq!(card.title, "Bahrain Grand Prix");
    assert_eq!(card.description, "Bahrain International Circuit\n2 марта 2024, 18:00");
    assert_eq!(card.buttons.len(), 2);
}
