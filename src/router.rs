//! Turns a classified command into a platform-neutral reply.

use chrono::{DateTime, Datelike, Utc};
use tracing::warn;

use crate::command::Command;
use crate::ergast::{F1Storage, Round};
use crate::keyboard::{Card, Keyboard, make_keyboard};
use crate::service::{self, CALENDAR_EMPTY, F1Service};

pub const HELLO: &str = "Привет! Я бот, который делится информацией про F1 :)
Пока что я могу сказать тебе информацию только о текущем сезоне (но всё ещё впереди).
Для того чтобы подробнее познакомиться с моими возможностями напиши мне \"Что умеешь?\".

Приятного пользования :)";

pub const HELP: &str = "Команды которые я понимаю (могу их прочесть в твоём сообщении среди других слов):
• календарь сезона - список гран-при F1 текущего сезона
• кубок конструкторов или кк - текущее положение команд в кубке конструкторов
• личный зачёт - текущее положение гонщиков в личном зачёте
• следующая гонка - информация о следующем гран-при F1
• результат гонки - результат последней прошедшей гонки F1
• результат квалы - результат последней квалификации
• ласт гп - карточка последнего гран-при
• этапы - список гран-при сезона
• дней без формулы/F1 или дбф - количество дней с последней гонки F1

!Внимание! Информация, связанная с проведённой гонкой может обновляться не сразу.";

pub const FAILURE: &str = "Не получилось достать данные, попробуй чуть позже.";
pub const GP_INFO: &str = "Информация о гран-при:";
pub const GP_LIST: &str = "Этапы F1:";
pub const GP_LIST_UPDATE: &str = "Обновление";
pub const KEYBOARD_CLOSED: &str = "Клавиатура скрыта.";

/// Grand prix list layout.
const LIST_ROWS: usize = 2;
const LIST_COLS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Column-aligned text; platforms with proportional fonts render it
    /// monospaced.
    Table(String),
    Keyboard { text: String, keyboard: Keyboard },
    Card { text: String, card: Card },
    /// Nothing to send.
    Silent,
}

/// Round number carried by a payload command, `last` for free text.
/// `None` when the payload carries something that is not a round.
fn round_of(arg: Option<&str>) -> Option<Round> {
    match arg {
        None => Some(Round::Last),
        Some(a) => a.parse::<u32>().ok().map(Round::Number),
    }
}

/// Build the reply for `command`.
///
/// `arg` is the id part of a payload command (`5` in `raceRes_5`).
/// `Stream` is platform specific and yields [`Reply::Silent`] here.
pub async fn route<S: F1Storage>(
    service: &F1Service<S>,
    command: Command,
    arg: Option<&str>,
    sent_at: DateTime<Utc>,
) -> Result<Reply, service::Error> {
    let year = sent_at.year();
    let round = match command {
        Command::RaceResult
        | Command::QualifyingResult
        | Command::SprintResult
        | Command::LastGrandPrix
        | Command::GrandPrixInfo => match round_of(arg) {
            Some(round) => round,
            None => {
                warn!("{command:?} with bad round `{}`", arg.unwrap_or_default());
                return Ok(Reply::Silent);
            }
        },
        _ => Round::Last,
    };
    let reply = match command {
        Command::Hello => Reply::Text(HELLO.to_string()),
        Command::Help => Reply::Text(HELP.to_string()),
        Command::DriverStandings => Reply::Table(service.driver_standings_message(year).await?),
        Command::ConstructorStandingsFull | Command::ConstructorStandings => {
            Reply::Table(service.constructor_standings_message(year).await?)
        }
        Command::Calendar => Reply::Text(service.calendar_message(year).await?),
        Command::NextRace => Reply::Text(service.next_race_message(sent_at).await?),
        Command::LastRaceResult => Reply::Table(service.race_results_message(year, Round::Last).await?),
        Command::LastQualifyingResult => {
            Reply::Table(service.qualifying_results_message(year, Round::Last).await?)
        }
        Command::LastSprintResult => Reply::Table(service.sprint_results_message(year, Round::Last).await?),
        Command::RaceResult => Reply::Table(service.race_results_message(year, round).await?),
        Command::QualifyingResult => {
            Reply::Table(service.qualifying_results_message(year, round).await?)
        }
        Command::SprintResult => Reply::Table(service.sprint_results_message(year, round).await?),
        Command::DaysAfterRace | Command::DaysAfterRaceShort => {
            Reply::Text(service.days_after_race_message(sent_at).await?)
        }
        Command::LastGrandPrix | Command::GrandPrixInfo => {
            match service.grand_prix_card(year, round).await? {
                Some(card) => Reply::Card {
                    text: GP_INFO.to_string(),
                    card,
                },
                None => Reply::Text(service::RACE_NOT_AVAILABLE.to_string()),
            }
        }
        Command::GrandPrixList => grand_prix_list(service, year, 1, GP_LIST).await?,
        Command::GrandPrixListPage => match arg.map_or(Ok(1), str::parse::<usize>) {
            Ok(page) => grand_prix_list(service, year, page, GP_LIST_UPDATE).await?,
            Err(e) => {
                warn!("Bad grand prix list page `{}`: {e}", arg.unwrap_or_default());
                Reply::Silent
            }
        },
        Command::CloseKeyboard => Reply::Keyboard {
            text: KEYBOARD_CLOSED.to_string(),
            keyboard: Keyboard::default(),
        },
        Command::Stream | Command::Unknown => Reply::Silent,
    };
    Ok(reply)
}

async fn grand_prix_list<S: F1Storage>(
    service: &F1Service<S>,
    year: i32,
    page: usize,
    text: &str,
) -> Result<Reply, service::Error> {
    let total = service.count_of_races(year).await?;
    if total == 0 {
        return Ok(Reply::Text(CALENDAR_EMPTY.to_string()));
    }
    match make_keyboard(LIST_ROWS, LIST_COLS, page, total, false) {
        Ok(keyboard) => Ok(Reply::Keyboard {
            text: text.to_string(),
            keyboard,
        }),
        Err(e) => {
            warn!("Grand prix list page {page}: {e}");
            Ok(Reply::Silent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ergast::{self, ConstructorStanding, DriverStanding, Race};

    /// Storage with a 22-race calendar and nothing else.
    struct CalendarOnly;

    impl F1Storage for CalendarOnly {
        async fn driver_standings(&self, _: i32) -> Result<Vec<DriverStanding>, ergast::Error> {
            Err(ergast::Error::EmptyList)
        }
        async fn constructor_standings(&self, _: i32) -> Result<Vec<ConstructorStanding>, ergast::Error> {
            Err(ergast::Error::Api("500 Internal Server Error".into()))
        }
        async fn calendar(&self, year: i32) -> Result<Vec<Race>, ergast::Error> {
            if year == 2024 {
                Ok(vec![Race::default(); 22])
            } else {
                Err(ergast::Error::EmptyList)
            }
        }
        async fn race_info(&self, _: i32, _: Round) -> Result<Vec<Race>, ergast::Error> {
            Err(ergast::Error::EmptyList)
        }
        async fn race_results(&self, _: i32, _: Round) -> Result<Vec<Race>, ergast::Error> {
            Err(ergast::Error::EmptyList)
        }
        async fn qualifying_results(&self, _: i32, _: Round) -> Result<Vec<Race>, ergast::Error> {
            Err(ergast::Error::EmptyList)
        }
        async fn sprint_results(&self, _: i32, _: Round) -> Result<Vec<Race>, ergast::Error> {
            Err(ergast::Error::EmptyList)
        }
    }

    fn service() -> F1Service<CalendarOnly> {
        F1Service::new(CalendarOnly, chrono_tz::Europe::Moscow)
    }

    fn in_2024() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_round_of() {
        assert_eq!(round_of(Some("7")), Some(Round::Number(7)));
        assert_eq!(round_of(Some("5x")), None);
        assert_eq!(round_of(Some("99999999999")), None);
        assert_eq!(round_of(None), Some(Round::Last));
    }

    #[tokio::test]
    async fn test_bad_round_is_silent() {
        let svc = service();
        assert_eq!(
            route(&svc, Command::RaceResult, Some("5x"), in_2024()).await.unwrap(),
            Reply::Silent
        );
        assert_eq!(
            route(&svc, Command::GrandPrixInfo, Some("99999999999"), in_2024()).await.unwrap(),
            Reply::Silent
        );
        assert_eq!(
            route(&svc, Command::GrandPrixListPage, Some("99999999999999999999999"), in_2024())
                .await
                .unwrap(),
            Reply::Silent
        );
        assert_eq!(
            route(&svc, Command::GrandPrixListPage, Some("9999999999999999999"), in_2024())
                .await
                .unwrap(),
            Reply::Silent
        );
    }

    #[tokio::test]
    async fn test_static_replies() {
        let svc = service();
        assert_eq!(
            route(&svc, Command::Hello, None, in_2024()).await.unwrap(),
            Reply::Text(HELLO.to_string())
        );
        assert_eq!(
            route(&svc, Command::Help, None, in_2024()).await.unwrap(),
            Reply::Text(HELP.to_string())
        );
        assert_eq!(route(&svc, Command::Unknown, None, in_2024()).await.unwrap(), Reply::Silent);
        assert_eq!(route(&svc, Command::Stream, None, in_2024()).await.unwrap(), Reply::Silent);
    }

    #[tokio::test]
    async fn test_grand_prix_list_pages() {
        let svc = service();
        let Reply::Keyboard { text, keyboard } =
            route(&svc, Command::GrandPrixList, None, in_2024()).await.unwrap()
        else {
            panic!("expected keyboard");
        };
        assert_eq!(text, GP_LIST);
        assert_eq!(keyboard.rows.len(), 3);
        assert_eq!(keyboard.rows[2][0].command, "gpListPage_2");

        let Reply::Keyboard { text, keyboard } =
            route(&svc, Command::GrandPrixListPage, Some("3"), in_2024()).await.unwrap()
        else {
            panic!("expected keyboard");
        };
        assert_eq!(text, GP_LIST_UPDATE);
        assert_eq!(keyboard.rows[1].len(), 2);

        assert_eq!(
            route(&svc, Command::GrandPrixListPage, Some("9"), in_2024()).await.unwrap(),
            Reply::Silent
        );
    }

    #[tokio::test]
    async fn test_grand_prix_list_without_calendar() {
        let next_year = "2025-01-10T12:00:00Z".parse().unwrap();
        assert_eq!(
            route(&service(), Command::GrandPrixList, None, next_year).await.unwrap(),
            Reply::Text(CALENDAR_EMPTY.to_string())
        );
    }

    #[tokio::test]
    async fn test_close_keyboard() {
        let Reply::Keyboard { keyboard, .. } =
            route(&service(), Command::CloseKeyboard, None, in_2024()).await.unwrap()
        else {
            panic!("expected keyboard");
        };
        assert!(keyboard.is_empty());
    }

    #[tokio::test]
    async fn test_empty_data_replies() {
        let svc = service();
        assert_eq!(
            route(&svc, Command::DriverStandings, None, in_2024()).await.unwrap(),
            Reply::Table(service::DRIVER_STANDINGS_EMPTY.to_string())
        );
        assert_eq!(
            route(&svc, Command::GrandPrixInfo, Some("4"), in_2024()).await.unwrap(),
            Reply::Text(service::RACE_NOT_AVAILABLE.to_string())
        );
    }

    #[tokio::test]
    async fn test_upstream_error_propagates() {
        let err = route(&service(), Command::ConstructorStandings, None, in_2024())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
