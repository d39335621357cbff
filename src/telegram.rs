//! Telegram front end using teloxide.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;
use tracing::{error, info, warn};

use crate::command::{self, Command};
use crate::ergast::F1Storage;
use crate::keyboard::{Card, Keyboard};
use crate::router::{self, Reply};
use crate::service::F1Service;

#[derive(Debug, Clone, Copy, PartialEq, Eq, BotCommands)]
#[command(rename_rule = "lowercase", description = "Команды бота:")]
pub enum SlashCommand {
    /// Приветствие
    Start,
    /// Что умеет бот
    Help,
    /// Личный зачёт
    DriverStandings,
    /// Кубок конструкторов
    ConstructorStandings,
    /// Календарь сезона
    Calendar,
    /// Следующая гонка
    NextRace,
    /// Результат последней гонки
    LastRace,
    /// Дней без F1
    DaysAfterRace,
    /// Этапы сезона
    Gps,
}

impl SlashCommand {
    pub fn intent(self) -> Command {
        match self {
            SlashCommand::Start => Command::Hello,
            SlashCommand::Help => Command::Help,
            SlashCommand::DriverStandings => Command::DriverStandings,
            SlashCommand::ConstructorStandings => Command::ConstructorStandings,
            SlashCommand::Calendar => Command::Calendar,
            SlashCommand::NextRace => Command::NextRace,
            SlashCommand::LastRace => Command::LastRaceResult,
            SlashCommand::DaysAfterRace => Command::DaysAfterRace,
            SlashCommand::Gps => Command::GrandPrixList,
        }
    }
}

/// Run the dispatcher until Ctrl-C.
pub async fn run<S: F1Storage + 'static>(bot: Bot, service: Arc<F1Service<S>>) {
    if let Err(e) = bot.set_my_commands(SlashCommand::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let message_handler = Update::filter_message()
        .branch(dptree::entry().filter_command::<SlashCommand>().endpoint(handle_command::<S>))
        .branch(dptree::endpoint(handle_message::<S>));

    let handler = dptree::entry()
        .branch(message_handler)
        .branch(Update::filter_callback_query().endpoint(handle_callback::<S>));

    info!("Start telegram polling");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![service])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_command<S: F1Storage + 'static>(
    bot: Bot,
    msg: Message,
    cmd: SlashCommand,
    service: Arc<F1Service<S>>,
) -> ResponseResult<()> {
    info!("From chat {}: {:?}", msg.chat.id, cmd);
    if cmd == SlashCommand::Help {
        let text = format!("{}\n\n{}", router::HELP, SlashCommand::descriptions());
        return send_reply(&bot, msg.chat.id, Reply::Text(text)).await;
    }
    respond(&bot, msg.chat.id, &service, cmd.intent(), None, msg.date).await
}

async fn handle_message<S: F1Storage + 'static>(
    bot: Bot,
    msg: Message,
    service: Arc<F1Service<S>>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    info!("From chat {}: {}", msg.chat.id, text);

    let intent = command::classify(text);
    // Stream announcements are a VK feature.
    if matches!(intent, Command::Unknown | Command::Stream) {
        info!("Command in message `{text}` not recognized");
        return Ok(());
    }
    respond(&bot, msg.chat.id, &service, intent, None, msg.date).await
}

async fn handle_callback<S: F1Storage + 'static>(
    bot: Bot,
    q: CallbackQuery,
    service: Arc<F1Service<S>>,
) -> ResponseResult<()> {
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        warn!("Failed to answer callback query: {e}");
    }

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(chat_id) = q.message.as_ref().map(|m| m.chat().id) else {
        warn!("Callback `{data}` without message");
        return Ok(());
    };
    info!("Callback from chat {chat_id}: {data}");

    let intent = command::classify(data);
    if intent == Command::Unknown {
        info!("Callback `{data}` not recognized");
        return Ok(());
    }
    respond(&bot, chat_id, &service, intent, command::command_arg(data), Utc::now()).await
}

async fn respond<S: F1Storage>(
    bot: &Bot,
    chat_id: ChatId,
    service: &F1Service<S>,
    intent: Command,
    arg: Option<&str>,
    sent_at: DateTime<Utc>,
) -> ResponseResult<()> {
    let reply = match router::route(service, intent, arg, sent_at).await {
        Ok(reply) => reply,
        Err(e) => {
            error!("{intent:?} for {chat_id}: {e}");
            Reply::Text(router::FAILURE.to_string())
        }
    };
    send_reply(bot, chat_id, reply).await
}

/// Only inline keyboards are ever sent here; they stay attached to their
/// message, so an empty grid (closing the keyboard on VK) has nothing to
/// remove and the reply goes out as plain text.
fn inline_keyboard(keyboard: &Keyboard) -> Option<InlineKeyboardMarkup> {
    if keyboard.is_empty() {
        return None;
    }
    Some(InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.command.clone()))
            .collect::<Vec<_>>()
    })))
}

fn card_markup(card: &Card) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    match reqwest::Url::parse(&card.link) {
        Ok(url) => rows.push(vec![InlineKeyboardButton::url("Подробнее", url)]),
        Err(e) => warn!("Bad card link {}: {e}", card.link),
    }
    rows.push(
        card.buttons
            .iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.command.clone()))
            .collect(),
    );
    InlineKeyboardMarkup::new(rows)
}

fn card_html(text: &str, card: &Card) -> String {
    format!(
        "{}\n\n<b>{}</b>\n{}",
        html::escape(text),
        html::escape(&card.title),
        html::escape(&card.description)
    )
}

fn table_html(text: &str) -> String {
    format!("<pre>{}</pre>", html::escape(text))
}

async fn send_reply(bot: &Bot, chat_id: ChatId, reply: Reply) -> ResponseResult<()> {
    let sent = match reply {
        Reply::Text(text) => bot.send_message(chat_id, text).await,
        Reply::Table(text) => {
            bot.send_message(chat_id, table_html(&text))
                .parse_mode(ParseMode::Html)
                .await
        }
        Reply::Keyboard { text, keyboard } => match inline_keyboard(&keyboard) {
            Some(markup) => bot.send_message(chat_id, text).reply_markup(markup).await,
            None => bot.send_message(chat_id, text).await,
        },
        Reply::Card { text, card } => {
            bot.send_message(chat_id, card_html(&text, &card))
                .parse_mode(ParseMode::Html)
                .reply_markup(card_markup(&card))
                .await
        }
        Reply::Silent => return Ok(()),
    };
    if let Err(e) = sent {
        warn!("Failed to send reply to {chat_id}: {e}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{Button, make_keyboard};

    #[test]
    fn test_slash_commands_parse() {
        assert_eq!(
            SlashCommand::parse("/driverstandings", "racebot").unwrap(),
            SlashCommand::DriverStandings
        );
        assert_eq!(SlashCommand::parse("/gps", "racebot").unwrap(), SlashCommand::Gps);
        assert_eq!(SlashCommand::parse("/lastrace", "racebot").unwrap().intent(), Command::LastRaceResult);
        assert!(SlashCommand::parse("/unknown", "racebot").is_err());
    }

    #[test]
    fn test_inline_keyboard() {
        let kb = make_keyboard(2, 4, 1, 10, false).unwrap();
        let markup = inline_keyboard(&kb).unwrap();
        assert_eq!(markup.inline_keyboard.len(), 3);
        assert_eq!(markup.inline_keyboard[0].len(), 4);
        assert_eq!(markup.inline_keyboard[2][0].text, "Далее");
    }

    #[test]
    fn test_closed_keyboard_has_no_markup() {
        assert!(inline_keyboard(&Keyboard::default()).is_none());
        assert!(inline_keyboard(&make_keyboard(2, 4, 1, 0, true).unwrap()).is_none());
    }

    #[test]
    fn test_card_markup() {
        let card = Card {
            title: "Monaco Grand Prix".into(),
            description: "Circuit de Monaco".into(),
            link: "https://en.wikipedia.org/wiki/2024_Monaco_Grand_Prix".into(),
            buttons: vec![
                Button::new("Результат гонки", "raceRes_8"),
                Button::new("Результат квалификации", "qualRes_8"),
            ],
        };
        let markup = card_markup(&card);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(markup.inline_keyboard[0][0].text, "Подробнее");
        assert_eq!(markup.inline_keyboard[1].len(), 2);

        let broken = Card {
            link: "not a url".into(),
            ..card
        };
        assert_eq!(card_markup(&broken).inline_keyboard.len(), 1);
    }

    #[test]
    fn test_html_escaping() {
        assert_eq!(table_html("1 | VER | <1>"), "<pre>1 | VER | &lt;1&gt;</pre>");
        let card = Card {
            title: "A & B".into(),
            description: "x".into(),
            link: String::new(),
            buttons: Vec::new(),
        };
        assert_eq!(card_html("Инфо:", &card), "Инфо:\n\n<b>A &amp; B</b>\nx");
    }
}
