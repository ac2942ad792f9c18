//! # DueBot Dispatch
//! Routes incoming chat events to handlers over the shared reminder engine.
//!
//! Handlers never hold the engine lock across a network call: they take the
//! lock, read or mutate, drop it, then reply.

pub mod commands;
pub mod replies;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use duebot_core::error::Result;
use duebot_core::traits::{Channel, Provider};
use duebot_core::types::{ChatId, Incoming, UserId};
use duebot_scheduler::{DailySchedule, SharedEngine};

use crate::commands::{CallbackAction, Command};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The bot: one per process, shared by every spawned handler task.
pub struct Bot {
    engine: SharedEngine,
    channel: Arc<dyn Channel>,
    provider: Option<Box<dyn Provider>>,
    schedule: DailySchedule,
    clock: Clock,
}

impl Bot {
    pub fn new(
        engine: SharedEngine,
        channel: Arc<dyn Channel>,
        provider: Option<Box<dyn Provider>>,
        schedule: DailySchedule,
    ) -> Self {
        Self {
            engine,
            channel,
            provider,
            schedule,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock, for tests.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    fn today(&self) -> NaiveDate {
        self.schedule.today((self.clock)())
    }

    /// Handle one event. Errors are transport failures while replying.
    pub async fn handle(&self, event: Incoming) -> Result<()> {
        match event {
            Incoming::Message {
                user_id,
                chat_id,
                text,
            } => {
                let Some(command) = commands::parse(&text) else {
                    return Ok(());
                };
                tracing::debug!("{user_id}: {command:?}");
                self.handle_command(user_id, chat_id, command).await
            }
            Incoming::Callback {
                query_id,
                user_id,
                chat_id,
                message_id,
                data,
            } => {
                self.handle_callback(&query_id, user_id, chat_id, message_id, &data)
                    .await
            }
        }
    }

    async fn handle_command(&self, user: UserId, chat: ChatId, command: Command) -> Result<()> {
        match command {
            Command::Start | Command::Help => {
                self.reply(chat, &replies::help(self.provider.is_some())).await
            }
            Command::Add(args) => self.add_task(user, chat, &args).await,
            Command::Tasks => self.show_tasks(user, chat).await,
            Command::Ask(question) => self.ask(chat, &question).await,
            Command::Unknown(_) => self.reply(chat, replies::UNKNOWN_COMMAND).await,
        }
    }

    async fn add_task(&self, user: UserId, chat: ChatId, args: &[String]) -> Result<()> {
        if args.len() < 2 {
            return self.reply(chat, replies::ADD_USAGE).await;
        }
        let Ok(date) = commands::parse_date(&args[0]) else {
            return self.reply(chat, replies::BAD_DATE).await;
        };
        let text = args[1..].join(" ");

        let task = self.engine.lock().await.add_task(user, &text, date);
        self.reply(chat, &replies::task_added(&task.text, task.date))
            .await
    }

    async fn show_tasks(&self, user: UserId, chat: ChatId) -> Result<()> {
        let pending = self.engine.lock().await.pending(user, self.today());
        if pending.is_empty() {
            return self.reply(chat, replies::NO_TASKS).await;
        }
        let buttons = replies::task_buttons(&pending);
        self.channel
            .send_message(chat, replies::TASKS_HEADER, &buttons)
            .await
    }

    async fn ask(&self, chat: ChatId, question: &str) -> Result<()> {
        let Some(provider) = &self.provider else {
            return self.reply(chat, replies::AI_DISABLED).await;
        };
        if question.trim().is_empty() {
            return self.reply(chat, replies::ASK_USAGE).await;
        }

        match provider.ask(question).await {
            Ok(answer) => self.reply(chat, answer.trim()).await,
            Err(e) => {
                tracing::warn!("{} ask failed: {e}", provider.name());
                self.reply(chat, replies::AI_FAILED).await
            }
        }
    }

    async fn handle_callback(
        &self,
        query_id: &str,
        user: UserId,
        chat: Option<ChatId>,
        message_id: Option<i64>,
        data: &str,
    ) -> Result<()> {
        if let Err(e) = self.channel.answer_callback(query_id).await {
            tracing::debug!("answerCallbackQuery failed: {e}");
        }

        let Some(action) = commands::parse_callback(data) else {
            tracing::debug!("{user}: ignoring callback data {data:?}");
            return Ok(());
        };

        let text = match action {
            CallbackAction::Done(id) => match self.engine.lock().await.mark_done(user, id) {
                Some(task) => replies::task_done(&task.text),
                None => replies::TASK_NOT_FOUND.to_string(),
            },
            CallbackAction::Malformed => replies::TASK_NOT_FOUND.to_string(),
        };

        match (chat, message_id) {
            (Some(chat), Some(message_id)) => {
                self.channel.edit_message(chat, message_id, &text).await
            }
            // No message to edit; answer in the user's private chat instead.
            _ => self.reply(user, &text).await,
        }
    }

    async fn reply(&self, chat: ChatId, text: &str) -> Result<()> {
        self.channel.send_message(chat, text, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use duebot_core::error::DueBotError;
    use duebot_core::types::TaskButton;
    use duebot_scheduler::ReminderEngine;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Message(ChatId, String, Vec<TaskButton>),
        Answer(String),
        Edit(ChatId, i64, String),
    }

    #[derive(Default)]
    struct RecordingChannel {
        log: Mutex<Vec<Sent>>,
    }

    impl RecordingChannel {
        fn take(&self) -> Vec<Sent> {
            std::mem::take(&mut *self.log.lock().unwrap())
        }
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send_message(&self, chat: ChatId, text: &str, b: &[TaskButton]) -> Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(Sent::Message(chat, text.to_string(), b.to_vec()));
            Ok(())
        }

        async fn answer_callback(&self, query_id: &str) -> Result<()> {
            self.log.lock().unwrap().push(Sent::Answer(query_id.to_string()));
            Ok(())
        }

        async fn edit_message(&self, chat: ChatId, message_id: i64, text: &str) -> Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(Sent::Edit(chat, message_id, text.to_string()));
            Ok(())
        }
    }

    struct CannedProvider(std::result::Result<String, String>);

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn ask(&self, _question: &str) -> Result<String> {
            self.0.clone().map_err(DueBotError::Provider)
        }
    }

    const USER: UserId = 42;

    fn setup(provider: Option<Box<dyn Provider>>) -> (Bot, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::default());
        let schedule = DailySchedule::new(8, 0, 0).unwrap();
        let bot = Bot::new(
            ReminderEngine::in_memory().into_shared(),
            channel.clone(),
            provider,
            schedule,
        )
        .with_clock(|| {
            DateTime::parse_from_rfc3339("2025-03-10T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc)
        });
        (bot, channel)
    }

    fn msg(text: &str) -> Incoming {
        Incoming::Message {
            user_id: USER,
            chat_id: USER,
            text: text.into(),
        }
    }

    fn press(data: &str) -> Incoming {
        Incoming::Callback {
            query_id: "q".into(),
            user_id: USER,
            chat_id: Some(USER),
            message_id: Some(7),
            data: data.into(),
        }
    }

    fn texts(sent: &[Sent]) -> Vec<String> {
        sent.iter()
            .map(|s| match s {
                Sent::Message(_, t, _) | Sent::Edit(_, _, t) => t.clone(),
                Sent::Answer(id) => format!("<answer {id}>"),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_start_replies_with_help() {
        let (bot, channel) = setup(None);
        bot.handle(msg("/start")).await.unwrap();
        bot.handle(msg("just chatting")).await.unwrap();
        let sent = channel.take();
        assert_eq!(sent.len(), 1);
        assert!(texts(&sent)[0].contains("/add"));
    }

    #[tokio::test]
    async fn test_add_validation() {
        let (bot, channel) = setup(None);
        bot.handle(msg("/add")).await.unwrap();
        bot.handle(msg("/add 2025-03-10")).await.unwrap();
        bot.handle(msg("/add 10.03.2025 dentist")).await.unwrap();
        bot.handle(msg("/add 2025-03-10 call   the dentist")).await.unwrap();
        assert_eq!(
            texts(&channel.take()),
            vec![
                replies::ADD_USAGE,
                replies::ADD_USAGE,
                replies::BAD_DATE,
                "Task added: call the dentist on 2025-03-10",
            ]
        );
    }

    #[tokio::test]
    async fn test_tasks_shows_only_due_and_unfinished() {
        let (bot, channel) = setup(None);
        bot.handle(msg("/tasks")).await.unwrap();
        assert_eq!(texts(&channel.take()), vec![replies::NO_TASKS]);

        bot.handle(msg("/add 2025-03-01 overdue")).await.unwrap();
        bot.handle(msg("/add 2025-03-10 today")).await.unwrap();
        bot.handle(msg("/add 2025-03-11 tomorrow")).await.unwrap();
        channel.take();

        bot.handle(msg("/tasks")).await.unwrap();
        let sent = channel.take();
        let Sent::Message(chat, header, buttons) = &sent[0] else {
            panic!("expected a message, got {sent:?}");
        };
        assert_eq!(*chat, USER);
        assert_eq!(header, replies::TASKS_HEADER);
        let data: Vec<_> = buttons.iter().map(|b| b.callback_data.as_str()).collect();
        assert_eq!(data, vec!["done_0", "done_1"]);
        assert_eq!(buttons[0].label, "✅ overdue (due 2025-03-01)");
    }

    #[tokio::test]
    async fn test_done_button_is_idempotent() {
        let (bot, channel) = setup(None);
        bot.handle(msg("/add 2025-03-10 stretch")).await.unwrap();
        channel.take();

        bot.handle(press("done_0")).await.unwrap();
        bot.handle(press("done_0")).await.unwrap();
        assert_eq!(
            channel.take(),
            vec![
                Sent::Answer("q".into()),
                Sent::Edit(USER, 7, "Task done: stretch".into()),
                Sent::Answer("q".into()),
                Sent::Edit(USER, 7, "Task done: stretch".into()),
            ]
        );

        bot.handle(msg("/tasks")).await.unwrap();
        assert_eq!(texts(&channel.take()), vec![replies::NO_TASKS]);
    }

    #[tokio::test]
    async fn test_unknown_or_foreign_task_is_not_found() {
        let (bot, channel) = setup(None);
        bot.handle(msg("/add 2025-03-10 mine")).await.unwrap();
        channel.take();

        bot.handle(press("done_5")).await.unwrap();
        bot.handle(press("done_zz")).await.unwrap();
        bot.handle(Incoming::Callback {
            query_id: "other".into(),
            user_id: 7,
            chat_id: None,
            message_id: None,
            data: "done_0".into(),
        })
        .await
        .unwrap();

        let sent = channel.take();
        assert_eq!(sent[1], Sent::Edit(USER, 7, replies::TASK_NOT_FOUND.into()));
        assert_eq!(sent[3], Sent::Edit(USER, 7, replies::TASK_NOT_FOUND.into()));
        assert_eq!(sent[5], Sent::Message(7, replies::TASK_NOT_FOUND.into(), vec![]));

        // The other user's press must not have touched our task.
        bot.handle(msg("/tasks")).await.unwrap();
        let sent = channel.take();
        let Sent::Message(_, _, buttons) = &sent[0] else {
            panic!("expected task list");
        };
        assert_eq!(buttons.len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_callback_data_is_only_acknowledged() {
        let (bot, channel) = setup(None);
        bot.handle(press("snooze_1")).await.unwrap();
        assert_eq!(channel.take(), vec![Sent::Answer("q".into())]);
    }

    #[tokio::test]
    async fn test_ask_paths() {
        let (bot, channel) = setup(None);
        bot.handle(msg("/ask anything")).await.unwrap();
        assert_eq!(texts(&channel.take()), vec![replies::AI_DISABLED]);

        let (bot, channel) = setup(Some(Box::new(CannedProvider(Ok(" 42 \n".into())))));
        bot.handle(msg("/ask")).await.unwrap();
        bot.handle(msg("/ask meaning of life")).await.unwrap();
        assert_eq!(texts(&channel.take()), vec![replies::ASK_USAGE, "42"]);

        let (bot, channel) = setup(Some(Box::new(CannedProvider(Err("503".into())))));
        bot.handle(msg("/ask hi")).await.unwrap();
        assert_eq!(texts(&channel.take()), vec![replies::AI_FAILED]);
    }

    #[tokio::test]
    async fn test_unknown_command_points_to_help() {
        let (bot, channel) = setup(None);
        bot.handle(msg("/remind me")).await.unwrap();
        assert_eq!(texts(&channel.take()), vec![replies::UNKNOWN_COMMAND]);
    }
}
