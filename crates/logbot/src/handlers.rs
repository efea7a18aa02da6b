use async_trait::async_trait;
use irc_core::{Dispatcher, Handler, Message, Session};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use crate::chanlog::ChannelLogs;
use crate::commands::{self, Command};
use crate::config::BotConfig;

#[derive(Debug)]
pub struct Toggle(AtomicBool);

impl Toggle {
    pub fn new(on: bool) -> Self {
        Self(AtomicBool::new(on))
    }

    pub fn is_on(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, on: bool) -> bool {
        self.0.swap(on, Ordering::AcqRel)
    }
}

pub struct BotState {
    pub channels: Vec<String>,
    pub admins: Vec<String>,
    pub greet: Toggle,
    pub logs: Arc<ChannelLogs>,
}

impl BotState {
    pub fn new(config: &BotConfig, logs: Arc<ChannelLogs>) -> Self {
        Self {
            channels: config.channels.clone(),
            admins: config.admins.clone(),
            greet: Toggle::new(config.greet),
            logs,
        }
    }

    fn is_admin(&self, nick: &str) -> bool {
        self.admins.iter().any(|a| a.eq_ignore_ascii_case(nick))
    }
}

pub fn dispatcher(state: Arc<BotState>) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dispatcher
        .register("001", Arc::new(Welcome(state.clone())))
        .register("JOIN", Arc::new(Join(state.clone())))
        .register("PRIVMSG", Arc::new(Privmsg(state)));
    dispatcher
}

pub fn greeting(nick: &str) -> String {
    format!("{nick}, everything said in this channel is logged. Say :logbot to see what I can do.")
}

struct Welcome(Arc<BotState>);

#[async_trait]
impl Handler for Welcome {
    async fn handle(&self, _msg: &Message, session: &Session) {
        for channel in &self.0.channels {
            if let Err(err) = session.send("JOIN", &[channel.as_str()]).await {
                warn!(%err, %channel, "join failed");
                return;
            }
        }
    }
}

struct Join(Arc<BotState>);

#[async_trait]
impl Handler for Join {
    async fn handle(&self, msg: &Message, session: &Session) {
        let (Some(nick), Some(channel)) = (msg.nick(), msg.arg(0)) else {
            return;
        };
        if nick == session.nick() {
            info!(%channel, "joined");
            return;
        }
        self.0.logs.append(channel, &format!("-- {nick} joined"));
        if self.0.greet.is_on() {
            session.enqueue(channel, &greeting(nick)).await;
        }
    }
}

struct Privmsg(Arc<BotState>);

#[async_trait]
impl Handler for Privmsg {
    async fn handle(&self, msg: &Message, session: &Session) {
        let (Some(target), Some(text)) = (msg.arg(0), msg.arg(1)) else {
            return;
        };
        let sender = msg.nick().unwrap_or("");
        let private = target.eq_ignore_ascii_case(session.nick());

        let entry = match msg.ctcp() {
            Some(("ACTION", action)) => format!("* {sender} {action}"),
            _ => format!("<{sender}> {text}"),
        };
        self.0.logs.append(target, &entry);

        if sender.is_empty() || sender == session.nick() || !text.starts_with(':') {
            return;
        }
        let reply_to = if private { sender } else { target };
        self.run(commands::parse(text), reply_to, sender, private, session)
            .await;
    }
}

impl Privmsg {
    async fn run(
        &self,
        cmd: Option<Command<'_>>,
        reply_to: &str,
        sender: &str,
        private: bool,
        session: &Session,
    ) {
        let reply = match cmd {
            None => return,
            Some(Command::Help) => Some(commands::HELP.to_string()),
            Some(Command::Ln(args)) => commands::ln(&args),
            Some(Command::Log(args)) => commands::log(&args),
            Some(Command::Version) => Some(commands::version()),
            Some(Command::Greet(arg)) => {
                if !self.0.is_admin(sender) {
                    return;
                }
                match arg {
                    Some("on") => {
                        self.0.greet.set(true);
                    }
                    Some("off") => {
                        self.0.greet.set(false);
                    }
                    _ => {}
                }
                let state = if self.0.greet.is_on() { "on" } else { "off" };
                Some(format!("greeting is {state}"))
            }
            Some(Command::Raw(args)) => {
                if !private || !self.0.is_admin(sender) {
                    return;
                }
                if let Some((command, rest)) = args.split_first() {
                    info!(%sender, %command, "raw command");
                    if let Err(err) = session.send(&command.to_ascii_uppercase(), rest).await {
                        warn!(%err, "raw command failed");
                    }
                }
                None
            }
        };
        if let Some(reply) = reply {
            session.enqueue(reply_to, &reply).await;
        }
    }
}
