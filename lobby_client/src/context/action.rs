use super::*;
use crate::command::{split_text, MAX_TEXT_LEN};

/// A request from the application, delivered to the connection task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    Login(Credentials),
    RegisterAccount {
        credentials: Credentials,
        email: Option<String>,
    },
    Authenticate(Credentials),
    RequestCapability(String),
    Join(String),
    Leave(String),
    Say { channel: String, text: String },
    SayEx { channel: String, text: String },
    SayPrivate { user: String, text: String },
    SayPrivateEx { user: String, text: String },
    Raw(String),
    Disconnect,
}

impl ConnectionContext {
    /// Apply an application request. Chat sent before registration completes is
    /// held and queued once the session is registered.
    pub fn handle_action(&mut self, action: ClientAction, now: Instant) {
        self.now = now;
        tracing::trace!(?action, "Client action");

        match action {
            ClientAction::Login(credentials) => {
                self.identity.login = Some(credentials);
                self.try_login();
            }
            ClientAction::RegisterAccount { credentials, email } => {
                self.enqueue(&Command::Register {
                    username: credentials.username,
                    password: credentials.password,
                    email,
                });
            }
            ClientAction::Authenticate(credentials) => {
                self.identity.sasl = Some(credentials.clone());
                self.sasl.configure(credentials);
                self.caps.wait_for(SASL_CAPABILITY);
                self.advance_negotiation();
            }
            ClientAction::RequestCapability(cap) => {
                if !self.identity.capabilities.contains(&cap) {
                    self.identity.capabilities.push(cap.clone());
                }
                self.caps.request(&cap);
                self.advance_negotiation();
            }
            ClientAction::Join(channel) => {
                if !self.identity.channels.contains(&channel) {
                    self.identity.channels.push(channel.clone());
                }
                if self.is_registered() {
                    self.enqueue(&Command::Join(channel));
                }
            }
            ClientAction::Leave(channel) => {
                self.identity.channels.retain(|c| c != &channel);
                if self.is_registered() {
                    self.enqueue(&Command::Leave(channel));
                }
            }
            ClientAction::Say { channel, text } => {
                self.chat(&text, |text| Command::Say {
                    channel: channel.clone(),
                    text,
                });
            }
            ClientAction::SayEx { channel, text } => {
                self.chat(&text, |text| Command::SayEx {
                    channel: channel.clone(),
                    text,
                });
            }
            ClientAction::SayPrivate { user, text } => {
                self.chat(&text, |text| Command::SayPrivate {
                    user: user.clone(),
                    text,
                });
            }
            ClientAction::SayPrivateEx { user, text } => {
                self.chat(&text, |text| Command::SayPrivateEx {
                    user: user.clone(),
                    text,
                });
            }
            ClientAction::Raw(line) => {
                let cmd = Command::Raw(line);
                if !cmd.to_line().is_empty() {
                    self.enqueue(&cmd);
                }
            }
            ClientAction::Disconnect => {
                self.send_now(&Command::Exit);
                self.close = Some(SessionClose::ClientExit);
            }
        }
    }

    fn chat(&mut self, text: &str, make: impl Fn(String) -> Command) {
        for chunk in split_text(text, MAX_TEXT_LEN) {
            let cmd = make(chunk);
            if self.is_registered() {
                self.enqueue(&cmd);
            } else {
                self.identity.replay.push(cmd.to_line());
            }
        }
    }
}
