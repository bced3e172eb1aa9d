use super::*;
use crate::event::EventKind;
use crate::tracking::UserIdentity;
use pretty_assertions::assert_eq;

struct Harness {
    ctx: ConnectionContext,
    now: Instant,
    sent: Vec<String>,
    events: Vec<Event>,
}

impl Harness {
    fn new(identity: SessionIdentity) -> Self {
        let now = Instant::now();
        let settings = ContextSettings {
            client_name: "test client".to_string(),
            timing: TimingConfig::default(),
        };
        let ctx = ConnectionContext::new(NetworkId::next(), 1, identity, settings, now);
        let mut ret = Self {
            ctx,
            now,
            sent: Vec::new(),
            events: Vec::new(),
        };
        ret.collect();
        ret
    }

    fn with_login() -> Self {
        Self::new(SessionIdentity {
            login: Some(Credentials::new("bot", "pw").unwrap()),
            channels: vec!["main".to_string()],
            ..Default::default()
        })
    }

    /// Logged in and accepted, with no capability negotiation
    fn registered() -> Self {
        let mut h = Self::with_login();
        h.open_window();
        h.feed("ACCEPTED bot");
        h.drain_queue();
        h.take();
        h
    }

    fn collect(&mut self) {
        let output = self.ctx.take_output();
        self.sent.extend(output.immediate);
        self.events.extend(output.events.into_iter().map(|(e, _)| e));
    }

    fn feed(&mut self, line: &str) {
        self.ctx.handle_line(line, self.now);
        self.collect();
    }

    fn act(&mut self, action: ClientAction) {
        self.ctx.handle_action(action, self.now);
        self.collect();
    }

    fn open_window(&mut self) {
        self.now += self.ctx.settings().timing.login_delay();
        self.ctx.open_login_window(self.now);
        self.collect();
    }

    fn advance(&mut self, secs: u64) {
        self.now += Duration::from_secs(secs);
        self.ctx.keepalive_tick(self.now);
        self.collect();
    }

    fn take(&mut self) -> (Vec<String>, Vec<Event>) {
        (
            std::mem::take(&mut self.sent),
            std::mem::take(&mut self.events),
        )
    }

    fn drain_queue(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.ctx.pop_queued())
            .map(|q| q.line)
            .collect()
    }

    /// Events, leaving out the per-line observability ones
    fn protocol_events(&mut self) -> Vec<Event> {
        self.take()
            .1
            .into_iter()
            .filter(|e| !matches!(e.kind(), EventKind::Raw | EventKind::Message))
            .collect()
    }

    fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn session_start() {
    let mut h = Harness::new(SessionIdentity::default());
    let (sent, events) = h.take();
    assert_eq!(sent, strings(&["CAP LS"]));
    assert_eq!(events, vec![Event::Connected { session: 1 }]);
    assert_eq!(h.ctx.registration(), &RegistrationState::Connected);
}

#[test]
fn login_waits_for_window() {
    let mut h = Harness::with_login();
    h.take();

    h.feed("PING");
    assert!(!h.take().0.iter().any(|l| l.starts_with("LOGIN")));

    h.open_window();
    assert_eq!(h.take().0, strings(&["LOGIN bot pw 3200 * test client"]));
    assert_eq!(h.ctx.nickname(), Some("bot"));

    // Only ever once per session
    h.act(ClientAction::Login(Credentials::new("bot", "pw").unwrap()));
    assert!(h.take().0.is_empty());
}

#[test]
fn accepted_registers_and_joins() {
    let mut h = Harness::with_login();
    h.open_window();
    h.take();

    h.feed("ACCEPTED bot");
    assert_eq!(
        h.protocol_events(),
        vec![Event::Registered {
            nickname: "bot".to_string()
        }]
    );
    assert!(h.ctx.is_registered());
    assert!(h.ctx.keepalive_running());
    assert_eq!(h.drain_queue(), strings(&["JOIN main"]));
}

#[test]
fn denied_is_terminal() {
    let mut h = Harness::with_login();
    h.open_window();
    h.take();

    h.feed("DENIED Bad username/password");
    assert_eq!(
        h.protocol_events(),
        vec![Event::Denied {
            reason: "Bad username/password".to_string()
        }]
    );
    assert!(matches!(h.ctx.registration(), RegistrationState::Denied(_)));

    h.feed("ACCEPTED bot");
    assert!(!h.ctx.is_registered());
    assert!(h.protocol_events().is_empty());
}

#[test]
fn capability_flow() {
    let mut h = Harness::with_login();
    h.take();
    h.act(ClientAction::RequestCapability("x".to_string()));
    h.open_window();
    let (sent, _) = h.take();
    assert_eq!(sent, strings(&["LOGIN bot pw 3200 * test client"]));

    // Acceptance arrives before negotiation is complete and is held
    h.feed(":server CAP * LS :x y");
    assert_eq!(h.take().0, strings(&["CAP REQ :x"]));
    h.feed("ACCEPTED bot");
    assert!(!h.ctx.is_registered());

    h.feed(":server CAP bot ACK :x");
    let (sent, events) = h.take();
    assert_eq!(sent, strings(&["CAP END"]));
    assert!(events.contains(&Event::CapabilityAcknowledged {
        caps: strings(&["x"])
    }));
    assert!(events.contains(&Event::Registered {
        nickname: "bot".to_string()
    }));
    assert!(h.ctx.capabilities().is_active("x"));

    // Nothing more to send
    h.feed(":server CAP bot ACK :x");
    assert!(h.take().0.is_empty());
}

#[test]
fn negotiation_with_nothing_to_request_ends_at_once() {
    let mut h = Harness::with_login();
    h.open_window();
    h.take();

    h.feed(":server CAP * LS :multi-prefix");
    assert_eq!(h.take().0, strings(&["CAP END"]));
}

#[test]
fn sasl_exchange() {
    let mut h = Harness::new(SessionIdentity {
        sasl: Some(Credentials::new("user", "pass").unwrap()),
        ..Default::default()
    });
    h.open_window();
    h.take();

    h.feed(":server CAP * LS :sasl");
    assert_eq!(h.take().0, strings(&["CAP REQ :sasl"]));

    h.feed(":server CAP * ACK :sasl");
    assert_eq!(h.take().0, strings(&["AUTHENTICATE PLAIN"]));
    assert_eq!(h.ctx.registration(), &RegistrationState::Authenticating);

    h.feed("AUTHENTICATE +");
    assert_eq!(h.take().0, strings(&["AUTHENTICATE dXNlcgB1c2VyAHBhc3M="]));

    h.feed(":server 900 * user :You are now logged in");
    h.feed(":server 903 * :SASL authentication successful");
    let (sent, events) = h.take();
    assert_eq!(sent, strings(&["CAP END"]));
    assert_eq!(
        events
            .iter()
            .filter(|e| e.kind() == EventKind::AuthComplete)
            .count(),
        1
    );
    assert_eq!(h.ctx.auth_state(), AuthState::Complete);
}

#[test]
fn sasl_failure_is_fatal() {
    let mut h = Harness::new(SessionIdentity {
        login: Some(Credentials::new("bot", "pw").unwrap()),
        sasl: Some(Credentials::new("user", "wrong").unwrap()),
        ..Default::default()
    });
    h.open_window();
    h.feed(":server CAP * LS :sasl");
    h.feed(":server CAP * ACK :sasl");
    h.feed("AUTHENTICATE +");
    h.take();

    h.feed(":server 904 * :SASL authentication failed");
    assert_eq!(h.count(EventKind::AuthFailed), 1);
    let (sent, _) = h.take();
    assert!(!sent.contains(&"CAP END".to_string()));
    assert_eq!(h.ctx.auth_state(), AuthState::Failed);
    assert!(matches!(h.ctx.registration(), RegistrationState::Denied(_)));

    h.feed("ACCEPTED bot");
    assert!(!h.ctx.is_registered());
}

#[test]
fn sasl_failure_event() {
    let mut h = Harness::new(SessionIdentity {
        sasl: Some(Credentials::new("user", "wrong").unwrap()),
        ..Default::default()
    });
    h.open_window();
    h.feed(":server CAP * LS :sasl");
    h.feed(":server CAP * ACK :sasl");
    h.feed("AUTHENTICATE +");
    h.feed(":server 904 * :SASL authentication failed");

    assert_eq!(h.count(EventKind::AuthFailed), 1);
    assert_eq!(h.count(EventKind::Denied), 1);
    assert_eq!(h.count(EventKind::AuthComplete), 0);
}

#[test]
fn sasl_not_offered() {
    let mut h = Harness::new(SessionIdentity {
        sasl: Some(Credentials::new("user", "pass").unwrap()),
        ..Default::default()
    });
    h.open_window();
    h.feed(":server CAP * LS :multi-prefix");

    assert_eq!(h.count(EventKind::AuthFailed), 1);
    assert_eq!(h.count(EventKind::Denied), 1);
    assert!(!h.sent.iter().any(|l| l.starts_with("CAP REQ")));
    assert!(matches!(h.ctx.registration(), RegistrationState::Denied(_)));
}

#[test]
fn sasl_rejected_denies_the_session() {
    let mut h = Harness::new(SessionIdentity {
        sasl: Some(Credentials::new("user", "pass").unwrap()),
        ..Default::default()
    });
    h.open_window();
    h.feed(":server CAP * LS :sasl");
    h.take();

    h.feed(":server CAP * NAK :sasl");
    let (sent, events) = h.take();
    let events: Vec<Event> = events
        .into_iter()
        .filter(|e| !matches!(e.kind(), EventKind::Raw | EventKind::Message))
        .collect();
    assert_eq!(
        events,
        vec![
            Event::CapabilityRejected {
                caps: strings(&["sasl"])
            },
            Event::AuthFailed {
                reason: "sasl capability rejected".to_string()
            },
            Event::Denied {
                reason: "sasl capability rejected".to_string()
            },
        ]
    );
    // The rejected capability is not asked for again
    assert_eq!(sent, strings(&["CAP END"]));
    assert!(matches!(h.ctx.registration(), RegistrationState::Denied(_)));

    h.feed("ACCEPTED user");
    assert!(!h.ctx.is_registered());
}

fn joined_harness() -> Harness {
    let mut h = Harness::registered();
    h.feed("JOIN main");
    h
}

#[test]
fn own_join_starts_sync() {
    let mut h = joined_harness();
    assert_eq!(
        h.protocol_events(),
        vec![Event::Joined {
            channel: "main".to_string(),
            user: "bot".to_string(),
            is_self: true,
        }]
    );
    assert_eq!(h.drain_queue(), strings(&["WHO main", "MODE main"]));
    assert!(h.ctx.registry().channel("main").unwrap().available);
    assert!(h.ctx.registry().is_member("bot", "main"));
}

#[test]
fn whox_sync_query() {
    let mut h = Harness::registered();
    h.feed(":server 005 bot WHOX PREFIX=(ov)@+ :are supported by this server");
    h.feed("JOIN main");
    assert_eq!(h.drain_queue(), strings(&["WHO main %cnuha", "MODE main"]));

    h.feed(":server 354 bot main ident host.example alice alice_acct");
    let alice = h.ctx.registry().user("alice").unwrap();
    assert_eq!(alice.account.as_deref(), Some("alice_acct"));
    assert!(alice.is_known());
    assert!(h.ctx.registry().is_member("alice", "main"));
}

#[test]
fn sync_completes_once_in_any_order() {
    let who = ":server 315 bot main :End of /WHO list";
    let names = ":server 366 bot main :End of /NAMES list";
    let mode = ":server 324 bot main +nt";

    let orders = [
        [who, names, mode],
        [who, mode, names],
        [names, who, mode],
        [names, mode, who],
        [mode, who, names],
        [mode, names, who],
    ];

    for order in orders {
        let mut h = joined_harness();
        h.take();

        h.feed(order[0]);
        h.feed(order[1]);
        assert_eq!(h.count(EventKind::SyncComplete), 0, "{:?}", order);

        h.feed(order[2]);
        assert_eq!(h.count(EventKind::SyncComplete), 1, "{:?}", order);

        // Repeated replies do not announce again
        h.feed(who);
        h.feed(mode);
        assert_eq!(h.count(EventKind::SyncComplete), 1, "{:?}", order);
        assert_eq!(h.ctx.registry().channel("main").unwrap().mode, "+nt");
    }
}

#[test]
fn observed_channel_does_not_sync() {
    let mut h = Harness::registered();
    h.feed(":server 315 bot other :End of /WHO list");
    h.feed(":server 366 bot other :End of /NAMES list");
    h.feed(":server 324 bot other +nt");
    assert_eq!(h.count(EventKind::SyncComplete), 0);
}

#[test]
fn names_and_rename() {
    let mut h = joined_harness();
    h.feed(":server 353 bot = main :@+alice bob bot");
    h.feed(":server 352 bot main a alice.example srv alice H :0 Alice");

    let registry = h.ctx.registry();
    assert_eq!(registry.members_of("main"), vec!["alice", "bob", "bot"]);
    let chan = registry.channel("main").unwrap();
    assert!(chan.has_flag('@', "alice"));
    assert!(chan.has_flag('+', "alice"));
    assert_eq!(
        registry.user("bob").unwrap().identity,
        UserIdentity::PendingHostmask
    );

    h.feed(":alice!a@alice.example NICK alicia");
    let registry = h.ctx.registry();
    assert!(registry.user("alice").is_none());
    assert_eq!(
        registry.user("alicia").unwrap().previous_nicks,
        strings(&["alice"])
    );
    assert!(registry.is_member("alicia", "main"));
    assert!(!registry.is_member("alice", "main"));
    assert!(registry.channel("main").unwrap().has_flag('@', "alicia"));
}

#[test]
fn own_nick_change() {
    let mut h = Harness::registered();
    h.feed(":bot!b@host NICK bot2");
    assert_eq!(h.ctx.nickname(), Some("bot2"));
    assert_eq!(h.ctx.old_nickname(), Some("bot"));
    assert!(h.events.contains(&Event::NickChanged {
        old: "bot".to_string(),
        new: "bot2".to_string(),
        is_self: true,
    }));
}

#[test]
fn nick_collision() {
    let mut h = Harness::with_login();
    h.open_window();
    h.take();

    h.feed(":server 433 * bot :Nickname is already in use");
    let (sent, events) = h.take();
    assert_eq!(sent.len(), 1);
    let replacement = sent[0].strip_prefix("NICK a").unwrap();
    assert_eq!(replacement.len(), 8);

    assert_eq!(h.ctx.old_nickname(), Some("bot"));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::NickCollision { attempted, .. } if attempted == "bot")));
}

#[test]
fn membership_changes() {
    let mut h = joined_harness();
    h.feed("JOINED main alice");
    h.feed("JOINED main carol");
    h.feed("JOINED other alice");
    assert_eq!(h.ctx.registry().members_of("main"), vec!["alice", "bot", "carol"]);

    h.feed("LEFT main carol bye now");
    assert!(h.events.contains(&Event::Parted {
        channel: "main".to_string(),
        user: "carol".to_string(),
        reason: Some("bye now".to_string()),
        is_self: false,
    }));
    assert!(!h.ctx.registry().is_member("carol", "main"));

    h.feed(":alice!a@h QUIT :gone");
    assert!(h.ctx.registry().user("alice").is_none());
    assert!(h.ctx.registry().channels_of("alice").is_empty());

    h.feed(":op!o@h KICK main bot :out");
    let chan = h.ctx.registry().channel("main").unwrap();
    assert!(!chan.available);
    assert!(h.ctx.registry().members_of("main").is_empty());
}

#[test]
fn mode_changes() {
    let mut h = joined_harness();
    h.feed(":server 353 bot = main :alice bob +carol");
    h.take();

    h.feed(":ChanServ!s@services.example MODE main +ovk-v alice bob key carol");
    let events = h.protocol_events();
    assert_eq!(
        events,
        vec![
            Event::ModeSet {
                target: "main".to_string(),
                mode: 'o',
                arg: Some("alice".to_string()),
                setter: Some("ChanServ".to_string()),
            },
            Event::ModeSet {
                target: "main".to_string(),
                mode: 'v',
                arg: Some("bob".to_string()),
                setter: Some("ChanServ".to_string()),
            },
            Event::ModeSet {
                target: "main".to_string(),
                mode: 'k',
                arg: Some("key".to_string()),
                setter: Some("ChanServ".to_string()),
            },
            Event::ModeUnset {
                target: "main".to_string(),
                mode: 'v',
                arg: Some("carol".to_string()),
                setter: Some("ChanServ".to_string()),
            },
        ]
    );

    let chan = h.ctx.registry().channel("main").unwrap();
    assert!(chan.has_flag('@', "alice"));
    assert!(chan.has_flag('+', "bob"));
    assert!(!chan.has_flag('+', "carol"));
}

#[test]
fn topics() {
    let mut h = joined_harness();
    h.feed(":server 332 bot main :Welcome");
    assert_eq!(
        h.ctx.registry().channel("main").unwrap().topic.as_deref(),
        Some("Welcome")
    );
    assert_eq!(h.count(EventKind::TopicChanged), 0);

    h.feed(":alice!a@h TOPIC main :New topic");
    assert_eq!(
        h.ctx.registry().channel("main").unwrap().topic.as_deref(),
        Some("New topic")
    );
    assert_eq!(h.count(EventKind::TopicChanged), 1);
}

#[test]
fn chat_events() {
    let mut h = Harness::registered();
    h.feed("SAID main alice :hello there");
    h.feed("SAIDEX main alice waves at everyone");
    h.feed("SAIDPRIVATE alice psst");
    h.feed("SAIDPRIVATEEX alice :nods");

    assert_eq!(
        h.protocol_events(),
        vec![
            Event::Said {
                channel: "main".to_string(),
                user: "alice".to_string(),
                text: "hello there".to_string(),
            },
            Event::SaidEx {
                channel: "main".to_string(),
                user: "alice".to_string(),
                text: "waves at everyone".to_string(),
            },
            Event::SaidPrivate {
                user: "alice".to_string(),
                text: "psst".to_string(),
            },
            Event::SaidPrivateEx {
                user: "alice".to_string(),
                text: "nods".to_string(),
            },
        ]
    );
}

#[test]
fn malformed_lines_are_reported_not_dispatched() {
    let mut h = Harness::registered();
    h.feed(":lonely.source");

    let (_, events) = h.take();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind(), EventKind::Raw);
    assert_eq!(
        events[1],
        Event::MalformedLine {
            line: ":lonely.source".to_string(),
            error: ParseError::SourceWithoutVerb,
        }
    );
}

#[test]
fn missing_parameters_do_not_break_the_session() {
    let mut h = Harness::registered();
    h.feed("JOINED main");
    h.feed("SAID main alice hi");
    assert_eq!(h.count(EventKind::Said), 1);
}

#[test]
fn ping_pong_and_lag() {
    let mut h = Harness::registered();
    h.feed("PING lobby.example");
    assert_eq!(h.take().0, strings(&["PONG lobby.example"]));

    h.advance(29);
    assert_eq!(h.take().0, strings(&["PING"]));

    h.now += Duration::from_millis(300);
    h.feed("PONG");
    assert!(h
        .events
        .contains(&Event::Pong {
            lag: Duration::from_millis(300)
        }));
    assert_eq!(h.ctx.lag(), Some(Duration::from_millis(300)));
}

#[test]
fn silence_closes_session() {
    let mut h = Harness::registered();
    for _ in 0..3 {
        h.advance(29);
        assert_eq!(h.ctx.close_requested(), None);
    }
    h.advance(29);
    assert!(matches!(
        h.ctx.close_requested(),
        Some(SessionClose::PingTimeout(_))
    ));
}

#[test]
fn keepalive_waits_for_registration() {
    let mut h = Harness::with_login();
    h.take();
    h.advance(200);
    assert!(h.take().0.is_empty());
    assert_eq!(h.ctx.close_requested(), None);
}

#[test]
fn chat_before_registration_is_held() {
    let mut h = Harness::with_login();
    h.act(ClientAction::Say {
        channel: "main".to_string(),
        text: "early".to_string(),
    });
    assert!(h.drain_queue().is_empty());

    h.open_window();
    h.feed("ACCEPTED bot");
    assert_eq!(h.drain_queue(), strings(&["JOIN main", "SAY main early"]));
}

#[test]
fn long_chat_is_split() {
    let mut h = Harness::registered();
    h.act(ClientAction::SayPrivate {
        user: "alice".to_string(),
        text: format!("{}\n{}", "x".repeat(399), "y".repeat(10)),
    });
    let queued = h.drain_queue();
    assert_eq!(queued.len(), 2);
    assert_eq!(
        queued[0],
        format!("SAYPRIVATE alice :{}y", "x".repeat(399))
    );
    assert_eq!(queued[1], format!("SAYPRIVATE alice :{}", "y".repeat(9)));
}

#[test]
fn unsent_chat_survives_into_identity() {
    let mut h = Harness::registered();
    h.act(ClientAction::Say {
        channel: "main".to_string(),
        text: "one".to_string(),
    });
    h.act(ClientAction::Join("other".to_string()));
    h.act(ClientAction::Say {
        channel: "main".to_string(),
        text: "two".to_string(),
    });

    let identity = h.ctx.into_identity();
    assert_eq!(identity.replay, strings(&["SAY main one", "SAY main two"]));
    assert_eq!(identity.channels, strings(&["main", "other"]));
}

#[test]
fn leave_forgets_autojoin() {
    let mut h = Harness::registered();
    h.act(ClientAction::Leave("main".to_string()));
    assert_eq!(h.drain_queue(), strings(&["LEAVE main"]));
    assert!(h.ctx.identity().channels.is_empty());
}

#[test]
fn account_registration() {
    let mut h = Harness::new(SessionIdentity::default());
    h.take();
    h.act(ClientAction::RegisterAccount {
        credentials: Credentials::new("newbie", "pw").unwrap(),
        email: Some("n@example.com".to_string()),
    });
    assert_eq!(h.drain_queue(), strings(&["REGISTER newbie pw n@example.com"]));

    h.feed("REGISTRATIONACCEPTED");
    h.feed("REGISTRATIONDENIED name taken");
    assert_eq!(
        h.protocol_events(),
        vec![
            Event::AccountRegistered,
            Event::AccountRegistrationDenied {
                reason: "name taken".to_string()
            }
        ]
    );
}

#[test]
fn disconnect_sends_exit() {
    let mut h = Harness::registered();
    h.act(ClientAction::Disconnect);
    assert_eq!(h.take().0, strings(&["EXIT"]));
    assert_eq!(h.ctx.close_requested(), Some(&SessionClose::ClientExit));
}

#[test]
fn events_carry_their_message() {
    let mut h = Harness::registered();
    h.ctx.handle_line("SAID main alice :hi", h.now);
    let output = h.ctx.take_output();

    let (event, message) = output.events.last().unwrap();
    assert_eq!(event.kind(), EventKind::Said);
    let message = message.as_ref().unwrap();
    assert_eq!(message.verb, "SAID");
    assert_eq!(message.network, h.ctx.network());
}
