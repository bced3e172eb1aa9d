use crate::errors::ConnectionError;
use crate::event::{Event, EventBus, Notification};
use crate::framing::{Frame, LineBuffer};
use crate::transport::BoxedStream;
use crate::{ClientAction, ConnectionContext, SessionClose};

use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf},
    select,
    sync::mpsc::UnboundedReceiver,
    time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior},
};

const READ_BUFFER_LEN: usize = 4096;

/// Why a transport session ended
#[derive(Debug)]
pub(crate) enum SessionEnd {
    /// The server closed the stream
    Closed,
    Error(ConnectionError),
    PingTimeout(Duration),
    /// The application asked to disconnect
    ClientExit,
    /// Every client handle has been dropped
    Abandoned,
}

impl SessionEnd {
    pub fn reason(&self) -> String {
        match self {
            Self::Closed => ConnectionError::Closed.to_string(),
            Self::Error(e) => e.to_string(),
            Self::PingTimeout(silent) => ConnectionError::PingTimeout(silent.as_secs()).to_string(),
            Self::ClientExit => "Client exited".to_string(),
            Self::Abandoned => "Client handle dropped".to_string(),
        }
    }

    /// Whether the reconnection policy applies to this kind of ending
    pub fn permits_reconnect(&self) -> bool {
        matches!(self, Self::Closed | Self::Error(_) | Self::PingTimeout(_))
    }
}

impl From<&SessionClose> for SessionEnd {
    fn from(close: &SessionClose) -> Self {
        match close {
            SessionClose::PingTimeout(silent) => Self::PingTimeout(*silent),
            SessionClose::ClientExit => Self::ClientExit,
        }
    }
}

/// What a finished session hands back to the supervisor
pub(crate) struct SessionOutcome {
    pub end: SessionEnd,
    pub context: ConnectionContext,
    pub actions: UnboundedReceiver<ClientAction>,
}

enum Step {
    Read(std::io::Result<usize>),
    Action(Option<ClientAction>),
    Pace,
    LoginWindow,
    Keepalive,
}

/// Drives one [`ConnectionContext`] over one transport stream until the
/// session ends
pub(crate) struct ConnectionTask {
    ctx: ConnectionContext,
    stream: BoxedStream,
    bus: EventBus,
    actions: UnboundedReceiver<ClientAction>,
}

impl ConnectionTask {
    pub fn new(
        ctx: ConnectionContext,
        stream: BoxedStream,
        bus: EventBus,
        actions: UnboundedReceiver<ClientAction>,
    ) -> Self {
        Self {
            ctx,
            stream,
            bus,
            actions,
        }
    }

    #[tracing::instrument(skip_all, fields(network = %self.ctx.network(), session = self.ctx.session()))]
    pub async fn run(self) -> SessionOutcome {
        let Self {
            mut ctx,
            stream,
            bus,
            mut actions,
        } = self;

        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut runner = Runner {
            ctx: &mut ctx,
            bus: &bus,
            writer: &mut writer,
        };

        let end = runner.run(&mut reader, &mut actions).await;
        tracing::info!(reason = %end.reason(), "Session ended");

        if let Err(e) = writer.shutdown().await {
            tracing::trace!(error = %e, "Error shutting down transport");
        }

        SessionOutcome {
            end,
            context: ctx,
            actions,
        }
    }
}

struct Runner<'a, W> {
    ctx: &'a mut ConnectionContext,
    bus: &'a EventBus,
    writer: &'a mut W,
}

impl<'a, W> Runner<'a, W>
where
    W: AsyncWrite + Unpin,
{
    async fn run<R>(
        &mut self,
        reader: &mut ReadHalf<R>,
        actions: &mut UnboundedReceiver<ClientAction>,
    ) -> SessionEnd
    where
        R: AsyncRead,
    {
        let timing = self.ctx.settings().timing;
        let start = Instant::now();

        let mut pacer = interval_at(start + timing.pacing_interval(), timing.pacing_interval());
        pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let login_window = sleep_until(start + timing.login_delay());
        tokio::pin!(login_window);
        let mut login_pending = true;

        let mut keepalive: Option<Interval> = None;
        let mut framer = LineBuffer::new();
        let mut buf = vec![0u8; READ_BUFFER_LEN];

        tracing::info!("Connected");
        if let Err(e) = self.flush().await {
            return SessionEnd::Error(e);
        }

        loop {
            if let Some(close) = self.ctx.close_requested() {
                return close.into();
            }

            if keepalive.is_none() && self.ctx.keepalive_running() {
                let period = timing.ping_interval();
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                keepalive = Some(interval);
            }

            let step = select! {
                read = reader.read(&mut buf) => Step::Read(read),
                action = actions.recv() => Step::Action(action),
                _ = pacer.tick() => Step::Pace,
                _ = &mut login_window, if login_pending => Step::LoginWindow,
                _ = tick(&mut keepalive), if keepalive.is_some() => Step::Keepalive,
            };

            let result = match step {
                Step::Read(Ok(0)) => return SessionEnd::Closed,
                Step::Read(Ok(len)) => self.receive(&mut framer, &buf[..len]).await,
                Step::Read(Err(e)) => return SessionEnd::Error(e.into()),
                Step::Action(None) => return SessionEnd::Abandoned,
                Step::Action(Some(action)) => {
                    self.ctx.handle_action(action, Instant::now());
                    self.flush().await
                }
                Step::Pace => self.send_queued().await,
                Step::LoginWindow => {
                    login_pending = false;
                    self.ctx.open_login_window(Instant::now());
                    self.flush().await
                }
                Step::Keepalive => {
                    self.ctx.keepalive_tick(Instant::now());
                    self.flush().await
                }
            };

            if let Err(e) = result {
                return SessionEnd::Error(e);
            }
        }
    }

    /// Handle every complete line in a chunk of input, publishing the results
    /// of each line before the next is processed
    async fn receive(&mut self, framer: &mut LineBuffer, data: &[u8]) -> Result<(), ConnectionError> {
        for frame in framer.feed(data) {
            match frame {
                Frame::Line(line) => {
                    tracing::trace!(%line, "<<");
                    self.ctx.handle_line(&line, Instant::now());
                }
                Frame::Overlong(prefix) => self.ctx.handle_overlong(&prefix, Instant::now()),
            }
            self.flush().await?;
        }
        Ok(())
    }

    /// Transmit the next paced line, if there is one
    async fn send_queued(&mut self) -> Result<(), ConnectionError> {
        let Some(queued) = self.ctx.pop_queued() else {
            return Ok(());
        };

        if let Err(e) = self.write_line(&queued.line).await {
            self.ctx.requeue(queued);
            return Err(e);
        }
        self.publish(Event::LineSent { line: queued.line });
        Ok(())
    }

    /// Publish pending events, then write the lines that bypass the queue
    async fn flush(&mut self) -> Result<(), ConnectionError> {
        let output = self.ctx.take_output();

        for (event, message) in &output.events {
            self.bus.publish(&Notification {
                context: &*self.ctx,
                event,
                message: message.as_deref(),
            });
        }

        for line in output.immediate {
            self.write_line(&line).await?;
            self.publish(Event::LineSent { line });
        }
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<(), ConnectionError> {
        tracing::trace!(%line, ">>");
        self.writer.write_all(format!("{}\r\n", line).as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    fn publish(&self, event: Event) {
        self.bus.publish(&Notification {
            context: &*self.ctx,
            event: &event,
            message: None,
        });
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
