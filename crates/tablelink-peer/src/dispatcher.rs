use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tablelink_frame::codec::VALUE_SEPARATOR;
use tablelink_frame::{
    catalog, checksum, Frame, FrameConfig, FrameError, FrameReader, FrameWriter, Message,
    MessageIdSequence, Setting, Side, Token,
};
use tablelink_transport::{LinkStream, TransportError};
use tracing::{debug, warn};

use crate::config::DispatcherConfig;
use crate::error::{PeerError, Result};

/// A correlated response to a [`Dispatcher::call`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Id of the request this answers.
    pub id: u8,
    /// Comma-separated response arguments, in order. Empty for setter acks.
    pub values: Vec<i64>,
}

impl Response {
    /// The first response value, if any.
    pub fn value(&self) -> Option<i64> {
        self.values.first().copied()
    }
}

/// A goal reported by the device while a game is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalEvent {
    pub id: u8,
    pub side: Side,
    pub speed: i64,
}

type Completion = std::result::Result<Frame, PeerError>;

#[derive(Default)]
struct PendingCalls {
    calls: HashMap<u8, SyncSender<Completion>>,
    closed: Option<String>,
}

#[derive(Default)]
struct UnsolicitedQueue {
    frames: VecDeque<Frame>,
    closed: bool,
}

struct Shared {
    pending: Mutex<PendingCalls>,
    unsolicited: Mutex<UnsolicitedQueue>,
    unsolicited_ready: Condvar,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, PendingCalls> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unsolicited(&self) -> MutexGuard<'_, UnsolicitedQueue> {
        self.unsolicited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn closed_reason(&self) -> Option<String> {
        self.pending().closed.clone()
    }

    /// Mark the link closed and fail every call still waiting.
    fn close(&self, reason: String) {
        let waiting = {
            let mut pending = self.pending();
            if pending.closed.is_none() {
                pending.closed = Some(reason.clone());
            }
            std::mem::take(&mut pending.calls)
        };
        if !waiting.is_empty() {
            warn!(calls = waiting.len(), %reason, "failing pending calls");
        }
        for (_, completion) in waiting {
            let _ = completion.try_send(Err(PeerError::Disconnected(reason.clone())));
        }

        self.unsolicited().closed = true;
        self.unsolicited_ready.notify_all();
    }

    fn fail_call(&self, id: u8, error: PeerError) {
        if let Some(completion) = self.pending().calls.remove(&id) {
            let _ = completion.try_send(Err(error));
        }
    }
}

/// Controller end of the table link.
///
/// Owns a sender worker that writes queued requests in order and a receiver
/// worker that routes every inbound frame: id 100 goes to the unsolicited
/// queue, anything else completes the pending call with that id. Calls may be
/// issued from several threads at once; each waits on its own completion.
pub struct Dispatcher {
    shared: Arc<Shared>,
    ids: Mutex<MessageIdSequence>,
    outgoing: Mutex<Option<Sender<Message>>>,
    stream: LinkStream,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    /// Start the dispatcher workers on a connected link.
    pub fn new(stream: LinkStream, config: DispatcherConfig) -> Result<Self> {
        let frame_config = FrameConfig {
            max_frame_len: config.max_frame_len,
            ..FrameConfig::default()
        };
        let reader = FrameReader::with_config(stream.try_clone()?, frame_config.clone());
        let writer = FrameWriter::with_config(stream.try_clone()?, frame_config);

        let shared = Arc::new(Shared {
            pending: Mutex::new(PendingCalls::default()),
            unsolicited: Mutex::new(UnsolicitedQueue::default()),
            unsolicited_ready: Condvar::new(),
        });
        let (outgoing, queue) = mpsc::channel();

        let receiver = {
            let shared = Arc::clone(&shared);
            let capacity = config.unsolicited_capacity.max(1);
            thread::Builder::new()
                .name("tablelink-recv".to_string())
                .spawn(move || receive_loop(reader, &shared, capacity))
                .map_err(TransportError::from)?
        };
        let sender = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("tablelink-send".to_string())
                .spawn(move || send_loop(writer, queue, &shared))
                .map_err(TransportError::from)?
        };

        debug!(?config, "dispatcher started");

        Ok(Self {
            shared,
            ids: Mutex::new(MessageIdSequence::new()),
            outgoing: Mutex::new(Some(outgoing)),
            stream,
            workers: Mutex::new(vec![sender, receiver]),
            config,
        })
    }

    /// Send `command` (with `args` if non-empty) and wait for its response.
    ///
    /// Waits up to [`DispatcherConfig::call_timeout`].
    pub fn call(&self, command: &str, args: &str) -> Result<Response> {
        self.call_with_timeout(command, args, self.config.call_timeout)
    }

    /// Like [`call`](Self::call) with an explicit timeout.
    pub fn call_with_timeout(
        &self,
        command: &str,
        args: &str,
        timeout: Duration,
    ) -> Result<Response> {
        let id = self
            .ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_id();
        let message = Message::with_args(id, command, args)?;
        if message.wire_size() > self.config.max_frame_len {
            return Err(FrameError::FrameTooLong {
                size: message.wire_size(),
                max: self.config.max_frame_len,
            }
            .into());
        }

        let (completion, done) = mpsc::sync_channel(1);
        {
            let mut pending = self.shared.pending();
            if let Some(reason) = &pending.closed {
                return Err(PeerError::Disconnected(reason.clone()));
            }
            if pending.calls.contains_key(&id) {
                return Err(PeerError::IdInUse(id));
            }
            pending.calls.insert(id, completion);
        }

        debug!(id, body = message.body(), "sending request");
        if !self.enqueue(message) {
            self.shared.pending().calls.remove(&id);
            return Err(PeerError::Disconnected("dispatcher shut down".to_string()));
        }

        match done.recv_timeout(timeout) {
            Ok(Ok(frame)) => response_from_frame(frame),
            Ok(Err(err)) => Err(err),
            Err(RecvTimeoutError::Timeout) => {
                self.shared.pending().calls.remove(&id);
                debug!(id, ?timeout, "request timed out");
                Err(PeerError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(PeerError::Disconnected(
                self.shared
                    .closed_reason()
                    .unwrap_or_else(|| "dispatcher shut down".to_string()),
            )),
        }
    }

    /// Read one setting.
    pub fn get(&self, setting: Setting) -> Result<i64> {
        let response = self.call(&setting.getter().to_string(), "")?;
        response.value().ok_or_else(|| {
            PeerError::MalformedResponse(format!("no value for {}", setting.name()))
        })
    }

    /// Write one setting. The device clamps out-of-range values.
    pub fn set(&self, setting: Setting, value: i64) -> Result<()> {
        self.call(&setting.setter().to_string(), &value.to_string())
            .map(|_| ())
    }

    /// Start or stop a game. Goals are only reported while one is running.
    pub fn set_game_active(&self, active: bool) -> Result<()> {
        let value = if active {
            catalog::ACTIVE
        } else {
            catalog::INACTIVE
        };
        self.set(Setting::GameState, value)
    }

    /// Take the next queued unsolicited event without waiting.
    pub fn poll_unsolicited(&self) -> Result<Option<GoalEvent>> {
        let frame = self.shared.unsolicited().frames.pop_front();
        frame.map(goal_from_frame).transpose()
    }

    /// Wait up to `timeout` for the next unsolicited event.
    ///
    /// Returns `Ok(None)` when the timeout elapses and `Disconnected` once the
    /// link has closed and the queue is drained.
    pub fn wait_unsolicited(&self, timeout: Duration) -> Result<Option<GoalEvent>> {
        let (frame, closed) = {
            let queue = self.shared.unsolicited();
            let (mut queue, _) = self
                .shared
                .unsolicited_ready
                .wait_timeout_while(queue, timeout, |queue| {
                    queue.frames.is_empty() && !queue.closed
                })
                .unwrap_or_else(PoisonError::into_inner);
            (queue.frames.pop_front(), queue.closed)
        };

        match frame {
            Some(frame) => goal_from_frame(frame).map(Some),
            None if closed => Err(PeerError::Disconnected(
                self.shared
                    .closed_reason()
                    .unwrap_or_else(|| "link closed".to_string()),
            )),
            None => Ok(None),
        }
    }

    /// True once the link has closed, whatever the cause.
    pub fn is_closed(&self) -> bool {
        self.shared.closed_reason().is_some()
    }

    /// Current configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Stop both workers and close the link. Idempotent.
    pub fn shutdown(&self) {
        drop(
            self.outgoing
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        if let Err(err) = self.stream.shutdown() {
            debug!(error = %err, "link shutdown failed");
        }

        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for worker in workers {
            if worker.join().is_err() {
                warn!("dispatcher worker panicked");
            }
        }
        self.shared.close("dispatcher shut down".to_string());
    }

    fn enqueue(&self, message: Message) -> bool {
        let outgoing = self.outgoing.lock().unwrap_or_else(PoisonError::into_inner);
        match outgoing.as_ref() {
            Some(outgoing) => outgoing.send(message).is_ok(),
            None => false,
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stream", &self.stream)
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn send_loop(mut writer: FrameWriter<LinkStream>, queue: Receiver<Message>, shared: &Shared) {
    for message in queue {
        match writer.send(&message) {
            Ok(()) => debug!(id = message.id(), "request written"),
            Err(err) => {
                warn!(id = message.id(), error = %err, "failed to write request");
                shared.fail_call(
                    message.id(),
                    PeerError::Disconnected(format!("write failed: {err}")),
                );
            }
        }
    }
    debug!("sender worker stopped");
}

fn receive_loop(mut reader: FrameReader<LinkStream>, shared: &Shared, capacity: usize) {
    let reason = loop {
        match reader.read_frame() {
            Ok(frame) => route(shared, frame, capacity),
            Err(err) if err.is_malformed() => warn!(error = %err, "discarding malformed frame"),
            Err(FrameError::ConnectionClosed) => break "link closed by peer".to_string(),
            Err(err) => break format!("link read failed: {err}"),
        }
    };
    debug!(%reason, "receiver worker stopped");
    shared.close(reason);
}

fn route(shared: &Shared, frame: Frame, capacity: usize) {
    debug!(id = frame.id, body = %frame.body, "frame received");

    if frame.is_unsolicited() {
        let mut queue = shared.unsolicited();
        if queue.frames.len() >= capacity {
            if let Some(dropped) = queue.frames.pop_front() {
                warn!(body = %dropped.body, capacity, "unsolicited queue full; dropping oldest");
            }
        }
        queue.frames.push_back(frame);
        drop(queue);
        shared.unsolicited_ready.notify_one();
        return;
    }

    let id = frame.id;
    let completion = shared.pending().calls.remove(&id);
    match completion {
        Some(completion) => {
            let _ = completion.try_send(Ok(frame));
        }
        None => warn!(id, body = %frame.body, "dropping response with no pending call"),
    }
}

fn response_from_frame(frame: Frame) -> Result<Response> {
    if catalog::is_error_body(&frame.body) {
        return Err(PeerError::Protocol {
            id: frame.id,
            body: frame.body,
        });
    }
    verify_checksum(&frame)?;
    let values = parse_values(frame.args())?;
    Ok(Response {
        id: frame.id,
        values,
    })
}

fn goal_from_frame(frame: Frame) -> Result<GoalEvent> {
    verify_checksum(&frame)?;
    if Token::parse(frame.token()) != Some(Token::GoalData) {
        return Err(PeerError::UnknownMessage(frame.body));
    }
    match parse_values(frame.args())?.as_slice() {
        [side, speed] => {
            let side = Side::from_value(*side)
                .ok_or_else(|| PeerError::MalformedResponse(format!("unknown side {side}")))?;
            Ok(GoalEvent {
                id: frame.id,
                side,
                speed: *speed,
            })
        }
        values => Err(PeerError::MalformedResponse(format!(
            "goal data needs side and speed, got {} values",
            values.len()
        ))),
    }
}

fn verify_checksum(frame: &Frame) -> Result<()> {
    if frame.validate() {
        return Ok(());
    }
    Err(PeerError::Checksum {
        id: frame.id,
        expected: checksum(&frame.body),
        received: frame.checksum,
    })
}

/// Setter acks may arrive as `TOKEN` or `TOKEN:`; both carry no values.
fn parse_values(args: Option<&str>) -> Result<Vec<i64>> {
    let args = match args.map(str::trim) {
        None | Some("") => return Ok(Vec::new()),
        Some(args) => args,
    };
    args.split(VALUE_SEPARATOR)
        .map(|value| {
            value.trim().parse::<i64>().map_err(|_| {
                PeerError::MalformedResponse(format!("non-integer value {value:?}"))
            })
        })
        .collect()
}
