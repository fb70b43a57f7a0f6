//! Client session: TTY ownership, key filtering, display writes.
//!
//! A [`Session`] drives one [`Transport`] through the mode machine in
//! [`SessionMode`]. Requests are strictly sequential: each one waits for
//! its reply before the next is sent. Key events that arrive while a
//! reply is outstanding are queued and handed out by [`Session::read_key`].

use std::collections::VecDeque;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::display::{DisplaySize, DisplayWrite};
use crate::error::BrlError;
use crate::filter::{
    Disposition, FilterCategory, FilterDirective, FilterRegistry, KeySelector,
};
use crate::key::{KeyCode, KeyEvent};
use crate::message::PacketType;
use crate::network::{CloseHandle, Endpoint, StreamTransport, Transport};
use crate::packet::Packet;
use crate::protocol::handshake::Credential;
use crate::protocol::info::driver_name_from_packet;
use crate::protocol::keys::KeyRangesRequest;
use crate::protocol::tty::{EnterTtyRequest, leave_tty_packet};
use crate::state::{SessionMode, TtySlot};

pub struct Session<T: Transport = StreamTransport> {
    transport: T,
    mode: SessionMode,
    filters: FilterRegistry,
    pending_keys: VecDeque<KeyCode>,
    // Replies still owed for requests that timed out.
    stale_replies: usize,
    // Raised by the service since the last call; surfaced by the next one.
    pending_exception: Option<BrlError>,
    request_timeout: Option<Duration>,
    display_size: Option<DisplaySize>,
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("filters", &self.filters)
            .field("pending_keys", &self.pending_keys)
            .field("stale_replies", &self.stale_replies)
            .field("pending_exception", &self.pending_exception)
            .field("request_timeout", &self.request_timeout)
            .field("display_size", &self.display_size)
            .finish_non_exhaustive()
    }
}

impl Session<StreamTransport> {
    /// Connect and authenticate.
    pub async fn connect(endpoint: &Endpoint, credential: &Credential) -> Result<Self, BrlError> {
        let transport = StreamTransport::open(endpoint, credential).await?;
        Ok(Self::from_transport(transport))
    }
}

impl<T: Transport> Session<T> {
    /// Wrap a transport whose handshake already completed.
    pub fn from_transport(transport: T) -> Self {
        Self {
            transport,
            mode: SessionMode::connected(),
            filters: FilterRegistry::new(),
            pending_keys: VecDeque::new(),
            stale_replies: 0,
            pending_exception: None,
            request_timeout: None,
            display_size: None,
        }
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Bound every request/reply round-trip. `None` waits forever.
    pub fn set_request_timeout(&mut self, timeout: Option<Duration>) {
        self.request_timeout = timeout;
    }

    /// Handle that closes the transport from another task, waking a
    /// blocked [`read_key`](Self::read_key).
    pub fn close_handle(&self) -> CloseHandle {
        self.transport.close_handle()
    }

    // ── Plumbing ─────────────────────────────────────────────────

    fn teardown(&mut self) {
        if !self.mode.is_disconnected() {
            debug!(mode = %self.mode, "session disconnected");
        }
        self.mode.force_disconnect();
        self.filters.clear();
        self.pending_keys.clear();
        self.stale_replies = 0;
        self.pending_exception = None;
        self.transport.close();
    }

    /// Tear the session down if `result` shows the transport is gone.
    fn check<R>(&mut self, result: Result<R, BrlError>) -> Result<R, BrlError> {
        if let Err(e) = &result {
            if e.is_fatal() || !self.transport.is_open() {
                self.teardown();
            }
        }
        result
    }

    async fn send(&mut self, packet: Packet) -> Result<(), BrlError> {
        let result = self.transport.send(packet).await;
        self.check(result)
    }

    async fn receive(&mut self) -> Result<Packet, BrlError> {
        let result = self.transport.receive().await;
        self.check(result)
    }

    /// Handle packets that can arrive at any time. Returns the packet
    /// back when the caller must look at it.
    fn absorb(&mut self, packet: Packet) -> Result<Option<Packet>, BrlError> {
        match packet.packet_type() {
            PacketType::Exception => {
                let (code, request) = packet.service_error()?;
                warn!(%code, ?request, "service raised an exception");
                // Never stands in for a reply; held for the next call.
                if self.pending_exception.is_none() {
                    self.pending_exception = Some(BrlError::Service { code, request });
                }
                Ok(None)
            }
            ty if ty.is_reply() && self.stale_replies > 0 => {
                self.stale_replies -= 1;
                warn!(packet_type = %ty, "discarding late reply");
                Ok(None)
            }
            _ => Ok(Some(packet)),
        }
    }

    fn raise_pending(&mut self) -> Result<(), BrlError> {
        match self.pending_exception.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn await_reply(&mut self) -> Result<Packet, BrlError> {
        loop {
            let packet = self.receive().await?;
            let Some(packet) = self.absorb(packet)? else {
                continue;
            };
            match packet.packet_type() {
                PacketType::Key => {
                    let code = KeyCode(packet.key_code()?);
                    trace!(%code, "queued key while awaiting reply");
                    self.pending_keys.push_back(code);
                }
                ty if ty.is_reply() => return Ok(packet),
                ty => {
                    warn!(packet_type = %ty, "ignoring unexpected packet");
                }
            }
        }
    }

    /// Send `packet` and wait for its reply. The request timeout covers
    /// both legs.
    async fn request(&mut self, packet: Packet) -> Result<Packet, BrlError> {
        self.raise_pending()?;
        let request = packet.packet_type();
        let deadline = self
            .request_timeout
            .map(|limit| (limit, Instant::now() + limit));

        match deadline {
            Some((limit, at)) => match tokio::time::timeout_at(at, self.send(packet)).await {
                Ok(sent) => sent?,
                Err(_) => {
                    // Part of the frame may be on the wire; the stream is unusable.
                    warn!(%request, ?limit, "send timed out, closing session");
                    self.teardown();
                    return Err(BrlError::Timeout(limit));
                }
            },
            None => self.send(packet).await?,
        }

        let reply = match deadline {
            Some((limit, at)) => match tokio::time::timeout_at(at, self.await_reply()).await {
                Ok(reply) => reply?,
                Err(_) => {
                    self.stale_replies += 1;
                    warn!(%request, ?limit, "request timed out");
                    return Err(BrlError::Timeout(limit));
                }
            },
            None => self.await_reply().await?,
        };

        if reply.packet_type() == PacketType::Error {
            let (code, _) = reply.service_error()?;
            debug!(%request, %code, "request refused");
            return Err(BrlError::Service {
                code,
                request: Some(request),
            });
        }
        Ok(reply)
    }

    async fn request_ack(&mut self, packet: Packet) -> Result<(), BrlError> {
        let reply = self.request(packet).await?;
        reply.expect_type(PacketType::Ack)
    }

    // ── Connection-scoped ────────────────────────────────────────

    /// Name of the braille driver the service runs.
    pub async fn driver_name(&mut self) -> Result<String, BrlError> {
        self.mode.require_open("query the driver name")?;
        let reply = self
            .request(Packet::empty(PacketType::GetDriverName))
            .await?;
        driver_name_from_packet(&reply)
    }

    /// Display geometry. Queried once, then cached.
    pub async fn display_size(&mut self) -> Result<DisplaySize, BrlError> {
        self.mode.require_open("query the display size")?;
        if let Some(size) = self.display_size {
            return Ok(size);
        }
        let reply = self
            .request(Packet::empty(PacketType::GetDisplaySize))
            .await?;
        let size = DisplaySize::from_packet(&reply)?;
        self.display_size = Some(size);
        Ok(size)
    }

    // ── TTY mode ─────────────────────────────────────────────────

    /// Take ownership of a terminal slot. `None` asks for the one the
    /// service currently shows.
    pub async fn enter_tty(&mut self, tty: Option<u32>) -> Result<(), BrlError> {
        self.mode.require_connected("enter tty mode")?;
        let slot = TtySlot::from(tty);
        let packet = EnterTtyRequest::for_slot(slot).into_packet()?;
        self.request_ack(packet).await?;

        self.mode.enter_tty(slot)?;
        self.filters.clear();
        self.pending_keys.clear();
        debug!(%slot, "entered tty mode");
        Ok(())
    }

    /// Release the owned slot. Registered filters are dropped.
    pub async fn leave_tty(&mut self) -> Result<(), BrlError> {
        let slot = self.mode.require_tty("leave tty mode")?;
        self.request_ack(leave_tty_packet()).await?;

        let held = self.mode.duration();
        self.mode.leave_tty()?;
        self.filters.clear();
        self.pending_keys.clear();
        debug!(%slot, ?held, "left tty mode");
        Ok(())
    }

    /// Run `f` while owning a terminal slot; the slot is released on
    /// every exit path.
    pub async fn with_tty<R, F>(&mut self, tty: Option<u32>, f: F) -> Result<R, BrlError>
    where
        F: for<'s> FnOnce(&'s mut Self) -> BoxFuture<'s, Result<R, BrlError>>,
    {
        self.enter_tty(tty).await?;
        let result = f(self).await;

        if self.mode.is_tty_owned() {
            match self.leave_tty().await {
                Err(e) if result.is_ok() => return Err(e),
                Err(e) => warn!(error = %e, "failed to release tty"),
                Ok(()) => {}
            }
        }
        result
    }

    /// Close the session, releasing the slot first when one is owned.
    pub async fn disconnect(mut self) {
        if self.mode.is_tty_owned() {
            if let Err(e) = self.leave_tty().await {
                warn!(error = %e, "implicit tty release failed");
            }
        }
        self.teardown();
    }

    // ── Keys ─────────────────────────────────────────────────────

    /// Stop delivering `keys`, widened according to `category`.
    pub async fn ignore(
        &mut self,
        category: FilterCategory,
        keys: impl Into<KeySelector>,
    ) -> Result<(), BrlError> {
        self.register("ignore keys", Disposition::Ignore, category, keys.into())
            .await
    }

    /// Deliver `keys`, widened according to `category`, even inside a
    /// broader ignored range.
    pub async fn accept(
        &mut self,
        category: FilterCategory,
        keys: impl Into<KeySelector>,
    ) -> Result<(), BrlError> {
        self.register("accept keys", Disposition::Accept, category, keys.into())
            .await
    }

    async fn register(
        &mut self,
        operation: &'static str,
        disposition: Disposition,
        category: FilterCategory,
        keys: KeySelector,
    ) -> Result<(), BrlError> {
        self.mode.require_tty(operation)?;
        let directive = FilterDirective::new(disposition, category, keys)?;
        debug!(?disposition, ?category, ranges = directive.ranges().len(), "filter registered");
        self.filters.push(directive);
        self.sync_filters().await
    }

    /// Replay the registry so the service reaches the same decisions.
    async fn sync_filters(&mut self) -> Result<(), BrlError> {
        for (disposition, ranges) in self.filters.replay_plan() {
            let packet = KeyRangesRequest::new(disposition, ranges).into_packet()?;
            self.request_ack(packet).await?;
        }
        Ok(())
    }

    async fn next_key(&mut self) -> Result<KeyCode, BrlError> {
        loop {
            let packet = self.receive().await?;
            let Some(packet) = self.absorb(packet)? else {
                self.raise_pending()?;
                continue;
            };
            match packet.packet_type() {
                PacketType::Key => return Ok(KeyCode(packet.key_code()?)),
                ty => warn!(packet_type = %ty, "ignoring unexpected packet"),
            }
        }
    }

    /// Wait for the next key the registered filters let through.
    pub async fn read_key(&mut self) -> Result<KeyEvent, BrlError> {
        self.mode.require_tty("read a key")?;
        self.raise_pending()?;
        loop {
            let code = match self.pending_keys.pop_front() {
                Some(code) => code,
                None => self.next_key().await?,
            };
            if self.filters.accepts(code) {
                return Ok(KeyEvent::expand(code));
            }
            trace!(%code, "dropped filtered key");
        }
    }

    // ── Output ───────────────────────────────────────────────────

    pub async fn write(&mut self, write: &DisplayWrite) -> Result<(), BrlError> {
        self.mode.require_tty("write to the display")?;
        write.validate(self.display_size)?;
        let packet = write.to_packet()?;
        self.request_ack(packet).await
    }

    /// Show `text` on the whole display, padded or cut to fit.
    pub async fn write_text(&mut self, text: &str) -> Result<(), BrlError> {
        self.mode.require_tty("write to the display")?;
        let cells = self.display_size().await?.cells();
        let mut fitted: String = text.chars().take(cells).collect();
        let used = fitted.chars().count();
        fitted.extend(std::iter::repeat_n(' ', cells - used));
        self.write(&DisplayWrite::text(fitted)).await
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}
