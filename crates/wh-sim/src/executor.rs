//! The single-threaded executor: one command queue in, one sink out.
//!
//! Transport listeners decode JSON into [`Inbound`] values and push them
//! onto the channel; this loop is the only code that ever touches the
//! warehouse.  It blocks on the channel whenever ticking is pointless (not
//! RUNNING, gate armed, or nothing could happen) and otherwise drains
//! pending commands before every tick, so a command always takes effect at
//! a tick boundary.

use std::sync::mpsc::{Receiver, TryRecvError};

use tracing::{error, warn};

use wh_plan::Planner;
use wh_proto::msg::outbound_types;
use wh_proto::{encode_ack, encode_msg, encode_update, Inbound, ProtoError};

use crate::sink::UpdateSink;
use crate::warehouse::Warehouse;

/// Drives a [`Warehouse`] from a channel of decoded inbound messages.
pub struct Executor<P: Planner, S: UpdateSink> {
    warehouse: Warehouse<P>,
    rx: Receiver<Inbound>,
    sink: S,
}

impl<P: Planner, S: UpdateSink> Executor<P, S> {
    pub fn new(warehouse: Warehouse<P>, rx: Receiver<Inbound>, sink: S) -> Self {
        Self { warehouse, rx, sink }
    }

    /// Run until the command channel disconnects.
    pub fn run(&mut self) {
        loop {
            // Suspend while nothing can progress: not running, gated on an
            // ACK, or the world is quiescent (ticking would only spin).
            let must_wait = !self.warehouse.can_tick() || self.warehouse.is_quiescent();
            if must_wait {
                match self.rx.recv() {
                    Ok(msg) => self.handle(msg),
                    Err(_) => return, // transport gone: shut down
                }
            }
            // Drain whatever else queued up; commands take effect before
            // the next tick starts.
            loop {
                match self.rx.try_recv() {
                    Ok(msg) => self.handle(msg),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return,
                }
            }

            if self.warehouse.can_tick() && !self.warehouse.is_quiescent() {
                self.tick();
            }
        }
    }

    /// Access the warehouse (tests, diagnostics).
    pub fn warehouse(&self) -> &Warehouse<P> {
        &self.warehouse
    }

    pub fn into_parts(self) -> (Warehouse<P>, S) {
        (self.warehouse, self.sink)
    }

    // ── One tick ──────────────────────────────────────────────────────────

    fn tick(&mut self) {
        match self.warehouse.run_tick() {
            Ok(result) => {
                if let Some(update) = result.update {
                    if self.sink.send(&encode_update(&update)).is_err() {
                        // Transport send failure is fatal for the session;
                        // there is nobody left to tell.
                        warn!("send failed; idling session");
                        self.warehouse.fail_to_idle();
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "tick failed");
                let fatal = ProtoError::Server(e.to_string());
                let _ = self.sink.send(&encode_msg(&fatal));
                self.warehouse.fail_to_idle();
            }
        }
    }

    // ── Command handling ──────────────────────────────────────────────────

    fn handle(&mut self, msg: Inbound) {
        match msg {
            Inbound::Start(start) => {
                let result = self.warehouse.handle_start(&start);
                self.reply(outbound_types::ACK_START, result);
            }
            Inbound::Stop => self.warehouse.handle_stop(),
            Inbound::Pause => {
                if let Err(e) = self.warehouse.handle_pause() {
                    self.send_error(&e);
                }
            }
            Inbound::Resume => {
                let result = self.warehouse.handle_resume();
                self.reply(outbound_types::ACK_RESUME, result);
            }
            Inbound::Order(order) => {
                let result = self.warehouse.handle_order(&order);
                self.reply(outbound_types::ACK_ORDER, result);
            }
            Inbound::Control(control) => {
                if let Err(e) = self.warehouse.handle_control(&control) {
                    self.send_error(&e);
                }
            }
            Inbound::AckUpdate => {
                if let Err(e) = self.warehouse.handle_ack_update() {
                    self.send_error(&e);
                }
            }
        }
    }

    /// Send a typed ACK; a failed send idles the session.
    fn reply(&mut self, ack_type: u8, result: Result<(), ProtoError>) {
        let ack = encode_ack(ack_type, result.as_ref().map(|_| ()));
        if self.sink.send(&ack).is_err() {
            warn!("send failed; idling session");
            self.warehouse.fail_to_idle();
        }
    }

    /// Errors for messages without a dedicated ACK go out as MSG.
    fn send_error(&mut self, err: &ProtoError) {
        if self.sink.send(&encode_msg(err)).is_err() {
            warn!("send failed; idling session");
            self.warehouse.fail_to_idle();
        }
    }
}
