//! Reference module for modlink hosts.
//!
//! Build it as a shared library and point the host (or `modlink ping`) at it.
//! Replies:
//! - ping: `BooleanMessage(true, PING)`
//! - any frame with a composite payload: the same entries plus `echoed_by`
//!   and `count`, under the same code
//! - anything else: `BooleanMessage(false, code)`

use modlink_module::frame::{BooleanMessage, CompositeMessage, Frame, Message, PING};
use modlink_module::Module;
use tracing::{debug, warn};

/// Value stored under `echoed_by` in every echoed composite.
pub const MODULE_NAME: &str = "echo";

#[derive(Debug, Default)]
pub struct EchoModule {
    handled: u64,
}

impl EchoModule {
    pub fn handled(&self) -> u64 {
        self.handled
    }

    fn echo(&self, frame: Frame) -> Option<Frame> {
        let code = frame.code();
        let reply = CompositeMessage::decode(frame).and_then(|mut message| {
            message.set("echoed_by", MODULE_NAME)?;
            message.set("count", &self.handled)?;
            message.encode()
        });

        match reply {
            Ok(frame) => Some(frame),
            Err(err) => {
                warn!(code, error = %err, "could not echo composite payload");
                None
            }
        }
    }
}

impl Module for EchoModule {
    fn load(&mut self) -> bool {
        debug!("echo module loaded");
        true
    }

    fn handle_message(&mut self, frame: Frame) -> Option<Frame> {
        self.handled += 1;

        if frame.is_ping() {
            return BooleanMessage::new(true, PING).encode().ok();
        }
        if !frame.content().is_null() && frame.size() > 0 {
            return self.echo(frame);
        }
        BooleanMessage::new(false, frame.code()).encode().ok()
    }

    fn unload(&mut self) {
        debug!(handled = self.handled, "echo module unloading");
    }
}

modlink_module::export_module!(|_| EchoModule::default());
