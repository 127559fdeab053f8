use std::sync::mpsc::{self, Receiver, Sender};

use crate::error::{LineError, Result};
use crate::traits::LineTx;

/// Line that queues transmitted bytes on an `mpsc` channel.
///
/// Used to chain simulated devices: the transmit side of one device feeds a
/// queue that a driver loop drains into the next device's receive callback.
/// Queuing (rather than calling the next device directly) keeps a ring of
/// devices from re-entering itself.
#[derive(Clone, Debug)]
pub struct ChannelLine {
    tx: Sender<u8>,
}

impl ChannelLine {
    /// Create a line and the receiving end of its queue.
    pub fn pair() -> (Self, Receiver<u8>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl LineTx for ChannelLine {
    fn transmit(&mut self, byte: u8) -> Result<()> {
        self.tx.send(byte).map_err(|_| LineError::Disconnected)
    }
}
