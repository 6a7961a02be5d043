//! The message router: a single-consumer dispatch loop over inbound frames,
//! driven by a `mio_06::Poll` exactly as the teacher's DDS readers drive
//! their own event loops over `mio_extras` channels (see
//! `dds::statusevents::sync_status_channel`). No async runtime is pulled in;
//! the worker is one OS thread cooperating with the poll.

use std::io;
use std::thread::{self, JoinHandle};

use log::{debug, error, trace, warn};
use mio_06::{Events, Poll, PollOpt, Ready, Token};
use mio_extras::channel as mio_channel;

use crate::transport::Frame;

const FRAME_TOKEN: Token = Token(0);
const SHUTDOWN_TOKEN: Token = Token(1);

/// A frame handler, invoked once per inbound frame on the router's worker
/// thread. Handlers run cooperatively: a slow handler delays every other
/// frame, matching the "single-threaded cooperative" concurrency note in
/// `spec.md` §5.
pub trait FrameHandler: Send + 'static {
    fn handle(&mut self, frame: Frame);
}

impl<F: FnMut(Frame) + Send + 'static> FrameHandler for F {
    fn handle(&mut self, frame: Frame) {
        (self)(frame)
    }
}

/// Sending half, handed to whatever feeds inbound frames into the core
/// (e.g. the host's transport listener).
#[derive(Clone)]
pub struct RouterSender {
    sender: mio_channel::Sender<Frame>,
}

impl RouterSender {
    pub fn send(&self, frame: Frame) -> Result<(), io::Error> {
        self.sender
            .send(frame)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }
}

/// Handle to a running router worker thread.
pub struct RouterHandle {
    shutdown: mio_channel::Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl RouterHandle {
    /// Ask the worker to stop and wait for it to drain its current frame.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for RouterHandle {
    fn drop(&mut self) {
        if self.join.is_some() {
            let _ = self.shutdown.send(());
        }
    }
}

/// Spawns the router worker thread and returns `(RouterSender, RouterHandle)`.
/// `handler` is called once per inbound frame, in delivery order, on the
/// worker thread only.
pub fn spawn<H>(mut handler: H) -> io::Result<(RouterSender, RouterHandle)>
where
    H: FrameHandler,
{
    let (frame_tx, frame_rx) = mio_channel::channel::<Frame>();
    let (shutdown_tx, shutdown_rx) = mio_channel::channel::<()>();

    let poll = Poll::new()?;
    poll.register(&frame_rx, FRAME_TOKEN, Ready::readable(), PollOpt::edge())?;
    poll.register(&shutdown_rx, SHUTDOWN_TOKEN, Ready::readable(), PollOpt::edge())?;

    let join = thread::Builder::new()
        .name("kpimon-router".to_owned())
        .spawn(move || run(poll, frame_rx, shutdown_rx, &mut handler))
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    Ok((
        RouterSender { sender: frame_tx },
        RouterHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        },
    ))
}

fn run<H: FrameHandler>(
    poll: Poll,
    frame_rx: mio_channel::Receiver<Frame>,
    shutdown_rx: mio_channel::Receiver<()>,
    handler: &mut H,
) {
    let mut events = Events::with_capacity(64);
    debug!("router worker started");
    'outer: loop {
        if let Err(e) = poll.poll(&mut events, None) {
            error!("router poll failed: {e}");
            break;
        }
        for event in &events {
            match event.token() {
                FRAME_TOKEN => loop {
                    match frame_rx.try_recv() {
                        Ok(frame) => {
                            trace!("dispatching frame mtype={}", frame.mtype);
                            handler.handle(frame);
                        }
                        Err(std::sync::mpsc::TryRecvError::Empty) => break,
                        Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                            warn!("frame channel disconnected; router stopping");
                            break 'outer;
                        }
                    }
                },
                SHUTDOWN_TOKEN => {
                    debug!("router received shutdown signal");
                    break 'outer;
                }
                _ => {}
            }
        }
    }
    debug!("router worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Meid;
    use std::sync::mpsc;

    #[test]
    fn dispatches_frames_in_order_and_shuts_down_cleanly() {
        let (result_tx, result_rx) = mpsc::channel::<i32>();
        let (sender, handle) = spawn(move |frame: Frame| {
            result_tx.send(frame.mtype).unwrap();
        })
        .unwrap();

        sender
            .send(Frame {
                mtype: 12050,
                sub_id: 1,
                meid: Meid::for_ran("ran1"),
                payload: vec![],
            })
            .unwrap();
        sender
            .send(Frame {
                mtype: 12011,
                sub_id: 1,
                meid: Meid::for_ran("ran1"),
                payload: vec![],
            })
            .unwrap();

        assert_eq!(result_rx.recv().unwrap(), 12050);
        assert_eq!(result_rx.recv().unwrap(), 12011);

        handle.shutdown();
    }
}
