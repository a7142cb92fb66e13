use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

use crate::{client::TargetRequest, Error, Result, TargetClient};

enum Message {
    Request(TargetRequest),
    Stop,
}

/// A background thread that owns a [`TargetClient`] and processes requests one at a time, in
/// arrival order.
///
/// A network-bound request blocks the thread until its response has been reconciled, so no new
/// request is picked up while one is in flight. Outcomes are reported through the client's
/// [`EventSink`](crate::EventSink).
pub struct IntakeThread {
    join_handle: std::thread::JoinHandle<()>,
    sender: SyncSender<Message>,
}

impl IntakeThread {
    /// Number of requests that may be queued before [`IntakeThread::submit`] blocks.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Start processing requests for `client` on a new thread.
    pub fn start(client: TargetClient) -> Result<IntakeThread> {
        IntakeThread::start_with_capacity(client, IntakeThread::DEFAULT_CAPACITY)
    }

    /// Same as [`IntakeThread::start`] with a custom queue capacity.
    pub fn start_with_capacity(client: TargetClient, capacity: usize) -> Result<IntakeThread> {
        let (sender, receiver) = sync_channel(capacity);

        let join_handle = std::thread::Builder::new()
            .name("target-intake".to_owned())
            .spawn(move || run(client, receiver))?;

        Ok(IntakeThread {
            join_handle,
            sender,
        })
    }

    /// Queue `request`. Blocks while the queue is full.
    pub fn submit(&self, request: TargetRequest) -> Result<()> {
        self.sender
            .send(Message::Request(request))
            .map_err(|_| Error::IntakeThreadStopped)
    }

    /// Ask the thread to stop once already queued requests have been processed.
    ///
    /// This function does not wait for the thread to actually stop.
    pub fn stop(&self) {
        // Error means that the receiver was dropped (thread exited). Nothing to do then.
        let _ = self.sender.send(Message::Stop);
    }

    /// Process queued requests, stop the thread and block waiting for it to exit.
    ///
    /// If you don't need to wait for the thread to exit, use [`IntakeThread::stop`] instead.
    pub fn shutdown(self) -> Result<()> {
        self.stop();

        // Error means that the thread has panicked and there's nothing useful we can do in that
        // case.
        self.join_handle
            .join()
            .map_err(|_| Error::IntakeThreadPanicked)?;

        Ok(())
    }
}

fn run(mut client: TargetClient, receiver: Receiver<Message>) {
    for message in receiver {
        match message {
            Message::Request(request) => {
                if let Err(err) = client.handle(request) {
                    log::debug!(target: "target_delivery", "request finished with error: {}", err);
                }
            }
            Message::Stop => {
                log::debug!(target: "target_delivery", "intake thread received stop command");
                return;
            }
        }
    }
}
