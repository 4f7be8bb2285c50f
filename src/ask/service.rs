//! Ask service - runs submissions off the UI thread

use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, Sender};
use log::{debug, error};

use super::client::AskTransport;
use super::{AskOutcome, AskRequest, NETWORK_ERROR_MESSAGE, interpret};

/// Identifies one submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AskTicket(pub u64);

/// A finished submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AskCompletion {
    pub ticket: AskTicket,
    pub outcome: AskOutcome,
}

/// Issues ask requests on worker threads.
///
/// There is no cancellation: every submission runs to completion and its
/// result is delivered in arrival order, so the last one to finish wins.
pub struct AskService {
    transport: Arc<dyn AskTransport>,
    completion_tx: Sender<AskCompletion>,
    completion_rx: Receiver<AskCompletion>,
    next_ticket: u64,
    in_flight: usize,
}

impl AskService {
    #[must_use]
    pub fn new(transport: Arc<dyn AskTransport>) -> Self {
        let (completion_tx, completion_rx) = flume::unbounded();
        Self {
            transport,
            completion_tx,
            completion_rx,
            next_ticket: 1,
            in_flight: 0,
        }
    }

    /// Start one request
    pub fn submit(&mut self, request: AskRequest) -> AskTicket {
        let ticket = AskTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight += 1;

        let transport = Arc::clone(&self.transport);
        let completion_tx = self.completion_tx.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("ask-{}", ticket.0))
            .spawn(move || {
                let outcome = interpret(transport.send(&request));
                let _ = completion_tx.send(AskCompletion { ticket, outcome });
            });

        if let Err(e) = spawned {
            error!("Failed to spawn ask worker: {e}");
            let _ = self.completion_tx.send(AskCompletion {
                ticket,
                outcome: AskOutcome::Failed(NETWORK_ERROR_MESSAGE.to_string()),
            });
        } else {
            debug!("Ask request {} submitted", ticket.0);
        }

        ticket
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Next finished submission, if any
    pub fn poll(&mut self) -> Option<AskCompletion> {
        let completion = self.completion_rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(completion)
    }

    /// Block up to `timeout` for the next finished submission
    pub fn wait(&mut self, timeout: Duration) -> Option<AskCompletion> {
        if self.in_flight == 0 {
            return self.poll();
        }
        let completion = self.completion_rx.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(completion)
    }
}
