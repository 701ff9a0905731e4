//! The cooperative protocol driver.
//!
//! A plain single-threaded loop that cranks two parties forward, forwarding
//! one message at a time. There is no parallelism and no cancellation; a
//! caller that needs a deadline wraps the whole run in a host-level timeout
//! and drops the parties on expiry.

use crate::error::ProtocolError;
use crate::mpc::party::{Message, Party, Status};

/// Generous upper bound on loop iterations; every protocol in this crate
/// finishes in at most three.
const MAX_ITERATIONS: usize = 16;

/// Pump `first` and `second` to completion.
///
/// `first` must be the protocol's initiator: the user side for DKG, the
/// validator side for refresh and signing. A mis-ordered call fails with
/// `Deadlock` on the non-initiator's first round. The sides may finish
/// asymmetrically; a party that has reported `Finished` is never called
/// again, and the driver keeps pumping the other so it can absorb the final
/// message.
pub fn run(first: &mut dyn Party, second: &mut dyn Party) -> Result<(), ProtocolError> {
    let mut pending: Option<Message> = None;
    let mut first_done = false;
    let mut second_done = false;
    let mut iterations = 0usize;

    while !(first_done && second_done) {
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            return Err(ProtocolError::Deadlock);
        }

        if !first_done {
            let (outgoing, status) = first.next(pending.take())?;
            pending = outgoing;
            first_done = status == Status::Finished;
        }
        if !second_done {
            let (outgoing, status) = second.next(pending.take())?;
            pending = outgoing;
            second_done = status == Status::Finished;
        }
    }

    tracing::debug!(iterations, "protocol run complete");
    Ok(())
}
