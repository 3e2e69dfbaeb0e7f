//! PUSH/PULL socket setup over `zmq`: bind/connect/linger policy around the raw socket types.
//!
//! Tests use `inproc://` endpoints (natively supported by `zmq`, no mocking crate needed) to get
//! a deterministic, in-process transport instead of binding real TCP ports.

use std::sync::Arc;

use crate::error::TransportError;

/// A shared `zmq::Context`, one per process, injected into every table a driver creates.
pub fn new_context() -> Result<Arc<zmq::Context>, TransportError> {
    Ok(Arc::new(zmq::Context::new()))
}

/// Binds a PULL socket on `tcp://*:<port>` with the given LINGER (milliseconds).
pub fn bind_pull(
    ctx: &zmq::Context,
    port: u16,
    linger_ms: i32,
) -> Result<zmq::Socket, TransportError> {
    let socket = ctx
        .socket(zmq::PULL)
        .map_err(TransportError::Context)?;
    socket
        .set_linger(linger_ms)
        .map_err(|source| TransportError::SetSockOpt {
            option: "LINGER",
            source,
        })?;
    let endpoint = format!("tcp://*:{port}");
    socket
        .bind(&endpoint)
        .map_err(|source| TransportError::Bind { port, source })?;
    Ok(socket)
}

/// Connects a PUSH socket to `uri` with the given LINGER (milliseconds).
pub fn connect_push(
    ctx: &zmq::Context,
    uri: &str,
    linger_ms: i32,
) -> Result<zmq::Socket, TransportError> {
    let socket = ctx
        .socket(zmq::PUSH)
        .map_err(TransportError::Context)?;
    socket
        .set_linger(linger_ms)
        .map_err(|source| TransportError::SetSockOpt {
            option: "LINGER",
            source,
        })?;
    socket
        .connect(uri)
        .map_err(|source| TransportError::Connect {
            uri: uri.to_string(),
            source,
        })?;
    Ok(socket)
}

/// Receives one frame, honoring `dont_wait`. A timed-out non-blocking receive and a terminated
/// context both surface as `Err` here; callers turn that into an invalid [`crate::row::Row`].
pub fn recv(socket: &zmq::Socket, dont_wait: bool) -> Result<Vec<u8>, TransportError> {
    let flags = if dont_wait { zmq::DONTWAIT } else { 0 };
    socket.recv_bytes(flags).map_err(TransportError::ReceiveFailed)
}

/// Sends one frame. Blocks per ordinary ZMQ semantics unless HWM is hit (`EAGAIN`).
pub fn send(socket: &zmq::Socket, payload: &[u8]) -> Result<(), TransportError> {
    socket
        .send(payload, 0)
        .map_err(TransportError::SendFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inproc_push_pull_round_trip() {
        let ctx = zmq::Context::new();
        let pull = ctx.socket(zmq::PULL).unwrap();
        pull.bind("inproc://transport-test").unwrap();
        let push = ctx.socket(zmq::PUSH).unwrap();
        push.connect("inproc://transport-test").unwrap();

        send(&push, b"1\x1Ehello").unwrap();
        let received = recv(&pull, false).unwrap();
        assert_eq!(received, b"1\x1Ehello");
    }

    #[test]
    fn non_blocking_receive_with_nothing_waiting_errors() {
        let ctx = zmq::Context::new();
        let pull = ctx.socket(zmq::PULL).unwrap();
        pull.bind("inproc://transport-test-empty").unwrap();
        let _push = ctx.socket(zmq::PUSH).unwrap();
        _push.connect("inproc://transport-test-empty").unwrap();

        assert!(recv(&pull, true).is_err());
    }
}
