//! UDP OSC transport: outbound sends plus the background receive loop
//! that decodes inbound messages and feeds the dispatcher.
//!
//! One dedicated thread reads the receive socket and dispatches
//! synchronously; every handler runs on that thread, so handlers must
//! not block for long. Sends run on the caller's thread, fire-and-forget.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use antescofo_types::{Event, EventDispatcher, EventKind, Value};
use log::{debug, info, warn};
use rosc::{OscMessage, OscPacket};

use crate::codec;
use crate::error::LinkError;

/// Address namespace for messages exchanged with the engine.
pub const OSC_PREFIX: &str = "/antescofo/";

/// Receive poll interval; bounds how long `close` can block.
const RECV_TIMEOUT: Duration = Duration::from_millis(50);

const RECV_BUF_SIZE: usize = 4096;

/// A datagram link to the engine: a send socket aimed at a fixed
/// destination and, optionally, a bound receive socket drained by a
/// background thread.
pub struct OscLink {
    socket: UdpSocket,
    dest: String,
    dispatcher: Arc<EventDispatcher>,
    running: Arc<AtomicBool>,
    recv_addr: Option<SocketAddr>,
    recv_thread: Option<JoinHandle<()>>,
}

impl OscLink {
    /// Open a send-only link to the engine.
    pub fn connect(host: &str, send_port: u16) -> Result<Self, LinkError> {
        Self::open(host, send_port, None)
    }

    /// Open a link that also receives engine messages on `receive_port`.
    /// Port 0 picks an ephemeral port; see [`OscLink::receive_addr`].
    pub fn open(
        host: &str,
        send_port: u16,
        receive_port: Option<u16>,
    ) -> Result<Self, LinkError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| LinkError::connect(host, send_port, e))?;
        let dest = format!("{}:{}", host, send_port);
        let dispatcher = Arc::new(EventDispatcher::new());
        let running = Arc::new(AtomicBool::new(true));

        let (recv_addr, recv_thread) = match receive_port {
            Some(port) => {
                let recv_socket = UdpSocket::bind(("127.0.0.1", port))
                    .map_err(|e| LinkError::connect("127.0.0.1", port, e))?;
                recv_socket.set_read_timeout(Some(RECV_TIMEOUT))?;
                let local = recv_socket.local_addr()?;
                let thread_dispatcher = Arc::clone(&dispatcher);
                let thread_running = Arc::clone(&running);
                let handle = thread::Builder::new()
                    .name("osc-recv".into())
                    .spawn(move || {
                        receive_loop(recv_socket, thread_dispatcher, thread_running)
                    })?;
                info!("receiving engine messages on {}", local);
                (Some(local), Some(handle))
            }
            None => (None, None),
        };

        info!("OSC link open: sending to {}", dest);
        Ok(Self {
            socket,
            dest,
            dispatcher,
            running,
            recv_addr,
            recv_thread,
        })
    }

    /// Send one OSC message to the engine. Best-effort: no retry, no
    /// acknowledgment.
    pub fn send(&self, addr: &str, args: &[Value]) -> Result<(), LinkError> {
        let packet = OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args: codec::encode_args(args),
        });
        let buf = rosc::encoder::encode(&packet)?;
        self.socket.send_to(&buf, &self.dest)?;
        debug!("sent {} ({} args)", addr, args.len());
        Ok(())
    }

    /// Send a transport-level command: all arguments as a flat list on
    /// the reserved no-address form.
    pub fn send_raw(&self, args: &[Value]) -> Result<(), LinkError> {
        self.send("/", args)
    }

    /// The subscription surface for events decoded by this link.
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Local address of the receive socket, when receiving is enabled.
    pub fn receive_addr(&self) -> Option<SocketAddr> {
        self.recv_addr
    }

    pub fn is_receiving(&self) -> bool {
        self.recv_thread.is_some()
    }

    /// Stop the receive loop and drop every subscription. Blocks until
    /// the loop's current iteration (including any in-flight dispatch)
    /// finishes. Idempotent.
    pub fn close(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.recv_thread.take() {
            if handle.join().is_err() {
                warn!("OSC receive thread terminated with a panic");
            }
            info!("stopped OSC receive loop");
        }
        self.recv_addr = None;
        self.dispatcher.clear();
    }
}

impl Drop for OscLink {
    fn drop(&mut self) {
        self.close();
    }
}

fn receive_loop(socket: UdpSocket, dispatcher: Arc<EventDispatcher>, running: Arc<AtomicBool>) {
    let mut buf = [0u8; RECV_BUF_SIZE];
    while running.load(Ordering::Relaxed) {
        match socket.recv(&mut buf) {
            Ok(n) => match rosc::decoder::decode_udp(&buf[..n]) {
                Ok((_, packet)) => handle_packet(packet, &dispatcher),
                Err(e) => warn!("dropping undecodable datagram ({} bytes): {}", n, e),
            },
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(e) => {
                warn!("OSC receive loop terminating: {}", e);
                break;
            }
        }
    }
}

fn handle_packet(packet: OscPacket, dispatcher: &EventDispatcher) {
    match packet {
        OscPacket::Message(msg) => handle_message(msg, dispatcher),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                handle_packet(inner, dispatcher);
            }
        }
    }
}

/// Decode and dispatch one message. Failures are contained here: a bad
/// message is logged and dropped, the loop keeps running.
fn handle_message(msg: OscMessage, dispatcher: &EventDispatcher) {
    let addr = msg.addr;
    let args = match codec::decode_args(msg.args) {
        Ok(args) => args,
        Err(e) => {
            warn!("dropping message {}: {}", addr, e);
            return;
        }
    };

    let kind = match addr.strip_prefix(OSC_PREFIX) {
        Some(message_type) => EventKind::from_message(message_type),
        None => EventKind::Unknown,
    };
    debug!("received {} -> {} ({} args)", addr, kind, args.len());

    match Event::from_args(kind, args, Some(addr.clone())) {
        Ok(event) => dispatcher.dispatch(&event),
        Err(e) => warn!("dropping message {}: {}", addr, e),
    }
}
