//! High-level control client for the engine.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use antescofo_types::{Event, EventKind, HandlerId, Value};
use log::{debug, info};

use crate::config::{self, Config};
use crate::error::LinkError;
use crate::link::{OscLink, OSC_PREFIX};

// Transport-level commands understood by the engine.
const CMD_LOAD: &str = "load";
const CMD_START: &str = "start";
const CMD_STOP: &str = "stop";
const CMD_PAUSE: &str = "pause";
const CMD_RESUME: &str = "resume";
const CMD_TEMPO: &str = "tempo";
const CMD_NEXTEVENT: &str = "nextevent";
const CMD_PREVEVENT: &str = "prevevent";
const CMD_ASCOGRAPHCOMM: &str = "ascographcomm";
const CMD_INCOMINGOSC: &str = "incomingosc";
// Engine wire token, misspelled upstream.
const CMD_INCOMING_OSC_PORT: &str = "IncmingOscPort";
const CMD_ASCOGRAPHCONF: &str = "ascographconf";

/// Client for one engine instance: transport control, configuration
/// commands, outbound application messages, and event subscriptions.
///
/// ```rust,ignore
/// let config = Config::load();
/// let mut client = AntescofoClient::connect(&config)?;
/// client.load_score("demo.asco.txt")?;
/// client.on(Some(EventKind::Tempo), |event| {
///     println!("tempo: {}", event.data);
/// });
/// client.start()?;
/// client.wait(10.0);
/// client.stop()?;
/// ```
pub struct AntescofoClient {
    link: OscLink,
    score_dir: PathBuf,
}

impl AntescofoClient {
    /// Connect using an explicit configuration. When a receive port is
    /// configured the receive loop starts and the engine is asked to
    /// send its messages back to this side.
    pub fn connect(config: &Config) -> Result<Self, LinkError> {
        let link = OscLink::open(config.host(), config.send_port(), config.receive_port())?;
        let client = Self {
            link,
            score_dir: config.score_dir(),
        };
        if client.link.is_receiving() {
            client.enable_osc_communication(true)?;
        }
        info!(
            "connected to engine at {}:{}",
            config.host(),
            config.send_port()
        );
        Ok(client)
    }

    /// Connect to an explicit host/port pair, bypassing configuration.
    pub fn connect_to(
        host: &str,
        send_port: u16,
        receive_port: Option<u16>,
    ) -> Result<Self, LinkError> {
        let link = OscLink::open(host, send_port, receive_port)?;
        Ok(Self {
            link,
            score_dir: PathBuf::from("."),
        })
    }

    fn command(&self, command: &str, mut args: Vec<Value>) -> Result<(), LinkError> {
        let mut message = Vec::with_capacity(args.len() + 1);
        message.push(Value::Str(command.to_string()));
        message.append(&mut args);
        self.link.send_raw(&message)
    }

    // Transport control.

    /// Load a score file. Relative paths are resolved against the
    /// current directory, then the configured score directory.
    pub fn load_score(&self, path: impl AsRef<Path>) -> Result<(), LinkError> {
        let path = config::resolve_score_path(&self.score_dir, path.as_ref());
        info!("loading score {}", path.display());
        self.command(
            CMD_LOAD,
            vec![Value::Str(path.to_string_lossy().into_owned())],
        )
    }

    pub fn start(&self) -> Result<(), LinkError> {
        info!("starting playback");
        self.command(CMD_START, vec![])
    }

    pub fn stop(&self) -> Result<(), LinkError> {
        info!("stopping playback");
        self.command(CMD_STOP, vec![])
    }

    pub fn pause(&self) -> Result<(), LinkError> {
        info!("pausing playback");
        self.command(CMD_PAUSE, vec![])
    }

    pub fn resume(&self) -> Result<(), LinkError> {
        info!("resuming playback");
        self.command(CMD_RESUME, vec![])
    }

    pub fn next_event(&self) -> Result<(), LinkError> {
        debug!("skipping to next event");
        self.command(CMD_NEXTEVENT, vec![])
    }

    pub fn prev_event(&self) -> Result<(), LinkError> {
        debug!("going to previous event");
        self.command(CMD_PREVEVENT, vec![])
    }

    /// Set the tempo in beats per minute.
    pub fn set_tempo(&self, bpm: f64) -> Result<(), LinkError> {
        info!("setting tempo to {}", bpm);
        self.command(CMD_TEMPO, vec![Value::Float(bpm)])
    }

    // Peer configuration.

    /// Enable or disable engine-to-client messaging.
    pub fn enable_osc_communication(&self, enable: bool) -> Result<(), LinkError> {
        self.command(CMD_ASCOGRAPHCOMM, vec![Value::Int(enable as i64)])
    }

    /// Enable or disable the engine's inbound OSC handling.
    pub fn enable_incoming_osc(&self, enable: bool) -> Result<(), LinkError> {
        self.command(CMD_INCOMINGOSC, vec![Value::Int(enable as i64)])
    }

    pub fn set_incoming_osc_port(&self, port: u16) -> Result<(), LinkError> {
        self.command(CMD_INCOMING_OSC_PORT, vec![Value::Int(port as i64)])
    }

    pub fn configure_ascograph(&self, host: &str, port: u16) -> Result<(), LinkError> {
        self.command(
            CMD_ASCOGRAPHCONF,
            vec![Value::Str(host.to_string()), Value::Int(port as i64)],
        )
    }

    // Application messages.

    /// Send an application OSC message. The engine namespace prefix is
    /// prepended when the caller omits it.
    pub fn send_osc(&self, address: &str, args: &[Value]) -> Result<(), LinkError> {
        let address = qualify_address(address);
        self.link.send(&address, args)
    }

    // Event subscriptions.

    /// Subscribe a handler to `kind`, or to every event when `None`.
    pub fn on<F>(&self, kind: Option<EventKind>, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.link.dispatcher().subscribe(kind, handler)
    }

    /// Remove a subscription made with [`AntescofoClient::on`].
    pub fn off(&self, kind: Option<EventKind>, id: HandlerId) {
        self.link.dispatcher().unsubscribe(kind, id)
    }

    /// Block the calling thread. Keeps scripts alive while the engine
    /// plays; no interaction with the dispatcher.
    pub fn wait(&self, seconds: f64) {
        thread::sleep(Duration::from_secs_f64(seconds));
    }

    pub fn link(&self) -> &OscLink {
        &self.link
    }

    /// Stop receiving and drop all subscriptions. Also runs on drop.
    pub fn close(&mut self) {
        self.link.close();
    }
}

fn qualify_address(address: &str) -> String {
    if address.starts_with(OSC_PREFIX) {
        address.to_string()
    } else {
        format!("{}{}", OSC_PREFIX, address.trim_start_matches('/'))
    }
}
