//! UDP loopback tests for the link, the receive loop, and the client.

use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use antescofo_osc::client::AntescofoClient;
use antescofo_osc::link::OscLink;
use antescofo_types::{Event, EventKind, Value};
use rosc::{OscMessage, OscPacket, OscType};

/// Shared recorder for events observed by a handler.
type Recorder = Arc<Mutex<Vec<Event>>>;

fn recorder() -> Recorder {
    Arc::new(Mutex::new(Vec::new()))
}

fn record_into(events: &Recorder) -> impl Fn(&Event) + Send + Sync + 'static {
    let events = Arc::clone(events);
    move |event: &Event| {
        events.lock().unwrap().push(event.clone());
    }
}

/// Open a link that receives on an ephemeral loopback port. The send
/// side points at a throwaway port; these tests never send through it.
fn receiving_link() -> OscLink {
    OscLink::open("127.0.0.1", 5678, Some(0)).unwrap()
}

fn send_raw_osc(link: &OscLink, addr: &str, args: Vec<OscType>) {
    let target = link.receive_addr().expect("link is receiving");
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let packet = OscPacket::Message(OscMessage {
        addr: addr.to_string(),
        args,
    });
    let buf = rosc::encoder::encode(&packet).unwrap();
    socket.send_to(&buf, target).unwrap();
}

fn wait_for_events(events: &Recorder, count: usize, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if events.lock().unwrap().len() >= count {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    events.lock().unwrap().len() >= count
}

#[test]
fn test_tempo_message_reaches_kind_subscriber() {
    let link = receiving_link();
    let events = recorder();
    link.dispatcher()
        .subscribe(Some(EventKind::Tempo), record_into(&events));

    send_raw_osc(&link, "/antescofo/tempo", vec![OscType::Float(120.0)]);
    assert!(wait_for_events(&events, 1, Duration::from_secs(2)));

    let events = events.lock().unwrap();
    assert_eq!(events[0].kind, EventKind::Tempo);
    assert_eq!(events[0].data, Value::Float(120.0));
    assert_eq!(events[0].raw_address.as_deref(), Some("/antescofo/tempo"));
}

#[test]
fn test_wildcard_subscriber_sees_every_kind() {
    let link = receiving_link();
    let events = recorder();
    link.dispatcher().subscribe(None, record_into(&events));

    send_raw_osc(&link, "/antescofo/tempo", vec![OscType::Float(90.0)]);
    send_raw_osc(&link, "/antescofo/stop", vec![]);
    assert!(wait_for_events(&events, 2, Duration::from_secs(2)));

    let kinds: Vec<EventKind> = events.lock().unwrap().iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::Tempo));
    assert!(kinds.contains(&EventKind::Stop));
}

#[test]
fn test_action_trace_end_to_end() {
    let link = receiving_link();
    let events = recorder();
    link.dispatcher()
        .subscribe(Some(EventKind::ActionTrace), record_into(&events));

    send_raw_osc(
        &link,
        "/antescofo/action_trace",
        vec![
            OscType::String("note_on".into()),
            OscType::String("message".into()),
            OscType::String("top_group".into()),
            OscType::Float(1.5),
            OscType::Float(0.25),
            OscType::String("hello".into()),
        ],
    );
    assert!(wait_for_events(&events, 1, Duration::from_secs(2)));

    let events = events.lock().unwrap();
    let trace = events[0].trace.as_ref().expect("trace populated");
    assert_eq!(trace.action_name, "note_on");
    assert_eq!(trace.trace_type, "message");
    assert!((trace.now - 1.5).abs() < 1e-6);
    assert!((trace.rnow - 0.25).abs() < 1e-6);
    assert_eq!(trace.message, "hello");
}

#[test]
fn test_short_action_trace_degrades_to_generic() {
    let link = receiving_link();
    let events = recorder();
    link.dispatcher()
        .subscribe(Some(EventKind::ActionTrace), record_into(&events));

    send_raw_osc(
        &link,
        "/antescofo/action_trace",
        vec![
            OscType::String("note_on".into()),
            OscType::String("message".into()),
            OscType::String("top_group".into()),
            OscType::Float(1.5),
            OscType::Float(0.25),
        ],
    );
    assert!(wait_for_events(&events, 1, Duration::from_secs(2)));

    let events = events.lock().unwrap();
    assert!(events[0].trace.is_none());
    match &events[0].data {
        Value::Tab(tab) => assert_eq!(tab.len(), 5),
        other => panic!("expected tab payload, got {:?}", other),
    }
}

#[test]
fn test_unrelated_address_dispatches_unknown() {
    let link = receiving_link();
    let events = recorder();
    link.dispatcher().subscribe(None, record_into(&events));

    send_raw_osc(&link, "/other/thing", vec![OscType::Int(7)]);
    assert!(wait_for_events(&events, 1, Duration::from_secs(2)));

    let events = events.lock().unwrap();
    assert_eq!(events[0].kind, EventKind::Unknown);
    assert_eq!(events[0].data, Value::Int(7));
    assert_eq!(events[0].raw_address.as_deref(), Some("/other/thing"));
}

#[test]
fn test_unrecognized_engine_message_dispatches_unknown() {
    let link = receiving_link();
    let events = recorder();
    link.dispatcher().subscribe(None, record_into(&events));

    send_raw_osc(&link, "/antescofo/mystery", vec![OscType::Int(1)]);
    assert!(wait_for_events(&events, 1, Duration::from_secs(2)));
    assert_eq!(events.lock().unwrap()[0].kind, EventKind::Unknown);
}

#[test]
fn test_panicking_handler_does_not_stall_the_loop() {
    let link = receiving_link();
    let events = recorder();
    link.dispatcher()
        .subscribe(Some(EventKind::Tempo), |_e: &Event| {
            panic!("boom");
        });
    link.dispatcher()
        .subscribe(Some(EventKind::Tempo), record_into(&events));

    send_raw_osc(&link, "/antescofo/tempo", vec![OscType::Float(100.0)]);
    assert!(wait_for_events(&events, 1, Duration::from_secs(2)));

    // The loop survived the panic and still delivers.
    send_raw_osc(&link, "/antescofo/tempo", vec![OscType::Float(110.0)]);
    assert!(wait_for_events(&events, 2, Duration::from_secs(2)));
}

#[test]
fn test_bad_trace_time_drops_only_that_message() {
    let link = receiving_link();
    let events = recorder();
    link.dispatcher().subscribe(None, record_into(&events));

    send_raw_osc(
        &link,
        "/antescofo/action_trace",
        vec![
            OscType::String("a".into()),
            OscType::String("message".into()),
            OscType::String("top".into()),
            OscType::String("not-a-time".into()),
            OscType::Float(0.0),
            OscType::String("m".into()),
        ],
    );
    send_raw_osc(&link, "/antescofo/tempo", vec![OscType::Float(80.0)]);
    assert!(wait_for_events(&events, 1, Duration::from_secs(2)));

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Tempo);
}

#[test]
fn test_flattened_map_argument_decodes_as_map() {
    let link = receiving_link();
    let events = recorder();
    link.dispatcher().subscribe(None, record_into(&events));

    send_raw_osc(
        &link,
        "/antescofo/pitch",
        vec![OscType::Array(rosc::OscArray {
            content: vec![
                OscType::String("a".into()),
                OscType::Int(1),
                OscType::String("b".into()),
                OscType::Int(2),
            ],
        })],
    );
    assert!(wait_for_events(&events, 1, Duration::from_secs(2)));

    let events = events.lock().unwrap();
    match &events[0].data {
        Value::Map(map) => {
            assert_eq!(map.get("a"), Some(&Value::Int(1)));
            assert_eq!(map.get("b"), Some(&Value::Int(2)));
        }
        other => panic!("expected map payload, got {:?}", other),
    }
}

#[test]
fn test_close_is_clean_and_idempotent() {
    let mut link = receiving_link();
    let events = recorder();
    link.dispatcher().subscribe(None, record_into(&events));

    link.close();
    link.close();
    assert!(!link.is_receiving());
    assert!(link.receive_addr().is_none());
}

#[test]
fn test_link_send_reaches_peer_link() {
    let receiver = receiving_link();
    let events = recorder();
    receiver.dispatcher().subscribe(None, record_into(&events));

    let recv_port = receiver.receive_addr().unwrap().port();
    let sender = OscLink::connect("127.0.0.1", recv_port).unwrap();
    sender
        .send("/antescofo/tempo", &[Value::Float(132.0)])
        .unwrap();

    assert!(wait_for_events(&events, 1, Duration::from_secs(2)));
    let events = events.lock().unwrap();
    assert_eq!(events[0].kind, EventKind::Tempo);
    assert_eq!(events[0].data, Value::Float(132.0));
}

/// Decode one packet from a plain socket standing in for the engine.
fn recv_message(socket: &UdpSocket) -> OscMessage {
    let mut buf = [0u8; 4096];
    let n = socket.recv(&mut buf).unwrap();
    match rosc::decoder::decode_udp(&buf[..n]).unwrap().1 {
        OscPacket::Message(msg) => msg,
        other => panic!("expected message, got {:?}", other),
    }
}

#[test]
fn test_client_commands_use_the_raw_form() {
    let engine = UdpSocket::bind("127.0.0.1:0").unwrap();
    engine
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let port = engine.local_addr().unwrap().port();

    let client = AntescofoClient::connect_to("127.0.0.1", port, None).unwrap();
    client.start().unwrap();

    let msg = recv_message(&engine);
    assert_eq!(msg.addr, "/");
    assert_eq!(msg.args, vec![OscType::String("start".into())]);

    client.set_tempo(120.0).unwrap();
    let msg = recv_message(&engine);
    assert_eq!(msg.addr, "/");
    assert_eq!(
        msg.args,
        vec![OscType::String("tempo".into()), OscType::Float(120.0)]
    );
}

#[test]
fn test_client_send_osc_prefixes_address() {
    let engine = UdpSocket::bind("127.0.0.1:0").unwrap();
    engine
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let port = engine.local_addr().unwrap().port();

    let client = AntescofoClient::connect_to("127.0.0.1", port, None).unwrap();
    client.send_osc("mark", &[Value::Int(1)]).unwrap();

    let msg = recv_message(&engine);
    assert_eq!(msg.addr, "/antescofo/mark");
    assert_eq!(msg.args, vec![OscType::Int(1)]);
}
