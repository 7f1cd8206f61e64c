use serde_json::{Value, json};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use vision_dashboard::activation::WidgetActivation;
use vision_dashboard::clock::ManualClock;
use vision_dashboard::dnd::{DragPayload, place_dropped_node};
use vision_dashboard::document::{GraphDocument, Position};
use vision_dashboard::feeds::{FeedBoard, FeedStatus};
use vision_dashboard::graph::PipelineGraph;
use vision_dashboard::node_types::NodeType;
use vision_dashboard::persistence::{
    ApiRequest, ApiResponse, ApiWorker, MemoryWidgetApi, WidgetApi, document_for_save,
};
use vision_dashboard::realtime::{ConnectionState, RealtimeClient, ReconnectPolicy, ScriptedTransport};
use vision_dashboard::refresh::RefreshScheduler;
use vision_dashboard::{GraphError, PersistenceError};

fn ids(list: &[&'static vision_dashboard::modules::WidgetDescriptor]) -> Vec<&'static str> {
    list.iter().map(|w| w.id).collect()
}

/// Two-node pipeline with the fixed ids used across these scenarios.
fn camera_to_detector() -> PipelineGraph {
    let doc: GraphDocument = serde_json::from_value(json!({
        "name": "gate",
        "createdAt": "2026-01-01T00:00:00Z",
        "nodes": [
            { "id": "camera-1", "type": "cameraInput", "position": { "x": 0, "y": 0 },
              "data": { "label": "Gate Camera" } },
            { "id": "detect-1", "type": "objectDetection", "position": { "x": 250, "y": 0 },
              "data": { "label": "Detector" } }
        ],
        "edges": []
    }))
    .unwrap();
    let mut graph = PipelineGraph::new();
    graph.load(&doc).unwrap();
    graph
}

#[test]
fn activating_a_widget_moves_it_between_sets() {
    let mut activation = WidgetActivation::new();
    activation.select_module("residential").unwrap();
    assert_eq!(ids(activation.active()), vec!["camera-main"]);
    assert_eq!(ids(activation.available()), vec!["occupancy", "package", "suspicious"]);

    activation.activate("occupancy").unwrap();
    assert_eq!(ids(activation.active()), vec!["camera-main", "occupancy"]);
    assert_eq!(ids(activation.available()), vec!["package", "suspicious"]);
}

#[test]
fn connected_graph_serializes_nodes_and_edge() {
    let mut graph = camera_to_detector();
    graph.connect("camera-1", "out", "detect-1", "in").unwrap();

    let doc = graph.serialize("gate");
    assert_eq!(doc.nodes.len(), 2);
    assert_eq!(doc.edges.len(), 1);
    assert_eq!(doc.edges[0].source, "camera-1");
    assert_eq!(doc.edges[0].target, "detect-1");
}

#[test]
fn removing_a_node_drops_its_edges() {
    let mut graph = camera_to_detector();
    graph.connect("camera-1", "out", "detect-1", "in").unwrap();

    graph.remove_node("camera-1").unwrap();
    assert_eq!(graph.nodes().len(), 1);
    assert_eq!(graph.nodes()[0].id, "detect-1");
    assert!(graph.edges().is_empty());
}

#[test]
fn connecting_a_missing_node_leaves_graph_unchanged() {
    let mut graph = camera_to_detector();
    let before = graph.serialize("gate");

    let err = graph.connect("missing-id", "out", "detect-1", "in").unwrap_err();
    assert!(matches!(err, GraphError::NotFound(ref id) if id == "missing-id"));
    assert_eq!(graph.serialize_at("gate", before.created_at), before);
}

#[test]
fn subscriber_receives_occupancy_payload_once() {
    let transport = ScriptedTransport::new();
    let mut client = RealtimeClient::new(
        "ws://dashboard.test/ws",
        transport.clone(),
        ManualClock::new(),
        ReconnectPolicy::default(),
    );
    let received: Rc<RefCell<Vec<Value>>> = Rc::default();
    let sink = Rc::clone(&received);
    let _sub = client.subscribe("occupancy_update", move |payload| {
        sink.borrow_mut().push(payload.clone())
    });

    client.connect();
    client.tick();
    transport.push_message(r#"{"type":"occupancy_update","payload":{"current_occupancy":5}}"#);
    client.tick();

    assert_eq!(*received.borrow(), vec![json!({ "current_occupancy": 5 })]);
}

#[test]
fn dropped_node_round_trips_through_backend() {
    let mut graph = PipelineGraph::new();
    let camera = place_dropped_node(
        &mut graph,
        Some(&DragPayload::for_type(NodeType::CameraInput)),
        Position::new(40.0, 60.0),
    )
    .unwrap();
    let detector = place_dropped_node(
        &mut graph,
        Some(&DragPayload::for_type(NodeType::ObjectDetection)),
        Position::new(300.0, 60.0),
    )
    .unwrap();
    assert!(place_dropped_node(&mut graph, None, Position::default()).is_none());
    graph.connect(&camera, "out", &detector, "in").unwrap();
    graph
        .set_node_field(&detector, "confidence", &json!(0.8))
        .unwrap();

    let api = Arc::new(MemoryWidgetApi::new());
    let mut worker = ApiWorker::new(api.clone());
    assert!(matches!(
        document_for_save(&graph, "   "),
        Err(PersistenceError::EmptyName)
    ));
    let doc = document_for_save(&graph, " lobby ").unwrap();
    worker.submit(ApiRequest::Save(doc));
    let saved = worker.wait(Duration::from_secs(5)).unwrap();
    assert!(matches!(saved.outcome, Ok(ApiResponse::Saved(ref name)) if name == "lobby"));

    let listed = api.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "lobby");

    let mut restored = PipelineGraph::new();
    restored.load(&api.load("lobby").unwrap()).unwrap();
    assert_eq!(restored.nodes().len(), 2);
    assert_eq!(restored.edges().len(), 1);
    let confidence = restored.node(&detector).unwrap().config.get("confidence");
    assert_eq!(confidence.map(|v| v.to_json()), Some(json!(0.8)));
}

#[test]
fn polled_widget_goes_stale_while_offline_and_recovers() {
    let clock = ManualClock::new();
    let transport = ScriptedTransport::new();
    let mut client = RealtimeClient::new(
        "ws://dashboard.test/ws",
        transport.clone(),
        clock.clone(),
        ReconnectPolicy::default(),
    );
    let mut refresh = RefreshScheduler::new(clock.clone());
    let mut feeds = FeedBoard::new();
    let inbox: Rc<RefCell<Vec<(u64, Value)>>> = Rc::default();

    let generation = feeds.open("occupancy");
    let sink = Rc::clone(&inbox);
    let _sub = client.subscribe("occupancy_update", move |payload| {
        sink.borrow_mut().push((generation, payload.clone()))
    });
    refresh.schedule("occupancy", Duration::from_secs(30));

    client.connect();
    client.tick();
    transport.push_message(r#"{"type":"occupancy_update","payload":{"current_occupancy":3}}"#);
    client.tick();
    for (generation, payload) in inbox.borrow_mut().drain(..) {
        assert!(feeds.accept("occupancy", generation, payload));
    }
    assert_eq!(feeds.feed("occupancy").unwrap().status, FeedStatus::Live);

    transport.drop_connection();
    client.tick();
    assert!(matches!(client.state(), ConnectionState::WaitingRetry { attempt: 1, .. }));
    feeds.mark_all_stale("connection lost");
    assert!(matches!(
        feeds.feed("occupancy").unwrap().status,
        FeedStatus::Stale(_)
    ));
    assert_eq!(
        feeds.feed("occupancy").unwrap().payload,
        Some(json!({ "current_occupancy": 3 }))
    );

    clock.advance(Duration::from_secs(30));
    assert_eq!(refresh.due(), vec!["occupancy".to_string()]);
    client.tick();
    client.tick();
    assert!(client.is_connected());
    client.send("get_occupancy_data", json!({}));
    assert_eq!(transport.sent().len(), 1);

    transport.push_message(r#"{"type":"occupancy_update","payload":{"current_occupancy":4}}"#);
    client.tick();
    for (generation, payload) in inbox.borrow_mut().drain(..) {
        assert!(feeds.accept("occupancy", generation, payload));
    }
    let feed = feeds.feed("occupancy").unwrap();
    assert_eq!(feed.status, FeedStatus::Live);
    assert_eq!(feed.payload, Some(json!({ "current_occupancy": 4 })));
}
