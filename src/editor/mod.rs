//! # Pipeline Canvas
//!
//! The widget builder's node canvas: draws the [`PipelineGraph`], accepts
//! palette drops, and turns pointer gestures into graph operations.
//!
//! ## Submodules
//! - [`coordinate_transform`]: canvas <-> screen conversion
//! - [`connection_renderer`]: bezier edges and edge hit-testing
//! - [`style`]: colors and node layout constants
//! - [`properties`]: edit buffers for the node properties panel
//!
//! ## Gestures
//! - drop a palette entry: add a node at the drop point
//! - drag a node: move it
//! - drag (or click) from a port to a port: connect
//! - right click a node or an edge: delete it
//! - middle drag / Alt+drag: pan, scroll: zoom

pub mod connection_renderer;
pub mod coordinate_transform;
pub mod properties;
pub mod style;

pub use properties::PropertyEdits;
pub use style::EditorStyle;

use crate::dnd::{DragPayload, drop_position, place_dropped_node};
use crate::document::Position;
use crate::error::GraphError;
use crate::graph::{Node, NodeId, PipelineGraph};
use coordinate_transform::{MAX_ZOOM, MIN_ZOOM, to_screen, zoom_about};
use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, StrokeKind, Vec2};
use style::{HEADER_HEIGHT, PORT_HIT_RADIUS, PORT_RADIUS};

/// A port picked as the start of a new edge.
#[derive(Clone, Debug, PartialEq)]
struct PortRef {
    node_id: NodeId,
    port: String,
    is_input: bool,
}

enum Action {
    Move(NodeId, Position),
    FinishMove,
    Connect(PortRef, PortRef),
    RemoveNode(NodeId),
    RemoveEdge(String),
}

/// What happened on the canvas this frame.
#[derive(Debug, Default)]
pub struct EditorOutput {
    /// The graph changed in a way worth an undo snapshot.
    pub changed: bool,
    pub placed: Option<NodeId>,
    /// A rejected gesture, e.g. connecting a node to itself.
    pub error: Option<GraphError>,
}

pub struct PipelineEditor {
    pub pan: Vec2,
    pub zoom: f32,
    pub style: EditorStyle,
    pub selected: Option<NodeId>,
    connection_start: Option<PortRef>,
    hovered_port: Option<PortRef>,
    moving: bool,
}

impl Default for PipelineEditor {
    fn default() -> Self {
        Self {
            pan: Vec2::new(40.0, 40.0),
            zoom: 1.0,
            style: EditorStyle::default(),
            selected: None,
            connection_start: None,
            hovered_port: None,
            moving: false,
        }
    }
}

impl PipelineEditor {
    pub fn reset_view(&mut self) {
        self.pan = Vec2::new(40.0, 40.0);
        self.zoom = 1.0;
    }

    /// Forget selection and pending gestures, e.g. after the graph was
    /// replaced wholesale.
    pub fn reset_interaction(&mut self, graph: &PipelineGraph) {
        if let Some(id) = &self.selected {
            if graph.node(id).is_none() {
                self.selected = None;
            }
        }
        self.connection_start = None;
        self.hovered_port = None;
        self.moving = false;
    }

    pub fn show(&mut self, ui: &mut egui::Ui, graph: &mut PipelineGraph) -> EditorOutput {
        let mut output = EditorOutput::default();
        let canvas = ui.max_rect();
        let origin = canvas.min;
        let canvas_response = ui.interact(canvas, ui.id().with("canvas_bg"), Sense::click_and_drag());

        self.handle_view_input(ui, canvas);

        let painter = ui.painter_at(canvas);
        painter.rect_filled(canvas, 0.0, Color32::from_gray(28));
        if self.style.show_grid {
            self.draw_grid(&painter, canvas);
        }

        let mut actions = Vec::new();
        let (primary_released, escape) =
            ui.input(|i| (i.pointer.primary_released(), i.key_pressed(egui::Key::Escape)));
        let pointer = ui.ctx().pointer_latest_pos();

        // Edges first so nodes paint over them.
        let secondary_clicked = ui.input(|i| i.pointer.secondary_clicked());
        for edge in graph.edges() {
            let (Some(source), Some(target)) = (graph.node(&edge.source), graph.node(&edge.target)) else {
                continue;
            };
            let p1 = self.port_screen_pos(source, &edge.source_port, false, origin);
            let p2 = self.port_screen_pos(target, &edge.target_port, true, origin);
            let (c1, c2) = if self.style.use_gradient_connections {
                (self.style.node_color(source.node_type()), self.style.node_color(target.node_type()))
            } else {
                (Color32::WHITE, Color32::WHITE)
            };
            connection_renderer::draw_bezier(&painter, p1, p2, c1, c2, 2.0 * self.zoom.max(0.5));

            if secondary_clicked {
                if let Some(pos) = pointer {
                    if connection_renderer::hit_test_bezier(pos, p1, p2, 8.0) {
                        actions.push(Action::RemoveEdge(edge.id.clone()));
                    }
                }
            }
        }

        // Edge being drawn
        if let (Some(start), Some(pos)) = (&self.connection_start, pointer) {
            if let Some(node) = graph.node(&start.node_id) {
                let anchor = self.port_screen_pos(node, &start.port, start.is_input, origin);
                let (from, to) = if start.is_input { (pos, anchor) } else { (anchor, pos) };
                connection_renderer::draw_bezier(&painter, from, to, Color32::WHITE, Color32::WHITE, 2.0);
            }
        }

        self.hovered_port = None;
        for node in graph.nodes() {
            self.draw_node(ui, &painter, node, origin, primary_released, &mut actions);
        }

        if primary_released && self.connection_start.is_some() && self.hovered_port.is_none() {
            // Released over empty canvas: keep the start only if it was a click.
            if !canvas_response.clicked() {
                self.connection_start = None;
            }
        }
        if escape || (secondary_clicked && self.connection_start.is_some()) {
            self.connection_start = None;
        }
        if canvas_response.clicked() && self.hovered_port.is_none() {
            self.selected = None;
            self.connection_start = None;
        }

        if let Some(placed) = self.accept_drop(ui, canvas, graph) {
            self.selected = Some(placed.clone());
            output.placed = Some(placed);
            output.changed = true;
        }

        self.apply(graph, actions, &mut output);
        output
    }

    fn handle_view_input(&mut self, ui: &egui::Ui, canvas: Rect) {
        let hovered = ui.rect_contains_pointer(canvas);
        ui.input(|i| {
            if !hovered {
                return;
            }
            if i.pointer.middle_down() || (i.modifiers.alt && i.pointer.primary_down()) {
                self.pan += i.pointer.delta();
            }
            let scroll = i.raw_scroll_delta.y;
            let pinch = i.zoom_delta();
            let factor = if pinch != 1.0 { pinch } else { 1.0 + scroll * 0.001 };
            if factor != 1.0 {
                if let Some(pos) = i.pointer.hover_pos() {
                    let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
                    self.pan = zoom_about(pos - canvas.min, self.pan, self.zoom, new_zoom);
                    self.zoom = new_zoom;
                }
            }
        });
    }

    fn draw_grid(&self, painter: &egui::Painter, canvas: Rect) {
        let spacing = 40.0 * self.zoom;
        if spacing < 8.0 {
            return;
        }
        let stroke = Stroke::new(1.0, Color32::from_gray(38));
        let start = canvas.min + Vec2::new(self.pan.x.rem_euclid(spacing), self.pan.y.rem_euclid(spacing));
        let mut x = start.x;
        while x < canvas.max.x {
            painter.line_segment([Pos2::new(x, canvas.min.y), Pos2::new(x, canvas.max.y)], stroke);
            x += spacing;
        }
        let mut y = start.y;
        while y < canvas.max.y {
            painter.line_segment([Pos2::new(canvas.min.x, y), Pos2::new(canvas.max.x, y)], stroke);
            y += spacing;
        }
    }

    fn node_rect(&self, node: &Node, origin: Pos2) -> Rect {
        let top_left = to_screen(node.position, self.pan, self.zoom, origin);
        let rows = node.config.fields().len();
        Rect::from_min_size(top_left, self.style.node_size(rows) * self.zoom)
    }

    fn port_screen_pos(&self, node: &Node, port: &str, is_input: bool, origin: Pos2) -> Pos2 {
        let rect = self.node_rect(node, origin);
        let ports = if is_input {
            node.descriptor().inputs
        } else {
            node.descriptor().outputs
        };
        let index = ports.iter().position(|p| *p == port).unwrap_or(0);
        let y = rect.min.y + (HEADER_HEIGHT + 14.0 + index as f32 * 18.0) * self.zoom;
        let x = if is_input { rect.min.x } else { rect.max.x };
        Pos2::new(x, y)
    }

    fn draw_node(
        &mut self,
        ui: &egui::Ui,
        painter: &egui::Painter,
        node: &Node,
        origin: Pos2,
        primary_released: bool,
        actions: &mut Vec<Action>,
    ) {
        let rect = self.node_rect(node, origin);
        let descriptor = node.descriptor();
        let header_color = self.style.node_color(node.node_type());
        let font = self.style.font_size * self.zoom;

        // Ports are interacted with before the body so they win the hit-test.
        let mut port_pressed = false;
        let ports = descriptor
            .inputs
            .iter()
            .map(|p| (*p, true))
            .chain(descriptor.outputs.iter().map(|p| (*p, false)));
        for (port, is_input) in ports {
            let pos = self.port_screen_pos(node, port, is_input, origin);
            let hit = Rect::from_center_size(pos, Vec2::splat(2.0 * PORT_HIT_RADIUS * self.zoom.max(0.75)));
            let response = ui.interact(
                hit,
                ui.id().with(&node.id).with(port).with(is_input),
                Sense::click_and_drag(),
            );
            let here = PortRef {
                node_id: node.id.clone(),
                port: port.to_string(),
                is_input,
            };

            if response.hovered() || response.contains_pointer() {
                self.hovered_port = Some(here.clone());
            }
            if response.drag_started() || response.clicked() || (response.contains_pointer() && primary_released) {
                port_pressed = true;
                match self.connection_start.take() {
                    Some(start) if start != here => actions.push(Action::Connect(start, here)),
                    Some(_) => {}
                    None if response.drag_started() || response.clicked() => {
                        self.connection_start = Some(here)
                    }
                    None => {}
                }
            }

            let highlighted = self.hovered_port.as_ref().is_some_and(|h| {
                h.node_id == node.id && h.port == port && h.is_input == is_input
            });
            painter.circle_filled(pos, PORT_RADIUS * self.zoom, header_color);
            if highlighted {
                painter.circle_stroke(pos, (PORT_RADIUS + 3.0) * self.zoom, Stroke::new(2.0, Color32::WHITE));
            }
        }

        let body = ui.interact(
            rect.shrink2(Vec2::new(PORT_HIT_RADIUS * self.zoom, 0.0)),
            ui.id().with(&node.id).with("node_body"),
            Sense::click_and_drag(),
        );
        if body.clicked() || body.drag_started() {
            self.selected = Some(node.id.clone());
        }
        if body.dragged() && !port_pressed && self.connection_start.is_none() {
            let delta = body.drag_delta() / self.zoom;
            if delta != Vec2::ZERO {
                self.moving = true;
                let to = Position::new(node.position.x + delta.x, node.position.y + delta.y);
                actions.push(Action::Move(node.id.clone(), to));
            }
        }
        if body.drag_stopped() && self.moving {
            self.moving = false;
            actions.push(Action::FinishMove);
        }
        if body.secondary_clicked() {
            actions.push(Action::RemoveNode(node.id.clone()));
        }

        painter.rect_filled(rect, 5.0, Color32::from_gray(60));
        let header = Rect::from_min_max(rect.min, Pos2::new(rect.max.x, rect.min.y + HEADER_HEIGHT * self.zoom));
        painter.rect_filled(header, 5.0, header_color);
        painter.text(
            header.left_center() + Vec2::new(8.0 * self.zoom, 0.0),
            Align2::LEFT_CENTER,
            format!("{} {}", descriptor.icon, node.label),
            FontId::proportional(font),
            Color32::WHITE,
        );

        let mut y = header.max.y + 28.0 * self.zoom;
        for (name, value) in node.config.fields() {
            let text = match value.to_json() {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            painter.text(
                Pos2::new(rect.min.x + 12.0 * self.zoom, y),
                Align2::LEFT_CENTER,
                format!("{}: {}", name, text),
                FontId::proportional(font * 0.8),
                Color32::from_gray(200),
            );
            y += 16.0 * self.zoom;
        }

        let border = if self.selected.as_deref() == Some(node.id.as_str()) {
            Stroke::new(2.0, Color32::YELLOW)
        } else {
            Stroke::new(1.0, Color32::BLACK)
        };
        painter.rect_stroke(rect, 5.0, border, StrokeKind::Middle);
    }

    /// Place a node for a palette payload released over the canvas.
    fn accept_drop(&self, ui: &egui::Ui, canvas: Rect, graph: &mut PipelineGraph) -> Option<NodeId> {
        let ctx = ui.ctx();
        if !ui.input(|i| i.pointer.any_released()) || !egui::DragAndDrop::has_any_payload(ctx) {
            return None;
        }
        let pointer = ctx.pointer_interact_pos().filter(|p| canvas.contains(*p))?;
        let payload = egui::DragAndDrop::take_payload::<DragPayload>(ctx);
        let position = drop_position(pointer, canvas.min, self.pan, self.zoom);
        place_dropped_node(graph, payload.as_deref(), position)
    }

    fn apply(&mut self, graph: &mut PipelineGraph, actions: Vec<Action>, output: &mut EditorOutput) {
        for action in actions {
            let result = match action {
                Action::Move(id, to) => graph.move_node(&id, to),
                Action::FinishMove => {
                    output.changed = true;
                    Ok(())
                }
                Action::Connect(a, b) => {
                    let (from, to) = if a.is_input { (b, a) } else { (a, b) };
                    if from.is_input || !to.is_input {
                        Err(GraphError::UnknownPort {
                            node_id: to.node_id.clone(),
                            port: to.port.clone(),
                        })
                    } else {
                        graph
                            .connect(&from.node_id, &from.port, &to.node_id, &to.port)
                            .map(|_| output.changed = true)
                    }
                }
                Action::RemoveNode(id) => graph.remove_node(&id).map(|_| {
                    if self.selected.as_deref() == Some(id.as_str()) {
                        self.selected = None;
                    }
                    output.changed = true;
                }),
                Action::RemoveEdge(id) => graph.disconnect(&id).map(|_| output.changed = true),
            };
            if let Err(e) = result {
                log::warn!("[Builder] {}", e);
                output.error = Some(e);
            }
        }
    }
}
