use chrono::Local;
use eframe::egui;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vision_dashboard::clock::SystemClock;
use vision_dashboard::config::{AppSettings, SETTINGS_FILE};
use vision_dashboard::dnd::DragPayload;
use vision_dashboard::editor::{PipelineEditor, PropertyEdits};
use vision_dashboard::error::PersistenceError;
use vision_dashboard::dashboard::DashboardSession;
use vision_dashboard::feeds::FeedStatus;
use vision_dashboard::graph::PipelineGraph;
use vision_dashboard::history::UndoStack;
use vision_dashboard::modules::{ModuleId, WidgetDescriptor, WidgetKind};
use vision_dashboard::node_types::{FieldDescriptor, FieldKind, FieldValue, palette};
use vision_dashboard::persistence::{
    ApiRequest, ApiResponse, ApiWorker, DraftCache, HttpWidgetApi, WidgetSummary, document_for_save,
};
use vision_dashboard::realtime::{ConnectionState, RealtimeClient, WsTransport};

/// Draft slot used for builder autosave.
const AUTOSAVE_DRAFT: &str = "autosave";
const NOTICE_DURATION: Duration = Duration::from_secs(3);

fn main() -> eframe::Result<()> {
    env_logger::init();
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 820.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Vision Dashboard",
        native_options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new()))),
    )
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum View {
    Dashboard,
    Builder,
}

enum Pending {
    Save(String),
    List,
    Load(String),
}

enum WidgetAction {
    Add(&'static str),
    Remove(&'static str),
    Nudge(&'static str, bool),
}

struct DashboardApp {
    settings: AppSettings,
    view: View,
    logs: Vec<String>,
    show_logs: bool,
    show_settings: bool,
    notice: Option<(String, Instant)>,
    error_modal: Option<String>,

    // Dashboard
    dashboard: DashboardSession<SystemClock>,
    realtime: RealtimeClient<WsTransport, SystemClock>,
    was_connected: bool,

    // Widget builder
    graph: PipelineGraph,
    editor: PipelineEditor,
    property_edits: PropertyEdits,
    undo_stack: UndoStack,
    widget_name: String,
    show_save_dialog: bool,
    show_load_window: bool,
    saved_widgets: Vec<WidgetSummary>,
    api: ApiWorker,
    pending: HashMap<u64, Pending>,
    drafts: Option<DraftCache>,
}

impl DashboardApp {
    fn new() -> Self {
        let settings = AppSettings::load_or_default(Path::new(SETTINGS_FILE));
        let realtime = RealtimeClient::new(
            settings.ws_url.clone(),
            WsTransport::new(),
            SystemClock,
            settings.reconnect_policy(),
        );
        let api = ApiWorker::new(Arc::new(HttpWidgetApi::new(&settings.api_base_url)));
        let drafts = settings.draft_dir().map(DraftCache::new);
        let mut editor = PipelineEditor::default();
        editor.style = settings.style.clone();

        let mut app = Self {
            view: View::Dashboard,
            logs: Vec::new(),
            show_logs: false,
            show_settings: false,
            notice: None,
            error_modal: None,
            dashboard: DashboardSession::new(SystemClock, settings.refresh_interval()),
            realtime,
            was_connected: false,
            graph: PipelineGraph::new(),
            editor,
            property_edits: PropertyEdits::new(),
            undo_stack: UndoStack::with_limit(settings.history_max_records),
            widget_name: String::new(),
            show_save_dialog: false,
            show_load_window: false,
            saved_widgets: Vec::new(),
            api,
            pending: HashMap::new(),
            drafts,
            settings,
        };
        app.logs.push("[System] Settings loaded.".to_string());
        app.restore_draft();
        app.undo_stack.reset(&app.graph);
        app.realtime.connect();
        if let Some(module) = app.settings.last_module.clone() {
            app.select_module(&module);
        }
        app
    }

    fn save_settings(&mut self) {
        self.settings.style = self.editor.style.clone();
        if let Err(e) = self.settings.save(Path::new(SETTINGS_FILE)) {
            self.logs.push(format!("[Error] Could not save settings: {:#}", e));
        }
    }

    fn notify(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.logs.push(format!("[System] {}", text));
        self.notice = Some((text, Instant::now()));
    }

    // ----- Dashboard -------------------------------------------------------

    fn select_module(&mut self, module_id: &str) {
        match self.dashboard.select_module(module_id, &mut self.realtime) {
            Ok(module) => {
                self.logs.push(format!("[System] Module '{}' selected", module.title()));
                self.settings.last_module = Some(module.as_str().to_string());
                self.save_settings();
            }
            Err(e) => self.notify(e.to_string()),
        }
    }

    fn apply_widget_action(&mut self, action: WidgetAction) {
        let result = match action {
            WidgetAction::Add(id) => self
                .dashboard
                .activate(id, &mut self.realtime)
                .map(|widget| self.logs.push(format!("[System] Added widget '{}'", widget.title))),
            WidgetAction::Remove(id) => self
                .dashboard
                .deactivate(id)
                .map(|widget| self.logs.push(format!("[System] Removed widget '{}'", widget.title))),
            WidgetAction::Nudge(id, up) => self.dashboard.nudge(id, up),
        };
        if let Err(e) = result {
            self.notify(e.to_string());
        }
    }

    /// Drive the socket, deliver payloads and fire due refreshes.
    fn pump_realtime(&mut self) {
        self.realtime.tick();

        let connected = self.realtime.is_connected();
        if connected != self.was_connected {
            if connected {
                self.logs.push("[Realtime] Connected".to_string());
                self.dashboard.on_connected(&mut self.realtime);
            } else {
                let reason = self.realtime.last_error().unwrap_or("connection lost").to_string();
                self.logs.push(format!("[Realtime] Disconnected: {}", reason));
                self.dashboard.on_disconnected(&reason);
            }
            self.was_connected = connected;
        }
        self.dashboard.pump(&mut self.realtime);
    }

    fn connection_status(&mut self, ui: &mut egui::Ui) {
        let (text, color) = match self.realtime.state() {
            ConnectionState::Connected => ("● Live".to_string(), egui::Color32::from_rgb(80, 200, 120)),
            ConnectionState::Connecting { .. } => ("○ Connecting…".to_string(), egui::Color32::GRAY),
            ConnectionState::WaitingRetry { attempt, .. } => (
                format!("○ Reconnecting ({}/{})", attempt, self.settings.reconnect_attempts),
                egui::Color32::from_rgb(230, 180, 60),
            ),
            ConnectionState::Exhausted => ("● Offline".to_string(), egui::Color32::from_rgb(220, 80, 80)),
            ConnectionState::Disconnected => ("○ Disconnected".to_string(), egui::Color32::GRAY),
        };
        let label = ui.colored_label(color, text);
        if let Some(err) = self.realtime.last_error() {
            label.on_hover_text(err);
        }
        if matches!(
            self.realtime.state(),
            ConnectionState::Exhausted | ConnectionState::Disconnected
        ) && ui.button("Reconnect").clicked()
        {
            self.logs.push("[Realtime] Manual reconnect".to_string());
            self.realtime.connect();
        }
    }

    fn dashboard_view(&mut self, ctx: &egui::Context) {
        let mut action = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(module) = self.dashboard.module() else {
                ui.centered_and_justified(|ui| {
                    ui.heading("Select a module to get started");
                });
                return;
            };
            ui.heading(module.title());

            let available: Vec<&'static WidgetDescriptor> = self.dashboard.available().to_vec();
            if !available.is_empty() {
                ui.horizontal_wrapped(|ui| {
                    ui.label("Add Widgets:");
                    for widget in available {
                        if ui.button(format!("+ {}", widget.title)).clicked() {
                            action = Some(WidgetAction::Add(widget.id));
                        }
                    }
                });
            }
            ui.separator();

            let active: Vec<&'static WidgetDescriptor> = self.dashboard.active().to_vec();
            let count = active.len();
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    for (index, widget) in active.into_iter().enumerate() {
                        ui.allocate_ui(egui::vec2(380.0, 240.0), |ui| {
                            ui.group(|ui| {
                                ui.set_min_size(egui::vec2(360.0, 220.0));
                                ui.horizontal(|ui| {
                                    ui.strong(widget.title);
                                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                        if !widget.permanent && ui.small_button("✕").clicked() {
                                            action = Some(WidgetAction::Remove(widget.id));
                                        }
                                        if index + 1 < count && ui.small_button("▼").clicked() {
                                            action = Some(WidgetAction::Nudge(widget.id, false));
                                        }
                                        if index > 0 && ui.small_button("▲").clicked() {
                                            action = Some(WidgetAction::Nudge(widget.id, true));
                                        }
                                    });
                                });
                                ui.separator();
                                self.widget_body(ui, widget);
                            });
                        });
                    }
                });
            });
        });
        if let Some(action) = action {
            self.apply_widget_action(action);
        }
    }

    fn widget_body(&self, ui: &mut egui::Ui, widget: &WidgetDescriptor) {
        if widget.kind == WidgetKind::Camera {
            ui.label("📷 Live camera stream");
            return;
        }
        if widget.feed.event.is_none() {
            ui.weak("No live data source");
            return;
        }
        let Some(feed) = self.dashboard.feed(widget.id) else {
            return;
        };
        match &feed.status {
            FeedStatus::Waiting => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Waiting for data…");
                });
            }
            FeedStatus::Live => {
                if let Some(at) = feed.updated_at {
                    ui.weak(format!("Updated {}", at.format("%H:%M:%S")));
                }
            }
            FeedStatus::Stale(reason) => {
                ui.colored_label(egui::Color32::from_rgb(230, 180, 60), format!("⚠ Stale: {}", reason));
            }
        }
        if let Some(payload) = &feed.payload {
            egui::ScrollArea::vertical()
                .id_salt(widget.id)
                .max_height(150.0)
                .show(ui, |ui| payload_rows(ui, payload));
        }
    }

    // ----- Widget builder --------------------------------------------------

    fn graph_changed(&mut self) {
        self.undo_stack.push(&self.graph);
        self.store_draft();
    }

    fn store_draft(&mut self) {
        let Some(drafts) = &self.drafts else {
            return;
        };
        let doc = self.graph.serialize(&self.widget_name);
        if let Err(e) = drafts.store(AUTOSAVE_DRAFT, &doc) {
            self.logs.push(format!("[Error] Draft autosave failed: {:#}", e));
        }
    }

    fn restore_draft(&mut self) {
        let Some(drafts) = &self.drafts else {
            return;
        };
        match drafts.restore(AUTOSAVE_DRAFT) {
            Ok(Some(doc)) => match self.graph.load(&doc) {
                Ok(()) => {
                    self.widget_name = doc.name.clone();
                    self.logs.push(format!(
                        "[Builder] Restored unsaved draft ({} nodes)",
                        doc.nodes.len()
                    ));
                }
                Err(e) => self.logs.push(format!("[Error] Draft ignored: {}", e)),
            },
            Ok(None) => {}
            Err(e) => self.logs.push(format!("[Error] Draft unreadable: {:#}", e)),
        }
    }

    fn undo(&mut self) {
        if let Some(graph) = self.undo_stack.undo() {
            self.graph = graph;
            self.editor.reset_interaction(&self.graph);
            self.store_draft();
        }
    }

    fn redo(&mut self) {
        if let Some(graph) = self.undo_stack.redo() {
            self.graph = graph;
            self.editor.reset_interaction(&self.graph);
            self.store_draft();
        }
    }

    fn submit_save(&mut self) {
        match document_for_save(&self.graph, &self.widget_name) {
            Ok(doc) => {
                let name = doc.name.clone();
                let id = self.api.submit(ApiRequest::Save(doc));
                self.pending.insert(id, Pending::Save(name));
            }
            Err(PersistenceError::EmptyName) => self.notify("Please enter a widget name"),
            Err(e) => self.error_modal = Some(format!("Error saving widget: {}", e)),
        }
    }

    fn request_list(&mut self) {
        let id = self.api.submit(ApiRequest::List);
        self.pending.insert(id, Pending::List);
    }

    fn request_load(&mut self, name: &str) {
        let id = self.api.submit(ApiRequest::Load(name.to_string()));
        self.pending.insert(id, Pending::Load(name.to_string()));
    }

    /// Apply finished API requests.
    fn poll_api(&mut self) {
        while let Some(result) = self.api.poll() {
            let Some(pending) = self.pending.remove(&result.id) else {
                continue;
            };
            match (pending, result.outcome) {
                (_, Ok(ApiResponse::Saved(name))) => {
                    self.show_save_dialog = false;
                    self.notify(format!("Widget '{}' saved successfully", name));
                    if let Some(drafts) = &self.drafts {
                        if let Err(e) = drafts.discard(AUTOSAVE_DRAFT) {
                            self.logs.push(format!("[Error] {:#}", e));
                        }
                    }
                }
                (_, Ok(ApiResponse::Listed(list))) => {
                    self.logs.push(format!("[Builder] {} saved widgets", list.len()));
                    self.saved_widgets = list;
                }
                (_, Ok(ApiResponse::Loaded(doc))) => match self.graph.load(&doc) {
                    Ok(()) => {
                        self.widget_name = doc.name.clone();
                        self.undo_stack.reset(&self.graph);
                        self.editor.reset_interaction(&self.graph);
                        self.show_load_window = false;
                        self.store_draft();
                        self.logs.push(format!("[Builder] Loaded '{}'", doc.name));
                    }
                    Err(e) => self.notify(format!("Could not load '{}': {}", doc.name, e)),
                },
                (Pending::Save(name), Err(e)) => {
                    self.logs.push(format!("[Error] Save '{}' failed: {}", name, e));
                    self.error_modal = Some(format!("Error saving widget '{}':\n{}", name, e));
                }
                (Pending::List, Err(e)) => self.notify(format!("Could not list widgets: {}", e)),
                (Pending::Load(name), Err(e)) => self.notify(format!("Could not load '{}': {}", name, e)),
            }
        }
    }

    fn builder_view(&mut self, ctx: &egui::Context) {
        if !ctx.wants_keyboard_input() {
            if ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z)) {
                self.undo();
            }
            if ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y)) {
                self.redo();
            }
        }

        egui::TopBottomPanel::top("builder_toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Widget:");
                ui.add(egui::TextEdit::singleline(&mut self.widget_name).desired_width(160.0));
                if ui.button("💾 Save").clicked() {
                    self.show_save_dialog = true;
                }
                if ui.button("📂 Load").clicked() {
                    self.show_load_window = true;
                    self.request_list();
                }
                if ui.button("Clear").clicked() {
                    self.graph.clear();
                    self.editor.reset_interaction(&self.graph);
                    self.graph_changed();
                    self.logs.push("[Builder] Canvas cleared".to_string());
                }
                ui.separator();
                if ui.add_enabled(self.undo_stack.can_undo(), egui::Button::new("↶ Undo")).clicked() {
                    self.undo();
                }
                if ui.add_enabled(self.undo_stack.can_redo(), egui::Button::new("↷ Redo")).clicked() {
                    self.redo();
                }
                ui.separator();
                if ui.button("Reset View").clicked() {
                    self.editor.reset_view();
                }
                if self.api.is_busy() {
                    ui.spinner();
                }
            });
        });

        egui::SidePanel::left("node_palette").default_width(200.0).show(ctx, |ui| {
            ui.heading("Node Library");
            ui.weak("Drag onto the canvas");
            egui::ScrollArea::vertical().show(ui, |ui| {
                for (category, entries) in palette() {
                    ui.add_space(6.0);
                    let color = self.editor.style.category_color(category);
                    ui.colored_label(color, category.title());
                    for descriptor in entries {
                        let payload = DragPayload::for_type(descriptor.node_type);
                        let id = egui::Id::new(("palette", descriptor.node_type.tag()));
                        ui.dnd_drag_source(id, payload, |ui| {
                            ui.label(format!("{} {}", descriptor.icon, descriptor.label));
                        })
                        .response
                        .on_hover_text(descriptor.description);
                    }
                }
            });
        });

        if self.property_edits.follow(self.editor.selected.as_deref()) {
            self.graph_changed();
        }
        let mut properties_changed = false;
        if let Some(selected) = self.editor.selected.clone() {
            egui::SidePanel::right("node_properties").default_width(260.0).show(ctx, |ui| {
                properties_changed = self.properties_panel(ui, &selected);
            });
        }
        if properties_changed {
            self.graph_changed();
        }

        let output = egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.editor.show(ui, &mut self.graph))
            .inner;
        if let Some(id) = &output.placed {
            self.logs.push(format!("[Builder] Added {}", id));
        }
        if let Some(err) = output.error {
            self.notify(err.to_string());
        }
        if output.changed {
            self.graph_changed();
        }

        self.save_dialog(ctx);
        self.load_window(ctx);
    }

    /// Edits the selected node. Returns true when history should be recorded.
    fn properties_panel(&mut self, ui: &mut egui::Ui, node_id: &str) -> bool {
        let Some(node) = self.graph.node(node_id) else {
            return false;
        };
        let descriptor = node.descriptor();
        let label = node.label.clone();
        let current: HashMap<&'static str, FieldValue> = node.config.fields().into_iter().collect();

        ui.heading(format!("{} {}", descriptor.icon, descriptor.label));
        ui.weak(descriptor.description);
        ui.separator();

        let mut patch = Map::new();
        let mut settled = false;
        ui.horizontal(|ui| {
            ui.label("Label");
            if let Some(text) = text_field(ui, &mut self.property_edits, "label", || label.clone()) {
                if text != label {
                    patch.insert("label".into(), Value::String(text));
                }
            }
        });
        for field in descriptor.fields {
            let edit = field_editor(ui, &mut self.property_edits, field, current.get(field.name));
            if let Some(value) = edit.value {
                patch.insert(field.name.to_string(), value);
            }
            settled |= edit.done;
        }
        ui.separator();
        ui.weak(format!("id: {}", node_id));

        if !patch.is_empty() {
            match self.graph.update_node_config(node_id, &patch) {
                Ok(()) => self.property_edits.applied_live(),
                Err(e) => self.notify(e.to_string()),
            }
        }
        settled && self.property_edits.settle()
    }

    fn save_dialog(&mut self, ctx: &egui::Context) {
        if !self.show_save_dialog {
            return;
        }
        let mut open = true;
        let mut submit = false;
        egui::Window::new("Save Widget")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label("Widget name");
                let response = ui.text_edit_singleline(&mut self.widget_name);
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    submit = true;
                }
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        submit = true;
                    }
                    if ui.button("Cancel").clicked() {
                        self.show_save_dialog = false;
                    }
                });
            });
        if !open {
            self.show_save_dialog = false;
        }
        if submit {
            self.submit_save();
        }
    }

    fn load_window(&mut self, ctx: &egui::Context) {
        if !self.show_load_window {
            return;
        }
        let mut open = true;
        let mut load = None;
        let mut refresh = false;
        egui::Window::new("Load Widget").open(&mut open).show(ctx, |ui| {
            if ui.button("⟳ Refresh").clicked() {
                refresh = true;
            }
            ui.separator();
            if self.saved_widgets.is_empty() {
                ui.weak("No saved widgets");
            }
            egui::ScrollArea::vertical().max_height(300.0).show(ui, |ui| {
                for widget in &self.saved_widgets {
                    ui.horizontal(|ui| {
                        if ui.button(&widget.name).clicked() {
                            load = Some(widget.name.clone());
                        }
                        if let Some(at) = widget.created_at {
                            ui.weak(at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string());
                        }
                    });
                }
            });
        });
        self.show_load_window = open;
        if refresh {
            self.request_list();
        }
        if let Some(name) = load {
            self.request_load(&name);
        }
    }

    // ----- Shared chrome ---------------------------------------------------

    fn top_bar(&mut self, ctx: &egui::Context) {
        let mut selected = None;
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Vision Dashboard");
                ui.separator();
                let current = self.dashboard.module();
                egui::ComboBox::from_id_salt("module_select")
                    .selected_text(current.map_or("Select Module", |m| m.title()))
                    .show_ui(ui, |ui| {
                        for module in ModuleId::ALL {
                            if ui.selectable_label(current == Some(module), module.title()).clicked() {
                                selected = Some(module);
                            }
                        }
                    });
                ui.separator();
                ui.selectable_value(&mut self.view, View::Dashboard, "Dashboard");
                ui.selectable_value(&mut self.view, View::Builder, "Widget Builder");
                ui.separator();
                self.connection_status(ui);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.toggle_value(&mut self.show_logs, "Logs");
                    ui.toggle_value(&mut self.show_settings, "⚙");
                });
            });
        });
        if let Some(module) = selected {
            self.select_module(module.as_str());
        }
    }

    fn logs_window(&mut self, ctx: &egui::Context) {
        if !self.show_logs {
            return;
        }
        let mut open = true;
        egui::Window::new("Activity Log")
            .open(&mut open)
            .resizable(true)
            .default_width(560.0)
            .default_height(220.0)
            .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -10.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("Clear").clicked() {
                        self.logs.clear();
                    }
                    if ui.button("🖥 Desktop").on_hover_text("Export to Desktop").clicked() {
                        self.export_logs();
                    }
                    ui.separator();
                    ui.label(format!("Count: {}", self.logs.len()));
                });
                ui.separator();
                egui::ScrollArea::both()
                    .stick_to_bottom(true)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for line in &self.logs {
                            let color = if line.starts_with("[Error]") {
                                egui::Color32::from_rgb(230, 90, 90)
                            } else {
                                ui.visuals().text_color()
                            };
                            ui.colored_label(color, line);
                        }
                    });
            });
        self.show_logs = open;
    }

    fn export_logs(&mut self) {
        let Some(home) = dirs::home_dir() else {
            self.logs.push("[Error] Could not find home directory".to_string());
            return;
        };
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let filename = home
            .join("Desktop")
            .join(format!("vision_dashboard_log_{}.txt", timestamp));
        match std::fs::write(&filename, self.logs.join("\n")) {
            Ok(_) => self.logs.push(format!("[System] Exported to {:?}", filename)),
            Err(e) => self.logs.push(format!("[Error] Export failed: {}", e)),
        }
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }
        let mut open = true;
        let mut save = false;
        egui::Window::new("⚙ Settings").open(&mut open).show(ctx, |ui| {
            egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
                ui.label("API base URL");
                ui.text_edit_singleline(&mut self.settings.api_base_url);
                ui.end_row();
                ui.label("WebSocket URL");
                ui.text_edit_singleline(&mut self.settings.ws_url);
                ui.end_row();
                ui.label("Refresh interval (s)");
                ui.add(egui::DragValue::new(&mut self.settings.refresh_interval_secs).range(1..=3600));
                ui.end_row();
                ui.label("Gradient edges");
                ui.checkbox(&mut self.editor.style.use_gradient_connections, "");
                ui.end_row();
                ui.label("Canvas grid");
                ui.checkbox(&mut self.editor.style.show_grid, "");
                ui.end_row();
            });
            ui.weak("Connection settings apply on next launch.");
            if ui.button("Save").clicked() {
                save = true;
            }
        });
        self.show_settings = open;
        if save {
            self.dashboard.set_refresh_interval(self.settings.refresh_interval());
            self.save_settings();
            self.logs.push("[System] Settings saved".to_string());
        }
    }

    fn notices(&mut self, ctx: &egui::Context) {
        if self
            .notice
            .as_ref()
            .is_some_and(|(_, shown_at)| shown_at.elapsed() > NOTICE_DURATION)
        {
            self.notice = None;
        }
        if let Some((text, _)) = &self.notice {
            egui::Area::new(egui::Id::new("notice"))
                .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0))
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(text.as_str());
                    });
                });
        }

        if let Some(message) = self.error_modal.clone() {
            let modal = egui::Modal::new(egui::Id::new("error_modal")).show(ctx, |ui| {
                ui.set_width(320.0);
                ui.heading("Error");
                ui.label(message);
                ui.add_space(8.0);
                ui.button("OK").clicked()
            });
            if modal.inner {
                self.error_modal = None;
            }
        }
    }
}

/// Outcome of one frame of a field editor.
#[derive(Default)]
struct FieldEdit {
    /// New JSON value to apply to the node.
    value: Option<Value>,
    /// The edit gesture is over.
    done: bool,
}

impl FieldEdit {
    fn finished(value: Value) -> Self {
        Self {
            value: Some(value),
            done: true,
        }
    }
}

/// Single-line text edit backed by a persistent buffer. Returns the text
/// when the user finishes editing.
fn text_field(
    ui: &mut egui::Ui,
    edits: &mut PropertyEdits,
    field: &'static str,
    initial: impl FnOnce() -> String,
) -> Option<String> {
    let response = ui.text_edit_singleline(edits.buffer(field, initial));
    if response.lost_focus() {
        edits.finish(field)
    } else {
        if !response.has_focus() {
            edits.discard(field);
        }
        None
    }
}

fn field_editor(
    ui: &mut egui::Ui,
    edits: &mut PropertyEdits,
    field: &FieldDescriptor,
    current: Option<&FieldValue>,
) -> FieldEdit {
    let mut edit = FieldEdit::default();
    ui.label(field.label);
    match field.kind {
        FieldKind::Select { options } if options.is_empty() => {
            let seed = match current {
                Some(FieldValue::Choice(s)) | Some(FieldValue::Text(s)) => s.clone(),
                Some(other) => other.to_json().to_string(),
                None => String::new(),
            };
            if let Some(text) = text_field(ui, edits, field.name, || seed) {
                let text = text.trim();
                if !text.is_empty() {
                    // Backend camera ids are numeric
                    let value = text
                        .parse::<u64>()
                        .map(Value::from)
                        .unwrap_or_else(|_| Value::String(text.to_string()));
                    edit = FieldEdit::finished(value);
                }
            }
        }
        FieldKind::Select { options } => {
            let selected = match current {
                Some(FieldValue::Choice(s)) => s.as_str(),
                _ => "(none)",
            };
            egui::ComboBox::from_id_salt(field.name)
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    for option in options {
                        if ui.selectable_label(selected == *option, *option).clicked() {
                            edit = FieldEdit::finished(Value::String(option.to_string()));
                        }
                    }
                });
        }
        FieldKind::MultiSelect { options } => {
            let chosen: Vec<String> = match current {
                Some(FieldValue::Choices(list)) => list.clone(),
                _ => Vec::new(),
            };
            for option in options {
                let mut on = chosen.iter().any(|c| c == option);
                if ui.checkbox(&mut on, *option).changed() {
                    let next: Vec<&str> = options
                        .iter()
                        .copied()
                        .filter(|o| if o == option { on } else { chosen.iter().any(|c| c == o) })
                        .collect();
                    edit = FieldEdit::finished(json!(next));
                }
            }
        }
        FieldKind::Slider { min, max, step } => {
            let mut value = match current {
                Some(FieldValue::Number(n)) => *n,
                _ => min,
            };
            let response = ui.add(egui::Slider::new(&mut value, min..=max).step_by(step));
            if response.changed() {
                edit.value = Some(json!(value));
                edit.done = !response.dragged();
            }
            if response.drag_stopped() {
                edit.done = true;
            }
        }
        FieldKind::Switch => {
            let mut on = matches!(current, Some(FieldValue::Flag(true)));
            if ui.checkbox(&mut on, "").changed() {
                edit = FieldEdit::finished(Value::Bool(on));
            }
        }
        FieldKind::Text => {
            let seed = match current {
                Some(FieldValue::Text(s)) => s.clone(),
                _ => String::new(),
            };
            if let Some(text) = text_field(ui, edits, field.name, || seed) {
                edit = FieldEdit::finished(Value::String(text));
            }
        }
    }
    ui.add_space(4.0);
    edit
}

/// Flat key/value rendering of a widget payload.
fn payload_rows(ui: &mut egui::Ui, payload: &Value) {
    match payload {
        Value::Object(map) => {
            egui::Grid::new(ui.next_auto_id()).num_columns(2).striped(true).show(ui, |ui| {
                for (key, value) in map {
                    ui.label(key);
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    ui.monospace(text);
                    ui.end_row();
                }
            });
        }
        Value::Array(items) => {
            for item in items {
                ui.monospace(item.to_string());
            }
        }
        other => {
            ui.monospace(other.to_string());
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(Duration::from_millis(100));

        self.pump_realtime();
        self.poll_api();

        self.top_bar(ctx);
        match self.view {
            View::Dashboard => self.dashboard_view(ctx),
            View::Builder => self.builder_view(ctx),
        }
        self.logs_window(ctx);
        self.settings_window(ctx);
        self.notices(ctx);
    }
}
