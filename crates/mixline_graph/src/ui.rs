// SPDX-License-Identifier: MIT OR Apache-2.0
//! Patch canvas rendering and pointer handling with egui.
//!
//! Each frame runs in three phases:
//! - pointer input becomes [`InputEvent`]s dispatched to the patch
//! - port anchors are synced for the current pan/zoom
//! - everything is drawn from a read-only [`PatchView`]

use crate::anchors::CanvasLayout;
use crate::backend::ProcessingBackend;
use crate::input::InputEvent;
use crate::node::{Node, NodeKind, ParamKind, ParamValue};
use crate::patch::Patch;
use crate::port::Port;
use crate::settings::CanvasSettings;
use crate::view::{PatchView, Segment};
use egui::{Color32, Pos2, Rect, Stroke, Vec2};

const NODE_ROUNDING: f32 = 6.0;
const NODE_SHADOW_OFFSET: f32 = 3.0;
const PORT_PADDING: f32 = 12.0;

const BEZIER_CURVATURE: f32 = 50.0;
const CONNECTION_THICKNESS: f32 = 2.0;
const CONNECTION_COLOR: Color32 = Color32::from_rgb(0, 255, 0);
const DRAG_COLOR: Color32 = Color32::from_rgb(255, 170, 0);

/// Canvas interaction mode
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum InteractionMode {
    /// Idle
    #[default]
    Normal,
    /// Panning the view
    Panning,
    /// Moving a node
    DraggingNode,
    /// Dragging out a connection
    CreatingConnection,
}

/// Canvas UI state: view transform and interaction mode
pub struct PatchEditorState {
    /// Pan offset (canvas space)
    pub pan: Vec2,
    /// Zoom level
    pub zoom: f32,
    /// Show grid
    pub show_grid: bool,
    /// Geometry and zoom limits
    pub canvas: CanvasSettings,
    /// Current interaction mode
    pub mode: InteractionMode,
    last_mouse_pos: Pos2,
    context_menu_pos: Pos2,
}

impl PatchEditorState {
    /// Create a canvas with the given geometry
    pub fn new(canvas: CanvasSettings) -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            show_grid: true,
            canvas,
            mode: InteractionMode::Normal,
            last_mouse_pos: Pos2::ZERO,
            context_menu_pos: Pos2::ZERO,
        }
    }

    /// Layout for the current view, centred on `rect`
    pub fn layout(&self, rect: Rect) -> CanvasLayout {
        CanvasLayout::new(&self.canvas).with_view(
            [self.pan.x, self.pan.y],
            self.zoom,
            [rect.center().x, rect.center().y],
        )
    }

    /// Render the canvas and apply this frame's input to `patch`
    pub fn ui<B: ProcessingBackend>(&mut self, ui: &mut egui::Ui, patch: &mut Patch<B>) {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        let events = self.collect_events(ui, &response, rect, patch.view());
        for event in events {
            patch.handle_event(event);
        }
        if response.clicked() {
            let mouse = self.layout(rect).to_canvas([self.last_mouse_pos.x, self.last_mouse_pos.y]);
            if patch.nodes().node_at(mouse).is_none() {
                patch.clear_selection();
            }
        }

        let layout = self.sync_anchors(rect, patch);
        self.draw(&painter, rect, &layout, patch.view());
        self.draw_status_bar(ui, rect, patch.view());
    }

    /// Place every node's port anchors for the current view.
    ///
    /// Off-screen nodes are placed too, so no anchor outlives the frame it
    /// was computed for.
    pub fn sync_anchors<B: ProcessingBackend>(&self, rect: Rect, patch: &mut Patch<B>) -> CanvasLayout {
        let layout = self.layout(rect);
        patch.sync_port_anchors(&layout);
        layout
    }

    fn collect_events(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        rect: Rect,
        view: PatchView<'_>,
    ) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let mouse_pos = ui.input(|i| i.pointer.hover_pos().unwrap_or(self.last_mouse_pos));
        let delta = mouse_pos - self.last_mouse_pos;
        self.last_mouse_pos = mouse_pos;
        let hit_radius = self.canvas.hit_radius * self.zoom.max(1.0);

        // Zoom toward the pointer
        let scroll_delta = ui.input(|i| i.raw_scroll_delta.y);
        if scroll_delta != 0.0 && rect.contains(mouse_pos) {
            let old_zoom = self.zoom;
            self.zoom = self.canvas.clamp_zoom(self.zoom * (1.0 + scroll_delta * 0.001));
            if self.zoom != old_zoom {
                // Keep the canvas point under the pointer fixed
                let from_center = mouse_pos - rect.center();
                self.pan += from_center * (1.0 / self.zoom - 1.0 / old_zoom);
            }
        }

        let layout = self.layout(rect);
        match self.mode {
            InteractionMode::Normal => {
                if response.dragged_by(egui::PointerButton::Middle) {
                    self.mode = InteractionMode::Panning;
                }

                if response.clicked() {
                    let canvas_pos = layout.to_canvas([mouse_pos.x, mouse_pos.y]);
                    if let Some(node) = view.nodes().rev().find(|n| n.contains(canvas_pos)) {
                        events.push(InputEvent::SelectNode { node: node.id });
                    }
                }

                if response.drag_started_by(egui::PointerButton::Primary) {
                    let origin = ui.input(|i| i.pointer.press_origin()).unwrap_or(mouse_pos);
                    let canvas_pos = layout.to_canvas([origin.x, origin.y]);

                    if let Some(port) = view.port_at([origin.x, origin.y], hit_radius) {
                        events.push(InputEvent::PortPressed {
                            node: port.node,
                            port: port.port,
                            is_output: port.is_output,
                        });
                        events.push(InputEvent::PointerMoved { x: mouse_pos.x, y: mouse_pos.y });
                        self.mode = InteractionMode::CreatingConnection;
                    } else if let Some(node) = view.nodes().rev().find(|n| n.contains(canvas_pos)) {
                        events.push(InputEvent::NodeDragStart {
                            node: node.id,
                            x: canvas_pos[0],
                            y: canvas_pos[1],
                        });
                        self.mode = InteractionMode::DraggingNode;
                    }
                }
            }

            InteractionMode::Panning => {
                if response.dragged() {
                    self.pan += delta / self.zoom;
                }
                if response.drag_stopped() {
                    self.mode = InteractionMode::Normal;
                }
            }

            InteractionMode::DraggingNode => {
                if response.dragged() {
                    let canvas_pos = layout.to_canvas([mouse_pos.x, mouse_pos.y]);
                    events.push(InputEvent::NodeDragMove { x: canvas_pos[0], y: canvas_pos[1] });
                }
                if response.drag_stopped() {
                    events.push(InputEvent::NodeDragEnd);
                    self.mode = InteractionMode::Normal;
                }
            }

            InteractionMode::CreatingConnection => {
                events.push(InputEvent::PointerMoved { x: mouse_pos.x, y: mouse_pos.y });
                if response.drag_stopped() {
                    events.push(InputEvent::PointerReleased {
                        on_port: view.port_at([mouse_pos.x, mouse_pos.y], hit_radius),
                    });
                    self.mode = InteractionMode::Normal;
                }
            }
        }

        if response.secondary_clicked() {
            self.context_menu_pos = mouse_pos;
        }
        let menu_pos = layout.to_canvas([self.context_menu_pos.x, self.context_menu_pos.y]);
        response.context_menu(|ui| {
            for kind in NodeKind::ALL {
                if ui.button(format!("Add {kind}")).clicked() {
                    events.push(InputEvent::AddNode { kind, x: menu_pos[0], y: menu_pos[1] });
                    ui.close_menu();
                }
            }
        });

        if ui.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            events.push(InputEvent::DeleteSelection);
        }

        events
    }

    fn screen_rect(&self, layout: &CanvasLayout, node: &Node) -> Rect {
        let [x, y] = layout.to_screen(node.position);
        Rect::from_min_size(
            Pos2::new(x, y),
            Vec2::new(node.size[0], node.size[1]) * self.zoom,
        )
    }

    fn draw(&self, painter: &egui::Painter, rect: Rect, layout: &CanvasLayout, view: PatchView<'_>) {
        if self.show_grid {
            self.draw_grid(painter, rect);
        }

        for (_, segment) in view.connection_segments() {
            self.draw_bezier_connection(painter, segment, CONNECTION_COLOR);
        }
        if let Some(segment) = view.drag_segment() {
            self.draw_bezier_connection(painter, segment, DRAG_COLOR);
        }

        for node in view.nodes() {
            let screen_rect = self.screen_rect(layout, node);
            if screen_rect.intersects(rect) {
                self.draw_node(painter, node, screen_rect, view.selected() == Some(node.id));
            }
        }
    }

    fn draw_grid(&self, painter: &egui::Painter, rect: Rect) {
        let spacing = self.canvas.grid_spacing * self.zoom;
        if spacing < 2.0 {
            return;
        }
        let dot_color = Color32::from_rgba_unmultiplied(0, 255, 0, 60);

        let offset_x = (self.pan.x * self.zoom + rect.width() / 2.0).rem_euclid(spacing);
        let offset_y = (self.pan.y * self.zoom + rect.height() / 2.0).rem_euclid(spacing);

        let mut x = rect.left() + offset_x;
        while x < rect.right() {
            let mut y = rect.top() + offset_y;
            while y < rect.bottom() {
                painter.circle_filled(Pos2::new(x, y), 0.75, dot_color);
                y += spacing;
            }
            x += spacing;
        }
    }

    fn draw_bezier_connection(&self, painter: &egui::Painter, segment: Segment, color: Color32) {
        let from = Pos2::new(segment.from[0], segment.from[1]);
        let to = Pos2::new(segment.to[0], segment.to[1]);
        let distance = (to.x - from.x).abs();
        let curvature = (BEZIER_CURVATURE * self.zoom).max(distance * 0.5);

        let ctrl1 = Pos2::new(from.x + curvature, from.y);
        let ctrl2 = Pos2::new(to.x - curvature, to.y);

        let points = bezier_points(from, ctrl1, ctrl2, to, 32);
        for pair in points.windows(2) {
            painter.line_segment(
                [pair[0], pair[1]],
                Stroke::new(CONNECTION_THICKNESS * self.zoom, color),
            );
        }
    }

    fn draw_node(&self, painter: &egui::Painter, node: &Node, screen_rect: Rect, is_selected: bool) {
        let rounding = NODE_ROUNDING * self.zoom;

        let shadow_rect = self.shadow_rect(screen_rect);
        painter.rect_filled(shadow_rect, rounding, Color32::from_rgba_unmultiplied(0, 0, 0, 60));

        let bg_color = if is_selected {
            Color32::from_rgb(30, 60, 30)
        } else {
            Color32::from_rgb(20, 20, 20)
        };
        painter.rect_filled(screen_rect, rounding, bg_color);

        let header_rect = Rect::from_min_size(
            screen_rect.min,
            Vec2::new(screen_rect.width(), self.canvas.header_height * self.zoom),
        );
        painter.rect_filled(
            header_rect,
            egui::Rounding {
                nw: rounding,
                ne: rounding,
                sw: 0.0,
                se: 0.0,
            },
            Color32::from_rgb(0, 90, 0),
        );
        painter.text(
            header_rect.center(),
            egui::Align2::CENTER_CENTER,
            node.title(),
            egui::FontId::monospace(12.0 * self.zoom),
            Color32::WHITE,
        );

        let outline = if is_selected {
            Stroke::new(2.0, Color32::from_rgb(0, 255, 0))
        } else {
            Stroke::new(1.0, Color32::from_rgb(0, 120, 0))
        };
        painter.rect_stroke(screen_rect, rounding, outline);

        for port in &node.inputs {
            self.draw_port(painter, port, egui::Align2::LEFT_CENTER, PORT_PADDING);
        }
        for port in &node.outputs {
            self.draw_port(painter, port, egui::Align2::RIGHT_CENTER, -PORT_PADDING);
        }

        let readout: Vec<String> = node.data.iter().map(|(key, value)| format_param(key, value)).collect();
        if !readout.is_empty() {
            painter.text(
                Pos2::new(screen_rect.center().x, screen_rect.bottom() - 14.0 * self.zoom),
                egui::Align2::CENTER_CENTER,
                readout.join("  "),
                egui::FontId::monospace(10.0 * self.zoom),
                Color32::from_gray(180),
            );
        }
    }

    fn shadow_rect(&self, screen_rect: Rect) -> Rect {
        screen_rect.translate(Vec2::splat(NODE_SHADOW_OFFSET * self.zoom))
    }

    fn draw_port(&self, painter: &egui::Painter, port: &Port, align: egui::Align2, label_offset: f32) {
        let pos = Pos2::new(port.anchor[0], port.anchor[1]);
        let radius = self.canvas.port_radius * self.zoom;
        let hovered = pos.distance(self.last_mouse_pos) <= self.canvas.hit_radius * self.zoom.max(1.0);

        let color = if port.is_output() {
            Color32::from_rgb(0, 255, 0)
        } else {
            Color32::from_rgb(0, 180, 255)
        };
        painter.circle_filled(pos, if hovered { radius * 1.3 } else { radius }, color);
        painter.circle_stroke(pos, radius, Stroke::new(1.0, Color32::from_gray(30)));

        painter.text(
            Pos2::new(pos.x + label_offset * self.zoom, pos.y),
            align,
            &port.label,
            egui::FontId::monospace(10.0 * self.zoom),
            Color32::from_gray(200),
        );
    }

    fn draw_status_bar(&self, ui: &egui::Ui, rect: Rect, view: PatchView<'_>) {
        ui.painter().text(
            Pos2::new(rect.left() + 5.0, rect.bottom() - 11.0),
            egui::Align2::LEFT_CENTER,
            format!(
                "Nodes: {} | Connections: {} | Zoom: {:.0}%",
                view.node_count(),
                view.connection_count(),
                self.zoom * 100.0,
            ),
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );
    }
}

impl Default for PatchEditorState {
    fn default() -> Self {
        Self::new(CanvasSettings::default())
    }
}

/// Parameter controls for the selected node.
///
/// Edits are sent through [`Patch::handle_event`] like canvas input.
pub fn parameter_panel<B: ProcessingBackend>(ui: &mut egui::Ui, patch: &mut Patch<B>) {
    let Some(node) = patch.view().selected().and_then(|id| patch.node(id)) else {
        ui.label("No node selected");
        return;
    };
    ui.heading(node.title());

    let node_id = node.id;
    let mut changes = Vec::new();
    for spec in node.kind.schema().params {
        let Some(current) = node.param(spec.key) else {
            continue;
        };
        match spec.kind {
            ParamKind::Float { min, max, .. } => {
                let mut value = current.as_f32().unwrap_or(min);
                if ui.add(egui::Slider::new(&mut value, min..=max).text(spec.key)).changed() {
                    changes.push((spec.key, ParamValue::Float(value)));
                }
            }
            ParamKind::Choice { options, .. } => {
                let mut selected = current.as_str().unwrap_or_default().to_string();
                egui::ComboBox::from_label(spec.key)
                    .selected_text(selected.clone())
                    .show_ui(ui, |ui| {
                        for option in options {
                            ui.selectable_value(&mut selected, option.to_string(), *option);
                        }
                    });
                if current.as_str() != Some(selected.as_str()) {
                    changes.push((spec.key, ParamValue::Text(selected)));
                }
            }
        }
    }

    for (key, value) in changes {
        patch.handle_event(InputEvent::SetParameter {
            node: node_id,
            key: key.to_string(),
            value,
        });
    }
}

fn format_param(key: &str, value: &ParamValue) -> String {
    match (key, value) {
        ("freq", ParamValue::Float(hz)) => format!("{hz:.0}Hz"),
        ("gain", ParamValue::Float(gain)) => format!("{:.0}%", gain * 100.0),
        _ => value.to_string(),
    }
}

/// Generate points along a cubic bezier curve
fn bezier_points(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, segments: usize) -> Vec<Pos2> {
    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let t = i as f32 / segments as f32;
        let mt = 1.0 - t;

        let x = mt * mt * mt * p0.x + 3.0 * mt * mt * t * p1.x + 3.0 * mt * t * t * p2.x + t * t * t * p3.x;
        let y = mt * mt * mt * p0.y + 3.0 * mt * mt * t * p1.y + 3.0 * mt * t * t * p2.y + t * t * t * p3.y;

        points.push(Pos2::new(x, y));
    }
    points
}
