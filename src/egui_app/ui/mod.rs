//! egui renderer for the application UI.

mod failure_report;
mod overlay_layers;
pub mod style;

use std::sync::Arc;
use std::time::Duration;

use crate::egui_app::controller::EguiController;
use crate::services::ReportServices;
use crate::settings::ReporterSettings;
use eframe::egui::{self, Frame, Margin, RichText};

/// Smallest window size that still fits the modal.
pub const MIN_VIEWPORT_SIZE: [f32; 2] = [720.0, 560.0];
const PENDING_JOB_REPAINT: Duration = Duration::from_millis(100);

/// Renders the egui UI using the shared controller state.
pub struct EguiApp {
    controller: EguiController,
    visuals_set: bool,
}

impl EguiApp {
    pub fn new(settings: ReporterSettings, services: Arc<dyn ReportServices>) -> Self {
        Self {
            controller: EguiController::new(settings, services),
            visuals_set: false,
        }
    }

    /// Drive the report modal's visibility from outside the window.
    pub fn set_report_open(&mut self, open: bool) {
        self.controller.sync_open(open);
    }

    fn apply_visuals(&mut self, ctx: &egui::Context) {
        if self.visuals_set {
            return;
        }
        let mut visuals = egui::Visuals::dark();
        style::apply_visuals(&mut visuals);
        ctx.set_visuals(visuals);
        self.visuals_set = true;
    }

    fn render_status(&mut self, ctx: &egui::Context) {
        let palette = style::palette();
        egui::TopBottomPanel::bottom("status_bar")
            .frame(
                Frame::NONE
                    .fill(palette.bg_primary)
                    .inner_margin(Margin::symmetric(8, 4)),
            )
            .show(ctx, |ui| {
                let status = &self.controller.ui.status;
                ui.horizontal(|ui| {
                    let (rect, _) =
                        ui.allocate_exact_size(egui::vec2(12.0, 12.0), egui::Sense::hover());
                    ui.painter()
                        .circle_filled(rect.center(), 6.0, status.badge_color);
                    ui.label(RichText::new(&status.badge_label).color(palette.text_muted));
                    ui.separator();
                    ui.label(RichText::new(&status.text).color(palette.text_primary));
                });
            });
    }

    fn render_home(&mut self, ctx: &egui::Context) {
        let palette = style::palette();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() * 0.3);
                ui.heading(RichText::new("Something went wrong?").color(palette.text_primary));
                ui.add_space(6.0);
                ui.label(
                    RichText::new(
                        "Describe what happened and we'll attach basic diagnostics to the report.",
                    )
                    .color(palette.text_muted),
                );
                ui.add_space(14.0);
                if ui.button("Report a failure…").clicked() {
                    self.controller.open_failure_report();
                }
            });
        });
    }
}

impl eframe::App for EguiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_visuals(ctx);
        self.controller.poll_background_jobs();
        self.render_status(ctx);
        self.render_home(ctx);
        self.render_failure_report(ctx);
        if self.controller.has_pending_jobs() {
            ctx.request_repaint_after(PENDING_JOB_REPAINT);
        }
    }
}
