use super::EguiApp;
use super::overlay_layers::{OverlayLayer, modal_backdrop};
use super::style;
use crate::diagnostics::SystemInfo;
use crate::egui_app::state::SubmissionStatus;
use eframe::egui::{self, Align2, Color32, RichText};

const MODAL_WIDTH: f32 = 560.0;

/// User intent captured while drawing the modal, applied after the frame.
#[derive(Clone, Debug, PartialEq, Eq)]
enum FailureReportAction {
    None,
    Submit,
    Close,
    OpenLink(String),
}

impl EguiApp {
    /// Render the failure report modal and its blocking validation notice.
    pub(super) fn render_failure_report(&mut self, ctx: &egui::Context) {
        if !self.controller.ui.failure_report.open {
            return;
        }

        modal_backdrop(
            ctx,
            OverlayLayer::Modal,
            "failure_report_backdrop",
            Color32::from_rgba_premultiplied(0, 0, 0, 160),
        );

        let notice_open = self.controller.ui.failure_report.validation_notice.is_some();
        if !notice_open && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.controller.request_close();
            return;
        }

        let mut open = true;
        let mut action = FailureReportAction::None;
        egui::Window::new("Report a failure")
            .anchor(Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .order(OverlayLayer::Modal.order())
            .collapsible(false)
            .resizable(false)
            .default_width(MODAL_WIDTH)
            .open(&mut open)
            .show(ctx, |ui| {
                action = self.render_failure_report_body(ui);
            });
        if !open {
            action = FailureReportAction::Close;
        }

        match action {
            FailureReportAction::None => {}
            FailureReportAction::Submit => self.controller.submit_failure_report(),
            FailureReportAction::Close => {
                self.controller.request_close();
            }
            FailureReportAction::OpenLink(url) => self.controller.open_link(&url),
        }

        self.render_validation_notice(ctx);
    }

    fn render_validation_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = self.controller.ui.failure_report.validation_notice.clone() else {
            return;
        };
        modal_backdrop(
            ctx,
            OverlayLayer::ModalNotice,
            "failure_report_notice_backdrop",
            Color32::from_rgba_premultiplied(0, 0, 0, 96),
        );
        let palette = style::palette();
        let mut dismissed = ctx.input(|i| {
            i.key_pressed(egui::Key::Escape) || i.key_pressed(egui::Key::Enter)
        });
        egui::Window::new("Description required")
            .anchor(Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .order(OverlayLayer::ModalNotice.order())
            .collapsible(false)
            .resizable(false)
            .title_bar(false)
            .show(ctx, |ui| {
                ui.set_min_width(320.0);
                ui.label(RichText::new(notice).color(palette.text_primary));
                ui.add_space(10.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.controller.dismiss_validation_notice();
        }
    }

    fn render_failure_report_body(&mut self, ui: &mut egui::Ui) -> FailureReportAction {
        let palette = style::palette();
        ui.set_min_width(MODAL_WIDTH);

        let status = self.controller.ui.failure_report.status;
        if status == SubmissionStatus::Success {
            return self.render_success(ui);
        }

        ui.label(
            RichText::new(
                "Tell us what you were doing and what went wrong. \
                 System details below are attached automatically.",
            )
            .color(palette.text_primary),
        );
        ui.add_space(8.0);

        let submitting = status == SubmissionStatus::Submitting;
        {
            let state = &mut self.controller.ui.failure_report;
            ui.label(RichText::new("What happened? (required)").color(palette.text_primary));
            let response = ui.add_enabled(
                !submitting,
                egui::TextEdit::multiline(&mut state.description)
                    .hint_text("Steps to reproduce…\nExpected…\nActual…")
                    .desired_width(MODAL_WIDTH - 16.0)
                    .desired_rows(7)
                    .lock_focus(true),
            );
            if state.focus_description_requested && !submitting && !response.has_focus() {
                response.request_focus();
                state.focus_description_requested = false;
            }
        }
        ui.add_space(10.0);

        self.render_diagnostics_panel(ui);
        ui.add_space(10.0);

        let mut action = FailureReportAction::None;
        if status == SubmissionStatus::Error {
            action = self.render_error_notice(ui);
            ui.add_space(8.0);
        }

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!submitting, egui::Button::new("Cancel"))
                .clicked()
            {
                action = FailureReportAction::Close;
            }
            ui.add_space(8.0);
            let label = if status == SubmissionStatus::Error {
                "Try again"
            } else {
                "Submit report"
            };
            // Blank descriptions stay clickable so the user gets the notice.
            if ui
                .add_enabled(!submitting, egui::Button::new(label))
                .clicked()
            {
                action = FailureReportAction::Submit;
            }
            if submitting {
                ui.add_space(8.0);
                ui.add(egui::Spinner::new().size(14.0));
                ui.label(RichText::new("Submitting…").color(palette.text_muted));
            }
        });
        action
    }

    fn render_diagnostics_panel(&self, ui: &mut egui::Ui) {
        let palette = style::palette();
        let state = &self.controller.ui.failure_report;
        egui::Frame::group(ui.style())
            .fill(style::compartment_fill())
            .stroke(style::inner_border())
            .show(ui, |ui| {
                ui.set_width(MODAL_WIDTH - 16.0);
                ui.label(RichText::new("System information").strong());
                ui.add_space(4.0);
                match state.system_info.as_ref() {
                    None => {
                        ui.horizontal(|ui| {
                            ui.add(egui::Spinner::new().size(14.0));
                            ui.label(
                                RichText::new("Collecting diagnostics…").color(palette.text_muted),
                            );
                        });
                    }
                    Some(info) => diagnostics_grid(ui, info),
                }
                if !state.recent_errors.is_empty() {
                    ui.add_space(4.0);
                    ui.label(
                        RichText::new(format!(
                            "{} recent error line(s) from the log will be attached.",
                            state.recent_errors.len()
                        ))
                        .color(palette.text_muted),
                    );
                }
            });
    }

    fn render_error_notice(&self, ui: &mut egui::Ui) -> FailureReportAction {
        let state = &self.controller.ui.failure_report;
        let mut action = FailureReportAction::None;
        ui.label(
            RichText::new("We couldn't submit your report.")
                .color(style::status_badge_color(style::StatusTone::Error)),
        );
        if let Some(err) = state.last_error.as_deref() {
            ui.label(RichText::new(err).color(style::palette().text_muted));
        }
        if let Some(url) = self.controller.manual_report_url() {
            ui.horizontal(|ui| {
                ui.label("You can retry, or");
                if ui.link("report it manually on GitHub").clicked() {
                    action = FailureReportAction::OpenLink(url);
                }
            });
        }
        action
    }

    fn render_success(&self, ui: &mut egui::Ui) -> FailureReportAction {
        let palette = style::palette();
        let state = &self.controller.ui.failure_report;
        let mut action = FailureReportAction::None;
        ui.label(
            RichText::new("Thanks! Your failure report was submitted.")
                .color(palette.success)
                .strong(),
        );
        if let Some(message) = state.success_message.as_deref() {
            ui.label(RichText::new(message).color(palette.text_muted));
        }
        if let Some(url) = state.derived_issue_url.clone() {
            ui.add_space(6.0);
            if ui.link("View the issue on GitHub").clicked() {
                action = FailureReportAction::OpenLink(url);
            }
        }
        ui.add_space(10.0);
        if ui.button("Close").clicked() {
            action = FailureReportAction::Close;
        }
        action
    }
}

fn diagnostics_grid(ui: &mut egui::Ui, info: &SystemInfo) {
    let muted = style::palette().text_muted;
    egui::Grid::new("failure_report_diagnostics")
        .num_columns(2)
        .spacing([12.0, 2.0])
        .show(ui, |ui| {
            let rows = [
                ("Version", info.version.clone()),
                ("OS", info.os_descriptor.clone()),
                ("Platform", format!("{} ({})", info.platform, info.architecture)),
                (
                    "Provider",
                    info.provider_name
                        .clone()
                        .unwrap_or_else(|| "Unavailable".to_string()),
                ),
                ("Extensions", info.extension_count.to_string()),
            ];
            for (label, value) in rows {
                ui.label(RichText::new(label).color(muted));
                ui.label(value);
                ui.end_row();
            }
        });
}
