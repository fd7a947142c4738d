#![deny(missing_docs)]

//! Entry point for the failure reporter window.
#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]
use eframe::egui;
use failure_report::egui_app::ui::{EguiApp, MIN_VIEWPORT_SIZE};
use failure_report::logging;
use failure_report::services::LiveServices;
use failure_report::settings::ReporterSettings;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };

    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let settings = match ReporterSettings::load_or_default() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!("Using default settings: {err}");
            ReporterSettings::default()
        }
    };
    let services = LiveServices::shared(&settings);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([880.0, 640.0])
            .with_min_inner_size(MIN_VIEWPORT_SIZE),
        ..Default::default()
    };

    eframe::run_native(
        "Report a failure",
        native_options,
        Box::new(move |_cc| {
            let mut app = EguiApp::new(settings, services);
            app.set_report_open(options.open_report);
            Ok(Box::new(app))
        }),
    )?;
    Ok(())
}

struct CliOptions {
    open_report: bool,
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut open_report = false;
    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--open" => open_report = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
    }
    Ok(Some(CliOptions { open_report }))
}

fn help_text() -> String {
    [
        "failure-report",
        "",
        "Usage:",
        "  failure-report [--open]",
        "",
        "Options:",
        "  --open   Show the report dialog immediately",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_open_flag() {
        let options = parse_args(vec!["--open".to_string()]).unwrap().unwrap();
        assert!(options.open_report);
        assert!(!parse_args(Vec::new()).unwrap().unwrap().open_report);
    }

    #[test]
    fn rejects_unknown_arguments() {
        let err = parse_args(vec!["--bogus".to_string()]).err().unwrap();
        assert!(err.contains("Unknown argument: --bogus"));
    }
}
