//! Headless scene runner.
//!
//! Builds a scene from a creation-parameters JSON file over the in-memory
//! engine and logs what ended up live. Useful for checking configuration
//! blobs without a host application.

use clap::{Arg, Command};
use filaview::engine::HeadlessEngine;
use filaview::scene::serialization::{
    load_creation_params_from_file, load_viewer_settings_from_file, ViewerSettings,
};
use filaview::SceneController;
use std::path::PathBuf;
use std::process::ExitCode;

fn parse_size(text: &str) -> Option<(u32, u32)> {
    let (width, height) = text.split_once(['x', 'X'])?;
    Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let matches = Command::new("filaview")
        .about("Loads a Filament view scene description and reports the resulting engine state")
        .arg(
            Arg::new("params")
                .value_name("CREATION_PARAMS")
                .help("Creation parameters JSON (models, scene, shapes)")
                .required(true),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_name("FILE")
                .help("Viewer settings JSON"),
        )
        .arg(
            Arg::new("assets")
                .long("assets")
                .value_name("DIR")
                .help("Root directory for assetPath values"),
        )
        .arg(
            Arg::new("size")
                .long("size")
                .value_name("WxH")
                .help("Initial viewport size, e.g. 1280x720"),
        )
        .get_matches();

    let mut settings = match matches.get_one::<String>("settings") {
        Some(path) => match load_viewer_settings_from_file(&PathBuf::from(path)) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Could not read viewer settings {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => ViewerSettings::default(),
    };
    if let Some(dir) = matches.get_one::<String>("assets") {
        settings.assets_path = PathBuf::from(dir);
    }
    if let Some(size) = matches.get_one::<String>("size") {
        match parse_size(size) {
            Some((width, height)) => {
                settings.viewport_width = width;
                settings.viewport_height = height;
            }
            None => log::warn!("Ignoring malformed --size '{size}'; expected WxH"),
        }
    }

    let params_path = matches
        .get_one::<String>("params")
        .map(PathBuf::from)
        .unwrap_or_default();
    let params = match load_creation_params_from_file(&params_path) {
        Ok(params) => params,
        Err(e) => {
            log::error!("Could not read creation parameters {}: {e}", params_path.display());
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "Loaded {} models and {} shapes from {}",
        params.models.len(),
        params.shapes.len(),
        params_path.display()
    );

    let engine = HeadlessEngine::new(settings.viewport_width, settings.viewport_height);
    let inspector = engine.inspector();
    let controller = match SceneController::new(Box::new(engine), settings, params) {
        Ok(controller) => controller,
        Err(e) => {
            log::error!("Scene controller failed to start: {e}");
            return ExitCode::FAILURE;
        }
    };

    let snapshot = inspector.snapshot();
    log::info!("States: {}", controller.states().summary());
    log::info!(
        "Engine: {} entities in scene, {} lights, {} models, {} shapes, skybox={:?}, indirect light={:?}",
        snapshot.scene.len(),
        snapshot.scene_lights().len(),
        snapshot.models.len(),
        snapshot.shapes.len(),
        snapshot.active_skybox(),
        snapshot.active_indirect_light().map(|light| light.intensity)
    );
    if let Some(index) = controller.animation_index() {
        log::info!("Autoplay animation index: {index}");
    }
    ExitCode::SUCCESS
}
