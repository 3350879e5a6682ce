//! Render stage application
//!
//! Renders the built-in demo stage through the engine facade and writes
//! every configured output channel to a PNG file. The configuration file
//! (`.toml` or `.ron`) is the optional first argument.

mod demo_stage;
mod output;

use imaging_lite::foundation::logging;
use imaging_lite::prelude::*;
use std::sync::Arc;
use std::time::Duration;

struct RenderStageApp {
    engine: Engine,
    config: EngineConfig,
    stage: Arc<Stage>,
    root: ScenePath,
}

impl RenderStageApp {
    fn new(config: EngineConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Arc::new(PluginRegistry::with_builtin_plugins());
        let mut engine = Engine::new(registry);
        for id in engine.list_backends() {
            log::info!(
                "Available backend: {id} ({})",
                engine.backend_display_name(&id).unwrap_or_default()
            );
        }
        engine.select_backend(&config.backend)?;

        Ok(Self {
            engine,
            config,
            stage: demo_stage::build()?,
            root: ScenePath::absolute_root(),
        })
    }

    fn configure(&mut self) -> Result<RenderParams, Box<dyn std::error::Error>> {
        for control in self.engine.renderer_setting_widgets()? {
            log::debug!(
                "Setting '{}' ({}) as {:?}",
                control.descriptor.name,
                control.descriptor.key,
                control.widget
            );
        }

        let (width, height) = self.config.resolution;
        self.engine.set_render_viewport(Viewport::from_size(width, height))?;

        let camera = self.engine.frame_stage(&self.stage, &self.root, TimeCode::Default)?;
        self.engine.set_camera_state(camera.world_to_view, camera.projection)?;

        for aov in &self.config.aovs {
            if let Err(err) = self.engine.set_renderer_aov(aov) {
                log::warn!("Skipping output '{aov}': {err}");
            }
        }

        Ok(self.config.to_render_params(camera.world_to_view, camera.projection))
    }

    fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let params = self.configure()?;
        let backend = self.engine.current_backend().unwrap_or_default().to_string();
        log::info!("Rendering with '{backend}' at {:?}", self.config.resolution);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let mut polls = 0;
        let converged = loop {
            self.engine.render(&self.stage, &self.root, &params)?;
            polls += 1;
            if self.engine.is_converged()? {
                break true;
            }
            if polls >= self.config.max_polls {
                break false;
            }
            if polls % 16 == 0 {
                if let Some(done) = self.engine.render_stats().get(tokens::PERCENT_DONE) {
                    log::info!("Progress: {done}%");
                }
            }
            if !poll_interval.is_zero() {
                std::thread::sleep(poll_interval);
            }
        };
        if converged {
            log::info!("Converged after {polls} render cycles");
        } else {
            log::warn!("Gave up after {polls} render cycles without converging");
        }

        let enabled: Vec<String> = self
            .engine
            .render_task_params()
            .map(|task_params| task_params.aov_bindings.iter().map(|b| b.aov_name.clone()).collect())
            .unwrap_or_default();
        for aov in &enabled {
            output::save_aov(
                &self.engine,
                aov,
                self.config.resolution,
                self.config.color_correction,
                &self.config.output_dir,
            )?;
        }
        Ok(())
    }
}

fn load_config() -> EngineConfig {
    let Some(path) = std::env::args().nth(1) else {
        log::info!("No configuration file given; using defaults");
        return EngineConfig::default();
    };
    match EngineConfig::load_from_file(&path) {
        Ok(config) => {
            log::info!("Loaded configuration from {path}");
            config
        }
        Err(err) => {
            log::warn!("Failed to load {path}: {err}; using defaults");
            EngineConfig::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default_level("info");
    log::info!("Starting render stage application");

    let config = load_config();
    let mut app = RenderStageApp::new(config)?;

    match app.run() {
        Ok(()) => {
            log::info!("Render stage application completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Render stage application failed: {e}");
            Err(e)
        }
    }
}
