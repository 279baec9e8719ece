use std::sync::Arc;

use tracing::debug;

use crate::adapters::{resolve_tool, AppConfig, FfmpegSpawner, FfprobeAdapter};
use crate::app::batch_interactor::BatchInteractor;
use crate::engine::CommandBuilder;
use crate::error::ParcaResult;
use crate::ports::{ProbePort, ProcessSpawner};

/// Wires the real adapters to the interactors from one configuration
pub struct AppContainer {
    config: AppConfig,
    probe_port: Arc<dyn ProbePort>,
    spawner: Arc<dyn ProcessSpawner>,
}

impl AppContainer {
    pub fn new(config: AppConfig) -> Self {
        let probe_port = Arc::new(FfprobeAdapter::new(config.tools.ffprobe.clone()));
        let spawner = Arc::new(FfmpegSpawner::new());
        Self {
            config,
            probe_port: probe_port as Arc<dyn ProbePort>,
            spawner: spawner as Arc<dyn ProcessSpawner>,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn probe_port(&self) -> Arc<dyn ProbePort> {
        Arc::clone(&self.probe_port)
    }

    /// Batch interactor; with `resolve_tools` the transcoder must be on
    /// `PATH` and is invoked by its resolved location
    pub fn batch_interactor(&self, resolve_tools: bool) -> ParcaResult<BatchInteractor> {
        let ffmpeg = if resolve_tools {
            let resolved = resolve_tool(&self.config.tools.ffmpeg)?;
            debug!(ffmpeg = %resolved.display(), "Resolved transcoder");
            resolved.to_string_lossy().into_owned()
        } else {
            self.config.tools.ffmpeg.clone()
        };

        Ok(BatchInteractor::new(
            Arc::clone(&self.probe_port),
            Arc::clone(&self.spawner),
            CommandBuilder::new(ffmpeg),
            self.config.planner_config(),
            self.config.encoding_options(),
            self.config.batch.concurrency,
        ))
    }
}
