use crate::config::{properties, Config};
use anyhow::{Context, Result};
use dasher_av::actions::{self, TranscodeOptions};
use dasher_av::{MediaMetadata, Runner, Toolset};
use dasher_common::paths::{self, MANIFEST};
use dasher_common::{RenditionSpec, VideoCodec};
use dasher_media::ManifestDocument;
use std::path::{Path, PathBuf};

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Enabled renditions packaged, secondary-input copies included.
    pub renditions: usize,
    /// Manifests written, in order.
    pub manifests: Vec<PathBuf>,
    /// Whether the DRM branch ran.
    pub drm: bool,
}

/// Runs the packaging stages for one configuration, strictly in order.
///
/// Each stage works on the files left by the previous one in the output
/// folder. A failing external tool aborts the run.
pub struct PipelineExecutor {
    pub(super) config: Config,
    pub(super) tools: Toolset,
    pub(super) runner: Runner,
    pub(super) input: PathBuf,
    pub(super) output: PathBuf,
}

impl PipelineExecutor {
    /// Prepare a run. Tools are resolved now unless `dry_run` is set.
    pub fn new(config: Config, dry_run: bool) -> Result<Self> {
        let input = absolute(config.input.as_deref().context("No input file configured")?)?;
        let output = absolute(config.output.as_deref().context("No output folder configured")?)?;

        let tools_config = &config.tools;
        let (tools, runner) = if dry_run {
            let tools = Toolset::unresolved(
                tools_config.ffmpeg_path.as_deref(),
                tools_config.ffprobe_path.as_deref(),
                tools_config.mp4box_path.as_deref(),
            );
            (tools, Runner::dry_run())
        } else {
            if !input.exists() {
                anyhow::bail!("Input file does not exist: {:?}", input);
            }
            let tools = Toolset::resolve(
                tools_config.ffmpeg_path.as_deref(),
                tools_config.ffprobe_path.as_deref(),
                tools_config.mp4box_path.as_deref(),
            )?;
            (tools, Runner::new())
        };

        Ok(Self {
            config,
            tools,
            runner,
            input,
            output,
        })
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn is_dry_run(&self) -> bool {
        self.runner.is_dry_run()
    }

    /// Run every stage.
    pub fn execute(&self) -> Result<RunSummary> {
        tracing::info!("Start dashing");
        tracing::info!("input={}", self.input.display());
        tracing::info!("output={}", self.output.display());

        self.prepare_output()?;
        self.log_parameters();
        let metadata = self.read_metadata();
        let options = TranscodeOptions {
            fps: metadata.fps_or_default(),
            gop_secs: self.config.gop_duration,
            overlay: self.config.overlay,
        };

        self.create_images()?;

        let mut specs = self.config.rendition_specs();
        self.transcode(&specs, &options)?;
        let duplicates = self.transcode_secondary_inputs(&specs)?;
        specs.extend(duplicates);

        let mut summary = RunSummary {
            renditions: specs.iter().filter(|s| s.enabled).count(),
            ..RunSummary::default()
        };

        let clear_manifest = self.package_clear(&specs)?;
        summary.manifests.push(clear_manifest);

        if let Some(descriptor) = super::drm::drm_descriptor(&self.config.drm)? {
            let written = self.package_drm(&specs, &descriptor)?;
            summary.drm = true;
            summary.manifests.extend(written);
        }

        self.cleanup_temp_files(&specs, summary.drm);

        let subtitle_manifests = self.attach_subtitles(summary.drm);
        summary.manifests.extend(subtitle_manifests);

        tracing::info!(
            "Completed dashing: {} renditions, {} manifests",
            summary.renditions,
            summary.manifests.len()
        );
        Ok(summary)
    }

    /// Stage 1: create the output folder and clear old artifacts.
    fn prepare_output(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output)
            .with_context(|| format!("Failed to create output folder {:?}", self.output))?;

        if self.is_dry_run() {
            tracing::info!("[DRY RUN] Would clean {}", self.output.display());
            return Ok(());
        }

        if self.config.delete_old_files {
            let removed = paths::delete_output_artifacts(&self.output)?;
            tracing::info!("Deleted {} old files from {}", removed, self.output.display());
        } else {
            remove_if_exists(&self.output.join(MANIFEST))?;
        }
        Ok(())
    }

    /// Stage 2a: every parameter, sorted.
    fn log_parameters(&self) {
        tracing::info!("Parameters:");
        for (key, value) in properties::to_properties(&self.config) {
            tracing::info!("{}={}", key, value);
        }
    }

    /// Stage 2b: input metadata. Failures fall back to defaults.
    fn read_metadata(&self) -> MediaMetadata {
        if self.is_dry_run() {
            return MediaMetadata::default();
        }
        match dasher_av::probe(&self.tools.ffprobe, &self.input) {
            Ok(metadata) => {
                tracing::info!("Input metadata:");
                for (key, value) in metadata.to_pairs() {
                    tracing::info!("{}={}", key, value);
                }
                metadata
            }
            Err(e) => {
                tracing::warn!(
                    "Could not read input metadata ({}), assuming {} fps",
                    e,
                    dasher_av::DEFAULT_FPS
                );
                MediaMetadata::default()
            }
        }
    }

    /// Stage 3: preview images.
    fn create_images(&self) -> Result<()> {
        let Some(seconds) = self.config.image.seconds else {
            return Ok(());
        };

        for image in &self.config.image.sizes {
            let cmd = actions::image_command(&self.tools.ffmpeg, &self.input, seconds, image.size)
                .current_dir(&self.output);
            if !image.enabled {
                tracing::info!("Image {} disabled: {}", image.size, cmd);
                continue;
            }
            self.runner
                .run(&cmd)
                .with_context(|| format!("Failed to create preview image {}", image.size))?;
        }
        Ok(())
    }

    /// Stages 4 and 5: one transcode per rendition.
    fn transcode(&self, specs: &[RenditionSpec], options: &TranscodeOptions) -> Result<()> {
        for spec in specs {
            let cmd = actions::transcode_command(&self.tools.ffmpeg, &self.input, spec, options)?
                .current_dir(&self.output);
            if !spec.enabled {
                tracing::info!("Rendition {} disabled: {}", spec.name, cmd);
                continue;
            }
            self.runner
                .run(&cmd)
                .with_context(|| format!("Failed to transcode rendition {}", spec.name))?;

            if spec.is_video() && self.config.mode == VideoCodec::H265 {
                tracing::info!("Convert HEV1 to HVC1 (name={})", spec.name);
                actions::retag_hvc1(&self.runner, &self.tools.ffmpeg, &self.output, &spec.name)
                    .with_context(|| format!("Failed to retag rendition {}", spec.name))?;
            }
        }
        Ok(())
    }

    /// Stage 5b: repeat every enabled audio rendition for each secondary input.
    fn transcode_secondary_inputs(&self, specs: &[RenditionSpec]) -> Result<Vec<RenditionSpec>> {
        let mut duplicates = Vec::new();
        for (i, source) in self.config.inputs.iter().enumerate() {
            let source = absolute(source)?;
            for spec in specs.iter().filter(|s| s.is_audio() && s.enabled) {
                let dup = spec.duplicate_for_input(i + 1);
                let cmd = actions::audio_command(&self.tools.ffmpeg, &source, &dup)?.current_dir(&self.output);
                self.runner
                    .run(&cmd)
                    .with_context(|| format!("Failed to transcode rendition {}", dup.name))?;
                duplicates.push(dup);
            }
        }
        Ok(duplicates)
    }

    /// Stage 6: clear DASH presentation plus manifest corrections.
    fn package_clear(&self, specs: &[RenditionSpec]) -> Result<PathBuf> {
        let cmd = actions::dash_command(&self.tools.mp4box, specs, self.config.segment_duration)
            .current_dir(&self.output);
        self.runner.run(&cmd).context("Failed to create DASH segments")?;

        let manifest_path = self.output.join(MANIFEST);
        self.fix_manifest(&manifest_path)?;
        Ok(manifest_path)
    }

    pub(super) fn fix_manifest(&self, path: &Path) -> Result<()> {
        if self.is_dry_run() {
            tracing::info!("[DRY RUN] Would fix {}", path.display());
            return Ok(());
        }
        let mut manifest =
            ManifestDocument::open(path).with_context(|| format!("Failed to read manifest {:?}", path))?;
        let edits = manifest.fix_content(self.config.mode);
        manifest
            .save(path)
            .with_context(|| format!("Failed to write manifest {:?}", path))?;
        tracing::info!("Fixed {} ({} edits)", path.display(), edits);
        Ok(())
    }

    /// Stage 8: remove intermediates.
    fn cleanup_temp_files(&self, specs: &[RenditionSpec], drm: bool) {
        if !self.config.delete_temp_files || self.is_dry_run() {
            return;
        }

        let mut targets: Vec<PathBuf> = specs
            .iter()
            .map(|s| self.output.join(paths::temp_rendition_name(&s.name)))
            .collect();
        if drm {
            targets.push(self.output.join(paths::ENCRYPTION_SPEC));
            let drm_dir = paths::drm_dir(&self.output);
            targets.extend(specs.iter().map(|s| drm_dir.join(paths::temp_rendition_name(&s.name))));
        }

        for target in targets {
            if let Err(e) = remove_if_exists(&target) {
                tracing::warn!("Failed to delete {}: {}", target.display(), e);
            }
        }
    }
}

/// Resolve against the current directory; external tools run elsewhere.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

pub(super) fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
