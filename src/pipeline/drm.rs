//! DRM branch: encryption, the protected presentation and its manifest
//! variants.

use super::executor::{remove_if_exists, PipelineExecutor};
use crate::config::DrmConfig;
use anyhow::{Context, Result};
use dasher_av::actions;
use dasher_common::paths::{self, ENCRYPTION_SPEC, MANIFEST, MANIFEST_CLEARKEY, MANIFEST_NOPSSH};
use dasher_common::{RenditionSpec, VideoCodec};
use dasher_media::drm::{ContentKey, Iv, KeyId, CENC_SCHEME};
use dasher_media::mp4::{self, BoxPath};
use dasher_media::{DrmDescriptor, DrmDescriptorBuilder, DrmSystem, ManifestDocument};
use std::path::{Path, PathBuf};

/// Every temp rendition holds a single track.
const TRACK_ID: u32 = 1;

const SENC_PATH: &str = "moov/trak/senc";
const PSSH_PATH: &str = "moov/pssh[*]";

/// Build the descriptor for this run, or `None` when DRM is off.
///
/// Half-configured key material is reported and the DRM branch skipped; the
/// clear presentation is still produced.
pub fn drm_descriptor(config: &DrmConfig) -> Result<Option<DrmDescriptor>> {
    if !config.requested() {
        tracing::info!("No DRM key material configured, skipping DRM");
        return Ok(None);
    }
    if let Err(e) = config.check_key_material() {
        tracing::warn!("{}, skipping DRM", e);
        return Ok(None);
    }

    let kid = KeyId::parse_or_generate(config.kid.as_deref().unwrap_or_default()).context("Invalid drm.kid")?;
    let key = ContentKey::parse_or_generate(config.key.as_deref().unwrap_or_default())
        .context("Invalid drm.key")?;
    let iv = match config.iv.as_deref().filter(|v| !v.trim().is_empty()) {
        Some(iv) => Iv::parse_or_generate(iv).context("Invalid drm.iv")?,
        None => Iv::random(),
    };

    let mut descriptor = DrmDescriptor::new(kid, key, iv);
    descriptor.systems.retain(|system| match system {
        DrmSystem::PlayReady => config.playready,
        DrmSystem::Widevine => config.widevine,
        DrmSystem::Marlin => config.marlin,
        DrmSystem::ClearKey => config.clearkey,
    });
    descriptor.playready_laurl = config.playready_laurl.clone();
    descriptor.clearkey_laurl = config.clearkey_laurl.clone();
    descriptor.cenc = config.cenc;

    tracing::info!(
        "DRM kid={} iv={} systems={:?}",
        descriptor.kid.to_uuid_string(),
        descriptor.iv.to_hex(),
        descriptor.systems.iter().map(|s| s.name()).collect::<Vec<_>>()
    );
    Ok(Some(descriptor))
}

impl PipelineExecutor {
    /// Stage 7: encrypt, segment into `drm/`, fix init segments and write
    /// the three DRM manifests. Returns the manifests written.
    pub(super) fn package_drm(&self, specs: &[RenditionSpec], descriptor: &DrmDescriptor) -> Result<Vec<PathBuf>> {
        let drm_dir = paths::drm_dir(&self.output);
        std::fs::create_dir_all(&drm_dir).with_context(|| format!("Failed to create {:?}", drm_dir))?;

        if !self.is_dry_run() {
            if self.config.delete_old_files {
                let removed = paths::delete_output_artifacts(&drm_dir)?;
                tracing::info!("Deleted {} old files from {}", removed, drm_dir.display());
            } else {
                remove_if_exists(&drm_dir.join(MANIFEST))?;
            }

            let spec = DrmDescriptorBuilder::new(descriptor).build_encryption_spec(&[TRACK_ID])?;
            dasher_media::write_atomic(&self.output.join(ENCRYPTION_SPEC), spec.as_bytes())
                .context("Failed to write encryption spec")?;
        }

        for spec in specs.iter().filter(|s| s.enabled) {
            let cmd = actions::crypt_command(&self.tools.mp4box, ENCRYPTION_SPEC, spec).current_dir(&self.output);
            self.runner
                .run(&cmd)
                .with_context(|| format!("Failed to encrypt rendition {}", spec.name))?;
        }

        let cmd = actions::dash_command(&self.tools.mp4box, specs, self.config.segment_duration)
            .current_dir(&drm_dir);
        self.runner.run(&cmd).context("Failed to create DRM DASH segments")?;

        if self.is_dry_run() {
            tracing::info!("[DRY RUN] Would fix init segments and manifests in {}", drm_dir.display());
            return Ok(vec![drm_dir.join(MANIFEST)]);
        }

        strip_init_segments(&drm_dir, specs);
        write_drm_manifests(&drm_dir, descriptor, self.config.mode)
    }
}

/// Remove `senc` from every init segment in place and write a copy without
/// PSSH boxes. A failing rendition is logged and the rest processed.
///
/// Returns the number of renditions fully handled. A rendition without an
/// init segment is not counted.
pub fn strip_init_segments(drm_dir: &Path, specs: &[RenditionSpec]) -> usize {
    let (senc, pssh) = match (SENC_PATH.parse::<BoxPath>(), PSSH_PATH.parse::<BoxPath>()) {
        (Ok(senc), Ok(pssh)) => (senc, pssh),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!("Invalid box path: {}", e);
            return 0;
        }
    };

    let mut handled = 0;
    for spec in specs.iter().filter(|s| s.enabled) {
        let init = drm_dir.join(paths::init_segment_name(&spec.name));
        let nopssh = drm_dir.join(paths::nopssh_init_segment_name(&spec.name));
        if !init.is_file() {
            tracing::warn!(
                "Init segment {} missing, {} will be incomplete",
                init.display(),
                MANIFEST_NOPSSH
            );
            continue;
        }

        match strip_init_segment(&init, &nopssh, &senc, &pssh) {
            Ok((senc_removed, pssh_removed)) => {
                tracing::debug!(
                    "{}: removed {} senc, {} pssh boxes",
                    init.display(),
                    senc_removed,
                    pssh_removed
                );
                handled += 1;
            }
            Err(e) => tracing::warn!("Failed to edit init segment {}: {}", init.display(), e),
        }
    }
    handled
}

fn strip_init_segment(
    init: &Path,
    nopssh: &Path,
    senc: &BoxPath,
    pssh: &BoxPath,
) -> dasher_media::Result<(usize, usize)> {
    let senc_removed = mp4::remove_from_file(init, init, senc)?;
    let pssh_removed = mp4::remove_from_file(init, nopssh, pssh)?;
    Ok((senc_removed, pssh_removed))
}

/// Turn the muxer's `drm/manifest.mpd` into the PlayReady/Widevine/Marlin
/// manifest, then derive the ClearKey and no-PSSH variants from it.
pub fn write_drm_manifests(drm_dir: &Path, descriptor: &DrmDescriptor, mode: VideoCodec) -> Result<Vec<PathBuf>> {
    let manifest_path = drm_dir.join(MANIFEST);
    let mut manifest = ManifestDocument::open(&manifest_path)
        .with_context(|| format!("Failed to read manifest {:?}", manifest_path))?;
    let builder = DrmDescriptorBuilder::new(descriptor);

    manifest.fix_content(mode);
    manifest.add_namespaces();
    for signalling in builder.protection_signalling() {
        let inserted = manifest.add_content_protection_element(signalling.element);
        tracing::debug!("Added {} signalling to {} AdaptationSets", signalling.system.name(), inserted);
    }
    if !descriptor.cenc {
        manifest.remove_content_protection(CENC_SCHEME);
    }
    manifest
        .save(&manifest_path)
        .with_context(|| format!("Failed to write manifest {:?}", manifest_path))?;
    let mut written = vec![manifest_path];

    if let Some(signalling) = builder.build_clearkey_signalling() {
        let mut clearkey = manifest.clone();
        clearkey.add_content_protection_element(signalling.element);
        for system in [DrmSystem::PlayReady, DrmSystem::Widevine, DrmSystem::Marlin] {
            clearkey.remove_content_protection(system.name());
        }
        let path = drm_dir.join(MANIFEST_CLEARKEY);
        clearkey
            .save(&path)
            .with_context(|| format!("Failed to write manifest {:?}", path))?;
        written.push(path);
    }

    let rewritten = manifest.rewrite_initialization(paths::INIT_TEMPLATE, paths::INIT_TEMPLATE_NOPSSH);
    if rewritten == 0 {
        tracing::warn!("No initialization template {} in {}", paths::INIT_TEMPLATE, drm_dir.display());
    }
    let path = drm_dir.join(MANIFEST_NOPSSH);
    manifest
        .save(&path)
        .with_context(|| format!("Failed to write manifest {:?}", path))?;
    written.push(path);

    tracing::info!("Wrote {} DRM manifests to {}", written.len(), drm_dir.display());
    Ok(written)
}
