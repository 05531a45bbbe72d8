//! HDR environment decoding and prefiltering into cube maps and reflections.

use crate::engine::{Engine, HdrImage, TextureId};
use crate::error::SceneError;
use crate::state::lock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Instant;

type Fingerprint = [u8; 32];

fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Decodes a Radiance `.hdr` file into tightly packed RGB32F.
pub fn decode_hdr(bytes: &[u8]) -> Result<HdrImage, image::ImageError> {
    let rgb = image::load_from_memory_with_format(bytes, image::ImageFormat::Hdr)?.to_rgb32f();
    let (width, height) = rgb.dimensions();
    Ok(HdrImage {
        width,
        height,
        pixels: rgb.into_raw(),
    })
}

/// Reads and decodes HDR files, keyed by content so a source still held
/// elsewhere is not decoded again. The cache holds no image alive.
#[derive(Default)]
pub struct HdrLoader {
    cache: Mutex<HashMap<Fingerprint, Weak<HdrImage>>>,
    decodes: AtomicUsize,
}

impl HdrLoader {
    pub fn load(&self, path: &Path) -> Result<Arc<HdrImage>, SceneError> {
        let bytes = std::fs::read(path).map_err(|source| SceneError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let key = fingerprint(&bytes);
        if let Some(image) = lock(&self.cache).get(&key).and_then(Weak::upgrade) {
            log::debug!("HDR {} already decoded", path.display());
            return Ok(image);
        }

        let started = Instant::now();
        let image = decode_hdr(&bytes).map_err(|source| SceneError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!(
            "Decoded HDR {} ({}x{}) in {:?}",
            path.display(),
            image.width,
            image.height,
            started.elapsed()
        );
        let image = Arc::new(image);
        self.decodes.fetch_add(1, Ordering::Relaxed);
        let mut cache = lock(&self.cache);
        cache.retain(|_, cached| cached.strong_count() > 0);
        cache.insert(key, Arc::downgrade(&image));
        Ok(image)
    }

    /// Decoded images still alive somewhere in the session.
    pub fn cached(&self) -> usize {
        lock(&self.cache)
            .values()
            .filter(|image| image.strong_count() > 0)
            .count()
    }

    /// Total decodes since creation.
    pub fn decoded(&self) -> usize {
        self.decodes.load(Ordering::Relaxed)
    }
}

/// Environment prefilter shared by the skybox and indirect light managers.
/// Engine-side methods must run on the strand.
#[derive(Default)]
pub struct IblPrefilter {
    hdr: HdrLoader,
}

impl IblPrefilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_hdr(&self, path: &Path) -> Result<Arc<HdrImage>, SceneError> {
        self.hdr.load(path)
    }

    pub fn decoded_sources(&self) -> usize {
        self.hdr.decoded()
    }

    /// Uploads `image` and converts it to a cube map. The intermediate
    /// equirectangular texture is always destroyed.
    pub fn create_cubemap(
        &self,
        engine: &mut dyn Engine,
        image: &HdrImage,
    ) -> Result<TextureId, SceneError> {
        let started = Instant::now();
        let equirect = engine.create_hdr_texture(image)?;
        let cubemap = engine.equirect_to_cubemap(equirect);
        engine.destroy_texture(equirect);
        let cubemap = cubemap?;
        log::debug!(
            "Equirect {}x{} converted to cube map in {:?}",
            image.width,
            image.height,
            started.elapsed()
        );
        Ok(cubemap)
    }

    pub fn light_reflections(
        &self,
        engine: &mut dyn Engine,
        cubemap: TextureId,
    ) -> Result<TextureId, SceneError> {
        let started = Instant::now();
        let reflections = engine.prefilter_specular(cubemap)?;
        log::debug!("Specular prefilter took {:?}", started.elapsed());
        Ok(reflections)
    }
}

/// A small valid Radiance file, `width` must stay below 8 so rows are stored flat.
#[cfg(test)]
pub(crate) fn hdr_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = format!("#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y {height} +X {width}\n").into_bytes();
    for _ in 0..width * height {
        out.extend_from_slice(&[128, 128, 128, 129]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{decode_hdr, hdr_bytes, HdrLoader, IblPrefilter};
    use crate::state::lock;
    use crate::engine::{Engine, HeadlessEngine, TextureKind};
    use crate::error::{ErrorKind, SceneError};
    use std::io::Write;
    use std::sync::Arc;

    fn hdr_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn decodes_flat_radiance_rows() {
        let image = decode_hdr(&hdr_bytes(2, 1)).unwrap();
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.pixels.len(), 6);
        assert!(image.pixels.iter().all(|v| (v - 1.0).abs() < 1e-2));
    }

    #[test]
    fn identical_sources_decode_once() {
        let prefilter = IblPrefilter::new();
        let first = hdr_file(&hdr_bytes(2, 2));
        let second = hdr_file(&hdr_bytes(2, 2));
        let a = prefilter.load_hdr(first.path()).unwrap();
        let b = prefilter.load_hdr(second.path()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(prefilter.decoded_sources(), 1);
    }

    #[test]
    fn released_images_leave_the_cache() {
        let loader = HdrLoader::default();
        let wide = hdr_file(&hdr_bytes(4, 2));
        let small = hdr_file(&hdr_bytes(2, 2));

        let image = loader.load(wide.path()).unwrap();
        let weak = Arc::downgrade(&image);
        assert_eq!(loader.cached(), 1);
        drop(image);
        assert!(weak.upgrade().is_none());
        assert_eq!(loader.cached(), 0);

        // The next insert prunes the dead entry.
        let kept = loader.load(small.path()).unwrap();
        assert_eq!(lock(&loader.cache).len(), 1);

        // A released source is decoded again on demand.
        let again = loader.load(wide.path()).unwrap();
        assert_eq!((again.width, again.height), (4, 2));
        assert_eq!(loader.decoded(), 3);
        assert_eq!(loader.cached(), 2);
        drop(kept);
    }

    #[test]
    fn unreadable_and_undecodable_files_are_resource_failures() {
        let prefilter = IblPrefilter::new();
        let dir = tempfile::tempdir().unwrap();
        let missing = prefilter.load_hdr(&dir.path().join("none.hdr")).unwrap_err();
        assert!(matches!(missing, SceneError::Read { .. }));
        let garbage = hdr_file(b"definitely not radiance");
        let bad = prefilter.load_hdr(garbage.path()).unwrap_err();
        assert!(matches!(bad, SceneError::Decode { .. }));
        assert_eq!(bad.kind(), ErrorKind::ResourceFailure);
    }

    #[test]
    fn cubemap_conversion_drops_the_equirect() {
        let mut engine = HeadlessEngine::new(8, 8);
        let prefilter = IblPrefilter::new();
        let image = decode_hdr(&hdr_bytes(4, 2)).unwrap();
        let cubemap = prefilter.create_cubemap(&mut engine, &image).unwrap();
        let reflections = prefilter.light_reflections(&mut engine, cubemap).unwrap();
        let snapshot = engine.inspector().snapshot();
        assert_eq!(snapshot.textures.len(), 2);
        assert_eq!(snapshot.textures[&cubemap].kind, TextureKind::Cubemap);
        assert_eq!(snapshot.textures[&reflections].kind, TextureKind::Reflections);
        engine.destroy_texture(reflections);
    }
}
