use std::{collections::BTreeMap, fs, io::BufWriter, path::Path};

use dynmask_image::ImageSize;
use dynmask_io::{layout::frame_name, png};
use dynmask_track::ObjectId;

use crate::{error::MaskError, renderer::EncodedMask};

/// File name of the per-frame, per-camera visibility lists.
pub const CAMERA_VISIBILITY_JSON: &str = "camera_visibility.json";

/// Write a mask as PNG, 16-bit for labels and 8-bit for binary masks.
pub fn write_mask(path: impl AsRef<Path>, mask: &EncodedMask) -> Result<(), MaskError> {
    match mask {
        EncodedMask::Label(image) => png::write_image_png_gray16(path, image)?,
        EncodedMask::Binary(image) => png::write_image_png_gray8(path, image)?,
    }
    Ok(())
}

/// Write visibility lists as `{"000010": {"0": [17, 22]}}`.
pub fn write_camera_visibility(
    path: impl AsRef<Path>,
    visibility: &BTreeMap<usize, BTreeMap<u32, Vec<ObjectId>>>,
) -> Result<(), MaskError> {
    let named = visibility
        .iter()
        .map(|(frame, cameras)| (frame_name(*frame), cameras))
        .collect::<BTreeMap<_, _>>();
    let writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(writer, &named)?;
    Ok(())
}

/// Pick the resolution of a camera's masks.
///
/// A configured size wins, then the size of the source image at `sample_image`,
/// then `fallback`.
pub fn resolve_image_size(
    configured: Option<ImageSize>,
    sample_image: impl AsRef<Path>,
    fallback: ImageSize,
) -> ImageSize {
    if let Some(size) = configured {
        return size;
    }
    let sample_image = sample_image.as_ref();
    match png::read_png_size(sample_image) {
        Ok(size) => size,
        Err(e) => {
            log::debug!(
                "no image size from {} ({e}), using {fallback}",
                sample_image.display()
            );
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynmask_image::Image;

    #[test]
    fn test_write_mask_and_resolve_size() -> Result<(), MaskError> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("000000_0.png");
        let mask = EncodedMask::Label(Image::from_size_val([8, 6].into(), 17u16));
        write_mask(&path, &mask)?;
        assert_eq!(png::read_image_png_gray16(&path)?.get(7, 5), Some(&17));

        let fallback = [1920, 1080].into();
        let configured = [640, 480].into();
        assert_eq!(resolve_image_size(Some(configured), &path, fallback), configured);
        assert_eq!(resolve_image_size(None, &path, fallback), mask.size());
        assert_eq!(
            resolve_image_size(None, tmp_dir.path().join("missing.png"), fallback),
            fallback
        );
        Ok(())
    }

    #[test]
    fn test_write_camera_visibility() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join(CAMERA_VISIBILITY_JSON);
        let visibility = BTreeMap::from([(
            10,
            BTreeMap::from([(0, vec![ObjectId(17)]), (2, vec![])]),
        )]);
        write_camera_visibility(&path, &visibility)?;

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(value["000010"]["0"], serde_json::json!([17]));
        assert_eq!(value["000010"]["2"], serde_json::json!([]));
        Ok(())
    }
}
