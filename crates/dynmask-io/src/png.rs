use std::{fs, fs::File, io::BufWriter, path::Path};

use dynmask_image::{Image, ImageSize};
use png::{BitDepth, ColorType, Decoder, Encoder};

use crate::error::IoError;

// png stores 16-bit samples big endian
fn u16_to_be_bytes(buf: &[u16]) -> Vec<u8> {
    buf.iter().flat_map(|v| v.to_be_bytes()).collect()
}

fn be_bytes_to_u16(buf: &[u8]) -> Vec<u16> {
    buf.chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect()
}

/// Writes a 16-bit grayscale label image.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The label image, one object id per pixel.
pub fn write_image_png_gray16(
    file_path: impl AsRef<Path>,
    image: &Image<u16>,
) -> Result<(), IoError> {
    write_png_impl(
        file_path,
        &u16_to_be_bytes(image.as_slice()),
        image.size(),
        BitDepth::Sixteen,
    )
}

/// Writes an 8-bit grayscale mask image.
///
/// # Arguments
///
/// - `file_path` - The path to the PNG image.
/// - `image` - The mask image.
pub fn write_image_png_gray8(
    file_path: impl AsRef<Path>,
    image: &Image<u8>,
) -> Result<(), IoError> {
    write_png_impl(file_path, image.as_slice(), image.size(), BitDepth::Eight)
}

/// Reads a 16-bit grayscale PNG image.
pub fn read_image_png_gray16(file_path: impl AsRef<Path>) -> Result<Image<u16>, IoError> {
    let (buf, size, depth) = read_png_impl(file_path)?;
    if depth != BitDepth::Sixteen {
        return Err(IoError::PngDecodeError(format!(
            "expected a 16-bit image, got {depth:?}"
        )));
    }
    Ok(Image::new(size, be_bytes_to_u16(&buf))?)
}

/// Reads an 8-bit grayscale PNG image.
pub fn read_image_png_gray8(file_path: impl AsRef<Path>) -> Result<Image<u8>, IoError> {
    let (buf, size, depth) = read_png_impl(file_path)?;
    if depth != BitDepth::Eight {
        return Err(IoError::PngDecodeError(format!(
            "expected an 8-bit image, got {depth:?}"
        )));
    }
    Ok(Image::new(size, buf)?)
}

/// Reads only the header of a PNG file and returns the image size.
pub fn read_png_size(file_path: impl AsRef<Path>) -> Result<ImageSize, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }
    let reader = Decoder::new(File::open(file_path)?)
        .read_info()
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;
    let info = reader.info();
    Ok(ImageSize {
        width: info.width as usize,
        height: info.height as usize,
    })
}

// grayscale only, anything else is a decode error
fn read_png_impl(file_path: impl AsRef<Path>) -> Result<(Vec<u8>, ImageSize, BitDepth), IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let file = fs::File::open(file_path)?;
    let mut reader = Decoder::new(file)
        .read_info()
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::PngDecodeError(e.to_string()))?;
    if info.color_type != ColorType::Grayscale {
        return Err(IoError::PngDecodeError(format!(
            "expected a grayscale image, got {:?}",
            info.color_type
        )));
    }
    buf.truncate(info.buffer_size());

    let size = ImageSize {
        width: info.width as usize,
        height: info.height as usize,
    };
    Ok((buf, size, info.bit_depth))
}

fn write_png_impl(
    file_path: impl AsRef<Path>,
    image_data: &[u8],
    image_size: ImageSize,
    depth: BitDepth,
) -> Result<(), IoError> {
    let file = BufWriter::new(File::create(file_path)?);

    let mut encoder = Encoder::new(file, image_size.width as u32, image_size.height as u32);
    encoder.set_color(ColorType::Grayscale);
    encoder.set_depth(depth);

    let mut writer = encoder
        .write_header()
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    writer
        .write_image_data(image_data)
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    writer
        .finish()
        .map_err(|e| IoError::PngEncodingError(e.to_string()))?;
    Ok(())
}
