use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use flate2::read::GzDecoder;
use log::info;
use ndarray::{Array1, Array4};

use crate::error::{LoadErr, Result};

pub const IMAGES_MAGIC: u32 = 0x0000_0803;
pub const LABELS_MAGIC: u32 = 0x0000_0801;

const IMAGES_HEADER_LEN: usize = 16;
const LABELS_HEADER_LEN: usize = 8;

/// The layout of the images of a dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetShape {
    /// Height and width of the square images.
    pub image_size: usize,
    pub num_channels: usize,
    /// Maximum pixel value.
    pub pixel_depth: f32,
}

/// Reads the first `num_images` images of a gzip compressed IDX file.
///
/// # Arguments
/// * `path` - The `.gz` file.
/// * `num_images` - How many images to read, the file may hold more.
/// * `shape` - The expected layout of each image.
///
/// # Returns
/// A `(num_images, image_size, image_size, num_channels)` tensor with every pixel mapped to
/// `(b - depth / 2) / depth`.
pub fn read_images<P: AsRef<Path>>(
    path: P,
    num_images: usize,
    shape: &DatasetShape,
) -> Result<Array4<f32>> {
    let path = path.as_ref();
    info!("reading {num_images} images from {}", path.display());

    let file = File::open(path)?;
    decode_images(GzDecoder::new(BufReader::new(file)), num_images, shape)
}

/// Reads the first `num_images` labels of a gzip compressed IDX file.
pub fn read_labels<P: AsRef<Path>>(path: P, num_images: usize) -> Result<Array1<i64>> {
    let path = path.as_ref();
    info!("reading {num_images} labels from {}", path.display());

    let file = File::open(path)?;
    decode_labels(GzDecoder::new(BufReader::new(file)), num_images)
}

/// Decodes an uncompressed IDX image stream, see [`read_images`].
pub fn decode_images<R: Read>(
    mut reader: R,
    num_images: usize,
    shape: &DatasetShape,
) -> Result<Array4<f32>> {
    let mut header = [0; IMAGES_HEADER_LEN];
    read_full(&mut reader, &mut header, "image header")?;

    check_magic("image file", &header, IMAGES_MAGIC)?;
    check_field("image count", be_u32(&header, 4), num_images, |got, n| got >= n)?;
    check_field("image rows", be_u32(&header, 8), shape.image_size, |got, n| got == n)?;
    check_field("image columns", be_u32(&header, 12), shape.image_size, |got, n| got == n)?;

    let size = shape.image_size;
    let mut data = vec![0; num_images * size * size * shape.num_channels];
    read_full(&mut reader, &mut data, "image data")?;

    let depth = shape.pixel_depth;
    let pixels: Vec<f32> = data
        .into_iter()
        .map(|b| (b as f32 - depth / 2.0) / depth)
        .collect();

    let images =
        Array4::from_shape_vec((num_images, size, size, shape.num_channels), pixels)?;
    Ok(images)
}

/// Decodes an uncompressed IDX label stream, see [`read_labels`].
pub fn decode_labels<R: Read>(mut reader: R, num_images: usize) -> Result<Array1<i64>> {
    let mut header = [0; LABELS_HEADER_LEN];
    read_full(&mut reader, &mut header, "label header")?;

    check_magic("label file", &header, LABELS_MAGIC)?;
    check_field("label count", be_u32(&header, 4), num_images, |got, n| got >= n)?;

    let mut data = vec![0; num_images];
    read_full(&mut reader, &mut data, "label data")?;

    Ok(data.into_iter().map(i64::from).collect())
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8], what: &'static str) -> Result<()> {
    let expected = buf.len();
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => LoadErr::Truncated { what, expected },
        _ => LoadErr::Io(e),
    })
}

fn be_u32(header: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
}

fn check_magic(what: &'static str, header: &[u8], expected: u32) -> Result<()> {
    let got = be_u32(header, 0);
    if got != expected {
        return Err(LoadErr::BadMagic {
            what,
            got,
            expected,
        });
    }

    Ok(())
}

fn check_field<F>(what: &'static str, got: u32, expected: usize, ok: F) -> Result<()>
where
    F: Fn(usize, usize) -> bool,
{
    let got = got as usize;
    if !ok(got, expected) {
        return Err(LoadErr::Header {
            what,
            got,
            expected,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPE: DatasetShape = DatasetShape {
        image_size: 2,
        num_channels: 1,
        pixel_depth: 255.0,
    };

    fn images_file(magic: u32, count: u32, size: u32, pixels: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        for field in [magic, count, size, size] {
            buf.extend_from_slice(&field.to_be_bytes());
        }
        buf.extend_from_slice(pixels);
        buf
    }

    fn labels_file(magic: u32, count: u32, labels: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&magic.to_be_bytes());
        buf.extend_from_slice(&count.to_be_bytes());
        buf.extend_from_slice(labels);
        buf
    }

    #[test]
    fn decodes_and_normalizes_images() {
        let buf = images_file(IMAGES_MAGIC, 2, 2, &[0, 255, 51, 102, 255, 255, 255, 255]);
        let images = decode_images(buf.as_slice(), 2, &SHAPE).unwrap();

        assert_eq!(images.dim(), (2, 2, 2, 1));
        assert_eq!(images[[0, 0, 0, 0]], -0.5);
        assert_eq!(images[[0, 0, 1, 0]], 0.5);
        assert!((images[[0, 1, 0, 0]] - (51.0 - 127.5) / 255.0).abs() < 1e-6);
        assert!(images.slice(ndarray::s![1, .., .., ..]).iter().all(|&v| v == 0.5));
    }

    #[test]
    fn reads_a_prefix_of_the_dataset() {
        let buf = images_file(IMAGES_MAGIC, 3, 2, &[255; 12]);
        let images = decode_images(buf.as_slice(), 1, &SHAPE).unwrap();
        assert_eq!(images.dim(), (1, 2, 2, 1));

        let buf = labels_file(LABELS_MAGIC, 4, &[7, 2, 1, 0]);
        let labels = decode_labels(buf.as_slice(), 3).unwrap();
        assert_eq!(labels.to_vec(), vec![7, 2, 1]);
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = images_file(LABELS_MAGIC, 1, 2, &[0; 4]);
        assert!(matches!(
            decode_images(buf.as_slice(), 1, &SHAPE),
            Err(LoadErr::BadMagic {
                got: LABELS_MAGIC,
                expected: IMAGES_MAGIC,
                ..
            })
        ));

        let buf = labels_file(IMAGES_MAGIC, 1, &[0]);
        assert!(matches!(
            decode_labels(buf.as_slice(), 1),
            Err(LoadErr::BadMagic { .. })
        ));
    }

    #[test]
    fn rejects_header_mismatch() {
        let buf = images_file(IMAGES_MAGIC, 1, 2, &[0; 8]);
        assert!(matches!(
            decode_images(buf.as_slice(), 2, &SHAPE),
            Err(LoadErr::Header {
                what: "image count",
                got: 1,
                expected: 2,
            })
        ));

        let buf = images_file(IMAGES_MAGIC, 1, 3, &[0; 9]);
        assert!(matches!(
            decode_images(buf.as_slice(), 1, &SHAPE),
            Err(LoadErr::Header {
                what: "image rows",
                ..
            })
        ));
    }

    #[test]
    fn rejects_truncated_input() {
        let buf = images_file(IMAGES_MAGIC, 2, 2, &[0; 5]);
        assert!(matches!(
            decode_images(buf.as_slice(), 2, &SHAPE),
            Err(LoadErr::Truncated {
                what: "image data",
                expected: 8,
            })
        ));

        assert!(matches!(
            decode_labels(&[0u8, 0, 8][..], 1),
            Err(LoadErr::Truncated {
                what: "label header",
                ..
            })
        ));

        let buf = labels_file(LABELS_MAGIC, 3, &[1, 2]);
        assert!(matches!(
            decode_labels(buf.as_slice(), 3),
            Err(LoadErr::Truncated { .. })
        ));
    }
}
