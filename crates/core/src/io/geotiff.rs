//! Single-band GeoTIFF I/O built on the `tiff` crate
//!
//! Rasters are written as 32-bit float with the ModelPixelScale and
//! ModelTiepoint tags carrying the geotransform. NaN survives the round
//! trip, so masks and sparse composites keep their absent pixels.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};

/// Read a single-band GeoTIFF into a raster.
///
/// Pixel values are cast to `T`; values that do not fit become `T`'s
/// default nodata. Files without georeferencing tags load with the
/// identity transform.
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let mut decoder =
        Decoder::new(file).map_err(|e| Error::Other(format!("TIFF decode error: {e}")))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("cannot read TIFF dimensions: {e}")))?;
    let (rows, cols) = (height as usize, width as usize);

    let image = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("cannot read TIFF data: {e}")))?;

    macro_rules! cast_buf {
        ($buf:expr) => {
            $buf.iter()
                .map(|&v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
                .collect()
        };
    }

    let data: Vec<T> = match image {
        DecodingResult::F32(buf) => cast_buf!(buf),
        DecodingResult::F64(buf) => cast_buf!(buf),
        DecodingResult::U8(buf) => cast_buf!(buf),
        DecodingResult::U16(buf) => cast_buf!(buf),
        DecodingResult::U32(buf) => cast_buf!(buf),
        DecodingResult::I16(buf) => cast_buf!(buf),
        DecodingResult::I32(buf) => cast_buf!(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF pixel format".into(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;
    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    Ok(raster)
}

fn read_geotransform(decoder: &mut Decoder<File>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint is [I, J, K, X, Y, Z]; anchor the origin at pixel (0, 0)
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Write a raster to a single-band GeoTIFF as 32-bit float.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder =
        TiffEncoder::new(file).map_err(|e| Error::Other(format!("TIFF encoder error: {e}")))?;

    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("cannot create TIFF image: {e}")))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    // GTModelTypeGeoKey=1 (projected), GTRasterTypeGeoKey=1 (pixel-is-area)
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];

    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(|e| Error::Other(format!("cannot write scale tag: {e}")))?;
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(|e| Error::Other(format!("cannot write tiepoint tag: {e}")))?;
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])
        .map_err(|e| Error::Other(format!("cannot write geokey tag: {e}")))?;

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("cannot write TIFF data: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_preserves_values_and_transform() {
        let dir = std::env::temp_dir().join("wastelens_io_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("roundtrip.tif");

        let mut raster: Raster<f64> = Raster::new(4, 3);
        raster.set(0, 0, 1.5).unwrap();
        raster.set(2, 1, -2.25).unwrap();
        raster.set(3, 2, f64::NAN).unwrap();
        raster.set_transform(GeoTransform::new(500.0, 1200.0, 10.0, -10.0));

        write_geotiff(&raster, &path).unwrap();
        let back: Raster<f64> = read_geotiff(&path).unwrap();

        assert_eq!(back.shape(), (4, 3));
        assert_eq!(back.get(0, 0).unwrap(), 1.5);
        assert_eq!(back.get(2, 1).unwrap(), -2.25);
        assert!(back.get(3, 2).unwrap().is_nan());
        assert_eq!(back.transform(), raster.transform());

        std::fs::remove_file(&path).ok();
    }
}
