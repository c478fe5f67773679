use crate::types::{PixelSpacing, Raster, RasterValue, SimError, SimResult};
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::Path;

/// Single-band Float32 GeoTIFF reader/writer
pub struct RasterFile;

impl RasterFile {
    /// Read band 1 of a raster as heights. `no_data` is the sentinel used
    /// for missing samples, whatever the file itself declares.
    pub fn read<P: AsRef<Path>>(path: P, no_data: RasterValue) -> SimResult<Raster> {
        log::info!("Reading raster from: {}", path.as_ref().display());

        let dataset = Dataset::open(path.as_ref())?;
        let geo_transform = dataset.geo_transform()?;
        let (width, height) = dataset.raster_size();

        log::debug!("Raster size: {}x{}", width, height);
        log::debug!("Raster geotransform: {:?}", geo_transform);

        let pixel_spacing = PixelSpacing::new(geo_transform[5].abs(), geo_transform[1]);
        if !(pixel_spacing.row.is_finite()
            && pixel_spacing.col.is_finite()
            && pixel_spacing.row > 0.0
            && pixel_spacing.col > 0.0)
        {
            return Err(SimError::InvalidRaster(format!(
                "Invalid pixel spacing {:?} in {}",
                pixel_spacing,
                path.as_ref().display()
            )));
        }

        let rasterband = dataset.rasterband(1)?;
        if let Some(declared) = rasterband.no_data_value() {
            if declared as RasterValue != no_data {
                log::debug!(
                    "File declares no-data value {}, using {} instead",
                    declared,
                    no_data
                );
            }
        }
        let band_data = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

        let data = Array2::from_shape_vec((height, width), band_data.data)
            .map_err(|e| SimError::InvalidRaster(format!("Failed to reshape raster data: {}", e)))?;

        Ok(Raster::new(data, pixel_spacing, Some(no_data)))
    }

    /// Write a raster as a single-band Float32 GeoTIFF
    pub fn write<P: AsRef<Path>>(path: P, raster: &Raster) -> SimResult<()> {
        log::info!("Writing raster to: {}", path.as_ref().display());

        let (height, width) = raster.dim();
        if height == 0 || width == 0 {
            return Err(SimError::InvalidRaster(format!(
                "Cannot write a {}x{} raster",
                height, width
            )));
        }

        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut dataset = driver.create_with_band_type::<f32, _>(
            path.as_ref(),
            width as isize,
            height as isize,
            1,
        )?;

        // Slant-range products carry only a nominal frame
        dataset.set_geo_transform(&[
            0.0,
            raster.pixel_spacing.col,
            0.0,
            height as f64,
            0.0,
            -raster.pixel_spacing.row,
        ])?;

        let mut rasterband = dataset.rasterband(1)?;
        let flat_data: Vec<f32> = raster.data.iter().cloned().collect();
        let buffer = gdal::raster::Buffer::new((width, height), flat_data);
        rasterband.write((0, 0), (width, height), &buffer)?;

        if let Some(no_data) = raster.no_data {
            rasterband.set_no_data_value(Some(no_data as f64))?;
        }

        log::debug!("Raster written: {}x{}", width, height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    #[test]
    fn test_write_rejects_empty_raster() {
        let dir = tempfile::tempdir().unwrap();
        let raster = Raster::new(Array2::zeros((0, 4)), PixelSpacing::new(1.0, 1.0), None);
        let err = RasterFile::write(dir.path().join("empty.tif"), &raster).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let err = RasterFile::read("/nonexistent/dem.tif", -9999.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
