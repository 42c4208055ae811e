//! Per-pixel photometric stereo: albedo and normal from an image stack lit
//! by known, distant light sources.
//!
//! Under the Lambertian model each pixel satisfies `I_k = S_k . m`, with
//! `m = albedo * n`. [`least_squares_normals`] solves that system in the
//! least-squares sense at every mask pixel; [`ransac_normals`] fits it
//! robustly so shadows and specular highlights drop out as outliers.

use log::{debug, warn};
use nalgebra::{DMatrix, DVector, Vector3};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::api::estimate_light_vector_with_rng;
use crate::error::{Error, Result};
use crate::models::ScaledNormal;
use crate::observer::{Event, LogObserver, Observer};
use crate::settings::RansacSettings;
use crate::types::{ensure_shape, Grid, LightMeasurements, Mask, NormalField};

/// Normals and albedo over the image grid. Outside the mask the normal is
/// `(0, 0, 1)` and the albedo `0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub normals: NormalField,
    pub albedo: Grid,
}

#[derive(Debug, Clone)]
pub struct RansacReconstruction {
    pub reconstruction: Reconstruction,
    /// Consensus size per pixel; `0` outside the mask and at fallback pixels.
    pub inliers: DMatrix<usize>,
    /// Mask pixels where the robust fit found no solution and the
    /// least-squares estimate was used instead.
    pub fallbacks: usize,
}

/// Least-squares albedo and normals.
///
/// `images` holds `K >= 3` grids of the mask shape and `lights` is the
/// `K x 3` matrix of light vectors, row `k` lighting image `k`.
pub fn least_squares_normals(
    images: &[Grid],
    lights: &DMatrix<f64>,
    mask: &Mask,
) -> Result<Reconstruction> {
    check_inputs(images, lights, mask)?;
    let pinv = lights
        .clone()
        .pseudo_inverse(1e-12)
        .map_err(|e| Error::InvalidMeasurements(e.to_string()))?;

    let (m, n) = mask.shape();
    let mut out = flat_reconstruction(m, n);
    for j in 0..n {
        for i in 0..m {
            if mask[(i, j)] {
                let model = least_squares_model(&pinv, &pixel_intensities(images, i, j));
                store(&mut out, i, j, &model);
            }
        }
    }
    Ok(out)
}

/// Robust albedo and normals, one RANSAC fit per mask pixel.
///
/// All pixels draw from one generator seeded with `seed`, visited in
/// column-major order, so a call is reproducible.
pub fn ransac_normals(
    images: &[Grid],
    lights: &DMatrix<f64>,
    mask: &Mask,
    threshold: f64,
    settings: &RansacSettings,
    seed: u64,
) -> Result<RansacReconstruction> {
    ransac_normals_observed(images, lights, mask, threshold, settings, seed, &mut LogObserver)
}

#[allow(clippy::too_many_arguments)]
pub fn ransac_normals_observed(
    images: &[Grid],
    lights: &DMatrix<f64>,
    mask: &Mask,
    threshold: f64,
    settings: &RansacSettings,
    seed: u64,
    observer: &mut dyn Observer,
) -> Result<RansacReconstruction> {
    check_inputs(images, lights, mask)?;
    let pinv = lights
        .clone()
        .pseudo_inverse(1e-12)
        .map_err(|e| Error::InvalidMeasurements(e.to_string()))?;

    let (m, n) = mask.shape();
    let mut out = flat_reconstruction(m, n);
    let mut inliers = DMatrix::<usize>::zeros(m, n);
    let mut fallbacks = 0;
    let mut pixels = 0;
    let mut rng = StdRng::seed_from_u64(seed);

    for j in 0..n {
        for i in 0..m {
            if !mask[(i, j)] {
                continue;
            }
            pixels += 1;
            let intensities = pixel_intensities(images, i, j);
            let measurements = LightMeasurements::new(intensities.clone(), lights.clone())?;

            match estimate_light_vector_with_rng(
                &measurements,
                threshold,
                settings,
                &mut rng,
                observer,
            ) {
                Ok(result) => {
                    inliers[(i, j)] = result.inliers.len();
                    store(&mut out, i, j, &result.model);
                }
                Err(e) if e.is_no_solution() => {
                    fallbacks += 1;
                    observer.notify(&Event::PixelFallback { row: i, col: j });
                    store(&mut out, i, j, &least_squares_model(&pinv, &intensities));
                }
                Err(e) => return Err(e),
            }
        }
    }

    if fallbacks > 0 {
        warn!("{fallbacks} of {pixels} pixels fell back to least-squares normals");
    } else {
        debug!("robust normals estimated at {pixels} pixels");
    }

    Ok(RansacReconstruction {
        reconstruction: out,
        inliers,
        fallbacks,
    })
}

fn check_inputs(images: &[Grid], lights: &DMatrix<f64>, mask: &Mask) -> Result<()> {
    if lights.ncols() != 3 {
        return Err(Error::InvalidMeasurements(format!(
            "light matrix must have 3 columns, got {}",
            lights.ncols()
        )));
    }
    if images.len() != lights.nrows() {
        return Err(Error::InvalidMeasurements(format!(
            "{} images for {} light vectors",
            images.len(),
            lights.nrows()
        )));
    }
    if images.len() < 3 {
        return Err(Error::InvalidMeasurements(format!(
            "at least 3 images are needed, got {}",
            images.len()
        )));
    }
    for image in images {
        ensure_shape("image", mask.shape(), image.shape())?;
    }

    let sv = lights.clone().svd(false, false).singular_values;
    let largest = sv.max();
    if sv.min() <= 1e-12 * largest.max(1.0) {
        return Err(Error::InvalidMeasurements(
            "light vectors do not span three dimensions".into(),
        ));
    }
    Ok(())
}

fn pixel_intensities(images: &[Grid], row: usize, col: usize) -> DVector<f64> {
    DVector::from_iterator(images.len(), images.iter().map(|img| img[(row, col)]))
}

fn least_squares_model(pinv: &DMatrix<f64>, intensities: &DVector<f64>) -> ScaledNormal {
    let m = pinv * intensities;
    ScaledNormal::new(Vector3::new(m[0], m[1], m[2]))
}

fn flat_reconstruction(rows: usize, cols: usize) -> Reconstruction {
    Reconstruction {
        normals: NormalField::constant(rows, cols, Vector3::z()),
        albedo: Grid::zeros(rows, cols),
    }
}

fn store(out: &mut Reconstruction, row: usize, col: usize, model: &ScaledNormal) {
    // A vanishing m carries no orientation; keep the flat default there.
    if let Some(normal) = model.normal() {
        out.normals.set(row, col, normal);
        out.albedo[(row, col)] = model.albedo();
    }
}
