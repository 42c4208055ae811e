//! Integration tests for the public API.
//!
//! These run the estimators, smoothers and integrators end to end on
//! synthetic scenes with known ground truth.

use nalgebra::{DMatrix, DVector, Vector3};
use photostereo::photometric::ransac_normals_observed;
use photostereo::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lights on a cone of half-opening ~37 degrees, one per entry of
/// `angles_deg` around the viewing axis.
fn cone_lights(angles_deg: &[f64]) -> DMatrix<f64> {
    DMatrix::from_fn(angles_deg.len(), 3, |k, c| {
        let a = angles_deg[k].to_radians();
        [0.6 * a.cos(), 0.6 * a.sin(), 0.8][c]
    })
}

fn light(lights: &DMatrix<f64>, k: usize) -> Vector3<f64> {
    Vector3::new(lights[(k, 0)], lights[(k, 1)], lights[(k, 2)])
}

/// Spherical cap of radius `radius` centred on the grid, restricted to a disk
/// of radius `disk`. Returns normals, mask and true depth.
fn sphere_cap(size: usize, radius: f64, disk: f64) -> (NormalField, Mask, DepthMap) {
    let c = (size as f64 - 1.0) / 2.0;
    let mask = Mask::from_fn(size, size, |r, col| {
        let (dr, dc) = (r as f64 - c, col as f64 - c);
        dr * dr + dc * dc <= disk * disk
    });
    let depth = DepthMap::from_fn(size, size, |r, col| {
        let (dr, dc) = (r as f64 - c, col as f64 - c);
        (radius * radius - dr * dr - dc * dc).max(0.0).sqrt()
    });
    let normals = NormalField::from_fn(size, size, |r, col| {
        if !mask[(r, col)] {
            return Vector3::z();
        }
        let (dr, dc) = (r as f64 - c, col as f64 - c);
        Vector3::new(dc, dr, depth[(r, col)]) / radius
    });
    (normals, mask, depth)
}

/// Root mean square difference over the mask after removing the mean offset.
fn rmse_up_to_constant(z: &DepthMap, truth: &DepthMap, mask: &Mask) -> f64 {
    let diffs: Vec<f64> = z
        .iter()
        .zip(truth.iter())
        .zip(mask.iter())
        .filter(|&(_, &inside)| inside)
        .map(|((a, b), _)| a - b)
        .collect();
    let mean = diffs.iter().sum::<f64>() / diffs.len() as f64;
    (diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / diffs.len() as f64).sqrt()
}

fn wavy_field(rows: usize, cols: usize) -> NormalField {
    NormalField::from_fn(rows, cols, |r, c| {
        Vector3::new(
            0.3 * (0.4 * c as f64).sin(),
            0.2 * (0.3 * r as f64).cos(),
            1.0,
        )
        .normalize()
    })
}

#[test]
fn test_estimate_light_vector_exact_inliers() {
    let lights = cone_lights(&[0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0]);
    let m = Vector3::new(-0.15, 0.25, 0.7);
    let mut intensities = DVector::from_fn(8, |k, _| light(&lights, k).dot(&m));
    intensities[1] -= 0.4;
    intensities[6] += 0.9;

    let data = LightMeasurements::new(intensities, lights).unwrap();
    let settings = RansacSettings {
        confidence: 0.999,
        ..RansacSettings::default()
    };
    let result = estimate_light_vector(&data, 1e-6, Some(settings), 2024).unwrap();

    assert_eq!(result.inliers, vec![0, 2, 3, 4, 5, 7]);
    assert!((result.model.m - m).norm() < 1e-9);
    assert!((result.model.albedo() - m.norm()).abs() < 1e-9);
}

#[test]
fn test_estimate_light_vector_random_lights_with_noise() {
    // 40 random lights, intensities with noise well below the threshold and
    // every fourth measurement shifted far outside it.
    let m_true = Vector3::new(0.2, -0.1, 0.8);
    let expected: Vec<usize> = (0..40).filter(|k| k % 4 != 3).collect();

    for seed in [3u64, 17, 101] {
        let mut rng = StdRng::seed_from_u64(seed);
        let lights = DMatrix::from_fn(40, 3, |_, c| {
            if c < 2 {
                rng.random_range(-0.7..0.7)
            } else {
                rng.random_range(0.3..1.0)
            }
        });
        let intensities = DVector::from_fn(40, |k, _| {
            let noise = rng.random_range(-0.003..0.003);
            let outlier = if k % 4 == 3 {
                let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                sign * rng.random_range(0.2..0.6)
            } else {
                0.0
            };
            light(&lights, k).dot(&m_true) + noise + outlier
        });

        let data = LightMeasurements::new(intensities, lights).unwrap();
        let settings = RansacSettings {
            confidence: 0.9999,
            ..RansacSettings::default()
        };
        let result = estimate_light_vector(&data, 0.01, Some(settings), seed).unwrap();

        assert_eq!(result.inliers, expected, "seed {seed}");
        let error = (result.model.m - m_true).norm();
        assert!(error < 0.01, "seed {seed}: |m - m*| = {error}");
    }
}

#[test]
fn test_estimate_light_vector_coplanar_lights() {
    let lights = DMatrix::from_row_slice(
        4,
        3,
        &[
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            -1.0, 0.0, 0.0, //
            0.7, 0.7, 0.0,
        ],
    );
    let data = LightMeasurements::new(DVector::from_element(4, 0.5), lights).unwrap();

    let err = estimate_light_vector(&data, 0.01, None, 1).unwrap_err();
    assert!(matches!(err, Error::DegenerateSample { .. }));
}

#[test]
fn test_unbiased_recovers_plane() {
    let (a, b) = (0.35, -0.2);
    let field = NormalField::constant(20, 24, Vector3::new(-b, -a, 1.0).normalize());
    // Annulus: connected, with an inner boundary.
    let mask = Mask::from_fn(20, 24, |r, c| {
        let (dr, dc) = (r as f64 - 9.5, c as f64 - 11.5);
        let d2 = dr * dr + dc * dc;
        d2 > 9.0 && d2 < 80.0
    });
    let truth = DepthMap::from_fn(20, 24, |r, c| a * r as f64 + b * c as f64);

    let z = unbiased_integrate(&field, &mask, IntegrationOrder::Second).unwrap();
    assert!(z[(9, 11)].is_nan());
    assert!(rmse_up_to_constant(&z, &truth, &mask) < 1e-5);
}

#[test]
fn test_spectral_and_unbiased_agree_on_rectangle() {
    let (rows, cols) = (12, 15);
    let field = wavy_field(rows, cols);
    let mask = Mask::from_element(rows, cols, true);

    let spectral = spectral_integrate(&field, &mask).unwrap();
    let unbiased = UnbiasedIntegrator::default().integrate(&field, &mask).unwrap();

    assert!(rmse_up_to_constant(&spectral, &unbiased, &mask) < 1e-6);
}

#[test]
fn test_constant_field_is_fixed_point() {
    let n = Vector3::new(0.2, -0.1, 0.9).normalize();
    let field = NormalField::constant(8, 9, n);
    let mask = Mask::from_fn(8, 9, |r, c| r * c % 5 != 1);

    let smoothed = smooth_normal_field(&field, &mask, &SmoothingSettings::default()).unwrap();
    let regularized =
        regularize_normal_field(&field, &field, &mask, &RegularizationSettings::default())
            .unwrap();

    for r in 0..8 {
        for c in 0..9 {
            assert!((smoothed.get(r, c) - n).norm() < 1e-12);
            assert!((regularized.get(r, c) - n).norm() < 1e-12);
        }
    }
}

#[test]
fn test_regularize_without_fidelity_equals_smooth() {
    let field = wavy_field(10, 11);
    let mask = Mask::from_fn(10, 11, |r, c| r + 2 * c > 3);
    let smoother = NormalFieldSmoother::new(&mask);

    let smoothed = smoother
        .smooth(
            &field,
            &SmoothingSettings {
                iterations: 25,
                tau: 0.1,
                exp_eps: 1e-7,
            },
        )
        .unwrap();
    let regularized = smoother
        .regularize(
            &field,
            &field,
            &RegularizationSettings {
                mu: 0.0,
                iterations: 25,
                tau: 0.1,
                ..RegularizationSettings::default()
            },
        )
        .unwrap();

    assert_eq!(smoothed.shape(), regularized.shape());
    for r in 0..10 {
        for c in 0..11 {
            assert!((smoothed.get(r, c) - regularized.get(r, c)).norm() < 1e-12);
        }
    }
}

#[test]
fn test_regularize_toward_clean_reference() {
    let (rows, cols) = (12, 12);
    let clean = wavy_field(rows, cols);
    let noisy = NormalField::from_fn(rows, cols, |r, c| {
        let jitter = ((r * 7 + c * 13) % 5) as f64 / 5.0 - 0.4;
        (clean.get(r, c) + Vector3::new(0.5 * jitter, -0.4 * jitter, 0.0)).normalize()
    });
    let mask = Mask::from_element(rows, cols, true);
    let settings = RegularizationSettings {
        mu: 2.0,
        iterations: 40,
        tau: 0.1,
        ..RegularizationSettings::default()
    };

    let toward_self = regularize_normal_field(&noisy, &noisy, &mask, &settings).unwrap();
    let toward_clean = regularize_normal_field(&noisy, &clean, &mask, &settings).unwrap();

    let error = |f: &NormalField| -> f64 {
        let mut total = 0.0;
        for r in 0..rows {
            for c in 0..cols {
                total += (f.get(r, c) - clean.get(r, c)).norm();
            }
        }
        total
    };
    assert!(error(&toward_clean) < error(&toward_self));
    assert!(error(&toward_clean) < error(&noisy));
}

#[test]
fn test_smoothing_preserves_unit_norm() {
    let field = NormalField::from_fn(16, 16, |r, c| {
        let jitter = ((r * 31 + c * 17) % 11) as f64 / 11.0 - 0.5;
        Vector3::new(0.4 * jitter, -0.3 * jitter, 1.0).normalize()
    });
    let mask = Mask::from_fn(16, 16, |r, c| (r as i32 - 8).abs() + (c as i32 - 8).abs() < 9);
    let mut observer = RecordingObserver::new();

    let out = NormalFieldSmoother::new(&mask)
        .smooth_observed(&field, &SmoothingSettings::default(), &mut observer)
        .unwrap();

    for r in 0..16 {
        for c in 0..16 {
            assert!((out.get(r, c).norm() - 1.0).abs() < 1e-12);
        }
    }
    let energies = observer.events.iter().find_map(|e| match *e {
        Event::SmoothingFinished {
            energy_before,
            energy_after,
        } => Some((energy_before, energy_after)),
        _ => None,
    });
    let (before, after) = energies.unwrap();
    assert!(after < before);
}

#[test]
fn test_spherical_cap_on_disk() {
    let (normals, mask, truth) = sphere_cap(64, 30.0, 20.0);

    let z = unbiased_integrate(&normals, &mask, IntegrationOrder::Second).unwrap();

    assert!(rmse_up_to_constant(&z, &truth, &mask) < 0.05);
    assert!(z[(0, 0)].is_nan());
    assert_eq!(
        z.iter().filter(|v| v.is_finite()).count(),
        mask.iter().filter(|&&b| b).count()
    );
}

#[test]
fn test_hemisphere_on_disk() {
    // Hemisphere of radius 20 over the disk of radius 20: the outermost ring
    // is nearly vertical (n3 down to ~0.06), and the finite-difference fluxes
    // there are far from the true slopes. The error concentrates on that rim.
    let (normals, mask, truth) = sphere_cap(64, 20.0, 20.0);
    assert_eq!(mask.iter().filter(|&&b| b).count(), 1264);

    let mut observer = RecordingObserver::new();
    let z = UnbiasedIntegrator::default()
        .integrate_observed(&normals, &mask, &mut observer)
        .unwrap();

    assert!(!observer
        .events
        .iter()
        .any(|e| matches!(e, Event::DegenerateNormals { .. })));
    assert_eq!(z.iter().filter(|v| v.is_finite()).count(), 1264);
    let rmse = rmse_up_to_constant(&z, &truth, &mask);
    assert!(rmse < 0.4, "hemisphere rmse {rmse}");
}

#[test]
fn test_hemisphere_with_grazing_rim_excluded() {
    let (normals, mask, truth) = sphere_cap(64, 20.0, 20.0);
    let settings = PoissonSettings {
        degenerate_eps: 0.3,
        degenerate_policy: DegeneratePolicy::Exclude,
        ..PoissonSettings::default()
    };
    let mut observer = RecordingObserver::new();

    let z = UnbiasedIntegrator::new(settings)
        .integrate_observed(&normals, &mask, &mut observer)
        .unwrap();

    assert!(observer.events.contains(&Event::DegenerateNormals {
        count: 116,
        pixels: 1264
    }));
    let kept = Mask::from_fn(64, 64, |r, c| z[(r, c)].is_finite());
    assert_eq!(kept.iter().filter(|&&b| b).count(), 1148);
    for r in 0..64 {
        for c in 0..64 {
            if kept[(r, c)] {
                assert!(mask[(r, c)]);
                assert!(normals.get(r, c).z >= 0.3);
            }
        }
    }
    let rmse = rmse_up_to_constant(&z, &truth, &kept);
    assert!(rmse < 0.05, "hemisphere rmse without rim {rmse}");
}

#[test]
fn test_conjugate_gradient_backend_matches_cholesky() {
    let (normals, mask, _) = sphere_cap(32, 16.0, 10.0);
    let iterative = PoissonSettings {
        solver: SolverKind::ConjugateGradient {
            max_iterations: 5000,
            tolerance: 1e-11,
        },
        ..PoissonSettings::default()
    };

    let direct = UnbiasedIntegrator::default().integrate(&normals, &mask).unwrap();
    let cg = UnbiasedIntegrator::new(iterative).integrate(&normals, &mask).unwrap();

    assert!(rmse_up_to_constant(&cg, &direct, &mask) < 1e-6);
}

#[test]
fn test_least_squares_photometric_stereo_is_exact() {
    let (normals, mask, _) = sphere_cap(24, 16.0, 9.0);
    let lights = cone_lights(&[0.0, 120.0, 240.0, 60.0]);
    let albedo = Grid::from_fn(24, 24, |r, c| 0.4 + 0.02 * ((r + c) % 10) as f64);
    let images: Vec<Grid> = (0..lights.nrows())
        .map(|k| {
            let s = light(&lights, k);
            Grid::from_fn(24, 24, |r, c| albedo[(r, c)] * s.dot(&normals.get(r, c)))
        })
        .collect();

    let rec = least_squares_normals(&images, &lights, &mask).unwrap();

    for r in 0..24 {
        for c in 0..24 {
            if mask[(r, c)] {
                assert!((rec.normals.get(r, c) - normals.get(r, c)).norm() < 1e-9);
                assert!((rec.albedo[(r, c)] - albedo[(r, c)]).abs() < 1e-9);
            } else {
                assert_eq!(rec.albedo[(r, c)], 0.0);
            }
        }
    }

    // Reconstructed normals integrate back to the cap.
    let (_, _, truth) = sphere_cap(24, 16.0, 9.0);
    let z = unbiased_integrate(&rec.normals, &mask, IntegrationOrder::Second).unwrap();
    assert!(rmse_up_to_constant(&z, &truth, &mask) < 0.05);
}

#[test]
fn test_ransac_photometric_stereo_ignores_corrupted_image() {
    let (rows, cols) = (5, 6);
    let normals = wavy_field(rows, cols);
    let mask = Mask::from_element(rows, cols, true);
    let lights = cone_lights(&[0.0, 90.0, 180.0, 270.0, 45.0, 135.0]);
    let mut images: Vec<Grid> = (0..lights.nrows())
        .map(|k| {
            let s = light(&lights, k);
            Grid::from_fn(rows, cols, |r, c| s.dot(&normals.get(r, c)))
        })
        .collect();
    images[5].add_scalar_mut(0.3);

    let settings = RansacSettings {
        confidence: 0.999,
        ..RansacSettings::default()
    };
    let mut observer = RecordingObserver::new();
    let robust =
        ransac_normals_observed(&images, &lights, &mask, 1e-6, &settings, 99, &mut observer)
            .unwrap();
    let plain = least_squares_normals(&images, &lights, &mask).unwrap();

    assert_eq!(robust.fallbacks, 0);
    assert!(!observer
        .events
        .iter()
        .any(|e| matches!(e, Event::PixelFallback { .. })));
    assert!(robust.inliers.iter().all(|&count| count == 5));

    let mut plain_error = 0.0f64;
    for r in 0..rows {
        for c in 0..cols {
            let truth = normals.get(r, c);
            assert!((robust.reconstruction.normals.get(r, c) - truth).norm() < 1e-8);
            assert!((robust.reconstruction.albedo[(r, c)] - 1.0).abs() < 1e-8);
            plain_error = plain_error.max((plain.normals.get(r, c) - truth).norm());
        }
    }
    assert!(plain_error > 1e-3);
}

#[test]
fn test_ransac_normals_are_reproducible() {
    let normals = wavy_field(3, 4);
    let mask = Mask::from_element(3, 4, true);
    let lights = cone_lights(&[0.0, 90.0, 180.0, 270.0, 45.0]);
    let images: Vec<Grid> = (0..lights.nrows())
        .map(|k| {
            let s = light(&lights, k);
            Grid::from_fn(3, 4, |r, c| s.dot(&normals.get(r, c)))
        })
        .collect();

    let settings = RansacSettings::default();
    let a = ransac_normals(&images, &lights, &mask, 1e-6, &settings, 5).unwrap();
    let b = ransac_normals(&images, &lights, &mask, 1e-6, &settings, 5).unwrap();
    assert_eq!(a.reconstruction, b.reconstruction);
    assert_eq!(a.inliers, b.inliers);
}

#[test]
fn test_settings_from_partial_json() {
    let smoothing: SmoothingSettings = serde_json::from_str(r#"{ "tau": 0.2 }"#).unwrap();
    assert_eq!(smoothing.iterations, 100);
    assert!((smoothing.tau - 0.2).abs() < 1e-12);

    let regularization: RegularizationSettings =
        serde_json::from_str(r#"{ "mu": 0.5, "iterations": 3 }"#).unwrap();
    assert_eq!(regularization.iterations, 3);
    assert!((regularization.eps - 1e-7).abs() < 1e-20);

    let spectral: SpectralSettings =
        serde_json::from_str(r#"{ "zero_frequency": "NeighborSum" }"#).unwrap();
    assert_eq!(spectral.zero_frequency, ZeroFrequency::NeighborSum);

    let json = serde_json::to_string(&PoissonSettings::default()).unwrap();
    let back: PoissonSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(back, PoissonSettings::default());
}

#[test]
fn test_mismatched_shapes_are_rejected() {
    let field = NormalField::constant(4, 5, Vector3::z());
    let mask = Mask::from_element(5, 4, true);

    assert!(matches!(
        unbiased_integrate(&field, &mask, IntegrationOrder::First),
        Err(Error::ShapeMismatch { .. })
    ));
    assert!(matches!(
        spectral_integrate(&field, &mask),
        Err(Error::ShapeMismatch { .. })
    ));
    assert!(matches!(
        smooth_normal_field(&field, &mask, &SmoothingSettings::default()),
        Err(Error::ShapeMismatch { .. })
    ));
}
