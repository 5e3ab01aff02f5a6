// In tests/backend_tests.rs

use dense_plu::elimination::{eliminate, EliminationOptions, PivotStrategy};
use dense_plu::linalg_backends::{BackendPlu, BackendProvider, InProcessBackend, NativeBackend, NativePluRoutine};
use dense_plu::{plu, BackendKind, FactorizationError, Factorizer, FactorizerConfig, Result};
use ndarray::{array, Array2, ArrayView2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

fn random_matrix(n: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array2::random_using((n, n), Uniform::new(-5.0, 5.0), &mut rng)
}

/// Packed routine that follows the native calling convention using the crate's own core.
struct PackedReferenceRoutine;

impl NativePluRoutine for PackedReferenceRoutine {
    fn name(&self) -> &'static str {
        "packed-reference"
    }

    fn plu_in_place(&self, n: usize, a: &mut [f64], perm: &mut [usize]) -> Result<()> {
        let matrix = ArrayView2::from_shape((n, n), &*a).map_err(|e| {
            FactorizationError::BackendUnavailable { backend: self.name().into(), reason: e.to_string() }
        })?;
        let output = eliminate(matrix, PivotStrategy::Partial, &EliminationOptions::default())?;
        for i in 0..n {
            for j in 0..n {
                a[i * n + j] = if i > j { output.lower[[i, j]] } else { output.upper[[i, j]] };
            }
            perm[i] = output.permutation[i];
        }
        Ok(())
    }
}

/// Routine that always faults, as a missing or crashing native library would.
struct FaultingRoutine;

impl NativePluRoutine for FaultingRoutine {
    fn name(&self) -> &'static str {
        "faulting"
    }

    fn plu_in_place(&self, _n: usize, _a: &mut [f64], _perm: &mut [usize]) -> Result<()> {
        Err(FactorizationError::BackendUnavailable {
            backend: self.name().into(),
            reason: "shared library could not be loaded".into(),
        })
    }
}

/// Routine that "succeeds" but returns a broken permutation.
struct DuplicatePermutationRoutine;

impl NativePluRoutine for DuplicatePermutationRoutine {
    fn name(&self) -> &'static str {
        "duplicate-perm"
    }

    fn plu_in_place(&self, _n: usize, _a: &mut [f64], perm: &mut [usize]) -> Result<()> {
        perm.fill(0);
        Ok(())
    }
}

/// Routine that leaves the buffers untouched (identity P, packed = A).
struct PassThroughRoutine;

impl NativePluRoutine for PassThroughRoutine {
    fn name(&self) -> &'static str {
        "pass-through"
    }

    fn plu_in_place(&self, _n: usize, _a: &mut [f64], _perm: &mut [usize]) -> Result<()> {
        Ok(())
    }
}

#[test]
fn native_adapter_matches_in_process_backend() {
    let a = random_matrix(9, 17);
    let native = NativeBackend::new(PackedReferenceRoutine).plu(a.view()).unwrap();
    let in_process = InProcessBackend::default().plu(a.view()).unwrap();
    assert_eq!(native.p(), in_process.p());
    assert_eq!(native.l(), in_process.l());
    assert_eq!(native.u(), in_process.u());
}

#[test]
fn native_fault_surfaces_without_fallback() {
    let a = array![[2.0, 1.0], [1.0, 3.0]];
    let err = NativeBackend::new(FaultingRoutine).plu(a.view()).unwrap_err();
    match err {
        FactorizationError::BackendUnavailable { backend, reason } => {
            assert_eq!(backend, "faulting");
            assert!(reason.contains("could not be loaded"));
        }
        other => panic!("expected BackendUnavailable, got {:?}", other),
    }
}

#[test]
fn invalid_native_permutation_is_a_backend_fault() {
    let a = array![[2.0, 1.0], [1.0, 3.0]];
    assert!(matches!(
        NativeBackend::new(DuplicatePermutationRoutine).plu(a.view()),
        Err(FactorizationError::BackendUnavailable { .. })
    ));
}

#[test]
fn zero_native_pivot_is_reported_as_singular() {
    // passing A through unchanged leaves a zero on the "U" diagonal at step 1
    let a = array![[1.0, 2.0], [3.0, 0.0]];
    assert_eq!(
        NativeBackend::new(PassThroughRoutine).plu(a.view()).unwrap_err(),
        FactorizationError::Singular { step: 1 }
    );
}

#[test]
fn native_adapter_applies_configured_pivot_tolerance() {
    let near_singular = array![[1.0, 1.0], [1.0, 1.0 + 1e-14]];
    let strict = EliminationOptions {
        pivot_tolerance: 1e-10,
        warn_on_small_pivot: false,
    };

    assert!(NativeBackend::new(PackedReferenceRoutine).plu(near_singular.view()).is_ok());
    assert_eq!(
        NativeBackend::with_options(PackedReferenceRoutine, strict)
            .plu(near_singular.view())
            .unwrap_err(),
        FactorizationError::Singular { step: 1 }
    );
    assert_eq!(
        InProcessBackend::new(strict).plu(near_singular.view()).unwrap_err(),
        FactorizationError::Singular { step: 1 }
    );
}

#[cfg(feature = "backend_faer")]
#[test]
fn faer_backend_honours_pivot_tolerance() {
    let near_singular = array![[1.0, 1.0], [1.0, 1.0 + 1e-14]];
    let config = FactorizerConfig::default()
        .with_backend(BackendKind::Faer)
        .with_pivot_tolerance(1e-10);
    assert_eq!(
        Factorizer::new(config).plu(&near_singular).unwrap_err(),
        FactorizationError::Singular { step: 1 }
    );
}

#[test]
fn native_adapter_checks_shape_before_calling_routine() {
    let rect = Array2::<f64>::zeros((2, 3));
    assert_eq!(
        NativeBackend::new(FaultingRoutine).plu(rect.view()).unwrap_err(),
        FactorizationError::NotSquare { rows: 2, cols: 3 }
    );
}

#[cfg(not(feature = "backend_lapack"))]
#[test]
fn lapack_backend_missing_from_build_is_unavailable() {
    assert!(!BackendKind::Lapack.is_available());
    let factorizer = Factorizer::new(FactorizerConfig::default().with_backend(BackendKind::Lapack));
    let err = factorizer.plu(&array![[1.0]]).unwrap_err();
    assert!(matches!(err, FactorizationError::BackendUnavailable { ref backend, .. } if backend == "lapack"));
}

#[cfg(not(feature = "backend_faer"))]
#[test]
fn faer_backend_missing_from_build_is_unavailable() {
    assert!(!BackendKind::Faer.is_available());
    let provider = BackendProvider::new(BackendKind::Faer, EliminationOptions::default());
    assert!(matches!(
        provider.plu(array![[1.0]].view()),
        Err(FactorizationError::BackendUnavailable { .. })
    ));
}

#[test]
fn lu_ignores_native_backend_selection() {
    let factorizer = Factorizer::new(FactorizerConfig::default().with_backend(BackendKind::Faer));
    let a = array![[4.0, 1.0], [2.0, 3.0]];
    assert!(factorizer.lu(&a).is_ok());
}

#[cfg(feature = "backend_lapack")]
#[test]
fn lapack_backend_matches_in_process_factors() {
    let a = random_matrix(10, 3);
    let factorizer = Factorizer::new(FactorizerConfig::default().with_backend(BackendKind::Lapack));
    let native = factorizer.plu(&a).unwrap();
    let reference = plu(&a).unwrap();
    assert_eq!(native.p(), reference.p());
    assert!(native.reconstructs(a.view(), 1e-9));
    assert_eq!(
        factorizer.plu(&array![[2.0, 0.0], [0.0, 0.0]]).unwrap_err(),
        FactorizationError::Singular { step: 1 }
    );
    let zero_row = array![[1.0, 2.0, 3.0], [0.0, 0.0, 0.0], [4.0, 5.0, 6.0]];
    assert_eq!(factorizer.plu(&zero_row).unwrap_err(), plu(&zero_row).unwrap_err());
}

#[cfg(feature = "backend_faer")]
#[test]
fn faer_backend_matches_in_process_factors() {
    let a = random_matrix(10, 4);
    let factorizer = Factorizer::new(FactorizerConfig::default().with_backend(BackendKind::Faer));
    let native = factorizer.plu(&a).unwrap();
    let reference = plu(&a).unwrap();
    assert_eq!(native.p(), reference.p());
    assert!(native.reconstructs(a.view(), 1e-9));
    assert_eq!(
        factorizer.plu(&array![[2.0, 0.0], [0.0, 0.0]]).unwrap_err(),
        FactorizationError::Singular { step: 1 }
    );
    let zero_row = array![[1.0, 2.0, 3.0], [0.0, 0.0, 0.0], [4.0, 5.0, 6.0]];
    assert_eq!(factorizer.plu(&zero_row).unwrap_err(), plu(&zero_row).unwrap_err());
}

#[test]
fn concurrent_callers_share_one_factorizer() {
    let factorizer = Factorizer::default();
    let matrices: Vec<Array2<f64>> = (0..32).map(|seed| random_matrix(8, seed)).collect();

    let parallel: Vec<_> = matrices
        .par_iter()
        .map(|a| factorizer.plu(a).unwrap())
        .collect();

    for (a, decomposition) in matrices.iter().zip(parallel.iter()) {
        let sequential = plu(a).unwrap();
        assert_eq!(&sequential, decomposition);
        assert!(decomposition.reconstructs(a.view(), 1e-9));
    }
}
