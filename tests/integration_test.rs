//! End-to-end runs driven by the YAML files under demos/

use fem_scf::app::{load_config_file, run_pipeline};
use fem_scf::io::save_bundle;
use std::fs;
use std::path::PathBuf;

fn demo_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(filename)
}

#[test]
fn test_demo_chain_converges() {
    let config = load_config_file(demo_path("chain.yaml")).unwrap();
    let run = run_pipeline(&config).unwrap();

    assert!(run.outcome.residual_norm < 1e-6);
    assert!(run.outcome.record.calls <= 50);

    let eigs = &run.bundle.eigenvalues;
    assert_eq!(eigs.len(), 8);
    assert!(eigs.windows(2).all(|w| w[0] <= w[1]));

    let names: Vec<&str> = run.bundle.fields().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["phi000", "phi001", "phi002", "phi003", "phi007", "nr2", "vh", "vxc"]
    );
    // 101 nodes including both Dirichlet ends.
    assert!(run.bundle.fields().all(|f| f.values.len() == 101));
    assert!(run.outcome.observables.density.iter().all(|&x| x >= 0.0));
}

#[test]
fn test_noninteracting_well_matches_oscillator_levels() {
    let mut config = load_config_file(demo_path("chain.yaml")).unwrap();
    config.potential.hartree = Some("none".to_string());
    config.potential.xc = Some("none".to_string());
    config.scf_params.n_eigs = Some(4);

    let run = run_pipeline(&config).unwrap();
    // F is constant, so the very first evaluation is already the fixed point.
    assert_eq!(run.outcome.record.calls, 1);
    for (n, level) in run.bundle.eigenvalues.iter().enumerate() {
        let exact = n as f64 + 0.5;
        assert!((level - exact).abs() < 2e-2, "level {n}: {level} vs {exact}");
    }
}

#[test]
fn test_result_files_are_written() {
    let config = load_config_file(demo_path("chain.yaml")).unwrap();
    let run = run_pipeline(&config).unwrap();

    let dir = std::env::temp_dir().join(format!("fem_scf_it_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let trunk = dir.join("chain");
    let (table, eigs) = save_bundle(trunk.to_str().unwrap(), &run.bundle).unwrap();

    let eig_text = fs::read_to_string(&eigs).unwrap();
    assert_eq!(eig_text.lines().count(), 1);
    let parsed: Vec<f64> = eig_text.split_whitespace().map(|s| s.parse().unwrap()).collect();
    assert_eq!(parsed, run.bundle.eigenvalues);

    let table_text = fs::read_to_string(&table).unwrap();
    assert!(table_text.starts_with("# x phi000"));
    assert_eq!(table_text.lines().count(), 102);

    fs::remove_dir_all(&dir).unwrap();
}
