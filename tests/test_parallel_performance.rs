use ndarray::Array2;
use sarsim::core::simulate_rows;
use sarsim::{PixelSpacing, Raster, SimulationConfig, Simulator};
use std::time::Instant;

/// Synthetic city block: rolling terrain with buildings every few pixels
fn synthetic_dsm(rows: usize, cols: usize) -> Raster {
    let data = Array2::from_shape_fn((rows, cols), |(r, c)| {
        let terrain = 50.0 + 10.0 * ((r as f32) * 0.01).sin() + 5.0 * ((c as f32) * 0.02).cos();
        let building = if (r / 8) % 3 == 0 && (c / 6) % 4 == 1 { 15.0 } else { 0.0 };
        terrain + building
    });
    Raster::new(data, PixelSpacing::new(1.0, 1.0), Some(-9999.0))
}

#[test]
fn test_parallel_vs_sequential_performance() {
    let _ = env_logger::builder().is_test(true).try_init();

    let dsm = synthetic_dsm(256, 384);

    println!("\n=== Performance Comparison: Sequential vs Parallel ===");

    let sequential_start = Instant::now();
    let mut sequential = Simulator::with_input(SimulationConfig::default(), dsm.clone())
        .expect("Failed to create simulator");
    let sequential_output = sequential.simulate().expect("Sequential simulation failed").clone();
    let sequential_time = sequential_start.elapsed();
    println!("Sequential: {:.3} seconds", sequential_time.as_secs_f64());

    let config = SimulationConfig {
        workers: 4,
        ..Default::default()
    };
    let parallel_start = Instant::now();
    let mut parallel = Simulator::with_input(config, dsm).expect("Failed to create simulator");
    let parallel_output = parallel.simulate().expect("Parallel simulation failed").clone();
    let parallel_time = parallel_start.elapsed();
    println!("Parallel (4 workers): {:.3} seconds", parallel_time.as_secs_f64());

    let speedup = sequential_time.as_secs_f64() / parallel_time.as_secs_f64().max(1e-9);
    println!("Speedup: {:.2}x", speedup);

    // Row order must survive the parallel map
    assert_eq!(sequential_output, parallel_output);
}

#[test]
fn test_row_results_follow_input_order() {
    let dsm = synthetic_dsm(64, 96);
    let mut simulator = Simulator::with_input(SimulationConfig::default(), dsm)
        .expect("Failed to create simulator");
    simulator.simulate().expect("Simulation failed");
    let params = simulator.params().clone();
    let working = simulator.working().expect("No working raster");

    let rows = simulate_rows(&working.data, &params, 8);
    assert_eq!(rows.len(), 64);
    for (iy, row) in rows.iter().enumerate() {
        let expected = sarsim::core::simulate_row(working.data.row(iy), &params);
        assert_eq!(row, &expected, "row {}", iy);
    }
}
