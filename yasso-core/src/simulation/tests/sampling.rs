use super::{acid_litter, builder};
use crate::climate::YearlyClimate;
use crate::config::{ClimateInput, DurationUnit, LitterInput, RunSettings};
use crate::example_kernels::LinearKernel;
use crate::litter::{LitterComponent, TimedLitterComponent};
use crate::FloatValue;
use approx::assert_relative_eq;
use std::ops::ControlFlow;

fn uncertain_litter() -> LitterComponent {
    LitterComponent {
        mass_std: 20.0,
        acid: 60.0,
        acid_std: 10.0,
        water: 40.0,
        ..acid_litter(100.0, 0.0)
    }
}

fn settings(sample_size: usize, simulation_length: usize, seed: Option<u64>) -> RunSettings {
    RunSettings {
        sample_size,
        simulation_length,
        parameter_columns: 5,
        seed,
        ..Default::default()
    }
}

/// Litter input of each step recovered from the stock of a [`LinearKernel`] run
fn inputs(output: &crate::simulation::SimulationOutput, sample: usize, steps: usize) -> Vec<FloatValue> {
    (0..steps)
        .map(|t| {
            let start = output.raw.stock.get(sample, t).unwrap().total_organic_matter;
            let end = output.raw.stock.get(sample, t + 1).unwrap().total_organic_matter;
            (end - 0.9 * start) / 0.5
        })
        .collect()
}

#[test]
fn maximum_likelihood_is_deterministic() {
    let mut builder = builder();
    builder
        .with_settings(settings(1, 4, None))
        .with_litter(LitterInput::Constant {
            components: vec![uncertain_litter()],
        });
    let simulation = builder.build(LinearKernel::default()).unwrap();

    // Unseeded runs still agree on the maximum-likelihood pass
    let first = simulation.run().unwrap();
    let second = simulation.run().unwrap();
    assert_eq!(first.raw.stock.to_array(), second.raw.stock.to_array());
    assert_eq!(first.raw.co2.to_array(), second.raw.co2.to_array());
    assert_relative_eq!(inputs(&first, 0, 1)[0], 100.0, epsilon = 1e-9);
}

#[test]
fn seeded_runs_are_reproducible() {
    let mut builder = builder();
    builder
        .with_settings(settings(20, 3, Some(42)))
        .with_litter(LitterInput::Constant {
            components: vec![uncertain_litter()],
        });
    let simulation = builder.build(LinearKernel::default()).unwrap();

    let first = simulation.run().unwrap();
    let second = simulation.run().unwrap();
    assert_eq!(first.raw.stock.to_array(), second.raw.stock.to_array());
    assert_eq!(first.raw.change.to_array(), second.raw.change.to_array());
}

#[test]
fn constant_litter_draw_is_replayed() {
    let mut builder = builder();
    builder
        .with_settings(settings(10, 4, Some(7)))
        .with_litter(LitterInput::Constant {
            components: vec![uncertain_litter()],
        });
    let output = builder.build(LinearKernel::default()).unwrap().run().unwrap();

    let mut first_inputs = vec![];
    for sample in 0..10 {
        let inputs = inputs(&output, sample, 4);
        for input in &inputs {
            assert_relative_eq!(*input, inputs[0], epsilon = 1e-6);
        }
        first_inputs.push(inputs[0]);
    }

    // Samples after the maximum-likelihood pass draw their own litter
    assert_relative_eq!(first_inputs[0], 100.0, epsilon = 1e-9);
    assert!(first_inputs[1..]
        .iter()
        .any(|input| (input - 100.0).abs() > 1e-6));
}

#[test]
fn timeseries_litter_is_redrawn() {
    let records = (1..=4)
        .map(|year| TimedLitterComponent::new(year, uncertain_litter()))
        .collect();
    let mut builder = builder();
    builder
        .with_settings(settings(3, 4, Some(11)))
        .with_litter(LitterInput::Yearly { records });
    let output = builder.build(LinearKernel::default()).unwrap().run().unwrap();

    let ml = inputs(&output, 0, 4);
    for input in &ml {
        assert_relative_eq!(*input, 100.0, epsilon = 1e-9);
    }

    let drawn = inputs(&output, 1, 4);
    assert!(drawn.iter().any(|input| (input - drawn[0]).abs() > 1e-6));
}

#[test]
fn litter_arriving_late_keeps_every_time_point() {
    let records = (2..=4)
        .map(|year| TimedLitterComponent::new(year, acid_litter(100.0, 0.0)))
        .collect();
    let mut builder = builder();
    builder
        .with_settings(settings(1, 4, Some(4)))
        .with_litter(LitterInput::Yearly { records });
    let output = builder.build(LinearKernel::default()).unwrap().run().unwrap();
    let raw = &output.raw;

    assert_eq!(raw.stock.len(), 5);
    assert_eq!(raw.change.len(), 4);
    assert_eq!(raw.co2.len(), 4);
    for t in 0..=1 {
        assert_eq!(raw.stock.get(0, t).unwrap().total_organic_matter, 0.0);
    }
    assert_eq!(raw.co2.rows()[0].co2, 0.0);

    let delivered = inputs(&output, 0, 4);
    assert_relative_eq!(delivered[0], 0.0);
    for input in &delivered[1..] {
        assert_relative_eq!(*input, 100.0, epsilon = 1e-9);
    }
}

#[test]
fn parameters_are_drawn_per_sample() {
    let kernel = |parameters: &[FloatValue],
                  _: FloatValue,
                  _: [FloatValue; 3],
                  _: [FloatValue; 5],
                  _: [FloatValue; 5],
                  _: FloatValue| [parameters[0], 0.0, 0.0, 0.0, 0.0];

    let mut builder = builder();
    builder.with_settings(settings(30, 3, Some(5)));
    let output = builder.build(kernel).unwrap().run().unwrap();

    let used = |sample: usize, t: usize| output.raw.stock.get(sample, t).unwrap().masses.acid;
    assert_relative_eq!(used(0, 1), 0.1);

    let mut rows = vec![];
    for sample in 1..30 {
        // The draw is kept for the whole sample
        assert_eq!(used(sample, 1), used(sample, 2));
        assert_eq!(used(sample, 1), used(sample, 3));
        rows.push(used(sample, 1));
    }
    assert!(rows.iter().any(|p| (p - 0.1).abs() > 1e-9));
}

#[test]
fn yearly_climate_rotates_across_samples() {
    let kernel = |_: &[FloatValue],
                  _: FloatValue,
                  climate: [FloatValue; 3],
                  _: [FloatValue; 5],
                  _: [FloatValue; 5],
                  _: FloatValue| [climate[0], 0.0, 0.0, 0.0, 0.0];
    let years = (0..3)
        .map(|i| YearlyClimate {
            timestep: i + 1,
            mean_temperature: i as FloatValue,
            annual_rainfall: 500.0,
            amplitude: 10.0,
        })
        .collect();

    let mut builder = builder();
    builder
        .with_settings(settings(2, 5, Some(1)))
        .with_climate(ClimateInput::Yearly { years });
    let output = builder.build(kernel).unwrap().run().unwrap();

    let temperatures = |sample: usize| -> Vec<FloatValue> {
        (1..=5)
            .map(|t| output.raw.stock.get(sample, t).unwrap().masses.acid)
            .collect()
    };
    assert_eq!(temperatures(0), vec![0.0, 1.0, 2.0, 0.0, 1.0]);
    // The rotation continues where the previous sample stopped
    assert_eq!(temperatures(1), vec![2.0, 0.0, 1.0, 2.0, 0.0]);
}

#[test]
fn co2_balances_monthly_steps() {
    let mut settings = settings(5, 6, Some(9));
    settings.duration_unit = DurationUnit::Month;
    settings.timestep_length = 2;

    let mut builder = builder();
    builder.with_settings(settings).with_litter(LitterInput::Constant {
        components: vec![uncertain_litter(), acid_litter(10.0, 3.0)],
    });
    let output = builder.build(LinearKernel::default()).unwrap().run().unwrap();
    let duration = 2.0 / 12.0;

    for row in output.raw.co2.rows() {
        let start = output.raw.stock.get(row.sample, row.timestep - 1).unwrap();
        let end = output.raw.stock.get(row.sample, row.timestep).unwrap();
        let input = (end.total_organic_matter - 0.9 * start.total_organic_matter) / 0.5;
        assert_relative_eq!(
            row.co2,
            start.total_organic_matter + input * duration - end.total_organic_matter,
            epsilon = 1e-9
        );
    }
}

#[test]
fn cancellation_keeps_completed_samples() {
    let mut builder = builder();
    builder.with_settings(settings(10, 3, Some(2)));
    let simulation = builder.build(LinearKernel::default()).unwrap();

    let mut calls = vec![];
    let output = simulation
        .run_with_progress(|info| {
            calls.push(info.sample);
            assert_eq!(info.total, 10);
            if info.sample == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

    assert_eq!(calls, vec![0, 1, 2, 3]);
    assert!(output.cancelled);
    assert_eq!(output.completed_samples, 3);
    assert_eq!(output.raw.stock.len(), 3 * 4);
    assert!(output.raw.stock.rows().iter().all(|row| row.sample < 3));

    let summary = output.summarize();
    assert!(summary.tables().iter().all(|(_, rows)| !rows.is_empty()));
}

#[test]
fn progress_without_cancellation() {
    let mut builder = builder();
    builder.with_settings(settings(4, 2, Some(2)));
    let simulation = builder.build(LinearKernel::default()).unwrap();

    let mut calls = 0;
    let output = simulation
        .run_with_progress(|_| {
            calls += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
    assert_eq!(calls, 4);
    assert!(!output.cancelled);
    assert_eq!(output.completed_samples, 4);
}
