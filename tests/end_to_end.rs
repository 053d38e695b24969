//! End-to-end runs through the public API.
//!
//! Runs are configured from TOML and text files the way the desktop
//! application drives them.

use approx::assert_relative_eq;
use std::io::Write;
use tempfile::NamedTempFile;
use yasso::config::{InitialState, RunSettings};
use yasso::example_kernels::{EquilibriumKernel, LinearKernel};
use yasso::io::{self, InputData, ResultKind, Series};
use yasso::results::OutputChannel;
use yasso::{FloatValue, SimulationBuilder, SimulationConfig};

/// Parameter file with `rows` rows of five decay rates
fn parameter_file(rows: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "# decay rates, maximum likelihood first").unwrap();
    for i in 0..rows {
        let rate = 0.1 + 0.02 * i as FloatValue;
        writeln!(file, "{r} {r} {r} {r} {r}", r = rate).unwrap();
    }
    file
}

fn config_toml() -> String {
    let mut toml = String::from(
        r#"
[settings]
sample_size = 6
simulation_length = 8
timestep_length = 6
duration_unit = "month"
start_date = "2010-01-01"
parameter_columns = 5
seed = 2024

[initial]
mode = "zero"

[litter]
mode = "yearly"

[[litter.records]]
timestep = 1
mass = 3.0
mass_std = 0.5
acid = 50.0
water = 20.0
ethanol = 10.0
non_soluble = 20.0

[[litter.records]]
timestep = 2
mass = 2.0
mass_std = 0.5
acid = 50.0
water = 20.0
ethanol = 10.0
non_soluble = 20.0
size_class = 2.0

[climate]
mode = "monthly"
"#,
    );
    for month in 1..=12 {
        toml.push_str(&format!(
            "\n[[climate.months]]\nmonth = {}\ntemperature = {:.1}\nrainfall = 40.0\n",
            month,
            month as FloatValue - 4.0
        ));
    }
    toml
}

/// Mass conserving kernel: a share of the available mass decays into CO2
fn decaying_kernel(
    parameters: &[FloatValue],
    duration: FloatValue,
    _climate: [FloatValue; 3],
    initial: [FloatValue; 5],
    input: [FloatValue; 5],
    _size_class: FloatValue,
) -> [FloatValue; 5] {
    let retained = 1.0 - parameters[0] * duration;
    let mut end = [0.0; 5];
    for (i, value) in end.iter_mut().enumerate() {
        *value = (initial[i] + input[i] * duration) * retained;
    }
    end
}

mod configured_runs {
    use super::*;

    #[test]
    fn test_toml_configured_run() {
        let mut config_file = NamedTempFile::new().unwrap();
        write!(config_file, "{}", config_toml()).unwrap();
        let parameters = parameter_file(4);

        let config = SimulationConfig::load(config_file.path()).unwrap();
        let mut builder = SimulationBuilder::from_config(config);
        builder.with_parameter_file(parameters.path());
        let simulation = builder.build(decaying_kernel).unwrap();
        let output = simulation.run().unwrap();

        assert_eq!(output.completed_samples, 6);
        assert!(output.sample_errors.is_empty());
        assert_eq!(output.raw.stock.len(), 6 * 9);
        assert_eq!(output.raw.change.len(), 6 * 8);
        assert_eq!(output.raw.co2.len(), 6 * 8);

        let summary = output.summarize();
        assert_eq!(summary.tables().len(), 15);
        for channel in OutputChannel::all() {
            let expected = match channel {
                OutputChannel::Stock(_) => 9,
                OutputChannel::Change(_) | OutputChannel::Co2 => 8,
            };
            assert_eq!(summary.get(channel).unwrap().len(), expected, "{}", channel);
        }
        assert_eq!(summary, output.summarize());
    }

    #[test]
    fn test_released_carbon_matches_decay() {
        let config = SimulationConfig::from_toml_str(&config_toml()).unwrap();
        let parameters = parameter_file(4);
        let mut builder = SimulationBuilder::from_config(config);
        builder.with_parameter_file(parameters.path());
        let output = builder.build(decaying_kernel).unwrap().run().unwrap();

        for row in output.raw.co2.rows() {
            assert!(row.co2 >= 0.0, "negative CO2 yield {:?}", row);
        }
        for row in output.raw.stock.rows() {
            assert!(row.total_organic_matter >= 0.0);
            assert!(row.woody <= row.total_organic_matter + 1e-12);
        }
    }

    #[test]
    fn test_maximum_likelihood_pass_is_stable() {
        let mut config = SimulationConfig::from_toml_str(&config_toml()).unwrap();
        config.settings.seed = None;
        let parameters = parameter_file(4);

        let run = || {
            let mut builder = SimulationBuilder::from_config(config.clone());
            builder.with_parameter_file(parameters.path());
            builder.build(decaying_kernel).unwrap().run().unwrap()
        };
        let first = run();
        let second = run();
        for t in 0..=8 {
            assert_eq!(
                first.raw.stock.get(0, t).unwrap(),
                second.raw.stock.get(0, t).unwrap()
            );
        }
    }
}

mod input_files {
    use super::*;

    const INPUT: &str = "\
[Constant litterfall]
# mass mass_std acid acid_std water water_std ethanol ethanol_std non_soluble non_soluble_std humus humus_std size_class
1.5 0.2 60 0 20 0 10 0 10 0 0 0 0
0.5 0.1 70 0 10 0 10 0 10 0 0 0 3
[Constant climate]
5.0 600 11
";

    #[test]
    fn test_run_from_input_data() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", INPUT).unwrap();
        let data = InputData::load(file.path()).unwrap();

        let config = SimulationConfig::new(
            RunSettings {
                sample_size: 4,
                simulation_length: 5,
                parameter_columns: 5,
                seed: Some(3),
                ..Default::default()
            },
            InitialState::SteadyState,
            data.litter_input(Series::Constant).unwrap(),
            data.climate_input(Series::Constant).unwrap(),
        );
        let parameters = parameter_file(3);
        let mut builder = SimulationBuilder::from_config(config);
        builder.with_parameter_file(parameters.path());
        let output = builder
            .build(EquilibriumKernel::default())
            .unwrap()
            .run()
            .unwrap();

        let steady_state = output.steady_state.as_ref().unwrap();
        assert_eq!(steady_state.states.len(), 2);
        assert_eq!(steady_state.samples, 4);
        let start = output.raw.stock.get(0, 0).unwrap();
        let expected: FloatValue = steady_state.states.values().map(|s| s.mass.mean).sum();
        assert_relative_eq!(start.total_organic_matter, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_result_exports() {
        let config = SimulationConfig::from_toml_str(&config_toml()).unwrap();
        let parameters = parameter_file(2);
        let mut builder = SimulationBuilder::from_config(config);
        builder.with_parameter_file(parameters.path());
        let output = builder
            .build(LinearKernel::default())
            .unwrap()
            .run()
            .unwrap();

        let mut stock = vec![];
        io::write_stock(&mut stock, &output.raw.stock).unwrap();
        let stock = String::from_utf8(stock).unwrap();
        assert_eq!(stock.lines().count(), 1 + 6 * 9);
        assert!(stock.starts_with(io::STOCK_HEADER));

        let mut co2 = vec![];
        io::write_co2(&mut co2, &output.raw.co2).unwrap();
        assert_eq!(String::from_utf8(co2).unwrap().lines().count(), 1 + 6 * 8);

        let mut moments = vec![];
        io::write_moments(&mut moments, &output.summarize(), ResultKind::Change).unwrap();
        let moments = String::from_utf8(moments).unwrap();
        assert_eq!(moments.lines().count(), 2 + 7 * 8);
        for line in moments.lines().skip(2) {
            assert_eq!(line.split_whitespace().count(), 9);
        }
    }
}
