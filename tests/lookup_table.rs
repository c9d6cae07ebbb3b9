#[cfg(test)]
mod tests {
    extern crate hh_benchmark;
    use hh_benchmark::{
        error::{ConfigurationError, HodgkinHuxleyError},
        kinetics::GatingVariable,
        table::{LookupTable, TableParameters, TablePosition, TableSample},
    };


    fn assert_sample_almost_eq(actual: &TableSample, expected: &[f64; 6], tolerance: f64) {
        let actual_values = [
            actual.tau_n, actual.n_inf, actual.tau_m, actual.m_inf, actual.tau_h, actual.h_inf,
        ];

        for (actual_value, expected_value) in actual_values.iter().zip(expected.iter()) {
            assert!(
                (actual_value - expected_value).abs() <= tolerance * expected_value.abs().max(1.),
                "{:?} != {:?}",
                actual_values,
                expected,
            );
        }
    }

    #[test]
    pub fn test_build_is_deterministic() -> Result<(), HodgkinHuxleyError> {
        let first = LookupTable::build(&TableParameters::default())?;
        let second = LookupTable::build(&TableParameters::default())?;

        for i in 0..=first.len() {
            let (a, b) = (first.sample(i), second.sample(i));
            assert_eq!(a.tau_n.to_bits(), b.tau_n.to_bits());
            assert_eq!(a.n_inf.to_bits(), b.n_inf.to_bits());
            assert_eq!(a.tau_m.to_bits(), b.tau_m.to_bits());
            assert_eq!(a.m_inf.to_bits(), b.m_inf.to_bits());
            assert_eq!(a.tau_h.to_bits(), b.tau_h.to_bits());
            assert_eq!(a.h_inf.to_bits(), b.h_inf.to_bits());
        }

        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    pub fn test_sample_voltages() -> Result<(), HodgkinHuxleyError> {
        let table = LookupTable::build(&TableParameters::default())?;

        assert_eq!(table.len(), 201);
        assert_eq!(table.step(), 1.);
        assert_eq!(table.voltage_at(0), -100.);
        assert_eq!(table.voltage_at(35), -65.);
        assert_eq!(table.voltage_at(200), 100.);

        Ok(())
    }

    #[test]
    pub fn test_reference_samples() -> Result<(), HodgkinHuxleyError> {
        let table = LookupTable::build(&TableParameters::default())?;

        assert_sample_almost_eq(
            &table.sample(0),
            &[
                5.033751453365069, 0.025446654154322342, 0.03574760784411865,
                0.0005329778846169563, 2.473267872311834, 0.9962871741539278,
            ],
            1e-12,
        );
        assert_sample_almost_eq(
            &table.sample(100),
            &[
                1.645480118244483, 0.9087278279671391, 0.23907906751265814,
                0.9741586073227078, 1.0273248228300127, 0.0027883594333768537,
            ],
            1e-12,
        );
        assert_sample_almost_eq(
            &table.sample(200),
            &[
                0.6386135427366768, 0.9898511748979811, 0.07142638017953491,
                0.9999701540173902, 0.9999830831443808, 1.828778963398621e-05,
            ],
            1e-12,
        );

        Ok(())
    }

    #[test]
    pub fn test_samples_match_rate_functions() -> Result<(), HodgkinHuxleyError> {
        let table = LookupTable::build(&TableParameters::default())?;

        for i in 0..table.len() {
            let v = table.voltage_at(i);
            let sample = table.sample(i);

            let expected = [
                GatingVariable::N.time_constant(v), GatingVariable::N.steady_state(v),
                GatingVariable::M.time_constant(v), GatingVariable::M.steady_state(v),
                GatingVariable::H.time_constant(v), GatingVariable::H.steady_state(v),
            ];

            assert_sample_almost_eq(&sample, &expected, 1e-12);
        }

        Ok(())
    }

    #[test]
    pub fn test_guard_sample_duplicates_last() -> Result<(), HodgkinHuxleyError> {
        let table = LookupTable::build(&TableParameters::default())?;

        assert_eq!(table.sample(table.len()), table.sample(table.len() - 1));

        let small = LookupTable::build(&TableParameters { size: 2, min_v: -10., max_v: 10. })?;
        assert_eq!(small.step(), 20.);
        assert_eq!(small.sample(2), small.sample(1));
        assert_ne!(small.sample(0), small.sample(1));

        Ok(())
    }

    #[test]
    pub fn test_locate_and_clamp() -> Result<(), HodgkinHuxleyError> {
        let table = LookupTable::build(&TableParameters::default())?;

        let cases: [(f64, usize, f64); 8] = [
            (-100., 0, 0.),
            (-99.5, 0, 0.5),
            (-65., 35, 0.),
            (99.5, 199, 0.5),
            (100., 200, 0.),
            (150., 200, 1.),
            (-100.5, 0, 0.),
            (-1e6, 0, 0.),
        ];

        for (v, index, theta) in cases {
            let position = table.clamp(table.locate(v));

            assert_eq!(position.index(), index, "index at {}", v);
            assert!((position.theta() - theta).abs() < 1e-12, "theta at {}: {}", v, position.theta());
        }

        // unclamped positions keep the signed floor
        assert_eq!(table.locate(-100.5).index, -1);
        assert_eq!(table.locate(100.).index, 200);
        assert_eq!(table.locate(100.5).index, 200);
        assert_eq!(table.locate(101.).index, 201);

        Ok(())
    }

    #[test]
    pub fn test_clamped_positions_read_edge_samples() -> Result<(), HodgkinHuxleyError> {
        let table = LookupTable::build(&TableParameters::default())?;
        let first = table.sample(0);
        let last = table.sample(table.len() - 1);

        for v in [100., 100.5, 150., 1e6, f64::MAX] {
            let position = table.clamp(table.locate(v));
            assert_eq!(table.interpolate(&position), last, "at {}", v);
        }

        for v in [-100., -100.5, -150., -1e6, f64::MIN] {
            let position = table.clamp(table.locate(v));
            assert_eq!(table.interpolate(&position), first, "at {}", v);
        }

        Ok(())
    }

    #[test]
    pub fn test_interpolation_is_linear() -> Result<(), HodgkinHuxleyError> {
        let table = LookupTable::build(&TableParameters::default())?;

        let lower = table.sample(35);
        let upper = table.sample(36);

        let position = table.clamp(TablePosition { index: 35, theta: 0.25 });
        let interpolated = table.interpolate(&position);

        let expected = [
            lower.tau_n + 0.25 * (upper.tau_n - lower.tau_n),
            lower.n_inf + 0.25 * (upper.n_inf - lower.n_inf),
            lower.tau_m + 0.25 * (upper.tau_m - lower.tau_m),
            lower.m_inf + 0.25 * (upper.m_inf - lower.m_inf),
            lower.tau_h + 0.25 * (upper.tau_h - lower.tau_h),
            lower.h_inf + 0.25 * (upper.h_inf - lower.h_inf),
        ];
        assert_sample_almost_eq(&interpolated, &expected, 1e-15);

        let at_lower = table.interpolate(&table.clamp(TablePosition { index: 35, theta: 0. }));
        assert_eq!(at_lower, lower);

        Ok(())
    }

    #[test]
    pub fn test_raw_positions_past_the_table_are_pinned() -> Result<(), HodgkinHuxleyError> {
        let table = LookupTable::build(&TableParameters::default())?;
        let last = table.sample(table.len() - 1);
        let first = table.sample(0);

        // one step past the guard sample
        let raw = table.locate(101.5);
        assert_eq!(raw.index, 201);
        assert_eq!(table.interpolate(&table.clamp(raw)), last);

        let raw_positions = [
            TablePosition { index: isize::MAX, theta: 0.5 },
            TablePosition { index: 202, theta: 0. },
            TablePosition { index: 201, theta: 0.99 },
        ];
        for raw in raw_positions {
            let position = table.clamp(raw);
            assert_eq!(position.index(), 200);
            assert_eq!(position.theta(), 1.);
            assert_eq!(table.interpolate(&position), last);
        }

        for index in [-1, -2, isize::MIN] {
            let position = table.clamp(TablePosition { index, theta: 0.5 });
            assert_eq!(position.index(), 0);
            assert_eq!(position.theta(), 0.);
            assert_eq!(table.interpolate(&position), first);
        }

        // every voltage, however far out, reads a sample without leaving the table
        for v in [f64::INFINITY, f64::NEG_INFINITY, 1e300, -1e300, 100.999, -100.001] {
            let position = table.clamp(table.locate(v));
            assert!(position.index() < table.len(), "{:?} at {}", position, v);
            assert!(table.interpolate(&position).tau_n.is_finite());
        }

        Ok(())
    }

    #[test]
    pub fn test_custom_resolution() -> Result<(), HodgkinHuxleyError> {
        let table = LookupTable::build(&TableParameters { size: 401, min_v: -100., max_v: 100. })?;

        assert_eq!(table.step(), 0.5);
        assert_eq!(table.voltage_at(400), 100.);

        let position = table.locate(-99.75);
        assert_eq!(position.index, 0);
        assert!((position.theta - 0.5).abs() < 1e-12);

        Ok(())
    }

    #[test]
    pub fn test_invalid_parameters() {
        assert!(matches!(
            LookupTable::build(&TableParameters { size: 1, ..TableParameters::default() }),
            Err(ConfigurationError::TableTooSmall(1)),
        ));
        assert!(matches!(
            LookupTable::build(&TableParameters { size: 0, ..TableParameters::default() }),
            Err(ConfigurationError::TableTooSmall(0)),
        ));
        assert!(matches!(
            LookupTable::build(&TableParameters { size: 201, min_v: 10., max_v: 10. }),
            Err(ConfigurationError::InvalidTableBounds(_, _)),
        ));
        assert!(matches!(
            LookupTable::build(&TableParameters { size: 201, min_v: 50., max_v: -50. }),
            Err(ConfigurationError::InvalidTableBounds(_, _)),
        ));
        assert!(matches!(
            LookupTable::build(&TableParameters { size: 201, min_v: f64::NAN, max_v: 100. }),
            Err(ConfigurationError::InvalidTableBounds(_, _)),
        ));
    }
}
