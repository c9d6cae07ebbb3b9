#[cfg(test)]
mod tests {
    extern crate hh_benchmark;
    use rand::{rngs::StdRng, SeedableRng};
    use hh_benchmark::{
        compartments::{CompartmentStore, ConductanceMode, MembraneParameters},
        error::{ConfigurationError, HodgkinHuxleyError},
        kernel::StepKernel,
        table::{LookupTable, TableParameters},
    };


    fn default_kernel() -> Result<StepKernel, HodgkinHuxleyError> {
        let table = LookupTable::build(&TableParameters::default())?;

        Ok(StepKernel::new(table, 0.01)?)
    }

    fn randomized_store(size: usize, seed: u64) -> Result<CompartmentStore, HodgkinHuxleyError> {
        let mut store = CompartmentStore::new(size, &MembraneParameters::default())?;
        store.randomize_voltages(&mut StdRng::seed_from_u64(seed), -90.0..40.);

        Ok(store)
    }

    fn assert_stores_identical(left: &CompartmentStore, right: &CompartmentStore) {
        let fields = [
            (left.voltages(), right.voltages()),
            (left.n(), right.n()),
            (left.m(), right.m()),
            (left.h(), right.h()),
        ];

        for (left_values, right_values) in fields {
            assert_eq!(left_values.len(), right_values.len());
            for (i, (l, r)) in left_values.iter().zip(right_values.iter()).enumerate() {
                assert_eq!(l.to_bits(), r.to_bits(), "compartment {}: {} != {}", i, l, r);
            }
        }
    }

    #[test]
    pub fn test_single_tick_from_rest() -> Result<(), HodgkinHuxleyError> {
        let mut kernel = default_kernel()?;
        let mut store = CompartmentStore::new(4, &MembraneParameters::default())?;

        kernel.step(&mut store, 0.);

        for v in store.voltages() {
            assert!((v - -64.99969676290817).abs() < 1e-10, "{}", v);
        }

        let position = kernel.positions()[0];
        assert_eq!(position.index(), 35);
        assert_eq!(position.theta(), 0.);

        Ok(())
    }

    #[test]
    pub fn test_parallel_matches_sequential() -> Result<(), HodgkinHuxleyError> {
        for mode in [ConductanceMode::Shared, ConductanceMode::PerCompartment] {
            let mut parallel_store = randomized_store(2048, 7)?;
            let mut sequential_store = parallel_store.clone();

            let mut parallel_kernel = default_kernel()?;
            parallel_kernel.conductance_mode = mode;
            let mut sequential_kernel = parallel_kernel.clone();
            sequential_kernel.parallel = false;

            for tick in 0..500 {
                let current = if tick % 100 < 50 { 10. } else { 0. };
                parallel_kernel.step(&mut parallel_store, current);
                sequential_kernel.step(&mut sequential_store, current);
            }

            assert_stores_identical(&parallel_store, &sequential_store);
            assert_eq!(parallel_kernel.positions(), sequential_kernel.positions());
        }

        Ok(())
    }

    #[test]
    pub fn test_disjoint_ranges_match_full_step() -> Result<(), HodgkinHuxleyError> {
        let mut full = randomized_store(1000, 11)?;
        let mut forward = full.clone();
        let mut backward = full.clone();
        let mut scattered = full.clone();

        let mut kernel = default_kernel()?;
        let mut sequential_kernel = kernel.clone();
        sequential_kernel.parallel = false;

        for _ in 0..200 {
            kernel.step(&mut full, 10.);

            kernel.step_range(&mut forward, 0..400, 10.);
            kernel.step_range(&mut forward, 400..1000, 10.);

            sequential_kernel.step_range(&mut backward, 750..1000, 10.);
            sequential_kernel.step_range(&mut backward, 0..750, 10.);

            for chunk in [3, 0, 8, 1, 9, 5, 2, 7, 4, 6] {
                kernel.step_range(&mut scattered, chunk * 100..(chunk + 1) * 100, 10.);
            }
        }

        assert_stores_identical(&full, &forward);
        assert_stores_identical(&full, &backward);
        assert_stores_identical(&full, &scattered);

        Ok(())
    }

    #[test]
    pub fn test_step_range_leaves_other_compartments() -> Result<(), HodgkinHuxleyError> {
        let mut store = randomized_store(100, 3)?;
        let before = store.clone();

        let mut kernel = default_kernel()?;
        kernel.step_range(&mut store, 10..20, 10.);

        for i in (0..10).chain(20..100) {
            assert_eq!(store.voltage(i), before.voltage(i));
            assert_eq!(store.n()[i], before.n()[i]);
            assert_eq!(store.m()[i], before.m()[i]);
            assert_eq!(store.h()[i], before.h()[i]);
        }
        for i in 10..20 {
            assert_ne!(store.voltage(i), before.voltage(i));
        }

        kernel.step_range(&mut store, 50..50, 10.);

        Ok(())
    }

    #[test]
    pub fn test_compartments_are_independent() -> Result<(), HodgkinHuxleyError> {
        let mut population = randomized_store(256, 19)?;
        let initial = population.clone();

        let mut kernel = default_kernel()?;
        let mut single_kernel = kernel.clone();

        for _ in 0..300 {
            kernel.step(&mut population, 10.);
        }

        for j in [0, 1, 77, 255] {
            let mut single = CompartmentStore::new(1, &MembraneParameters::default())?;
            single.set_voltage(0, initial.voltage(j));

            for _ in 0..300 {
                single_kernel.step(&mut single, 10.);
            }

            assert_eq!(single.voltage(0).to_bits(), population.voltage(j).to_bits());
            assert_eq!(single.n()[0].to_bits(), population.n()[j].to_bits());
            assert_eq!(single.m()[0].to_bits(), population.m()[j].to_bits());
            assert_eq!(single.h()[0].to_bits(), population.h()[j].to_bits());
        }

        Ok(())
    }

    #[test]
    pub fn test_voltages_outside_table() -> Result<(), HodgkinHuxleyError> {
        let voltages = [-100., 100., -100.5, 100.5, -150., 150., -1e6, 1e6, 99.999, -99.999];

        let mut store = CompartmentStore::new(voltages.len(), &MembraneParameters::default())?;
        for (i, v) in voltages.iter().enumerate() {
            store.set_voltage(i, *v);
        }

        let mut kernel = default_kernel()?;
        kernel.step(&mut store, 10.);

        let size = kernel.table().len();
        for position in kernel.positions() {
            assert!(position.index() < size, "{:?}", position);
            assert!((0.0..=1.).contains(&position.theta()), "{:?}", position);
        }

        for i in 0..store.len() {
            assert!(store.voltage(i).is_finite(), "voltage {} from {}", store.voltage(i), voltages[i]);
            for gate in [store.n()[i], store.m()[i], store.h()[i]] {
                assert!(gate.is_finite() && (0.0..=1.).contains(&gate), "gate {} from {}", gate, voltages[i]);
            }
        }

        Ok(())
    }

    #[test]
    pub fn test_conductance_modes() -> Result<(), HodgkinHuxleyError> {
        let mut shared_store = CompartmentStore::new(2, &MembraneParameters::default())?;
        let passive = MembraneParameters { gna_max: 0., ..MembraneParameters::default() };
        shared_store.set_parameters(1, &passive)?;
        let mut per_compartment_store = shared_store.clone();

        let mut shared_kernel = default_kernel()?;
        let mut per_compartment_kernel = default_kernel()?;
        per_compartment_kernel.conductance_mode = ConductanceMode::PerCompartment;

        let mut per_compartment_peaks = [f64::MIN; 2];

        for _ in 0..2000 {
            shared_kernel.step(&mut shared_store, 10.);
            per_compartment_kernel.step(&mut per_compartment_store, 10.);

            for (peak, v) in per_compartment_peaks.iter_mut().zip(per_compartment_store.voltages()) {
                *peak = peak.max(*v);
            }
        }

        // shared mode reads compartment 0 for everyone
        assert_eq!(shared_store.voltage(0).to_bits(), shared_store.voltage(1).to_bits());

        // without sodium the second compartment never fires
        assert!(per_compartment_peaks[0] > 0.);
        assert!(per_compartment_peaks[1] < -40.);

        Ok(())
    }

    #[test]
    pub fn test_invalid_timestep() -> Result<(), HodgkinHuxleyError> {
        let table = LookupTable::build(&TableParameters::default())?;

        for dt in [0., -0.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                StepKernel::new(table.clone(), dt),
                Err(ConfigurationError::InvalidTimestep(_)),
            ));
        }

        Ok(())
    }
}
