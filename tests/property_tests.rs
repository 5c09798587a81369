#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;
    use tenbilac::layers::LayerMode;
    use tenbilac::model::Model;
    use tenbilac::network::Network;
    use tenbilac::types::Tensor;
    use tenbilac::wnet::WNet;
    use ndarray::{Array1, Array2, Array3, Axis};

    // Hidden layers as (size, is product unit)
    fn hidden_strategy() -> impl Strategy<Value = Vec<(usize, bool)>> {
        prop::collection::vec((1usize..=6, any::<bool>()), 0..=3)
    }

    fn build(ni: usize, hidden: &[(usize, bool)], no: usize) -> Network {
        let mut builder = Network::builder().inputs(ni);
        for &(nn, mult) in hidden {
            let mode = if mult { LayerMode::Mult } else { LayerMode::Sum };
            builder = builder.add_layer(nn, mode, None);
        }
        builder.output(no).build().unwrap()
    }

    proptest! {
        #[test]
        fn test_nparams_equals_flat_length(
            ni in 1usize..=5,
            hidden in hidden_strategy(),
            no in 1usize..=4,
        ) {
            let mut net = build(ni, &hidden, no);
            let mut nin = ni;
            let mut expected = 0;
            for &(nn, _) in hidden.iter().chain(std::iter::once(&(no, false))) {
                expected += nn * (nin + 1);
                nin = nn;
            }
            prop_assert_eq!(net.nparams(), expected);
            prop_assert_eq!(net.flat_parameters().len(), expected);
            prop_assert_eq!(net.param_labels().len(), expected);
        }

        #[test]
        fn test_aliasing_every_index(
            ni in 1usize..=4,
            hidden in hidden_strategy(),
            no in 1usize..=3,
            value in -10.0f64..10.0,
        ) {
            let mut net = build(ni, &hidden, no);
            let layers = net.layers().to_vec();
            for (l, layer) in layers.iter().enumerate() {
                for (k, i) in layer.weight_range().enumerate() {
                    net.flat_parameters()[i] = value + i as f64;
                    prop_assert_eq!(net.weights(l).unwrap()[[k / layer.ni, k % layer.ni]], value + i as f64);
                    net.weights_mut(l).unwrap()[[k / layer.ni, k % layer.ni]] = -value;
                    prop_assert_eq!(net.flat_parameters()[i], -value);
                }
                for (k, i) in layer.bias_range().enumerate() {
                    net.flat_parameters()[i] = value;
                    prop_assert_eq!(net.biases(l).unwrap()[k], value);
                }
            }
        }

        #[test]
        fn test_stacked_realizations_match_rank2(
            ni in 1usize..=4,
            nsum in 1usize..=5,
            ncases in 1usize..=6,
            k in 1usize..=4,
            seed in 0u64..1000,
        ) {
            use rand::SeedableRng;
            let mut net = Network::new(ni, &[nsum], 2).unwrap();
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            net.addnoise(&tenbilac::network::NoiseScales::uniform(0.5), &mut rng).unwrap();

            let slice = Array2::from_shape_fn((ni, ncases), |(f, c)| (f as f64 - c as f64) * 0.37);
            let stacked: Array3<f64> = slice
                .view()
                .insert_axis(Axis(0))
                .broadcast((k, ni, ncases))
                .unwrap()
                .to_owned();
            let out2 = net.run(&Tensor::D2(slice)).unwrap();
            let out3 = net.run(&Tensor::D3(stacked)).unwrap();
            let out2 = out2.as_d2().unwrap();
            for rea in out3.as_d3().unwrap().outer_iter() {
                prop_assert_eq!(&rea, out2);
            }
        }

        #[test]
        fn test_wnet_halves_are_independent(
            ni in 1usize..=3,
            nh in 1usize..=4,
            no in 1usize..=2,
            value in -3.0f64..3.0,
        ) {
            let mut wnet = WNet::new(ni, &[nh], no).unwrap();
            let n = wnet.neto().nparams();
            prop_assert_eq!(wnet.nparams(), 2 * n);
            let input = Tensor::D1(Array1::from_elem(ni, 0.4));
            let (outputs, _) = wnet.run_split(&input).unwrap();
            for i in n..wnet.nparams() {
                wnet.flat_parameters()[i] = value;
            }
            let (after, weights) = wnet.run_split(&input).unwrap();
            prop_assert_eq!(outputs, after);
            prop_assert_eq!(weights.shape(), &[no][..]);
        }
    }
}
