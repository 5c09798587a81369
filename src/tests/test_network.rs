use ndarray::{arr1, Array1, Array2, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;
use crate::activations::Activation;
use crate::data::MaskedInputs;
use crate::error::TenbilacError;
use crate::layers::LayerMode;
use crate::model::Model;
use crate::network::{Network, NoiseScales};
use crate::types::Tensor;

fn noisy_network() -> Network {
    let mut net = Network::builder()
        .inputs(3)
        .hidden(4)
        .hidden_mult(2)
        .output(2)
        .name("test")
        .build()
        .unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    net.addnoise(&NoiseScales::uniform(0.5), &mut rng).unwrap();
    net
}

#[test]
fn test_network_creation() {
    let net = Network::new(2, &[5, 3], 1).unwrap();
    assert_eq!(net.arch(), vec![2, 5, 3, 1]);
    assert_eq!(net.layers().len(), 3);
    assert_eq!(net.layers()[0].activation, Activation::Tanh);
    assert_eq!(net.layers()[2].activation, Activation::Identity);
    assert_eq!(net.inames(), &["i0".to_string(), "i1".to_string()]);
    assert_eq!(net.onames(), &["o0".to_string()]);
    assert_eq!(net.to_string(), "Net with architecture [2, 5, 3, 1] and 37 params");
}

#[test]
fn test_nparams_matches_flat_vector() {
    let mut net = noisy_network();
    let expected = 4 * 4 + 2 * 5 + 2 * 3;
    assert_eq!(net.nparams(), expected);
    assert_eq!(net.flat_parameters().len(), expected);
    assert_eq!(net.param_labels().len(), expected);
}

#[test]
fn test_flat_parameters_write_through() {
    let mut net = noisy_network();
    for (l, layer) in net.layers().to_vec().iter().enumerate() {
        for (k, i) in layer.weight_range().enumerate() {
            net.flat_parameters()[i] = 100.0 + i as f64;
            let (row, col) = (k / layer.ni, k % layer.ni);
            assert_eq!(net.weights(l).unwrap()[[row, col]], 100.0 + i as f64);
        }
        for (k, i) in layer.bias_range().enumerate() {
            net.flat_parameters()[i] = -(i as f64);
            assert_eq!(net.biases(l).unwrap()[k], -(i as f64));
        }
    }
}

#[test]
fn test_layer_writes_show_in_flat_parameters() {
    let mut net = noisy_network();
    net.weights_mut(1).unwrap()[[1, 3]] = 42.0;
    net.biases_mut(2).unwrap()[0] = -7.0;
    let w_index = net.layers()[1].weight_range().start + 1 * 4 + 3;
    let b_index = net.layers()[2].bias_range().start;
    assert_eq!(net.flat_parameters()[w_index], 42.0);
    assert_eq!(net.parameters()[b_index], -7.0);
}

#[test]
fn test_flat_parameters_idempotent() {
    let mut net = noisy_network();
    let first = net.flat_parameters().to_owned();
    let second = net.flat_parameters().to_owned();
    assert_eq!(first, second);

    net.flat_parameters()[0] = 9.0;
    assert_eq!(net.weights(0).unwrap()[[0, 0]], 9.0);
    assert_eq!(net.flat_parameters()[0], 9.0);
}

#[test]
fn test_set_parameters_changes_output() {
    let mut net = noisy_network();
    let input = Tensor::D1(arr1(&[0.3, -0.2, 0.9]));
    let before = net.run(&input).unwrap();
    let shifted = &net.parameters() + 0.1;
    net.set_parameters(shifted.view()).unwrap();
    assert_ne!(net.run(&input).unwrap(), before);

    let wrong = Array1::zeros(3);
    assert!(matches!(
        net.set_parameters(wrong.view()),
        Err(TenbilacError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_run_shapes() {
    let net = noisy_network();
    let out1 = net.run(&Tensor::D1(Array1::zeros(3))).unwrap();
    assert_eq!(out1.shape(), &[2]);
    let out2 = net.run(&Tensor::D2(Array2::zeros((3, 7)))).unwrap();
    assert_eq!(out2.shape(), &[2, 7]);
    let out3 = net.run(&Tensor::D3(Array3::zeros((5, 3, 7)))).unwrap();
    assert_eq!(out3.shape(), &[5, 2, 7]);
    assert!(net.run(&Tensor::D2(Array2::zeros((4, 7)))).is_err());
}

#[test]
fn test_identity_network() {
    let mut net = Network::builder()
        .inputs(3)
        .hidden(3)
        .output(3)
        .identity_only(true)
        .build()
        .unwrap();
    net.set_identity(None);
    let x = Array2::from_shape_fn((3, 4), |(f, c)| f as f64 - c as f64 * 0.5);
    let out = net.run(&Tensor::D2(x.clone())).unwrap();
    assert_eq!(out.as_d2().unwrap(), &x);
}

#[test]
fn test_set_identity_with_tanh_is_close() {
    let mut net = Network::new(2, &[4], 2).unwrap();
    net.set_identity(None);
    let out = net.run(&Tensor::D1(arr1(&[0.01, -0.02]))).unwrap();
    let out = out.as_d1().unwrap();
    assert!((out[0] - 0.01).abs() < 1e-5);
    assert!((out[1] + 0.02).abs() < 1e-5);
}

#[test]
fn test_predict_masks_outputs() {
    let net = noisy_network();
    let data = Array3::from_elem((2, 3, 3), 0.5);
    let mut rmask = Array2::from_elem((2, 3), false);
    rmask[[1, 2]] = true;
    let inputs = MaskedInputs::from_realization_mask(data, rmask).unwrap();
    let outputs = net.predict(&inputs).unwrap();
    assert_eq!(outputs.data.shape(), &[2, 2, 3]);
    assert_eq!(outputs.masked_positions(), vec![(1, 0, 2), (1, 1, 2)]);
    assert!(outputs.data.iter().all(|x| x.is_finite()));
}

#[test]
fn test_mult_layer_noise_scales() {
    let mut net = Network::builder().inputs(2).hidden_mult(2).output(1).build().unwrap();
    let scales = NoiseScales {
        wscale: 1.0,
        bscale: 1.0,
        multwscale: 0.0,
        multbscale: 0.0,
    };
    net.addnoise(&scales, &mut StdRng::seed_from_u64(3)).unwrap();
    assert_eq!(net.layers()[0].mode, LayerMode::Mult);
    assert!(net.weights(0).unwrap().iter().all(|&w| w == 0.0));
    assert!(net.weights(1).unwrap().iter().any(|&w| w != 0.0));
}

#[test]
fn test_report() {
    let net = noisy_network();
    let report = net.report();
    assert!(report.contains("Net 'test' with architecture [3, 4, 2, 2] and 32 params"));
    assert!(report.contains("prod (input ** "));
    assert_eq!(net.param_labels()[0], "layer-test-0_weight");
}

#[test]
fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("net.bin");
    let net = noisy_network();
    net.save(&path).unwrap();
    let loaded = Network::load(&path).unwrap();
    assert_eq!(loaded, net);
}

#[test]
fn test_builder_errors() {
    assert!(Network::builder().output(1).build().is_err());
    assert!(Network::builder().inputs(2).build().is_err());
    assert!(Network::builder().inputs(2).hidden(0).output(1).build().is_err());
}
