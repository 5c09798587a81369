use ndarray::{Array1, Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;
use crate::model::Model;
use crate::network::{Network, NoiseScales};
use crate::types::Tensor;
use crate::wnet::WNet;

fn noisy_wnet() -> WNet {
    let mut wnet = WNet::new(3, &[4], 2).unwrap();
    wnet.addnoise(&NoiseScales::uniform(0.3), &mut StdRng::seed_from_u64(11)).unwrap();
    wnet
}

#[test]
fn test_wnet_layout() {
    let wnet = noisy_wnet();
    let sub = 4 * 4 + 2 * 5;
    assert_eq!(wnet.nparams(), 2 * sub);
    assert_eq!(wnet.neto_params().len(), sub);
    assert_eq!(wnet.netw_params().len(), sub);
    assert_eq!(wnet.ni(), 3);
    assert_eq!(wnet.no(), 4);
    assert_eq!(wnet.neto().onames, vec!["o0_o".to_string(), "o1_o".to_string()]);
    assert_eq!(wnet.netw().onames, vec!["o0_w".to_string(), "o1_w".to_string()]);
    assert_eq!(wnet.param_labels()[sub], "layer-netw-0_weight");
}

#[test]
fn test_wnet_run_concatenates() {
    let wnet = noisy_wnet();
    let input = Array3::from_shape_fn((2, 3, 5), |(r, f, c)| (r + f) as f64 * 0.1 - c as f64 * 0.2);
    let out = wnet.run(&Tensor::D3(input.clone())).unwrap();
    let out = out.as_d3().unwrap();
    assert_eq!(out.shape(), &[2, 4, 5]);

    let (outputs, weights) = wnet.run_split(&Tensor::D3(input.clone())).unwrap();
    assert_eq!(&out.slice(ndarray::s![.., 0..2, ..]), outputs.as_d3().unwrap());
    assert_eq!(&out.slice(ndarray::s![.., 2..4, ..]), weights.as_d3().unwrap());
    assert_eq!(&wnet.run3(input.view()).unwrap(), out);

    let out2 = wnet.run(&Tensor::D2(Array2::zeros((3, 5)))).unwrap();
    assert_eq!(out2.shape(), &[4, 5]);
    let out1 = wnet.run(&Tensor::D1(Array1::zeros(3))).unwrap();
    assert_eq!(out1.shape(), &[4]);
}

#[test]
fn test_wnet_aliasing_is_transitive() {
    let mut wnet = noisy_wnet();
    let n = wnet.neto().nparams();
    let input = Tensor::D1(Array1::from_elem(3, 0.5));
    let (o_before, w_before) = wnet.run_split(&input).unwrap();

    // last bias of netw
    let last = wnet.nparams() - 1;
    wnet.flat_parameters()[last] += 1.0;
    let (o_after, w_after) = wnet.run_split(&input).unwrap();
    assert_eq!(o_before, o_after);
    assert_ne!(w_before, w_after);
    assert_eq!(wnet.netw_params()[wnet.netw().nparams() - 1], wnet.parameters()[last]);
    assert_eq!(wnet.neto_params().len(), n);
}

#[test]
fn test_setini() {
    let mut wnet = noisy_wnet();
    wnet.setini();
    assert!(wnet.netw_params().iter().all(|&p| p == 0.0));
    let x = Array2::from_shape_fn((3, 2), |(f, c)| (f as f64 - c as f64) * 0.001);
    let (outputs, weights) = wnet.run_split(&Tensor::D2(x.clone())).unwrap();
    assert!(weights.as_d2().unwrap().iter().all(|&w| w == 0.0));
    let outputs = outputs.as_d2().unwrap();
    for feature in 0..2 {
        for case in 0..2 {
            assert!((outputs[[feature, case]] - x[[feature, case]]).abs() < 1e-6);
        }
    }
}

#[test]
fn test_from_and_into_networks() {
    let neto = Network::new(2, &[3], 1).unwrap();
    let netw = Network::new(2, &[3], 1).unwrap();
    let mut wnet = WNet::from_networks(neto, netw).unwrap();
    wnet.flat_parameters().fill(0.25);
    let (neto, netw) = wnet.into_networks().unwrap();
    assert!(neto.parameters().iter().all(|&p| p == 0.25));
    assert!(netw.parameters().iter().all(|&p| p == 0.25));
    assert_eq!(neto.onames(), &["o0_o".to_string()]);

    let other = Network::new(3, &[3], 1).unwrap();
    assert!(WNet::from_networks(netw, other).is_err());
}

#[test]
fn test_from_networks_labels_are_distinct() {
    let neto = Network::new(2, &[3], 1).unwrap();
    let netw = Network::new(2, &[3], 1).unwrap();
    let wnet = WNet::from_networks(neto, netw).unwrap();
    let labels = wnet.param_labels();
    let n = wnet.neto().nparams();
    assert_eq!(labels[0], "layer-neto-0_weight");
    assert_eq!(labels[n], "layer-netw-0_weight");
    assert!(labels[..n].iter().all(|l| !labels[n..].contains(l)));

    let same = || Network::builder().inputs(2).name("twin").hidden(3).output(1).build().unwrap();
    let wnet = WNet::from_networks(same(), same()).unwrap();
    let labels = wnet.param_labels();
    let n = wnet.neto().nparams();
    assert_eq!(labels[0], "layer-twin-0_o_weight");
    assert!(labels[..n].iter().all(|l| !labels[n..].contains(l)));
}

#[test]
fn test_wnet_report_and_display() {
    let wnet = noisy_wnet().with_name("demo");
    assert!(wnet.to_string().starts_with("WNet 'demo' with 52 params"));
    let report = wnet.report();
    assert!(report.starts_with(&"#".repeat(120)));
    assert!(report.contains("neto with architecture [3, 4, 2]"));
}

#[test]
fn test_wnet_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wnet.bin");
    let wnet = noisy_wnet();
    wnet.save(&path).unwrap();
    assert_eq!(WNet::load(&path).unwrap(), wnet);
    let rows = WNet::load(&path).unwrap().run3(Array3::zeros((1, 3, 2)).view()).unwrap();
    assert_eq!(rows.len_of(Axis(1)), 4);
}
