//! Dense multilayer perceptron with ReLU hidden layers, trained by Adam.
//!
//! Weight matrices are stored `outputs × inputs`, so a layer computes
//! `z = W·a + b`. Gradients are derived by hand: callers supply the
//! gradient of their loss with respect to the output pre-activation, and
//! [`Mlp::train_step`] backpropagates it through the hidden layers.

use ndarray::{Array, Array1, Array2, ArrayView1, Axis, Dimension, Zip};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Activation applied to the last layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Head {
    Linear,
    Softmax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl Dense {
    /// He-normal weights, zero bias.
    fn new<R>(inputs: usize, outputs: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        #[expect(clippy::cast_precision_loss)]
        let scale = (2.0 / inputs as f32).sqrt();
        let weights = Array2::from_shape_simple_fn((outputs, inputs), || {
            let z: f32 = rng.sample(StandardNormal);
            z * scale
        });
        Self {
            weights,
            bias: Array1::zeros(outputs),
        }
    }

    fn forward(&self, input: ArrayView1<'_, f32>) -> Array1<f32> {
        self.weights.dot(&input) + &self.bias
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    layers: Vec<Dense>,
    head: Head,
}

fn relu(mut z: Array1<f32>) -> Array1<f32> {
    z.mapv_inplace(|v| v.max(0.0));
    z
}

/// Numerically stable softmax.
#[must_use]
pub fn softmax(z: ArrayView1<'_, f32>) -> Array1<f32> {
    let max = z.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
    let exp = z.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

impl Mlp {
    /// Builds a network with the given layer widths, input first.
    ///
    /// # Panics
    ///
    /// Panics if fewer than two widths are given.
    pub fn new<R>(sizes: &[usize], head: Head, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        assert!(sizes.len() >= 2, "a network needs an input and an output width");
        let layers = sizes
            .windows(2)
            .map(|w| Dense::new(w[0], w[1], rng))
            .collect();
        Self { layers, head }
    }

    #[must_use]
    pub fn head(&self) -> Head {
        self.head
    }

    /// Layer widths, input first.
    #[must_use]
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = self
            .layers
            .first()
            .map(|l| vec![l.weights.ncols()])
            .unwrap_or_default();
        sizes.extend(self.layers.iter().map(|l| l.weights.nrows()));
        sizes
    }

    /// Returns `true` if every layer has the widths `sizes` describes and the
    /// network ends in `head`.
    ///
    /// Deserialized weights are not checked by serde, and a mismatched layer
    /// would panic on the first forward pass.
    #[must_use]
    pub fn has_shape(&self, sizes: &[usize], head: Head) -> bool {
        self.head == head
            && self.layers.len() + 1 == sizes.len()
            && self.layers.iter().zip(sizes.windows(2)).all(|(layer, w)| {
                layer.weights.dim() == (w[1], w[0]) && layer.bias.len() == w[1]
            })
    }

    /// Input, hidden activations and the output pre-activation.
    fn activations(&self, input: ArrayView1<'_, f32>) -> Vec<Array1<f32>> {
        let mut activations = vec![input.to_owned()];
        for (i, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(activations[i].view());
            let is_last = i + 1 == self.layers.len();
            activations.push(if is_last { z } else { relu(z) });
        }
        activations
    }

    fn apply_head(&self, z: Array1<f32>) -> Array1<f32> {
        match self.head {
            Head::Linear => z,
            Head::Softmax => softmax(z.view()),
        }
    }

    #[must_use]
    pub fn forward(&self, input: ArrayView1<'_, f32>) -> Array1<f32> {
        let mut activations = self.activations(input);
        let z = activations.pop().unwrap_or_default();
        self.apply_head(z)
    }

    /// One optimizer step on a batch.
    ///
    /// `output_grad(i, output)` returns the gradient of sample `i`'s loss
    /// with respect to the last pre-activation, given the network output
    /// (after the head). Gradients are averaged over the batch.
    pub fn train_step<F>(&mut self, adam: &mut Adam, inputs: &[Array1<f32>], mut output_grad: F)
    where
        F: FnMut(usize, &Array1<f32>) -> Array1<f32>,
    {
        if inputs.is_empty() {
            return;
        }
        let mut grads = self
            .layers
            .iter()
            .map(|l| Dense {
                weights: Array2::zeros(l.weights.raw_dim()),
                bias: Array1::zeros(l.bias.raw_dim()),
            })
            .collect::<Vec<_>>();

        for (sample, input) in inputs.iter().enumerate() {
            let activations = self.activations(input.view());
            let Some(z) = activations.last() else {
                continue;
            };
            let output = self.apply_head(z.clone());
            let mut delta = output_grad(sample, &output);
            for l in (0..self.layers.len()).rev() {
                let a = &activations[l];
                let outer = delta
                    .view()
                    .insert_axis(Axis(1))
                    .dot(&a.view().insert_axis(Axis(0)));
                grads[l].weights += &outer;
                grads[l].bias += &delta;
                if l > 0 {
                    let mut back = self.layers[l].weights.t().dot(&delta);
                    back.zip_mut_with(a, |g, &act| {
                        if act <= 0.0 {
                            *g = 0.0;
                        }
                    });
                    delta = back;
                }
            }
        }

        #[expect(clippy::cast_precision_loss)]
        let scale = 1.0 / inputs.len() as f32;
        for grad in &mut grads {
            grad.weights *= scale;
            grad.bias *= scale;
        }
        adam.step(&mut self.layers, &grads);
    }

    /// Mean squared error regression on a linear head. Returns the loss
    /// before the step.
    pub fn fit_mse(
        &mut self,
        adam: &mut Adam,
        inputs: &[Array1<f32>],
        targets: &[Array1<f32>],
    ) -> f32 {
        let mut loss = 0.0;
        self.train_step(adam, inputs, |i, output| {
            let diff = output - &targets[i];
            loss += diff.mapv(|d| d * d).sum() / 2.0;
            diff
        });
        #[expect(clippy::cast_precision_loss)]
        let n = inputs.len().max(1) as f32;
        loss / n
    }

    /// REINFORCE step on a softmax head: minimizes `−A·log π(a)` per sample.
    pub fn policy_gradient_step(
        &mut self,
        adam: &mut Adam,
        inputs: &[Array1<f32>],
        actions: &[usize],
        advantages: &[f32],
    ) {
        self.train_step(adam, inputs, |i, probs| {
            let mut grad = probs * advantages[i];
            grad[actions[i]] -= advantages[i];
            grad
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Moments {
    m: Dense,
    v: Dense,
}

/// Adam optimizer state for one network.
#[derive(Debug, Clone, PartialEq)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    moments: Vec<Moments>,
}

impl Adam {
    #[must_use]
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            moments: Vec::new(),
        }
    }

    #[must_use]
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f32) {
        self.learning_rate = learning_rate;
    }

    /// Forgets the moment estimates, e.g. after loading new weights.
    pub fn reset(&mut self) {
        self.t = 0;
        self.moments.clear();
    }

    fn step(&mut self, layers: &mut [Dense], grads: &[Dense]) {
        let shapes_match = self.moments.len() == layers.len()
            && self
                .moments
                .iter()
                .zip(layers.iter())
                .all(|(m, l)| m.m.weights.raw_dim() == l.weights.raw_dim());
        if !shapes_match {
            self.moments = layers
                .iter()
                .map(|l| {
                    let zeros = Dense {
                        weights: Array2::zeros(l.weights.raw_dim()),
                        bias: Array1::zeros(l.bias.raw_dim()),
                    };
                    Moments {
                        m: zeros.clone(),
                        v: zeros,
                    }
                })
                .collect();
            self.t = 0;
        }

        self.t = self.t.saturating_add(1);
        let params = StepParams {
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            step: self.learning_rate * (1.0 - self.beta2.powi(self.t)).sqrt()
                / (1.0 - self.beta1.powi(self.t)),
        };
        for ((layer, grad), moments) in layers.iter_mut().zip(grads).zip(&mut self.moments) {
            let Moments { m, v } = moments;
            adam_update(&mut layer.weights, &grad.weights, &mut m.weights, &mut v.weights, params);
            adam_update(&mut layer.bias, &grad.bias, &mut m.bias, &mut v.bias, params);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StepParams {
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// Bias-corrected learning rate
    step: f32,
}

fn adam_update<D>(
    param: &mut Array<f32, D>,
    grad: &Array<f32, D>,
    m: &mut Array<f32, D>,
    v: &mut Array<f32, D>,
    p: StepParams,
) where
    D: Dimension,
{
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|w, &g, m, v| {
            *m = p.beta1 * *m + (1.0 - p.beta1) * g;
            *v = p.beta2 * *v + (1.0 - p.beta2) * g * g;
            *w -= p.step * *m / (v.sqrt() + p.epsilon);
        });
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn net(sizes: &[usize], head: Head) -> Mlp {
        Mlp::new(sizes, head, &mut Pcg32::seed_from_u64(21))
    }

    #[test]
    fn test_shapes_and_softmax() {
        let policy = net(&[16, 32, 16, 4], Head::Softmax);
        assert_eq!(policy.sizes(), [16, 32, 16, 4]);
        let probs = policy.forward(Array1::from_elem(16, 0.1).view());
        assert_eq!(probs.len(), 4);
        assert!((probs.sum() - 1.0).abs() < 1e-5);
        assert!(probs.iter().all(|&p| p > 0.0));

        let s = softmax(array![1000.0, 1000.0].view());
        assert!((s[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fit_mse_reduces_loss() {
        let mut model = net(&[4, 8, 1], Head::Linear);
        let mut adam = Adam::new(0.01);
        let inputs = vec![
            array![0.0, 0.1, 0.2, 0.3],
            array![0.5, 0.4, 0.3, 0.2],
            array![0.9, 0.0, 0.9, 0.0],
        ];
        let targets = vec![array![1.0], array![-1.0], array![0.5]];
        let first = model.fit_mse(&mut adam, &inputs, &targets);
        let mut last = first;
        for _ in 0..300 {
            last = model.fit_mse(&mut adam, &inputs, &targets);
        }
        assert!(last < first * 0.5, "{first} -> {last}");
    }

    #[test]
    fn test_policy_gradient_favours_rewarded_action() {
        let mut policy = net(&[4, 8, 4], Head::Softmax);
        let mut adam = Adam::new(0.01);
        let input = array![0.2, 0.4, 0.6, 0.8];
        let before = policy.forward(input.view())[2];
        for _ in 0..50 {
            policy.policy_gradient_step(&mut adam, &[input.clone()], &[2], &[1.0]);
        }
        let after = policy.forward(input.view())[2];
        assert!(after > before, "{before} -> {after}");
    }

    #[test]
    fn test_weights_serialize() {
        let model = net(&[16, 4, 1], Head::Linear);
        let json = serde_json::to_string(&model).unwrap();
        let back: Mlp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_empty_batch_is_ignored() {
        let mut model = net(&[4, 2, 1], Head::Linear);
        let before = model.clone();
        let mut adam = Adam::new(0.1);
        model.fit_mse(&mut adam, &[], &[]);
        assert_eq!(model, before);
    }
}
