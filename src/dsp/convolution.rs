//! Convolution reverb engine.
//!
//! Uniformly partitioned overlap-save convolution (UPOLS):
//!
//! ```text
//!   impulse response  h = [h0 | h1 | ... | hK-1]     K partitions of P samples
//!   filter spectra    Hk = FFT(hk zero-padded to 2P)
//!
//!   every P input samples:
//!     X   = FFT([previous P inputs | newest P inputs])
//!     push X to the front of the frequency-domain delay line (FDL)
//!     Y   = sum_k FDL[k] * Hk
//!     y   = last P samples of IFFT(Y) / 2P
//! ```
//!
//! The output block computed from inputs `n..n+P` is emitted while the next
//! `P` inputs arrive, so the convolver has a latency of exactly `P` samples
//! regardless of the impulse length. Cost per sample grows with `K`, not with
//! the impulse length times the block size.
//!
//! All buffers are allocated up front; `process` never allocates.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

pub const DEFAULT_PARTITION: usize = 256;

pub struct Convolver {
    partition: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    /// Spectrum of each impulse partition
    filters: Vec<Vec<Complex<f32>>>,
    /// Input spectra, newest at `fdl_head`
    fdl: Vec<Vec<Complex<f32>>>,
    fdl_head: usize,
    /// Time-domain window of the last 2P inputs
    window: Vec<f32>,
    /// Output samples for the current block
    ready: Vec<f32>,
    fill: usize,
    spectrum: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Convolver {
    pub fn new(impulse: &[f32]) -> Self {
        Self::with_partition(impulse, DEFAULT_PARTITION)
    }

    pub fn with_partition(impulse: &[f32], partition: usize) -> Self {
        let partition = partition.max(1);
        let size = partition * 2;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        let scratch_len = fft
            .get_inplace_scratch_len()
            .max(ifft.get_inplace_scratch_len());
        let mut scratch = vec![Complex::new(0.0, 0.0); scratch_len];

        let filters: Vec<Vec<Complex<f32>>> = if impulse.is_empty() {
            vec![vec![Complex::new(0.0, 0.0); size]]
        } else {
            impulse
                .chunks(partition)
                .map(|chunk| {
                    let mut spectrum = vec![Complex::new(0.0, 0.0); size];
                    for (bin, &sample) in spectrum.iter_mut().zip(chunk) {
                        bin.re = sample;
                    }
                    fft.process_with_scratch(&mut spectrum, &mut scratch);
                    spectrum
                })
                .collect()
        };

        let fdl = vec![vec![Complex::new(0.0, 0.0); size]; filters.len()];

        Self {
            partition,
            fft,
            ifft,
            filters,
            fdl,
            fdl_head: 0,
            window: vec![0.0; size],
            ready: vec![0.0; partition],
            fill: 0,
            spectrum: vec![Complex::new(0.0, 0.0); size],
            accum: vec![Complex::new(0.0, 0.0); size],
            scratch,
        }
    }

    /// Samples between an input and its first contribution to the output.
    pub fn latency(&self) -> usize {
        self.partition
    }

    pub fn partitions(&self) -> usize {
        self.filters.len()
    }

    #[inline]
    pub fn next_sample(&mut self, input: f32) -> f32 {
        let output = self.ready[self.fill];
        self.window[self.partition + self.fill] = input;
        self.fill += 1;

        if self.fill == self.partition {
            self.convolve_block();
            self.fill = 0;
        }

        output
    }

    pub fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    fn convolve_block(&mut self) {
        let size = self.window.len();
        let count = self.filters.len();

        for (bin, &sample) in self.spectrum.iter_mut().zip(&self.window) {
            *bin = Complex::new(sample, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        self.fdl_head = (self.fdl_head + count - 1) % count;
        self.fdl[self.fdl_head].copy_from_slice(&self.spectrum);

        self.accum.fill(Complex::new(0.0, 0.0));
        for (k, filter) in self.filters.iter().enumerate() {
            let input = &self.fdl[(self.fdl_head + k) % count];
            for ((acc, x), h) in self.accum.iter_mut().zip(input).zip(filter) {
                *acc += x * h;
            }
        }

        self.ifft
            .process_with_scratch(&mut self.accum, &mut self.scratch);

        let norm = 1.0 / size as f32;
        for (out, bin) in self.ready.iter_mut().zip(&self.accum[self.partition..]) {
            *out = bin.re * norm;
        }

        self.window.copy_within(self.partition.., 0);
    }

    pub fn reset(&mut self) {
        for spectrum in &mut self.fdl {
            spectrum.fill(Complex::new(0.0, 0.0));
        }
        self.window.fill(0.0);
        self.ready.fill(0.0);
        self.fill = 0;
    }
}

impl std::fmt::Debug for Convolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Convolver")
            .field("partition", &self.partition)
            .field("partitions", &self.filters.len())
            .finish()
    }
}
