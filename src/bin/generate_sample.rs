use anyhow::{Context, Result};
use num_complex::Complex64;
use uff_tables::{write_file, Ordinate, UffRecord};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Single degree of freedom receptance `1 / (k - m w^2 + i c w)`.
fn sdof_frf(freq_hz: f64, fn_hz: f64, zeta: f64) -> Complex64 {
    let w = 2.0 * std::f64::consts::PI * freq_hz;
    let wn = 2.0 * std::f64::consts::PI * fn_hz;
    Complex64::new(1.0, 0.0) / Complex64::new(wn * wn - w * w, 2.0 * zeta * wn * w)
}

fn point(id1: String, func_type: i64, node: i64, x: Vec<f64>, data: Ordinate) -> UffRecord {
    UffRecord::new(id1, func_type, x, data)
        .with_field("id2", "uff-tables sample")
        .with_field("rsp_ent_name", "sample")
        .with_field("rsp_node", node)
        .with_field("rsp_dir", 3i64)
        .with_field("ref_node", 1i64)
        .with_field("ref_dir", 3i64)
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let mut records = Vec::new();

    // Time responses: 1 kHz sampling, 512 samples
    let dt = 0.001;
    let t: Vec<f64> = (0..512).map(|i| i as f64 * dt).collect();
    for node in 1..=3i64 {
        let fn_hz = 40.0 * node as f64;
        let y = t
            .iter()
            .map(|&ti| {
                (-4.0 * ti).exp() * (2.0 * std::f64::consts::PI * fn_hz * ti).sin()
                    + rng.gauss(0.0, 0.01)
            })
            .collect();
        records.push(
            point(format!("Pt={node:>3};  Dir=+Z"), 1, node, t.clone(), Ordinate::Real(y))
                .with_field("abscissa_axis_lab", "Time")
                .with_field("abscissa_axis_units_lab", "s")
                .with_field("ordinate_axis_lab", "Acceleration"),
        );
    }

    // FRFs on a 0.5 Hz grid; the last point uses a coarser grid to show row alignment
    for node in 1..=3i64 {
        let df = if node == 3 { 1.0 } else { 0.5 };
        let f: Vec<f64> = (0..400).map(|i| i as f64 * df).collect();
        let h = f
            .iter()
            .map(|&fi| sdof_frf(fi, 40.0 * node as f64, 0.02) * (1.0 + rng.gauss(0.0, 0.005)))
            .collect();
        records.push(
            point(format!("Pt={node:>3};  Dir=+Z / Pt=  1;  Dir=+Z"), 4, node, f, Ordinate::Complex(h))
                .with_field("abscissa_axis_lab", "Frequency")
                .with_field("abscissa_axis_units_lab", "Hz"),
        );
    }

    // Coherence between the first two points
    let f: Vec<f64> = (0..400).map(|i| i as f64 * 0.5).collect();
    let coh = f.iter().map(|_| (0.95 + rng.gauss(0.0, 0.02)).min(1.0)).collect();
    records.push(point("Coh Pt=  1 / Pt=  2".to_string(), 6, 2, f, Ordinate::Real(coh)));

    // Records the reader leaves out with a warning
    records.push(point("Unknown channel".to_string(), 0, 9, vec![0.0, 1.0], Ordinate::Real(vec![0.0, 0.0])));
    let bins: Vec<f64> = (0..21).map(|i| -1.0 + i as f64 * 0.1).collect();
    let pdf = bins.iter().map(|b| (-b * b * 8.0).exp()).collect();
    records.push(point("Amplitude PDF Pt=  1".to_string(), 11, 1, bins, Ordinate::Real(pdf)));

    let output_path = "sample_data.uff";
    write_file(output_path, &records).with_context(|| format!("writing {output_path}"))?;

    println!("Wrote {} function records to {output_path}", records.len());
    Ok(())
}
