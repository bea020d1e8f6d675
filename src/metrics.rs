use std::io::Write;

/// Aggregate measurements for one simulated timestep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// The simulated time of the step.
    pub time: f64,
    /// The number of active vehicles after the step.
    pub active: usize,
    /// Mean over active vehicles of each one's distance to its closest
    /// active neighbour; NaN with fewer than 2 active vehicles.
    pub mean_closest: f64,
    /// Mean of all finite pairwise distances; NaN with fewer than
    /// 2 active vehicles.
    pub mean_pairwise: f64,
}

/// Append-only time series of per-step aggregates.
///
/// Exposed read-only to the persistence layer; never trimmed or
/// rewritten in place.
#[derive(Debug, Default)]
pub struct Metrics {
    samples: Vec<Sample>,
}

impl Metrics {
    pub(crate) fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// The recorded samples, one per step, in step order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Writes the series as CSV: a header row, then one row per step.
    /// NaN aggregates are written as empty cells.
    pub fn write_csv(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "Time,ActiveVehicleCount,AvgClosestDist,AvgDist")?;
        for sample in &self.samples {
            writeln!(
                out,
                "{},{},{},{}",
                sample.time,
                sample.active,
                csv_field(sample.mean_closest),
                csv_field(sample.mean_pairwise),
            )?;
        }
        Ok(())
    }
}

fn csv_field(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}
