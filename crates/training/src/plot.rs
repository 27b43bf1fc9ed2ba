//! Loss-curve PNG for a finished training run.

use crate::metrics::LossHistory;
use plotters::prelude::*;
use std::path::Path;

const PLOT_WIDTH: u32 = 800;
const PLOT_HEIGHT: u32 = 600;

/// Draw training and test loss per epoch into a PNG at `path`.
///
/// The test curve is omitted when no epoch had a test split.
pub fn plot_losses(path: &Path, title: &str, history: &LossHistory) -> anyhow::Result<()> {
    let train = history.train_curve();
    let test = history.test_curve();
    if train.is_empty() {
        anyhow::bail!("no epochs to plot");
    }

    let root = BitMapBackend::new(path, (PLOT_WIDTH, PLOT_HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = train.len() as f64 + 0.5;
    let (y_min, y_max) = loss_range(train.iter().chain(test.iter()).map(|&(_, y)| y));
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.5..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Epoch")
        .y_desc("MSE Loss")
        .draw()?;

    chart
        .draw_series(LineSeries::new(train, &BLUE))?
        .label("training")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
    if !test.is_empty() {
        chart
            .draw_series(LineSeries::new(test, &RED))?
            .label("test")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Padded y range over the finite values; `0..1` when there are none.
fn loss_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.1).max(1e-3);
    ((lo - pad).max(0.0), hi + pad)
}
