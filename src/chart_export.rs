//! Chart export to PNG (plotters bitmap).

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::Path;

use crate::axis::AxisData;
use crate::quantiles::QuantilesVector;

pub const PNG_FILE_NAME: &str = "quantiles2d.png";
pub const PNG_SIZE: (u32, u32) = (1024, 640);

/// Titles and the Y range of an exported quartile chart.
#[derive(Debug, Clone, PartialEq)]
pub struct QuartilesExportBounds {
    pub chart_title: String,
    pub x_label: String,
    pub y_label: String,
    pub y_min: f64,
    pub y_max: f64,
}

/// Write one box per bucket to PNG. Size is (width, height) in pixels.
pub fn write_quartiles_png(
    path: &Path,
    data: &QuantilesVector,
    axis: &AxisData,
    bounds: &QuartilesExportBounds,
    (width, height): (u32, u32),
) -> Result<()> {
    use plotters::prelude::*;

    if data.is_empty() {
        return Err(eyre!("No data to export"));
    }
    let (y_min, y_max) = if bounds.y_max > bounds.y_min {
        (bounds.y_min, bounds.y_max)
    } else {
        (bounds.y_min - 0.5, bounds.y_max + 0.5)
    };

    let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_min = -0.5;
    let x_max = (data.len() as f64 - 1.0).max(0.0) + 0.5;
    let mut binding = ChartBuilder::on(&root);
    let builder = binding.margin(30);
    let builder = if bounds.chart_title.is_empty() {
        builder
    } else {
        builder.caption(bounds.chart_title.as_str(), ("sans-serif", 20))
    };
    let mut chart = builder
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let labels: Vec<String> = (0..data.len())
        .map(|bucket| axis.bucket_description(bucket, 16))
        .collect();
    let label_count = labels.len();
    chart
        .configure_mesh()
        .x_labels(label_count.min(12))
        .x_desc(bounds.x_label.as_str())
        .y_desc(bounds.y_label.as_str())
        .x_label_formatter(&move |v: &f64| {
            let idx = v.round();
            if idx >= 0.0 && (idx as usize) < labels.len() && (v - idx).abs() < 0.25 {
                labels[idx as usize].clone()
            } else {
                String::new()
            }
        })
        .draw()?;

    let box_color = CYAN;
    let median_color = RGBColor(200, 150, 0);
    let box_half = 0.3;
    let cap_half = 0.2;

    for (idx, entry) in data.data.iter().enumerate() {
        let x = idx as f64;
        if entry.empty {
            chart.draw_series(std::iter::once(Cross::new(
                (x, (y_min + y_max) / 2.0),
                4,
                ShapeStyle::from(&BLACK.mix(0.4)),
            )))?;
            continue;
        }
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x - cap_half, entry.min), (x + cap_half, entry.min)],
            BLACK,
        )))?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x - cap_half, entry.max), (x + cap_half, entry.max)],
            BLACK,
        )))?;
        let (Some(q1), Some(median), Some(q3)) = (entry.q1(), entry.median(), entry.q3()) else {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x, entry.min), (x, entry.max)],
                BLACK,
            )))?;
            continue;
        };
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, entry.min), (x, q1)],
            BLACK,
        )))?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, q3), (x, entry.max)],
            BLACK,
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - box_half, q1), (x + box_half, q3)],
            ShapeStyle::from(&box_color).stroke_width(1),
        )))?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x - box_half, median), (x + box_half, median)],
            ShapeStyle::from(&median_color).stroke_width(2),
        )))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::DataRange;
    use crate::schema::{ColumnDescription, ContentsKind};

    #[test]
    fn empty_vector_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let axis = AxisData::new(
            ColumnDescription::new("x", ContentsKind::Double),
            Some(DataRange::numeric(0.0, 1.0, 1, 0)),
            1,
        );
        let bounds = QuartilesExportBounds {
            chart_title: String::new(),
            x_label: "x".into(),
            y_label: "q".into(),
            y_min: 0.0,
            y_max: 1.0,
        };
        let path = dir.path().join(PNG_FILE_NAME);
        assert!(write_quartiles_png(&path, &QuantilesVector::default(), &axis, &bounds, PNG_SIZE).is_err());
        assert!(!path.exists());
    }
}
