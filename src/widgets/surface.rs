use ratatui::layout::Rect;

/// Cells reserved around the chart for the title and axis labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub top: u16,
    pub bottom: u16,
    pub left: u16,
    pub right: u16,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 1,
            bottom: 2,
            left: 10,
            right: 1,
        }
    }
}

/// A page area split into a chart and the margins around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlottingSurface {
    area: Rect,
    margins: Margins,
}

impl PlottingSurface {
    pub fn new(area: Rect) -> Self {
        Self::with_margins(area, Margins::default())
    }

    pub fn with_margins(area: Rect, margins: Margins) -> Self {
        Self { area, margins }
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    pub fn chart_area(&self) -> Rect {
        let m = self.margins;
        let width = self.area.width.saturating_sub(m.left + m.right);
        let height = self.area.height.saturating_sub(m.top + m.bottom);
        Rect::new(
            self.area.x + m.left.min(self.area.width),
            self.area.y + m.top.min(self.area.height),
            width,
            height,
        )
    }

    pub fn chart_width(&self) -> u16 {
        self.chart_area().width
    }

    pub fn chart_height(&self) -> u16 {
        self.chart_area().height
    }

    /// Screen cell to chart-relative cell; negative or past the edge when outside the chart.
    pub fn to_chart(&self, column: u16, row: u16) -> (i32, i32) {
        let chart = self.chart_area();
        (
            column as i32 - chart.x as i32,
            row as i32 - chart.y as i32,
        )
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        let (x, y) = self.to_chart(column, row);
        x >= 0 && y >= 0 && x < self.chart_width() as i32 && y < self.chart_height() as i32
    }
}
