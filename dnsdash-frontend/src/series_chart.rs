//! Canvas charts for the dashboard's count series.
//!
//! One stateless canvas program draws either a line (time series) or
//! vertical bars (categorical counts). Points are drawn in the order they
//! arrive in the [`ChartSeries`].

use iced::widget::canvas::{self, Frame, Geometry, Path, Stroke, Text};
use iced::{mouse, Color, Element, Length, Point, Rectangle, Renderer, Size, Theme};

use crate::presentation::ChartSeries;

/// How a series is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bars,
}

#[derive(Debug, Clone, Copy)]
pub struct ChartColors {
    pub data: Color,
    pub grid: Color,
    pub axis: Color,
    pub text: Color,
    pub background: Color,
}

impl Default for ChartColors {
    fn default() -> Self {
        Self {
            data: Color::from_rgb(0.13, 0.59, 0.95),
            grid: Color::from_rgba(0.5, 0.5, 0.5, 0.3),
            axis: Color::from_rgb(0.4, 0.4, 0.4),
            text: Color::from_rgb(0.45, 0.45, 0.45),
            background: Color::from_rgba(0.95, 0.95, 0.95, 0.5),
        }
    }
}

struct ChartPadding {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

const PADDING: ChartPadding = ChartPadding {
    left: 45.0,
    right: 10.0,
    top: 10.0,
    bottom: 34.0,
};

/// Canvas element for `series`.
pub fn series_chart_view<Message: 'static>(
    series: &ChartSeries,
    kind: ChartKind,
    height: f32,
) -> Element<'static, Message, Theme, Renderer> {
    iced::widget::Canvas::new(SeriesChart {
        series: series.clone(),
        kind,
        colors: ChartColors::default(),
    })
    .width(Length::Fill)
    .height(Length::Fixed(height))
    .into()
}

struct SeriesChart {
    series: ChartSeries,
    kind: ChartKind,
    colors: ChartColors,
}

impl<Message> canvas::Program<Message, Theme, Renderer> for SeriesChart {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        self.draw_chart(&mut frame, bounds.size());
        vec![frame.into_geometry()]
    }
}

impl SeriesChart {
    fn draw_chart(&self, frame: &mut Frame, size: Size) {
        let width = size.width - PADDING.left - PADDING.right;
        let height = size.height - PADDING.top - PADDING.bottom;
        if width <= 0.0 || height <= 0.0 {
            return;
        }

        frame.fill_rectangle(
            Point::new(PADDING.left, PADDING.top),
            Size::new(width, height),
            self.colors.background,
        );

        if self.series.is_empty() {
            self.draw_no_data(frame, size);
            return;
        }

        let max_value = scale_max(self.series.max_value());
        self.draw_grid(frame, width, height, max_value);

        match self.kind {
            ChartKind::Line => self.draw_line(frame, width, height, max_value),
            ChartKind::Bars => self.draw_bars(frame, width, height, max_value),
        }

        self.draw_labels(frame, width, height);
        self.draw_axes(frame, width, height);
    }

    /// Horizontal position of the centre of slot `index`.
    fn slot_x(&self, index: usize, width: f32) -> f32 {
        let slot = width / self.series.points.len() as f32;
        PADDING.left + slot * (index as f32 + 0.5)
    }

    fn value_y(value: u64, height: f32, max_value: u64) -> f32 {
        PADDING.top + height * (1.0 - value as f32 / max_value as f32)
    }

    fn draw_line(&self, frame: &mut Frame, width: f32, height: f32, max_value: u64) {
        let path = Path::new(|builder| {
            for (index, (_, value)) in self.series.points.iter().enumerate() {
                let point = Point::new(
                    self.slot_x(index, width),
                    Self::value_y(*value, height, max_value),
                );
                if index == 0 {
                    builder.move_to(point);
                } else {
                    builder.line_to(point);
                }
            }
        });
        frame.stroke(
            &path,
            Stroke::default().with_width(2.0).with_color(self.colors.data),
        );

        if self.series.points.len() == 1 {
            let (_, value) = &self.series.points[0];
            let dot = Path::circle(
                Point::new(self.slot_x(0, width), Self::value_y(*value, height, max_value)),
                3.0,
            );
            frame.fill(&dot, self.colors.data);
        }
    }

    fn draw_bars(&self, frame: &mut Frame, width: f32, height: f32, max_value: u64) {
        let slot = width / self.series.points.len() as f32;
        let bar_width = (slot * 0.7).max(1.0);

        for (index, (_, value)) in self.series.points.iter().enumerate() {
            let top = Self::value_y(*value, height, max_value);
            frame.fill_rectangle(
                Point::new(self.slot_x(index, width) - bar_width / 2.0, top),
                Size::new(bar_width, PADDING.top + height - top),
                self.colors.data,
            );
        }
    }

    fn draw_grid(&self, frame: &mut Frame, width: f32, height: f32, max_value: u64) {
        for i in 0..=4 {
            let y = PADDING.top + height * (i as f32 / 4.0);
            let path = Path::line(
                Point::new(PADDING.left, y),
                Point::new(PADDING.left + width, y),
            );
            frame.stroke(
                &path,
                Stroke::default().with_width(1.0).with_color(self.colors.grid),
            );

            let value = max_value * (4 - i) / 4;
            frame.fill_text(Text {
                content: value.to_string(),
                position: Point::new(PADDING.left - 5.0, y),
                color: self.colors.text,
                size: 10.0.into(),
                align_x: iced::alignment::Horizontal::Right.into(),
                align_y: iced::alignment::Vertical::Center,
                ..Default::default()
            });
        }
    }

    /// Category labels under the x axis, thinned out when crowded.
    fn draw_labels(&self, frame: &mut Frame, width: f32, height: f32) {
        let count = self.series.points.len();
        let step = label_step(count, width);

        for (index, (label, _)) in self.series.points.iter().enumerate() {
            if index % step != 0 {
                continue;
            }
            frame.fill_text(Text {
                content: shorten(label, 14),
                position: Point::new(self.slot_x(index, width), PADDING.top + height + 6.0),
                color: self.colors.text,
                size: 9.0.into(),
                align_x: iced::alignment::Horizontal::Center.into(),
                align_y: iced::alignment::Vertical::Top,
                ..Default::default()
            });
        }
    }

    fn draw_axes(&self, frame: &mut Frame, width: f32, height: f32) {
        let y_axis = Path::line(
            Point::new(PADDING.left, PADDING.top),
            Point::new(PADDING.left, PADDING.top + height),
        );
        let x_axis = Path::line(
            Point::new(PADDING.left, PADDING.top + height),
            Point::new(PADDING.left + width, PADDING.top + height),
        );
        for axis in [y_axis, x_axis] {
            frame.stroke(
                &axis,
                Stroke::default().with_width(1.0).with_color(self.colors.axis),
            );
        }
    }

    fn draw_no_data(&self, frame: &mut Frame, size: Size) {
        frame.fill_text(Text {
            content: "No data yet".to_string(),
            position: Point::new(size.width / 2.0, size.height / 2.0),
            color: self.colors.text,
            size: 12.0.into(),
            align_x: iced::alignment::Horizontal::Center.into(),
            align_y: iced::alignment::Vertical::Center,
            ..Default::default()
        });
    }
}

/// Y-axis maximum: at least 4 so the grid labels stay integral, rounded up
/// to a multiple of 4.
fn scale_max(max_value: u64) -> u64 {
    max_value.max(4).div_ceil(4) * 4
}

/// Draw every `n`th label so neighbouring labels keep ~60px apart.
fn label_step(count: usize, width: f32) -> usize {
    if count == 0 {
        return 1;
    }
    let fitting = ((width / 60.0).floor() as usize).max(1);
    count.div_ceil(fitting).max(1)
}

fn shorten(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let head: String = label.chars().take(max_chars - 1).collect();
        format!("{}…", head)
    }
}
