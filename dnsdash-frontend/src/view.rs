//! Main view of the DNS dashboard.
//!
//! Header with the interface selector and monitoring controls, a stack of
//! banners for errors and notices, and either a placeholder or the
//! dashboard body (summary, charts, recent queries).

use iced::widget::{button, column, container, pick_list, row, scrollable, space, text, text_input};
use iced::{Color, Element, Length};

use crate::interface_registry::RegistryStatus;
use crate::messages::DashMessage;
use crate::presentation::{render, ChartSeries, DashboardView};
use crate::series_chart::{series_chart_view, ChartKind};
use crate::session::{SessionPhase, SessionStatus, StatsAvailability};
use crate::table_view::render_query_table;
use crate::ui_state::UiStateManager;

pub const SELECT_INTERFACE_PROMPT: &str = "Please select a network interface to begin monitoring.";
pub const MONITORING_PAUSED: &str =
    "Monitoring paused. Start monitoring to see live DNS traffic analytics.";
pub const NO_INTERFACES: &str = "No active interfaces";

const CHART_HEIGHT: f32 = 220.0;

/// Color palette for consistent styling
#[derive(Debug, Clone, Copy)]
pub struct ColorPalette {
    pub primary_blue: Color,
    pub success_green: Color,
    pub warning_orange: Color,
    pub error_red: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub background_primary: Color,
    pub background_card: Color,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            primary_blue: Color::from_rgb(0.2, 0.6, 1.0),
            success_green: Color::from_rgb(0.0, 0.8, 0.3),
            warning_orange: Color::from_rgb(1.0, 0.6, 0.0),
            error_red: Color::from_rgb(0.9, 0.2, 0.2),
            text_primary: Color::from_rgb(0.1, 0.1, 0.1),
            text_secondary: Color::from_rgb(0.4, 0.4, 0.4),
            background_primary: Color::from_rgb(0.97, 0.98, 1.0),
            background_card: Color::from_rgb(0.98, 0.99, 1.0),
        }
    }
}

/// Renders the main application view
pub fn render_main_view<'a>(
    status: Option<&'a SessionStatus>,
    ui_state: &'a UiStateManager,
    startup_error: Option<&'a str>,
) -> Element<'a, DashMessage> {
    let colors = ColorPalette::default();
    let bg_color = colors.background_primary;

    let mut page = column![render_header(status, ui_state, colors)].spacing(12);

    if let Some(message) = startup_error {
        page = page.push(render_banner(message.to_string(), colors.error_red, false));
    }

    let content: Element<'a, DashMessage> = match status {
        Some(status) => {
            for banner in render_status_banners(status, ui_state, colors) {
                page = page.push(banner);
            }
            render_content(status, ui_state, colors)
        }
        None => render_placeholder("Connecting to the capture backend...", colors),
    };
    page = page.push(content);

    container(scrollable(page.padding(12)))
        .width(Length::Fill)
        .height(Length::Fill)
        .style(move |_| container::Style {
            background: Some(iced::Background::Color(bg_color)),
            ..container::Style::default()
        })
        .into()
}

/// Renders the header with interface selector, polling interval and start/stop
fn render_header<'a>(
    status: Option<&'a SessionStatus>,
    ui_state: &'a UiStateManager,
    colors: ColorPalette,
) -> Element<'a, DashMessage> {
    let title = text("DNS Traffic Monitor")
        .size(22)
        .style(move |_| text::Style {
            color: Some(colors.text_primary),
        });

    let Some(status) = status else {
        return row![title].into();
    };

    let placeholder = if status.interfaces.is_empty() {
        NO_INTERFACES
    } else {
        "Select interface"
    };
    let interface_picker = pick_list(
        status.interfaces.as_slice(),
        status.interface.clone(),
        DashMessage::InterfaceSelected,
    )
    .placeholder(placeholder)
    .text_size(14)
    .width(Length::Fixed(180.0));

    let refresh = button(text("↻").size(14))
        .on_press(DashMessage::RefreshInterfaces)
        .padding([4, 8]);

    let interval_input = text_input("seconds", ui_state.polling_input())
        .on_input(DashMessage::PollingInputChanged)
        .on_submit(DashMessage::PollingInputSubmitted)
        .size(14)
        .width(Length::Fixed(70.0));

    let interval_label = text(format!("Poll every (s), now {}", status.polling_interval))
        .size(13)
        .style(move |_| text::Style {
            color: Some(colors.text_secondary),
        });

    row![
        title,
        space().width(Length::Fill),
        interface_picker,
        refresh,
        interval_label,
        interval_input,
        render_toggle_button(status, colors),
    ]
    .spacing(10)
    .align_y(iced::Alignment::Center)
    .into()
}

/// Label and press message of the Start/Stop button, or `None` while no
/// interface is selected and the button is hidden.
pub fn toggle_button_action(phase: SessionPhase) -> Option<(&'static str, Option<DashMessage>)> {
    match phase {
        SessionPhase::Unselected => None,
        SessionPhase::Idle => Some(("Start Monitoring", Some(DashMessage::StartMonitoring))),
        SessionPhase::Starting => Some(("Starting...", None)),
        SessionPhase::Monitoring => Some(("Stop Monitoring", Some(DashMessage::StopMonitoring))),
    }
}

fn render_toggle_button(status: &SessionStatus, colors: ColorPalette) -> Element<'static, DashMessage> {
    let Some((label, message)) = toggle_button_action(status.phase) else {
        return space().into();
    };
    let color = match status.phase {
        SessionPhase::Monitoring => colors.error_red,
        SessionPhase::Starting => colors.warning_orange,
        _ => colors.primary_blue,
    };

    button(text(label).size(14))
        .on_press_maybe(message)
        .padding([6, 14])
        .style(move |_, _| button::Style {
            background: Some(iced::Background::Color(color)),
            text_color: Color::WHITE,
            border: iced::Border {
                radius: 6.0.into(),
                width: 0.0,
                color: Color::TRANSPARENT,
            },
            ..button::Style::default()
        })
        .into()
}

fn render_status_banners<'a>(
    status: &'a SessionStatus,
    ui_state: &'a UiStateManager,
    colors: ColorPalette,
) -> Vec<Element<'a, DashMessage>> {
    let mut banners = Vec::new();

    if let Some(error) = &status.error {
        banners.push(render_banner(error.to_string(), colors.error_red, false));
    }
    if let RegistryStatus::Unavailable(reason) = &status.registry {
        banners.push(render_banner(
            format!("{}. Use ↻ to retry.", reason),
            colors.warning_orange,
            false,
        ));
    }
    if status.is_monitoring() {
        if let StatsAvailability::Unavailable(reason) = &status.stats {
            banners.push(render_banner(reason.clone(), colors.warning_orange, false));
        }
    }
    if let Some(error) = ui_state.input_error() {
        banners.push(render_banner(error.to_string(), colors.warning_orange, false));
    }
    if let Some(notice) = ui_state.visible_notice(status) {
        banners.push(render_banner(notice.to_string(), colors.primary_blue, true));
    }

    banners
}

fn render_banner(message: String, color: Color, dismissible: bool) -> Element<'static, DashMessage> {
    let mut content = row![text(message).size(13).style(move |_| text::Style {
        color: Some(color)
    })]
    .spacing(8)
    .align_y(iced::Alignment::Center);

    if dismissible {
        content = content.push(space().width(Length::Fill)).push(
            button(text("✕").size(12))
                .on_press(DashMessage::DismissNotice)
                .padding([0, 6]),
        );
    }

    container(content)
        .padding([6, 10])
        .width(Length::Fill)
        .style(move |_| container::Style {
            background: Some(iced::Background::Color(Color { a: 0.08, ..color })),
            border: iced::Border {
                radius: 4.0.into(),
                width: 1.0,
                color: Color { a: 0.4, ..color },
            },
            ..container::Style::default()
        })
        .into()
}

fn render_content<'a>(
    status: &'a SessionStatus,
    ui_state: &'a UiStateManager,
    colors: ColorPalette,
) -> Element<'a, DashMessage> {
    match status.phase {
        SessionPhase::Unselected => render_placeholder(SELECT_INTERFACE_PROMPT, colors),
        SessionPhase::Idle => render_placeholder(MONITORING_PAUSED, colors),
        SessionPhase::Starting | SessionPhase::Monitoring => match &status.snapshot {
            Some(snapshot) => render_dashboard(&render(snapshot, ui_state.pagination()), colors),
            None => render_placeholder(
                &format!(
                    "Waiting for statistics from {}...",
                    status.interface.as_deref().unwrap_or_default()
                ),
                colors,
            ),
        },
    }
}

fn render_placeholder(message: &str, colors: ColorPalette) -> Element<'static, DashMessage> {
    container(
        text(message.to_string())
            .size(16)
            .style(move |_| text::Style {
                color: Some(colors.text_secondary),
            }),
    )
    .padding(40)
    .center_x(Length::Fill)
    .into()
}

fn render_dashboard(view: &DashboardView, colors: ColorPalette) -> Element<'static, DashMessage> {
    let summary = card(
        column![
            text("Total Queries").size(14).style(move |_| text::Style {
                color: Some(colors.text_secondary)
            }),
            text(view.total_queries.to_string())
                .size(32)
                .style(move |_| text::Style {
                    color: Some(colors.primary_blue)
                }),
        ]
        .spacing(4),
        colors,
    );

    let timeline = chart_card(&view.queries_over_time, ChartKind::Line, colors);

    column![
        row![summary, timeline].spacing(12),
        row![
            chart_card(&view.top_domains, ChartKind::Bars, colors),
            chart_card(&view.top_clients, ChartKind::Bars, colors),
        ]
        .spacing(12),
        row![
            chart_card(&view.query_types, ChartKind::Bars, colors),
            chart_card(&view.protocols, ChartKind::Bars, colors),
        ]
        .spacing(12),
        row![
            chart_card(&view.response_codes, ChartKind::Bars, colors),
            chart_card(&view.ports, ChartKind::Bars, colors),
        ]
        .spacing(12),
        card(render_query_table(view, colors), colors),
    ]
    .spacing(12)
    .into()
}

fn chart_card(series: &ChartSeries, kind: ChartKind, colors: ColorPalette) -> Element<'static, DashMessage> {
    card(
        column![
            text(series.title).size(15).style(move |_| text::Style {
                color: Some(colors.text_primary)
            }),
            series_chart_view(series, kind, CHART_HEIGHT),
        ]
        .spacing(6),
        colors,
    )
}

fn card<'a>(
    content: impl Into<Element<'a, DashMessage>>,
    colors: ColorPalette,
) -> Element<'a, DashMessage> {
    container(content)
        .padding(12)
        .width(Length::Fill)
        .style(move |_| container::Style {
            background: Some(iced::Background::Color(colors.background_card)),
            border: iced::Border {
                radius: 8.0.into(),
                width: 1.0,
                color: Color::from_rgb(0.88, 0.92, 0.98),
            },
            ..container::Style::default()
        })
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_button_hidden_until_interface_selected() {
        assert!(toggle_button_action(SessionPhase::Unselected).is_none());

        let (label, message) = toggle_button_action(SessionPhase::Idle).unwrap();
        assert_eq!(label, "Start Monitoring");
        assert!(matches!(message, Some(DashMessage::StartMonitoring)));
    }

    #[test]
    fn test_toggle_button_disabled_while_starting() {
        let (_, message) = toggle_button_action(SessionPhase::Starting).unwrap();
        assert!(message.is_none());

        let (label, message) = toggle_button_action(SessionPhase::Monitoring).unwrap();
        assert_eq!(label, "Stop Monitoring");
        assert!(matches!(message, Some(DashMessage::StopMonitoring)));
    }
}
