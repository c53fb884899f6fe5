//! Recent DNS queries table.
//!
//! Renders the current page of [`QueryRow`]s with the Iced 0.14 table widget
//! and a pagination footer (rows per page, position label, previous/next).

use iced::widget::{button, column, container, pick_list, row, space, table, text};
use iced::{Color, Element, Length};

use crate::messages::DashMessage;
use crate::presentation::{DashboardView, PageInfo, QueryRow, ROWS_PER_PAGE_OPTIONS};
use crate::view::ColorPalette;

const TEXT_SIZE: f32 = 12.0;

// Helper functions to create styled text cells
fn text_cell(content: String, color: Color) -> Element<'static, DashMessage> {
    text(content)
        .size(TEXT_SIZE)
        .style(move |_| text::Style { color: Some(color) })
        .into()
}

fn header_cell(content: &'static str, color: Color) -> Element<'static, DashMessage> {
    text(content)
        .size(TEXT_SIZE)
        .style(move |_| text::Style { color: Some(color) })
        .into()
}

/// Render the recent queries table with its pagination footer
pub fn render_query_table(
    view: &DashboardView,
    colors: ColorPalette,
) -> Element<'static, DashMessage> {
    let title = text("Recent Queries")
        .size(16)
        .style(move |_| text::Style {
            color: Some(colors.text_primary),
        });

    let body: Element<'static, DashMessage> = if view.rows.is_empty() {
        container(
            text("No queries captured yet")
                .size(14)
                .style(move |_| text::Style {
                    color: Some(colors.text_secondary),
                }),
        )
        .padding(20)
        .center_x(Length::Fill)
        .into()
    } else {
        render_rows(view.rows.clone(), colors)
    };

    column![title, body, render_pagination(&view.page, colors)]
        .spacing(8)
        .into()
}

fn render_rows(rows: Vec<QueryRow>, colors: ColorPalette) -> Element<'static, DashMessage> {
    let primary = colors.text_primary;
    let secondary = colors.text_secondary;
    let success = colors.success_green;
    let error = colors.error_red;

    let time_col = table::column(
        header_cell("Time", primary),
        move |row: QueryRow| -> Element<'static, DashMessage> { text_cell(row.time, secondary) },
    )
    .width(Length::Fixed(80.0));

    let client_col = table::column(
        header_cell("Source IP", primary),
        move |row: QueryRow| -> Element<'static, DashMessage> { text_cell(row.client, primary) },
    )
    .width(Length::Fixed(130.0));

    let server_col = table::column(
        header_cell("Destination IP", primary),
        move |row: QueryRow| -> Element<'static, DashMessage> { text_cell(row.server, primary) },
    )
    .width(Length::Fixed(130.0));

    let domain_col = table::column(
        header_cell("Domain", primary),
        move |row: QueryRow| -> Element<'static, DashMessage> { text_cell(row.domain, primary) },
    )
    .width(Length::Fill);

    let qtype_col = table::column(
        header_cell("Type", primary),
        move |row: QueryRow| -> Element<'static, DashMessage> { text_cell(row.qtype, secondary) },
    )
    .width(Length::Fixed(60.0))
    .align_x(iced::alignment::Horizontal::Center);

    let protocol_col = table::column(
        header_cell("Protocol", primary),
        move |row: QueryRow| -> Element<'static, DashMessage> {
            text_cell(row.protocol, secondary)
        },
    )
    .width(Length::Fixed(70.0))
    .align_x(iced::alignment::Horizontal::Center);

    let ports_col = table::column(
        header_cell("Ports", primary),
        move |row: QueryRow| -> Element<'static, DashMessage> {
            text_cell(format!("{} → {}", row.src_port, row.dst_port), secondary)
        },
    )
    .width(Length::Fixed(110.0));

    let rcode_col = table::column(
        header_cell("Response Code", primary),
        move |row: QueryRow| -> Element<'static, DashMessage> {
            let color = match row.rcode.as_str() {
                "NOERROR" => success,
                "-" => secondary,
                _ => error,
            };
            text_cell(row.rcode, color)
        },
    )
    .width(Length::Fixed(110.0));

    let response_col = table::column(
        header_cell("Response", primary),
        move |row: QueryRow| -> Element<'static, DashMessage> {
            text_cell(row.response.to_string(), secondary)
        },
    )
    .width(Length::Fixed(70.0))
    .align_x(iced::alignment::Horizontal::Center);

    table(
        [
            time_col,
            client_col,
            server_col,
            domain_col,
            qtype_col,
            protocol_col,
            ports_col,
            rcode_col,
            response_col,
        ],
        rows,
    )
    .padding_x(8)
    .padding_y(4)
    .separator_x(1.0)
    .separator_y(1.0)
    .width(Length::Fill)
    .into()
}

fn render_pagination(page: &PageInfo, colors: ColorPalette) -> Element<'static, DashMessage> {
    let secondary = colors.text_secondary;

    let rows_per_page = pick_list(
        ROWS_PER_PAGE_OPTIONS.to_vec(),
        Some(page.rows_per_page),
        DashMessage::RowsPerPageSelected,
    )
    .text_size(TEXT_SIZE)
    .padding(4);

    let previous = button(text("‹").size(14))
        .on_press_maybe(page.has_previous().then_some(DashMessage::PreviousPage))
        .padding([2, 10]);
    let next = button(text("›").size(14))
        .on_press_maybe(page.has_next().then_some(DashMessage::NextPage))
        .padding([2, 10]);

    row![
        space().width(Length::Fill),
        text("Rows per page:")
            .size(TEXT_SIZE)
            .style(move |_| text::Style {
                color: Some(secondary)
            }),
        rows_per_page,
        text(page.label.clone())
            .size(TEXT_SIZE)
            .style(move |_| text::Style {
                color: Some(secondary)
            }),
        previous,
        next,
    ]
    .spacing(10)
    .align_y(iced::Alignment::Center)
    .into()
}
