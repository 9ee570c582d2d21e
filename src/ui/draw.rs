use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use ratatui::{Frame, Terminal};

use crate::capture::SearchBar;
use crate::config::{NavVariant, RgbColor};
use crate::resolver::ResultsPage;
use crate::route::Route;

use super::app::{App, Focus};

const LOGO: &str = "ShopEase";
const HELP_MODAL_FOOTER: &str = "j/k: scroll  Esc/q: close";

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_nav_bar(frame, layout[0], app);
    draw_body(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
    draw_help_modal(frame, size, app);
}

// =============================================================================
// Navigation bar
// =============================================================================

fn draw_nav_bar(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    match app.nav_variant() {
        NavVariant::Default => draw_default_nav(frame, inner, app),
        NavVariant::Auth => draw_auth_nav(frame, inner, app),
    }
}

fn draw_default_nav(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let route = app.route();
    let links = [("Shop", Route::Home), ("Men", Route::Men), ("Women", Route::Women)];
    let icons = [
        ("Wishlist".to_string(), Route::Wishlist),
        ("Account".to_string(), Route::Account),
        (cart_label(app.cart_count()), Route::Cart),
    ];

    let links_line = link_line(app, &links.map(|(label, r)| (label.to_string(), r)), &route);
    let icons_line = link_line(app, &icons, &route);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(LOGO.len() as u16 + 2),
            Constraint::Length(links_line.width() as u16 + 2),
            Constraint::Min(10),
            Constraint::Length(icons_line.width() as u16 + 1),
        ])
        .split(area);

    frame.render_widget(Paragraph::new(logo_line(app)), chunks[0]);
    frame.render_widget(Paragraph::new(links_line), chunks[1]);
    draw_search_field(frame, chunks[2], app);
    frame.render_widget(
        Paragraph::new(icons_line).alignment(Alignment::Right),
        chunks[3],
    );
}

fn draw_auth_nav(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let route = app.route();
    let links = [
        ("Login".to_string(), Route::Login),
        ("Signup".to_string(), Route::Register),
    ];
    let links_line = link_line(app, &links, &route);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(links_line.width() as u16 + 1)])
        .split(area);

    frame.render_widget(Paragraph::new(logo_line(app)), chunks[0]);
    frame.render_widget(
        Paragraph::new(links_line).alignment(Alignment::Right),
        chunks[1],
    );
}

fn logo_line(app: &App) -> Line<'static> {
    Line::from(Span::styled(
        LOGO,
        header_text_style(app).add_modifier(Modifier::BOLD),
    ))
}

/// Badge count is shown only when the cart is not empty.
fn cart_label(count: usize) -> String {
    if count > 0 {
        format!("Cart ({})", count)
    } else {
        "Cart".to_string()
    }
}

fn link_line(app: &App, links: &[(String, Route)], active: &Route) -> Line<'static> {
    let mut spans = Vec::with_capacity(links.len() * 2);
    for (index, (label, route)) in links.iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw("  "));
        }
        let style = if route == active {
            selection_style(app)
        } else {
            Style::default()
        };
        spans.push(Span::styled(label.clone(), style));
    }
    Line::from(spans)
}

fn draw_search_field(frame: &mut Frame<'_>, area: Rect, app: &App) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let active = app.focus == Focus::Search;
    let label = "SEARCH: ";
    let label_style = header_text_style(app);
    let value = app.search_bar.value();

    let value_span = if value.is_empty() && !active {
        Span::styled(
            SearchBar::PLACEHOLDER,
            Style::default().add_modifier(Modifier::DIM),
        )
    } else if active {
        Span::styled(value.to_string(), selection_style(app))
    } else {
        Span::raw(value.to_string())
    };

    let line = Line::from(vec![Span::styled(label, label_style), value_span]);
    frame.render_widget(Paragraph::new(line), area);

    if active {
        let column = Span::raw(label).width() + app.search_bar.visual_cursor();
        let x = area
            .x
            .saturating_add(column as u16)
            .min(area.x + area.width.saturating_sub(1));
        frame.set_cursor_position((x, area.y));
    }
}

// =============================================================================
// Body
// =============================================================================

fn draw_body(frame: &mut Frame<'_>, area: Rect, app: &App) {
    match app.results_page() {
        Some(page) => draw_results(frame, area, app, page),
        None => draw_placeholder(frame, area, app),
    }
}

fn draw_results(frame: &mut Frame<'_>, area: Rect, app: &App, page: &ResultsPage) {
    let title = Line::from(Span::styled(
        format!(" {} ", page.heading()),
        header_text_style(app),
    ));
    let location = Line::from(Span::styled(
        format!(" {} ", app.current_target()),
        header_text_style(app),
    ));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(title)
        .title_bottom(location);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    render_header_with_separator(frame, layout[0], app, &page.count_label(), area.width);

    let rows: Vec<Row> = page
        .rows(app.currency())
        .into_iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.image),
                Cell::from(row.name),
                Cell::from(row.price),
            ])
        })
        .collect();

    let header = Row::new(vec!["IMAGE", "NAME", "PRICE"]).style(header_text_style(app));
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(35),
            Constraint::Percentage(45),
            Constraint::Percentage(20),
        ],
    )
    .header(header)
    .highlight_style(selection_style(app));

    let mut state = TableState::default();
    if !page.results.is_empty() {
        state.select(Some(app.selected));
    }

    frame.render_stateful_widget(table, layout[1], &mut state);
}

fn draw_placeholder(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let route = app.route();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(Span::styled(format!(" {} ", route.title()), header_text_style(app)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text = match &route {
        Route::Home => format!(
            "{} products in the catalog. Press {} to search.",
            app.catalog_len(),
            first_key(&app.config().keys.global.search)
        ),
        Route::NotFound { path } => format!("Nothing here: {}", path),
        _ => "This page is not available yet.".to_string(),
    };

    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center),
        centered_line(inner),
    );
}

fn centered_line(area: Rect) -> Rect {
    if area.height == 0 {
        return area;
    }
    Rect {
        x: area.x,
        y: area.y + area.height / 2,
        width: area.width,
        height: 1,
    }
}

// =============================================================================
// Footer and help
// =============================================================================

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let keys = &app.config().keys;
    let message = if let Some(status) = &app.status {
        status.clone()
    } else if app.help_modal.is_some() {
        HELP_MODAL_FOOTER.to_string()
    } else if app.focus == Focus::Search {
        format!(
            "Type a query  {}: search  {}: leave  {}: voice  {}: image  {}: AI mode",
            first_key(&keys.search_input.confirm),
            first_key(&keys.search_input.cancel),
            first_key(&keys.search_input.voice),
            first_key(&keys.search_input.image),
            first_key(&keys.search_input.ai_mode),
        )
    } else {
        let search = if app.search_enabled() {
            format!("{}: search  ", first_key(&keys.global.search))
        } else {
            String::new()
        };
        if app.results_page().is_some() {
            format!(
                "{}/{}: select  {}{}: back  {}: help",
                first_key(&keys.results.next),
                first_key(&keys.results.prev),
                search,
                first_key(&keys.global.back),
                first_key(&keys.global.help),
            )
        } else {
            format!(
                "{}{}: back  {}: help  {}: quit",
                search,
                first_key(&keys.global.back),
                first_key(&keys.global.help),
                first_key(&keys.global.quit),
            )
        }
    };

    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    frame.render_widget(Paragraph::new(message).style(style), area);
}

fn first_key(bindings: &[String]) -> &str {
    bindings.first().map(String::as_str).unwrap_or("-")
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if app.help_modal.is_none() {
        return;
    }

    // 2/3 width, 80% height
    let width = area.width.saturating_mul(2).saturating_div(3).max(40).min(area.width);
    let height = area.height.saturating_mul(4).saturating_div(5).max(10).min(area.height);

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let header_style = header_text_style(app);
    let border_s = border_style(app);

    let sections = app.help_entries();
    let mut lines: Vec<Line> = Vec::new();

    let content_width = width.saturating_sub(4) as usize;
    let action_width = 20usize;

    for (section_idx, section) in sections.iter().enumerate() {
        let header_text = format!(" {} ", section.title);
        let padding_total = content_width.saturating_sub(header_text.len());
        let left_pad = padding_total / 2;
        let right_pad = padding_total - left_pad;
        let header_line = format!(
            "{}{}{}",
            LINE.horizontal.repeat(left_pad),
            header_text,
            LINE.horizontal.repeat(right_pad)
        );
        lines.push(Line::from(Span::styled(header_line, header_style)));

        for entry in &section.entries {
            let action = format!("{:<width$}", entry.action, width = action_width);
            lines.push(Line::from(vec![
                Span::styled(action, Style::default()),
                Span::styled(entry.keys.clone(), header_style),
            ]));
        }

        if section_idx + 1 < sections.len() {
            lines.push(Line::from(""));
        }
    }

    let total_lines = lines.len();
    // borders (2) + footer line (1)
    let inner_height = height.saturating_sub(3) as usize;

    let Some(modal) = app.help_modal.as_mut() else {
        return;
    };
    modal.total_lines = total_lines;
    modal.viewport_height = inner_height;

    let max_scroll = modal.total_lines.saturating_sub(modal.viewport_height);
    if modal.scroll > max_scroll {
        modal.scroll = max_scroll;
    }

    let scroll = modal.scroll;
    let scroll_indicator = match (modal.can_scroll_up(), modal.can_scroll_down()) {
        (true, true) => "▲▼",
        (true, false) => "▲ ",
        (false, true) => " ▼",
        (false, false) => "  ",
    };

    let visible_lines: Vec<Line> = lines
        .into_iter()
        .skip(scroll)
        .take(inner_height)
        .collect();

    let title = Line::from(vec![
        Span::styled(" HELP ", header_style),
        Span::styled(scroll_indicator, header_style),
    ]);
    let footer = Line::from(Span::styled(format!(" {} ", HELP_MODAL_FOOTER), header_style));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_s)
        .title(title)
        .title_bottom(footer)
        .title_alignment(Alignment::Center);

    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);
    frame.render_widget(Paragraph::new(visible_lines), inner);
}

// =============================================================================
// Styles
// =============================================================================

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.border))
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn separator_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

/// One line of text followed by a separator joined to the enclosing border: ├───┤
fn render_header_with_separator(
    frame: &mut Frame<'_>,
    area: Rect,
    app: &App,
    text: &str,
    outer_width: u16,
) {
    if area.height == 0 {
        return;
    }

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(text.to_string(), header_text_style(app)))),
        Rect { height: 1, ..area },
    );

    if area.height < 2 {
        return;
    }

    let inner_width = outer_width.saturating_sub(2) as usize;
    let separator = format!(
        "{}{}{}",
        LINE.vertical_right,
        LINE.horizontal.repeat(inner_width),
        LINE.vertical_left
    );
    let separator_area = Rect {
        x: area.x.saturating_sub(1),
        y: area.y + 1,
        width: outer_width,
        height: 1,
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(separator, separator_style(app)))),
        separator_area,
    );
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}
