//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * The layout is a header row (tabs + API health), the active tab's body,
//!   the collection panel and a one-line status bar.
//! * Modal popups (source form, delete confirmation, date prompt, article
//!   detail) are drawn last, over the body, after clearing their area.
//! * Colours and styles are defined inline.

use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::api::{Article, Source};
use crate::app::{App, RowState, Tab};
use crate::form::{FormField, SourceForm};

/// Collection errors listed before the rest are summarised.
const SHOWN_ERRORS: usize = 4;

/// Panel rows taken by `count` collection errors, including the overflow line.
fn error_rows(count: usize) -> u16 {
    (count.min(SHOWN_ERRORS) + usize::from(count > SHOWN_ERRORS)) as u16
}

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let collect_height = 3 + app
        .collect
        .result
        .as_ref()
        .map_or(0, |r| error_rows(r.errors.len()));

    let [header_area, body_area, collect_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(collect_height),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(app, frame, header_area);
    match app.tab {
        Tab::Articles => {
            let [filter_area, list_area] =
                Layout::vertical([Constraint::Length(3), Constraint::Min(1)]).areas(body_area);
            draw_filter_bar(app, frame, filter_area);
            draw_article_list(app, frame, list_area);
        }
        Tab::Sources => {
            let [list_area, detail_area] =
                Layout::vertical([Constraint::Min(3), Constraint::Length(6)]).areas(body_area);
            draw_source_list(app, frame, list_area);
            draw_source_detail(app, frame, detail_area);
        }
    }
    draw_collect_panel(app, frame, collect_area);
    draw_status_bar(app, frame, status_area);

    if app.show_detail {
        draw_article_detail(app, frame);
    }
    if let Some(form) = &app.form {
        draw_source_form(form, frame);
    }
    if let Some(id) = app.pending_delete {
        draw_confirm_delete(app, id, frame);
    }
    if app.date_prompt.is_some() {
        draw_date_prompt(app, frame);
    }
}

fn draw_header(app: &App, frame: &mut Frame, area: Rect) {
    let [tabs_area, health_area] =
        Layout::horizontal([Constraint::Min(20), Constraint::Length(36)]).areas(area);

    let selected = match app.tab {
        Tab::Articles => 0,
        Tab::Sources => 1,
    };
    let tabs = Tabs::new(vec![" Articles ", " Sources "])
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, tabs_area);

    let health = match &app.health {
        None => Span::styled("○ checking API", Style::default().fg(Color::DarkGray)),
        Some(Ok(h)) => Span::styled(
            format!("● {} {}", h.service, h.status),
            Style::default().fg(Color::Green),
        ),
        Some(Err(_)) => Span::styled("● API unreachable", Style::default().fg(Color::Red)),
    };
    frame.render_widget(Paragraph::new(Line::from(health)).right_aligned(), health_area);
}

fn draw_filter_bar(app: &App, frame: &mut Frame, area: Rect) {
    let filters = &app.filters;
    let value = |v: Option<String>| v.unwrap_or_else(|| "all".into());
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "-".into());

    let line = Line::from(vec![
        Span::styled("source ", Style::default().fg(Color::DarkGray)),
        Span::raw(value(filters.source_id().map(|id| app.source_label(id)))),
        Span::styled("  tag ", Style::default().fg(Color::DarkGray)),
        Span::raw(value(filters.tag_id().map(|id| app.tag_label(id)))),
        Span::styled("  from ", Style::default().fg(Color::DarkGray)),
        Span::raw(date(filters.date_from())),
        Span::styled("  until ", Style::default().fg(Color::DarkGray)),
        Span::raw(date(filters.date_to())),
        Span::styled("  page ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{} ({} per page)", filters.page(), filters.limit())),
    ]);

    let title = if filters.is_filtered() { " Filters (x to clear) " } else { " Filters " };
    let block = Block::default().title(title).borders(Borders::ALL);
    frame.render_widget(Paragraph::new(line).block(block), area);
}

/// Block title carrying the loading flag and the last read error.
fn list_title<'a>(name: &'a str, loading: bool, error: Option<&'a str>) -> Line<'a> {
    let mut spans = vec![Span::raw(format!(" {name} "))];
    if loading {
        spans.push(Span::styled("loading… ", Style::default().fg(Color::Yellow)));
    }
    if let Some(error) = error {
        spans.push(Span::styled(
            format!("{error} "),
            Style::default().fg(Color::Red),
        ));
    }
    Line::from(spans)
}

fn article_line(app: &App, article: &Article) -> Line<'static> {
    let date_str = article
        .published_at
        .or(article.created_at)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "no date".into());

    let mut spans = vec![
        Span::styled(format!("{:<17}", date_str), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(article.title.clone(), Style::default().fg(Color::White)),
    ];
    if let Some(name) = app.article_source_name(article) {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(format!("[{name}]"), Style::default().fg(Color::Cyan)));
    }
    for tag in &article.tags {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("#{}", tag.name),
            Style::default().fg(Color::Magenta),
        ));
    }
    Line::from(spans)
}

fn draw_article_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let title = list_title(
        "Articles",
        app.articles.loading,
        app.articles.error.as_deref(),
    );
    let block = Block::default().title(title).borders(Borders::ALL);

    if app.articles.items.is_empty() {
        let text = if app.articles.loading { "" } else { "No articles match." };
        let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty.block(block), area);
        return;
    }

    let list_items: Vec<ListItem> = app
        .articles
        .items
        .iter()
        .map(|article| ListItem::new(article_line(app, article)))
        .collect();

    let list = List::new(list_items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.article_list);
}

fn source_line(app: &App, source: &Source) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!("{:>4} ", source.id), Style::default().fg(Color::DarkGray)),
        Span::styled(source.name.clone(), Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", source.kind.as_deref().unwrap_or("manual")),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(
            source.url_or_config.clone().unwrap_or_default(),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if source.is_collectable() {
        spans.push(Span::styled("  [c]", Style::default().fg(Color::DarkGray)));
    }
    if let Some(run) = app.source_runs.get(&source.id) {
        spans.push(Span::raw("  "));
        spans.push(row_span(run, "collecting…", |r| {
            if r.ok {
                format!("+{} articles", r.articles_added.unwrap_or(0))
            } else {
                r.error.clone().unwrap_or_else(|| "collection failed".into())
            }
        }));
    }
    if let Some(probe) = app.probes.get(&source.id) {
        spans.push(Span::raw("  "));
        spans.push(row_span(probe, "testing…", |p| {
            format!("feed ok: {} items, {} skipped", p.usable, p.skipped)
        }));
    }
    Line::from(spans)
}

fn row_span<T>(row: &RowState<T>, busy: &'static str, done: impl Fn(&T) -> String) -> Span<'static> {
    if row.in_flight {
        return Span::styled(busy, Style::default().fg(Color::Yellow));
    }
    match &row.last {
        Some(Ok(value)) => Span::styled(done(value), Style::default().fg(Color::Green)),
        Some(Err(e)) => Span::styled(e.clone(), Style::default().fg(Color::Red)),
        None => Span::raw(""),
    }
}

fn draw_source_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let title = list_title("Sources", app.sources.loading, app.sources.error.as_deref());
    let block = Block::default().title(title).borders(Borders::ALL);

    if app.sources.items.is_empty() {
        let text = if app.sources.loading { "" } else { "No sources yet. Press a to add one." };
        let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty.block(block), area);
        return;
    }

    let list_items: Vec<ListItem> = app
        .sources
        .items
        .iter()
        .map(|source| ListItem::new(source_line(app, source)))
        .collect();

    let list = List::new(list_items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.source_list);
}

fn draw_source_detail(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default().title(" Source ").borders(Borders::ALL);
    let Some(source) = app.selected_source() else {
        frame.render_widget(block, area);
        return;
    };

    let dim = Style::default().fg(Color::DarkGray);
    let added = source
        .created_at
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into());
    let mut lines = vec![
        Line::from(vec![
            Span::styled("name  ", dim),
            Span::raw(source.name.as_str()),
            Span::styled("   added ", dim),
            Span::raw(added),
        ]),
        Line::from(vec![
            Span::styled("url   ", dim),
            Span::raw(source.url_or_config.as_deref().unwrap_or("-")),
        ]),
    ];
    let first_title = app
        .probes
        .get(&source.id)
        .and_then(|p| p.last.as_ref())
        .and_then(|r| r.as_ref().ok())
        .and_then(|report| report.first_title.as_deref());
    if let Some(title) = first_title {
        lines.push(Line::from(vec![
            Span::styled("first ", dim),
            Span::raw(title),
        ]));
    }
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_collect_panel(app: &App, frame: &mut Frame, area: Rect) {
    let collect = &app.collect;
    let title = if collect.from_history { " Last collection " } else { " Collection " };

    let mut lines = Vec::new();
    if collect.running {
        lines.push(Line::styled("Collecting from all sources…", Style::default().fg(Color::Yellow)));
    } else if let Some(error) = &collect.error {
        lines.push(Line::styled(
            format!("Collection failed: {error}"),
            Style::default().fg(Color::Red),
        ));
    }
    match &collect.result {
        Some(run) if !collect.running => {
            lines.push(Line::from(vec![
                Span::styled("ok ", Style::default().fg(Color::DarkGray)),
                Span::styled(run.sources_ok.to_string(), Style::default().fg(Color::Green)),
                Span::styled("  failed ", Style::default().fg(Color::DarkGray)),
                Span::styled(run.sources_fail.to_string(), Style::default().fg(Color::Red)),
                Span::styled("  added ", Style::default().fg(Color::DarkGray)),
                Span::styled(run.articles_added.to_string(), Style::default().fg(Color::Cyan)),
            ]));
            for error in run.errors.iter().take(SHOWN_ERRORS) {
                lines.push(Line::styled(format!("  {error}"), Style::default().fg(Color::Red)));
            }
            if let Some(hidden) = run.errors.len().checked_sub(SHOWN_ERRORS).filter(|&n| n > 0) {
                lines.push(Line::styled(format!("  +{hidden} more"), Style::default().fg(Color::DarkGray)));
            }
        }
        _ if lines.is_empty() => {
            lines.push(Line::styled("Press R to collect", Style::default().fg(Color::DarkGray)));
        }
        _ => {}
    }

    let block = Block::default().title(title).borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let help = match app.tab {
        Tab::Articles => {
            "q quit  Tab sources  s/t source/tag  f/u dates  x clear  n/p page  +/- size  R collect"
        }
        Tab::Sources => "q quit  Tab articles  a add  e edit  d delete  c collect  t test  R collect all",
    };
    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(app.status.as_str(), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(help, Style::default().fg(Color::DarkGray)),
    ]));
    frame.render_widget(status, area);
}

// ---------------------------------------------------------------------------
// Popups
// ---------------------------------------------------------------------------

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    area
}

fn draw_source_form(form: &SourceForm, frame: &mut Frame) {
    let area = popup_area(frame.area(), 64, 11);
    frame.render_widget(Clear, area);

    let mut lines = Vec::new();
    for field in FormField::ALL {
        let focused = field == form.focus;
        let label_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::styled(field.label(), label_style));
        let cursor = if focused { "▏" } else { "" };
        lines.push(Line::from(format!("  {}{cursor}", form.value(field))));
    }
    if form.submitting {
        lines.push(Line::styled("Saving…", Style::default().fg(Color::Yellow)));
    } else if let Some(error) = &form.error {
        lines.push(Line::styled(error.as_str(), Style::default().fg(Color::Red)));
    }

    let block = Block::default()
        .title(form.title())
        .title_bottom(" Enter save  Esc cancel  Tab next field ")
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_confirm_delete(app: &App, id: i64, frame: &mut Frame) {
    let area = popup_area(frame.area(), 48, 5);
    frame.render_widget(Clear, area);
    let text = vec![
        Line::from(format!("Delete source {}?", app.source_label(id))),
        Line::styled("y confirm  n cancel", Style::default().fg(Color::DarkGray)),
    ];
    let block = Block::default().title(" Confirm ").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_date_prompt(app: &App, frame: &mut Frame) {
    let Some(prompt) = &app.date_prompt else {
        return;
    };
    let area = popup_area(frame.area(), 40, 5);
    frame.render_widget(Clear, area);

    let mut text = vec![Line::from(format!("{}▏", prompt.input))];
    match &prompt.error {
        Some(error) => text.push(Line::styled(error.as_str(), Style::default().fg(Color::Red))),
        None => text.push(Line::styled(
            "YYYY-MM-DD, empty to clear",
            Style::default().fg(Color::DarkGray),
        )),
    }
    let block = Block::default()
        .title(format!(" {} ", prompt.bound.label()))
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_article_detail(app: &App, frame: &mut Frame) {
    let Some(article) = app.selected_article() else {
        return;
    };
    let area = popup_area(frame.area(), 80, 16);
    frame.render_widget(Clear, area);

    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::styled(article.title.as_str(), Style::default().add_modifier(Modifier::BOLD)),
        Line::from(vec![
            Span::styled("source  ", dim),
            Span::raw(app.article_source_name(article).unwrap_or("-")),
        ]),
        Line::from(vec![
            Span::styled("url     ", dim),
            Span::raw(article.url.as_deref().unwrap_or("-")),
        ]),
    ];
    if let Some(published) = article.published_at {
        lines.push(Line::from(vec![
            Span::styled("date    ", dim),
            Span::raw(published.format("%Y-%m-%d %H:%M").to_string()),
        ]));
    }
    if !article.tags.is_empty() {
        let tags: Vec<String> = article.tags.iter().map(|t| format!("#{}", t.name)).collect();
        lines.push(Line::from(vec![
            Span::styled("tags    ", dim),
            Span::styled(tags.join(" "), Style::default().fg(Color::Magenta)),
        ]));
    }
    if let Some(summary) = article.summary.as_deref() {
        lines.push(Line::raw(""));
        lines.push(Line::raw(summary));
    }

    let block = Block::default()
        .title(" Article ")
        .title_bottom(" Esc close ")
        .borders(Borders::ALL);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
