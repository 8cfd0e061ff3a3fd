use std::f64::consts::TAU;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Context, Points},
        Block, Borders, Gauge, Paragraph,
    },
    Frame,
};

use crate::scene::Body;
use crate::state::App;
use crate::theme::{self, darken, lighten, tint, GlowTier};

/// One discrete status projection: what the badge says, the marker glyph
/// in front of it, and the accent color.
#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub label: &'static str,
    pub icon: &'static str,
    pub color: Color,
}

pub fn agent_badge(app: &App) -> Badge {
    if app.snapshot.running {
        Badge {
            label: "Running",
            icon: "●",
            color: tint(theme::OK),
        }
    } else {
        Badge {
            label: "Stopped",
            icon: "○",
            color: tint(theme::MUTED),
        }
    }
}

pub fn speaker_badge(app: &App) -> Badge {
    if app.snapshot.speaker_verified {
        Badge {
            label: "Verified",
            icon: "✓",
            color: tint(theme::OK),
        }
    } else {
        Badge {
            label: "Unverified",
            icon: "?",
            color: tint(theme::WARN),
        }
    }
}

/// Progress-bar fill for the verification confidence, in whole percent.
pub fn speaker_fill(app: &App) -> u16 {
    (app.snapshot.speaker_score * 100.0).round().clamp(0.0, 100.0) as u16
}

pub fn vad_badge(app: &App) -> Badge {
    if app.snapshot.vad_speaking {
        Badge {
            label: "Speaking",
            icon: "▶",
            color: tint(GlowTier::Speaking.color()),
        }
    } else {
        Badge {
            label: "Silent",
            icon: "▷",
            color: tint(theme::MUTED),
        }
    }
}

pub fn connection_badge(app: &App) -> Badge {
    if app.connected {
        Badge {
            label: "Connected",
            icon: "●",
            color: tint(theme::OK),
        }
    } else {
        Badge {
            label: "Reconnecting",
            icon: "●",
            color: tint(theme::CRITICAL),
        }
    }
}

pub fn render(frame: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(frame.size());
    render_header(frame, app, layout[0]);
    render_badges(frame, app, layout[1]);
    render_scene(frame, app, layout[2]);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let link = connection_badge(app);
    let header = Paragraph::new(Line::from(vec![
        Span::styled("HELIOSCOPE", theme::HEADER_STYLE),
        Span::styled("  voice agent status", Style::new().fg(tint(theme::MUTED))),
        Span::raw("   "),
        Span::styled(link.icon, Style::new().fg(link.color)),
        Span::styled(
            format!(" {} ({})", link.label, app.config.hub_addr),
            Style::new().fg(tint(theme::TEXT)),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::new().fg(tint(theme::PANEL_BORDER)))
            .title(" s start · x stop · q quit "),
    );
    frame.render_widget(header, area);
}

fn render_badges(frame: &mut Frame, app: &App, area: Rect) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);
    render_badge_cell(frame, agent_badge(app), " Agent ", cells[0]);
    render_speaker_cell(frame, app, cells[1]);
    render_badge_cell(frame, vad_badge(app), " Voice ", cells[2]);
    render_badge_cell(frame, connection_badge(app), " Link ", cells[3]);
}

fn render_badge_cell(frame: &mut Frame, badge: Badge, title: &'static str, area: Rect) {
    let body = Paragraph::new(Line::from(vec![
        Span::styled(badge.icon, Style::new().fg(badge.color)),
        Span::raw(" "),
        Span::styled(
            badge.label,
            Style::new().fg(badge.color).add_modifier(Modifier::BOLD),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::new().fg(tint(theme::PANEL_BORDER)))
            .title(title),
    );
    frame.render_widget(body, area);
}

fn render_speaker_cell(frame: &mut Frame, app: &App, area: Rect) {
    let badge = speaker_badge(app);
    let fill = speaker_fill(app);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::new().fg(tint(theme::PANEL_BORDER)))
                .title(" Speaker "),
        )
        .gauge_style(Style::new().fg(badge.color).bg(tint(theme::BG)))
        .percent(fill)
        .label(format!("{} {}%", badge.label, fill));
    frame.render_widget(gauge, area);
}

fn render_scene(frame: &mut Frame, app: &App, area: Rect) {
    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::new().fg(tint(theme::PANEL_BORDER))),
        )
        .background_color(tint(theme::BG))
        .marker(Marker::Braille)
        .x_bounds([-crate::scene::CANVAS_BOUND, crate::scene::CANVAS_BOUND])
        .y_bounds([-crate::scene::CANVAS_BOUND, crate::scene::CANVAS_BOUND])
        .paint(|ctx| paint_scene(ctx, app));
    frame.render_widget(canvas, area);
}

/// Back-to-front: star, orbit paths, sun glow layers, corona, disk and
/// its decorations, then each orbiting body.
fn paint_scene(ctx: &mut Context, app: &App) {
    if let Some((x, y)) = app.scene.star {
        ctx.draw(&Points {
            coords: &[(x, y)],
            color: tint(theme::STAR),
        });
    }
    for body in &app.scene.bodies {
        ctx.draw(&Circle {
            x: 0.0,
            y: 0.0,
            radius: body.orbit_radius,
            color: tint(theme::ORBIT_PATH),
        });
    }
    ctx.layer();

    let tier = GlowTier::for_signals(
        app.snapshot.vad_speaking,
        app.snapshot.speaker_verified,
        app.snapshot.running,
    );
    let pulse = app.scene.pulse_offset();
    let glow = app.scene.sun.glow_radius + pulse;
    for (spread, fade) in [(6.0, 62.0), (3.0, 45.0), (0.0, 28.0)] {
        ctx.draw(&Circle {
            x: 0.0,
            y: 0.0,
            radius: (glow + spread).max(1.0),
            color: tint(darken(tier.color(), fade)),
        });
    }

    let disk = app.scene.sun.disk_radius;
    ctx.draw(&Circle {
        x: 0.0,
        y: 0.0,
        radius: disk + 2.5 + pulse * 0.5,
        color: tint(darken(tier.color(), 12.0)),
    });

    let mut radius = disk;
    while radius > 0.4 {
        let rim_distance = 1.0 - radius / disk;
        ctx.draw(&Circle {
            x: 0.0,
            y: 0.0,
            radius,
            color: tint(lighten(theme::SUN_CORE, rim_distance * 30.0)),
        });
        radius -= 0.8;
    }
    ctx.draw(&Points {
        coords: &[(-disk * 0.35, disk * 0.35)],
        color: tint(lighten(theme::SUN_CORE, 45.0)),
    });
    ctx.draw(&Points {
        coords: &[(disk * 0.22, -disk * 0.18), (-disk * 0.12, -disk * 0.4)],
        color: tint(darken(theme::SUN_CORE, 35.0)),
    });

    ctx.layer();
    for body in &app.scene.bodies {
        paint_body(ctx, body);
    }
}

fn paint_body(ctx: &mut Context, body: &Body) {
    let (x, y) = body.position();
    if body.ringed {
        paint_rings(ctx, body, x, y);
    }
    ctx.draw(&Circle {
        x,
        y,
        radius: body.size + 1.5,
        color: tint(darken(body.base_color, 42.0)),
    });
    let mut radius = body.size;
    while radius > 0.2 {
        let t = radius / body.size;
        let shade = if t > 0.75 {
            darken(body.base_color, 22.0)
        } else if t > 0.35 {
            body.base_color
        } else {
            lighten(body.base_color, 18.0)
        };
        ctx.draw(&Circle {
            x,
            y,
            radius,
            color: tint(shade),
        });
        radius -= 0.5;
    }
    ctx.draw(&Points {
        coords: &[(x - body.size * 0.35, y + body.size * 0.35)],
        color: tint(lighten(body.base_color, 45.0)),
    });
}

/// Two rotated ellipses around the one ringed body.
fn paint_rings(ctx: &mut Context, body: &Body, x: f64, y: f64) {
    const TILT: f64 = 0.45;
    const SAMPLES: usize = 48;
    for (major, shade) in [
        (body.size * 2.3, darken(body.base_color, 10.0)),
        (body.size * 1.7, lighten(body.base_color, 8.0)),
    ] {
        let minor = major * 0.35;
        let mut coords = Vec::with_capacity(SAMPLES);
        for i in 0..SAMPLES {
            let t = i as f64 / SAMPLES as f64 * TAU;
            let ex = major * t.cos();
            let ey = minor * t.sin();
            coords.push((
                x + ex * TILT.cos() - ey * TILT.sin(),
                y + ex * TILT.sin() + ey * TILT.cos(),
            ));
        }
        ctx.draw(&Points {
            coords: &coords,
            color: tint(shade),
        });
    }
}
