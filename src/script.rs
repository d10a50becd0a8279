use crate::geometry::Point;
use crate::viewport::{Handled, Key, PointerButton, ScrollHost, ViewportController, ViewportEvent};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

static POINTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<verb>press|move|drag)(?::(?P<x>-?\d+(?:\.\d+)?),(?P<y>-?\d+(?:\.\d+)?))?(?:>(?P<x2>-?\d+(?:\.\d+)?),(?P<y2>-?\d+(?:\.\d+)?))?$")
        .unwrap()
});
static WHEEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<verb>ctrl-wheel|wheel):(?P<dy>-?\d+(?:\.\d+)?)$").unwrap());

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: unknown step '{token}'")]
    UnknownStep { line: usize, token: String },
    #[error("line {line}: '{token}' needs coordinates like {expected}")]
    MissingCoordinates {
        line: usize,
        token: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptStep {
    Open,
    Close,
    Event(ViewportEvent),
}

/// Parse a whitespace or `;` separated list of steps. `#` comments run to
/// the end of the line, e.g. `open + + right drag:600,400>640,420 esc`.
pub fn parse_script(input: &str) -> Result<Vec<ScriptStep>, ScriptError> {
    let mut steps = Vec::new();
    for (idx, raw_line) in input.lines().enumerate() {
        let line = idx + 1;
        let content = raw_line.split('#').next().unwrap_or("");
        for token in content
            .split(|c: char| c.is_whitespace() || c == ';')
            .filter(|token| !token.is_empty())
        {
            parse_token(token, line, &mut steps)?;
        }
    }
    Ok(steps)
}

fn parse_token(token: &str, line: usize, steps: &mut Vec<ScriptStep>) -> Result<(), ScriptError> {
    let lower = token.to_ascii_lowercase();
    let simple = match lower.as_str() {
        "open" => Some(ScriptStep::Open),
        "close" => Some(ScriptStep::Close),
        "esc" | "escape" => Some(key(Key::Escape)),
        "+" | "plus" => Some(key(Key::Plus)),
        "=" => Some(key(Key::Equals)),
        "-" | "minus" => Some(key(Key::Minus)),
        "0" | "reset" => Some(key(Key::Zero)),
        "up" | "arrowup" => Some(key(Key::ArrowUp)),
        "down" | "arrowdown" => Some(key(Key::ArrowDown)),
        "left" | "arrowleft" => Some(key(Key::ArrowLeft)),
        "right" | "arrowright" => Some(key(Key::ArrowRight)),
        "release" | "up-pointer" => Some(ScriptStep::Event(ViewportEvent::PointerUp)),
        "leave" => Some(ScriptStep::Event(ViewportEvent::PointerLeave)),
        _ => None,
    };
    if let Some(step) = simple {
        steps.push(step);
        return Ok(());
    }

    if let Some(caps) = WHEEL_RE.captures(&lower) {
        let delta_y = caps["dy"].parse::<f32>().unwrap_or(0.0);
        let ctrl = &caps["verb"] == "ctrl-wheel";
        steps.push(ScriptStep::Event(ViewportEvent::Wheel { delta_y, ctrl }));
        return Ok(());
    }

    if let Some(caps) = POINTER_RE.captures(&lower) {
        let verb = &caps["verb"];
        let first = point_from(caps.name("x").map(|m| m.as_str()), caps.name("y").map(|m| m.as_str()));
        let second = point_from(caps.name("x2").map(|m| m.as_str()), caps.name("y2").map(|m| m.as_str()));
        let missing = |expected| ScriptError::MissingCoordinates {
            line,
            token: token.to_string(),
            expected,
        };
        match verb {
            "press" => {
                let position = first.ok_or_else(|| missing("press:X,Y"))?;
                steps.push(ScriptStep::Event(ViewportEvent::PointerDown {
                    position,
                    button: PointerButton::Primary,
                }));
            }
            "move" => {
                let position = first.ok_or_else(|| missing("move:X,Y"))?;
                steps.push(ScriptStep::Event(ViewportEvent::PointerMove { position }));
            }
            _ => {
                let (Some(from), Some(to)) = (first, second) else {
                    return Err(missing("drag:X,Y>X,Y"));
                };
                steps.push(ScriptStep::Event(ViewportEvent::PointerDown {
                    position: from,
                    button: PointerButton::Primary,
                }));
                steps.push(ScriptStep::Event(ViewportEvent::PointerMove { position: to }));
                steps.push(ScriptStep::Event(ViewportEvent::PointerUp));
            }
        }
        return Ok(());
    }

    Err(ScriptError::UnknownStep {
        line,
        token: token.to_string(),
    })
}

fn key(key: Key) -> ScriptStep {
    ScriptStep::Event(ViewportEvent::Key(key))
}

fn point_from(x: Option<&str>, y: Option<&str>) -> Option<Point> {
    let x = x?.parse::<f32>().ok()?;
    let y = y?.parse::<f32>().ok()?;
    Some(Point::new(x, y))
}

/// Outcome of replaying a script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub handled: usize,
    pub ignored: usize,
}

pub fn apply_script<H: ScrollHost + Clone>(
    controller: &mut ViewportController<H>,
    steps: &[ScriptStep],
) -> ReplayStats {
    let mut stats = ReplayStats::default();
    for step in steps {
        match step {
            ScriptStep::Open => {
                controller.open();
                stats.handled += 1;
            }
            ScriptStep::Close => {
                controller.close();
                stats.handled += 1;
            }
            ScriptStep::Event(event) => match controller.handle(*event) {
                Handled::Yes => stats.handled += 1,
                Handled::No => stats.ignored += 1,
            },
        }
    }
    debug!(handled = stats.handled, ignored = stats.ignored, "replayed viewport script");
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_and_comments() {
        let steps = parse_script("open + ; right # pan\n esc").unwrap();
        assert_eq!(
            steps,
            vec![
                ScriptStep::Open,
                key(Key::Plus),
                key(Key::ArrowRight),
                key(Key::Escape),
            ]
        );
    }

    #[test]
    fn drag_expands_to_press_move_release() {
        let steps = parse_script("drag:10,20>30,45.5").unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[1],
            ScriptStep::Event(ViewportEvent::PointerMove {
                position: Point::new(30.0, 45.5)
            })
        );
    }

    #[test]
    fn wheel_tokens_carry_modifier() {
        let steps = parse_script("wheel:120 ctrl-wheel:-120").unwrap();
        assert_eq!(
            steps,
            vec![
                ScriptStep::Event(ViewportEvent::Wheel { delta_y: 120.0, ctrl: false }),
                ScriptStep::Event(ViewportEvent::Wheel { delta_y: -120.0, ctrl: true }),
            ]
        );
    }

    #[test]
    fn reports_unknown_tokens_with_line() {
        let err = parse_script("open\nzoom-everything").unwrap_err();
        assert_eq!(
            err,
            ScriptError::UnknownStep {
                line: 2,
                token: "zoom-everything".to_string()
            }
        );
        assert!(matches!(
            parse_script("press").unwrap_err(),
            ScriptError::MissingCoordinates { .. }
        ));
    }

    #[test]
    fn replay_drives_controller() {
        let steps = parse_script("open + + right drag:100,100>150,80 wheel:50").unwrap();
        let mut controller: ViewportController = ViewportController::default();
        let stats = apply_script(&mut controller, &steps);
        assert_eq!(stats, ReplayStats { handled: 7, ignored: 1 });
        assert!((controller.zoom() - 1.44).abs() < 1e-4);
        // right nudge moves content left, then the drag adds (+50, -20)
        assert_eq!(controller.pan(), Point::new(30.0, -20.0));
        assert!(!controller.is_dragging());
    }
}
