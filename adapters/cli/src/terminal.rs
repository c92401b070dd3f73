//! Headless backend that replays scripted frames and prints the HUD.

use std::{io::Write, time::Duration};

use anyhow::{Context, Result as AnyResult};
use waterworks_rendering::{key_legend, FrameInput, Presentation, RenderingBackend, Scene};
use waterworks_system_turn::KeyLatch;

use crate::script::ScriptFrame;

/// Backend printing to any writer, one scripted frame at a time.
#[derive(Debug)]
pub(crate) struct TerminalBackend<W> {
    frames: Vec<ScriptFrame>,
    tick: Duration,
    out: W,
    latch: KeyLatch,
}

impl<W: Write> TerminalBackend<W> {
    /// Creates a backend that replays `frames`, charging `tick` per frame
    /// unless a frame carries its own delay.
    pub(crate) fn new(frames: Vec<ScriptFrame>, tick: Duration, out: W) -> Self {
        Self {
            frames,
            tick,
            out,
            latch: KeyLatch::default(),
        }
    }

    fn present(&mut self, scene: &Scene, last: &mut Option<String>) -> AnyResult<()> {
        let status = scene.hud.status_line();
        let [plumbers, saboteurs] = scene.hud.score_lines();
        let summary = format!("{status}\n{plumbers} | {saboteurs}");
        if last.as_deref() == Some(summary.as_str()) {
            return Ok(());
        }

        writeln!(self.out, "[{}] {summary}", scene.hud.timer_text())?;
        if let Some(role) = scene.hud.role {
            let legend = key_legend(role)
                .into_iter()
                .map(|(key, action)| format!("{key}: {action}"))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(self.out, "  keys: {legend}")?;
        }
        *last = Some(summary);
        Ok(())
    }
}

impl<W: Write> RenderingBackend for TerminalBackend<W> {
    fn run<F>(mut self, presentation: Presentation, mut update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> AnyResult<()>,
    {
        let mut scene = presentation.scene;
        let mut last = None;
        writeln!(self.out, "== {} ==", presentation.window_title)
            .context("failed to write to the terminal")?;
        self.present(&scene, &mut last)?;

        let frames = std::mem::take(&mut self.frames);
        for (index, frame) in frames.into_iter().enumerate() {
            self.latch.register(frame.key);
            let input = FrameInput {
                key: self.latch.take(),
                click: frame.click,
            };
            self.latch.register(None);

            update_scene(frame.delay.unwrap_or(self.tick), input, &mut scene)
                .with_context(|| format!("script frame {} failed", index + 1))?;
            self.present(&scene, &mut last)?;
        }

        let [plumbers, saboteurs] = scene.hud.score_lines();
        writeln!(self.out, "Final score: {plumbers} | {saboteurs}")?;
        self.out.flush().context("failed to flush the terminal")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;
    use glam::Vec2;
    use waterworks_core::{Role, Scores};
    use waterworks_rendering::{Color, Hud};

    use super::*;

    fn empty_scene() -> Scene {
        Scene {
            elements: Vec::new(),
            endpoints: Vec::new(),
            players: Vec::new(),
            highlight: None,
            hud: Hud::default(),
        }
    }

    fn presentation() -> Presentation {
        Presentation::new("Waterworks", Color::from_rgb_u8(0, 0, 0), empty_scene())
    }

    fn frame(key: Option<char>, delay: Option<Duration>) -> ScriptFrame {
        ScriptFrame {
            key,
            click: Some(Vec2::new(1.0, 2.0)),
            delay,
        }
    }

    #[test]
    fn frames_are_replayed_in_order_with_their_delays() {
        let frames = vec![
            frame(Some('q'), None),
            frame(Some('q'), Some(Duration::from_secs(3))),
        ];
        let mut out = Vec::new();
        let mut seen = Vec::new();

        TerminalBackend::new(frames, Duration::from_millis(100), &mut out)
            .run(presentation(), |dt, input, scene| {
                seen.push((dt, input));
                scene.hud.player = Some(String::from("Mario"));
                scene.hud.role = Some(Role::Plumber);
                scene.hud.scores = Scores {
                    collected: 1,
                    leaked: 0,
                };
                Ok(())
            })
            .expect("run");

        let expected_input = FrameInput {
            key: Some('Q'),
            click: Some(Vec2::new(1.0, 2.0)),
        };
        assert_eq!(
            seen,
            vec![
                (Duration::from_millis(100), expected_input),
                (Duration::from_secs(3), expected_input),
            ],
            "each line is a separate press"
        );

        let printed = String::from_utf8(out).expect("utf8");
        assert!(printed.starts_with("== Waterworks ==\n"));
        assert!(printed.contains("Player: Mario's turn | Team: Plumbers"));
        assert!(printed.contains("keys: Q: Move to an element"));
        assert!(printed.ends_with("Final score: Team Plumbers: 1 | Team Saboteurs: 0\n"));
        assert_eq!(
            printed.matches("Player: Mario's turn").count(),
            1,
            "unchanged HUDs are not reprinted"
        );
    }

    #[test]
    fn update_errors_stop_the_replay() {
        let frames = vec![frame(None, None), frame(None, None)];
        let mut calls = 0;

        let result = TerminalBackend::new(frames, Duration::from_millis(100), Vec::new()).run(
            presentation(),
            |_, _, _| {
                calls += 1;
                bail!("network invariant violated")
            },
        );

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
