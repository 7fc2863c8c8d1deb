//! JSON-lines render dump.

use std::io::Write;

use serde::Serialize;
use vexsim::{RenderFrame, Renderer};

#[derive(Serialize)]
struct DumpLine<'a> {
    frame: u64,
    #[serde(flatten)]
    render: &'a RenderFrame,
}

/// Writes every render frame as one JSON object per line.
///
/// Rendering cannot fail mid-frame, so the first write error is kept and
/// reported by [`finish`](Self::finish).
pub struct JsonLinesRenderer<W: Write> {
    out: W,
    frame: u64,
    error: Option<std::io::Error>,
}

impl<W: Write> JsonLinesRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            frame: 0,
            error: None,
        }
    }

    /// Flush and return the writer, or the first error seen.
    pub fn finish(mut self) -> std::io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn write_frame(&mut self, frame: &RenderFrame) -> std::io::Result<()> {
        let line = DumpLine {
            frame: self.frame,
            render: frame,
        };
        serde_json::to_writer(&mut self.out, &line)?;
        self.out.write_all(b"\n")
    }
}

impl<W: Write> Renderer for JsonLinesRenderer<W> {
    fn render(&mut self, frame: &RenderFrame) {
        if self.error.is_none() {
            if let Err(e) = self.write_frame(frame) {
                tracing::warn!(error = %e, "render dump failed, further frames dropped");
                self.error = Some(e);
            }
        }
        self.frame += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vexsim::{InputSnapshot, Session, SimConfig};

    #[test]
    fn test_one_line_per_frame() {
        let mut session = Session::new(SimConfig::default()).unwrap();
        let mut renderer = JsonLinesRenderer::new(Vec::new());
        for _ in 0..3 {
            session.frame(&InputSnapshot::default(), 1.0 / 60.0, &mut renderer);
        }

        let bytes = renderer.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        let last: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(last["frame"], 2);
        assert_eq!(last["draws"][0]["mesh"], "field");
        assert_eq!(last["draws"][1]["mesh"], "robot");
        assert_eq!(last["view_projection"].as_array().unwrap().len(), 16);
    }
}
