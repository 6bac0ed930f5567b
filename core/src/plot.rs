//! Plot rendering for saved series files (gnuplot)

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PlotRequest {
    pub data_file: PathBuf,
    pub output_image: PathBuf,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend: String,
}

impl PlotRequest {
    pub fn new(data_file: &Path, output_image: &Path, title: &str, y_label: &str, legend: &str) -> Self {
        Self {
            data_file: data_file.to_path_buf(),
            output_image: output_image.to_path_buf(),
            title: title.to_string(),
            x_label: "Time (s)".to_string(),
            y_label: y_label.to_string(),
            legend: legend.to_string(),
        }
    }
}

/// Renders a two-column series file into an image.
pub trait PlotSink {
    fn render(&self, request: &PlotRequest) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct GnuplotSink {
    gnuplot_path: PathBuf,
    open_viewer: bool,
}

/// gnuplot single-quoted string; embedded quotes are doubled.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl GnuplotSink {
    pub fn new(gnuplot_path: impl Into<PathBuf>, open_viewer: bool) -> Self {
        Self { gnuplot_path: gnuplot_path.into(), open_viewer }
    }

    pub fn script(request: &PlotRequest) -> String {
        format!(
            "set terminal png\n\
             set output {}\n\
             set title {}\n\
             set xlabel {}\n\
             set ylabel {}\n\
             plot {} using 1:2 with linespoints title {}\n",
            quote(&request.output_image.to_string_lossy()),
            quote(&request.title),
            quote(&request.x_label),
            quote(&request.y_label),
            quote(&request.data_file.to_string_lossy()),
            quote(&request.legend),
        )
    }
}

impl PlotSink for GnuplotSink {
    fn render(&self, request: &PlotRequest) -> io::Result<()> {
        let mut child = Command::new(&self.gnuplot_path)
            .arg("-persistent")
            .stdin(Stdio::piped())
            .spawn()?;
        // stdin is dropped before waiting so gnuplot sees EOF
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(Self::script(request).as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;
        written?;
        if !status.success() {
            return Err(io::Error::other(format!("gnuplot exited with {}", status)));
        }
        debug!("Rendered {:?}", request.output_image);

        if self.open_viewer {
            if let Err(e) = Command::new("xdg-open").arg(&request.output_image).status() {
                warn!("Could not open {:?}: {}", request.output_image, e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_matches_gnuplot_commands() {
        let req = PlotRequest::new(
            Path::new("mem_data.txt"),
            Path::new("mem_plot.png"),
            "Memory Usage Over Time",
            "Memory (kB)",
            "VmRSS",
        );
        let script = GnuplotSink::script(&req);
        assert!(script.starts_with("set terminal png\nset output 'mem_plot.png'\n"));
        assert!(script.contains("set xlabel 'Time (s)'\n"));
        assert!(script.ends_with("plot 'mem_data.txt' using 1:2 with linespoints title 'VmRSS'\n"));
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(quote("it's"), "'it''s'");
    }

    #[test]
    fn failing_renderer_is_reaped() {
        use crate::collector::LinuxProcessTable;
        use crate::scanner::scan_zombies;

        let sink = GnuplotSink::new("false", false);
        let req = PlotRequest::new(Path::new("a"), Path::new("b"), "t", "y", "l");
        assert!(sink.render(&req).is_err());

        let own_pid = std::process::id();
        let report = scan_zombies(&LinuxProcessTable::new()).unwrap();
        assert!(report.zombies.iter().all(|z| z.parent_pid != Some(own_pid)));
    }

    #[test]
    fn missing_gnuplot_is_an_error() {
        let sink = GnuplotSink::new("/nonexistent/gnuplot", false);
        let req = PlotRequest::new(Path::new("a"), Path::new("b"), "t", "y", "l");
        assert!(sink.render(&req).is_err());
    }
}
