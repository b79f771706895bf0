use crate::orchestrator::{BuildObserver, UiState};
use crate::progress::BuildStep;
use crate::ui::icons::{CHECK, CROSS, LINK, ROCKET, SPARKLE};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal UI for one build, rendered via `indicatif`.
///
/// A single bar tracks completed steps; each step is also printed as a line
/// above the bar so the full log stays visible after the bar finishes.
/// Implements [`BuildObserver`], so the orchestrator drives it directly.
pub struct BuildUI {
    multi: MultiProgress,
    step_bar: ProgressBar,
    verbose: bool,
}

impl BuildUI {
    /// Create the UI sized to `steps`.
    ///
    /// # Arguments
    /// * `steps`: the step table the animator walks
    /// * `verbose`: when `true`, state transitions are printed as they happen
    pub fn new(steps: &[BuildStep], verbose: bool) -> Self {
        let multi = MultiProgress::new();

        let step_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} {spinner} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let step_bar = multi.add(ProgressBar::new(steps.len() as u64));
        step_bar.set_style(step_style);
        step_bar.set_prefix(" Build");

        Self {
            multi,
            step_bar,
            verbose,
        }
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!` if the rich UI fails.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Print the header block before the build starts.
    pub fn print_header(&self, app_name: &str, model: &str, images: usize) {
        self.print_line("");
        self.print_line(format!("{}", style("═".repeat(60)).cyan()));
        self.print_line(format!(
            "{}Building {}",
            ROCKET,
            style(app_name).yellow().bold()
        ));
        self.print_line(format!("{}", style("═".repeat(60)).cyan()));
        self.print_line(format!("{}  {}", style("Model:").dim(), model));
        self.print_line(format!("{} {}", style("Images:").dim(), images));
        self.print_line("");
    }
}

impl BuildObserver for BuildUI {
    fn on_state(&self, state: &UiState) {
        if self.verbose {
            self.print_line(format!("    {} {}", style("→").dim(), style(state.name()).dim()));
        }
        match state {
            UiState::Idle => {
                self.step_bar.reset();
            }
            UiState::Building { .. } => {
                self.step_bar.set_position(0);
                self.step_bar.set_message(format!("{}", style("waiting for backend").dim()));
                self.step_bar.enable_steady_tick(Duration::from_millis(100));
            }
            UiState::Complete { link } => {
                self.step_bar
                    .finish_with_message(format!("{}done", CHECK));
                self.print_line(format!(
                    "\n{}App ready: {}{}\n",
                    SPARKLE,
                    LINK,
                    style(link).green().bold()
                ));
            }
            UiState::Error { message } => {
                self.step_bar.abandon_with_message(format!("{}failed", CROSS));
                self.print_line(format!("\n{}{}\n", CROSS, style(message).red().bold()));
            }
        }
    }

    fn on_step(&self, index: usize, label: &str) {
        self.step_bar.set_position(index as u64 + 1);
        self.step_bar.set_message(label.to_string());
        self.print_line(format!("    {}{}", CHECK, label));
    }
}
