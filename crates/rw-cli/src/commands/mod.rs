pub mod check;
pub mod play;
pub mod saves;
pub mod show;

use std::path::{Path, PathBuf};

use ariadne::{Color, Label, Report, ReportKind, Source};
use colored::Colorize;
use rw_engine::{ParseError, Scenario, validate_scenario};

/// Load a scenario directory and print validation issues.
/// Returns the scenario if there are no errors.
fn load_scenario(dir: &Path) -> Result<Scenario, String> {
    let scenario = Scenario::load(dir).map_err(|e| e.to_string())?;
    let issues = validate_scenario(&scenario);

    let errors = issues.iter().filter(|i| i.is_error).count();
    let warnings = issues.len() - errors;
    for issue in &issues {
        let line = issue.to_string();
        if issue.is_error {
            eprintln!("  {}", line.red());
        } else {
            eprintln!("  {}", line.yellow());
        }
    }

    if errors > 0 {
        eprintln!(
            "  {} error{}, {} warning{}",
            errors,
            if errors == 1 { "" } else { "s" },
            warnings,
            if warnings == 1 { "" } else { "s" },
        );
        Err("scenario has errors".into())
    } else {
        if warnings > 0 {
            eprintln!(
                "  {} warning{}",
                warnings,
                if warnings == 1 { "" } else { "s" },
            );
        }
        Ok(scenario)
    }
}

/// Where save slots live for a scenario directory.
fn saves_dir(dir: &Path, saves: Option<&Path>) -> PathBuf {
    saves.map_or_else(|| dir.join("saves"), Path::to_path_buf)
}

/// Render parse errors in typed input using ariadne.
fn render_parse_errors(source: &str, errors: &[ParseError]) -> String {
    let name = "input";
    let mut output = Vec::new();

    for error in errors {
        let span = (name, error.span.clone());
        Report::build(ReportKind::Error, span.clone())
            .with_message(&error.message)
            .with_label(
                Label::new(span)
                    .with_message(&error.message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((name, Source::from(source)), &mut output)
            .ok();
    }

    String::from_utf8(output).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_render_with_their_message() {
        let source = "look @";
        let errors = rw_engine::parse_command_line(source).err().into_iter().collect::<Vec<_>>();
        assert_eq!(errors.len(), 1);
        let output = render_parse_errors(source, &errors);
        assert!(output.contains(&errors[0].message));
    }

    #[test]
    fn saves_default_inside_the_scenario() {
        assert_eq!(saves_dir(Path::new("demo"), None), Path::new("demo").join("saves"));
        assert_eq!(
            saves_dir(Path::new("demo"), Some(Path::new("/tmp/s"))),
            Path::new("/tmp/s")
        );
    }
}
