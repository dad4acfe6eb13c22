//! Interactive target selection.
//!
//! The operator types menu numbers separated by spaces or commas. `0`
//! anywhere exits; `5` anywhere means the configured "all" set and
//! everything else on the line is ignored.

use crate::bundler::{BuildTarget, probe::Confirm};
use std::io::{self, BufRead, Write};

/// Menu number that exits.
pub const EXIT_KEY: &str = "0";
/// Menu number for the "all Linux targets" set.
pub const ALL_KEY: &str = "5";

/// What a selection line resolved to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Selection {
    /// Leave without building.
    Exit,
    /// Build these targets, in order. May be empty.
    Targets(Vec<BuildTarget>),
}

/// A resolved selection plus per-token warnings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedSelection {
    /// Resolved selection.
    pub selection: Selection,
    /// One message per ignored token.
    pub warnings: Vec<String>,
}

/// Resolve a selection line against the menu.
pub fn parse_selection(input: &str, all: &[BuildTarget]) -> ParsedSelection {
    let tokens: Vec<&str> = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.contains(&EXIT_KEY) {
        return ParsedSelection {
            selection: Selection::Exit,
            warnings: Vec::new(),
        };
    }
    if tokens.contains(&ALL_KEY) {
        return ParsedSelection {
            selection: Selection::Targets(dedup(all.iter().copied())),
            warnings: Vec::new(),
        };
    }

    let mut warnings = Vec::new();
    let mut targets = Vec::new();
    for token in tokens {
        match token.parse::<u32>().ok().and_then(BuildTarget::from_menu_key) {
            Some(target) => targets.push(target),
            None => warnings.push(format!("ignoring unknown selection `{token}`")),
        }
    }

    ParsedSelection {
        selection: Selection::Targets(dedup(targets)),
        warnings,
    }
}

fn dedup(targets: impl IntoIterator<Item = BuildTarget>) -> Vec<BuildTarget> {
    let mut unique = Vec::new();
    for target in targets {
        if !unique.contains(&target) {
            unique.push(target);
        }
    }
    unique
}

/// The menu text.
pub fn render_menu(all: &[BuildTarget]) -> String {
    let mut lines = vec!["Available build targets:".to_string()];
    let mut push = |key: u32, label: String, minutes: Option<u32>| {
        let estimate = minutes.map(|m| format!(" (~{m} min)")).unwrap_or_default();
        lines.push(format!("  {key}) {label}{estimate}"));
    };

    for target in BuildTarget::ALL {
        let spec = target.spec();
        // The "all" entry sits between the Linux targets and Windows.
        if spec.menu_key == 6 {
            push(5, all_label(all), Some(estimate_minutes(all)));
        }
        push(spec.menu_key, spec.label.to_string(), Some(spec.estimate_minutes));
    }
    push(0, "Exit".to_string(), None);
    lines.join("\n")
}

fn all_label(all: &[BuildTarget]) -> String {
    let ids: Vec<_> = all.iter().map(|t| t.id()).collect();
    format!("All Linux targets ({})", ids.join(", "))
}

/// Sum of the rough per-target estimates.
pub fn estimate_minutes(targets: &[BuildTarget]) -> u32 {
    targets.iter().map(|t| t.spec().estimate_minutes).sum()
}

/// Human description of a resolved list, used before confirming.
pub fn describe_targets(targets: &[BuildTarget]) -> String {
    let mut out = String::from("Selected targets:");
    for (i, target) in targets.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", i + 1, target.label()));
    }
    out.push_str(&format!(
        "\nEstimated time: ~{} min",
        estimate_minutes(targets)
    ));
    out
}

/// Line-oriented prompt over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Prompter reading from `input` and writing to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask for one line. `None` on end of input.
    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Yes/no question; anything but `y`/`yes` (or end of input) is no.
    pub fn ask_yes_no(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{question} [y/N] "))?;
        Ok(matches!(
            answer.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "yes")
        ))
    }

    /// Show the menu until the operator confirms a non-empty selection or
    /// exits. End of input counts as exit.
    pub fn choose_targets(&mut self, all: &[BuildTarget]) -> io::Result<Selection> {
        loop {
            writeln!(self.output, "\n{}", render_menu(all))?;
            let Some(line) = self.ask("Select targets (e.g. 1,3): ")? else {
                return Ok(Selection::Exit);
            };

            let parsed = parse_selection(&line, all);
            for warning in &parsed.warnings {
                writeln!(self.output, "warning: {warning}")?;
            }

            match parsed.selection {
                Selection::Exit => return Ok(Selection::Exit),
                Selection::Targets(targets) if targets.is_empty() => {
                    writeln!(self.output, "Nothing selected.")?;
                }
                Selection::Targets(targets) => {
                    writeln!(self.output, "{}", describe_targets(&targets))?;
                    if self.ask_yes_no("Proceed?")? {
                        return Ok(Selection::Targets(targets));
                    }
                }
            }
        }
    }
}

impl<R: BufRead, W: Write> Confirm for Prompter<R, W> {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        self.ask_yes_no(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BuildTarget::*;

    fn default_all() -> Vec<BuildTarget> {
        BuildTarget::DEFAULT_ALL.to_vec()
    }

    #[test]
    fn numbers_map_to_targets_in_order() {
        let parsed = parse_selection("1,3", &default_all());
        assert_eq!(parsed.selection, Selection::Targets(vec![AppImageX86_64, Deb]));
        assert!(parsed.warnings.is_empty());

        let parsed = parse_selection(" 7  4,, 7 ", &default_all());
        assert_eq!(parsed.selection, Selection::Targets(vec![SourceDevEnv, Rpm]));
    }

    #[test]
    fn five_means_the_all_set_and_discards_the_rest() {
        let parsed = parse_selection("5", &default_all());
        assert_eq!(parsed.selection, Selection::Targets(vec![AppImageX86_64, Deb]));

        let parsed = parse_selection("6 5 9", &[Rpm, Deb]);
        assert_eq!(parsed.selection, Selection::Targets(vec![Rpm, Deb]));
    }

    #[test]
    fn zero_exits_even_with_other_tokens() {
        assert_eq!(parse_selection("0", &default_all()).selection, Selection::Exit);
        assert_eq!(parse_selection("1 0 5", &default_all()).selection, Selection::Exit);
    }

    #[test]
    fn unknown_tokens_warn_and_are_skipped() {
        let parsed = parse_selection("9", &default_all());
        assert_eq!(parsed.selection, Selection::Targets(vec![]));
        assert_eq!(parsed.warnings.len(), 1);

        let parsed = parse_selection("abc,2", &default_all());
        assert_eq!(parsed.selection, Selection::Targets(vec![AppImageAArch64]));
        assert!(parsed.warnings[0].contains("abc"));
    }

    #[test]
    fn menu_lists_every_key() {
        let menu = render_menu(&default_all());
        for key in ["1)", "2)", "3)", "4)", "5)", "6)", "7)", "0)"] {
            assert!(menu.contains(key), "missing {key} in\n{menu}");
        }
        assert!(menu.contains("appimage-x86_64, deb"));
        assert!(menu.find("4)").unwrap() < menu.find("5)").unwrap());
        assert!(menu.find("5)").unwrap() < menu.find("6)").unwrap());
    }

    #[test]
    fn declining_reprompts_and_eof_exits() {
        let input = b"9\n1\nn\n3\ny\n";
        let mut out = Vec::new();
        let mut prompter = Prompter::new(&input[..], &mut out);
        let selection = prompter.choose_targets(&default_all()).unwrap();
        assert_eq!(selection, Selection::Targets(vec![Deb]));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Nothing selected."));
        assert_eq!(text.matches("Proceed?").count(), 2);

        let mut prompter = Prompter::new(&b""[..], Vec::new());
        assert_eq!(prompter.choose_targets(&default_all()).unwrap(), Selection::Exit);
    }

    #[test]
    fn confirm_defaults_to_no() {
        let mut prompter = Prompter::new(&b"\n"[..], Vec::new());
        assert!(!prompter.confirm("Install?").unwrap());
        let mut prompter = Prompter::new(&b"YES\n"[..], Vec::new());
        assert!(prompter.confirm("Install?").unwrap());
    }
}
