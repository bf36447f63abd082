use anyhow::{Context, Result, bail};
use coral_rte_config::Config;
use coral_rte_dom::parse_markup;
use coral_rte_engine::{
    CommandValue, DialogResult, DialogValues, EditorKernel, HeadlessDialogHost, Notice,
    PluginRegistry, ToolbarOptions,
};
use std::{env, fs, path::PathBuf, process};

const USAGE: &str = "\
Usage:
  coral-rte find <file> <term>
  coral-rte replace-all <file> <term> <replacement> [--match-case] [--write]
  coral-rte link <file> <start> <end> <href> [--write]
  coral-rte unlink <file> <start> <end> [--write]
  coral-rte spellcheck <file> [--write]
  coral-rte toolbar [toolbar-id]";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Find {
        term: String,
    },
    ReplaceAll {
        term: String,
        replacement: String,
        match_case: bool,
    },
    Link {
        start: usize,
        end: usize,
        href: String,
    },
    Unlink {
        start: usize,
        end: usize,
    },
    SpellCheck,
    Toolbar {
        toolbar_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    action: Action,
    file: Option<PathBuf>,
    write: bool,
}

/// What a run produced: notices for the user, the spans found by `find` and
/// the resulting markup.
#[derive(Debug, Default)]
struct Report {
    notices: Vec<Notice>,
    matches: Vec<(usize, usize)>,
    markup: Option<String>,
}

fn parse_args(args: &[String]) -> Option<Invocation> {
    let mut flags = Vec::new();
    let mut positional = Vec::new();
    for arg in args.iter().skip(1) {
        if arg.starts_with("--") {
            flags.push(arg.as_str());
        } else {
            positional.push(arg.as_str());
        }
    }
    let match_case = flags.contains(&"--match-case");
    let write = flags.contains(&"--write");
    if flags.iter().any(|f| !matches!(*f, "--match-case" | "--write")) {
        return None;
    }

    let number = |s: &str| s.parse::<usize>().ok();
    let (action, file) = match positional.as_slice() {
        ["find", file, term] => (Action::Find { term: term.to_string() }, Some(file)),
        ["replace-all", file, term, replacement] => (
            Action::ReplaceAll {
                term: term.to_string(),
                replacement: replacement.to_string(),
                match_case,
            },
            Some(file),
        ),
        ["link", file, start, end, href] => (
            Action::Link {
                start: number(start)?,
                end: number(end)?,
                href: href.to_string(),
            },
            Some(file),
        ),
        ["unlink", file, start, end] => (
            Action::Unlink {
                start: number(start)?,
                end: number(end)?,
            },
            Some(file),
        ),
        ["spellcheck", file] => (Action::SpellCheck, Some(file)),
        ["toolbar"] => (
            Action::Toolbar {
                toolbar_id: ToolbarOptions::default().toolbar_id,
            },
            None,
        ),
        ["toolbar", id] => (
            Action::Toolbar {
                toolbar_id: id.to_string(),
            },
            None,
        ),
        _ => return None,
    };
    Some(Invocation {
        action,
        file: file.map(PathBuf::from),
        write,
    })
}

fn new_kernel(config: Config) -> EditorKernel {
    EditorKernel::new(
        &PluginRegistry::with_defaults(),
        config,
        Box::new(HeadlessDialogHost::new()),
    )
}

fn run(action: &Action, markup: &str, config: Config) -> Result<Report> {
    let mut kernel = new_kernel(config);
    let mut report = Report::default();

    if let Action::Toolbar { toolbar_id } = action {
        let options = ToolbarOptions {
            toolbar_id: toolbar_id.clone(),
            ..ToolbarOptions::default()
        };
        report.markup = Some(kernel.create_toolbar(&options)?.to_markup());
        return Ok(report);
    }

    kernel.initialize_edit_context(parse_markup(markup)?)?;
    kernel.initialize_event_handling()?;

    match action {
        Action::Find { term } => loop {
            let notices = kernel.exec_cmd("find", Some(CommandValue::Text(term.clone())))?;
            if !notices.is_empty() {
                report.notices.extend(notices);
                break;
            }
            let Some(found) = kernel.selection_definition() else {
                bail!("edit context disappeared while searching");
            };
            report.matches.push((found.start_pos, found.end_pos));
        },
        Action::ReplaceAll {
            term,
            replacement,
            match_case,
        } => {
            kernel.exec_cmd("replace", None)?;
            let values = DialogValues::new()
                .with("findText", term)
                .with("replaceText", replacement)
                .with("matchCase", if *match_case { "true" } else { "false" });
            report
                .notices
                .extend(kernel.dialog_action("replaceall", &values)?);
            report
                .notices
                .extend(kernel.resolve_dialog(DialogResult::Cancelled)?);
        }
        Action::Link { start, end, href } => {
            kernel.select_chars(*start, *end)?;
            kernel.exec_cmd("modifylink", None)?;
            let values = DialogValues::new().with("href", href);
            report
                .notices
                .extend(kernel.resolve_dialog(DialogResult::Applied(values))?);
        }
        Action::Unlink { start, end } => {
            kernel.select_chars(*start, *end)?;
            report.notices.extend(kernel.exec_cmd("unlink", None)?);
        }
        Action::SpellCheck => {
            report.notices.extend(kernel.exec_cmd("checktext", None)?);
        }
        Action::Toolbar { .. } => {}
    }

    report.markup = Some(kernel.serialize()?);
    kernel.destroy();
    Ok(report)
}

fn load_config() -> Config {
    match Config::load() {
        Ok(Some(config)) => config,
        Ok(None) => {
            log::debug!("no config file at {}, using defaults", Config::config_path().display());
            Config::default()
        }
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let Some(invocation) = parse_args(&args) else {
        eprintln!("{USAGE}");
        process::exit(1);
    };
    let config = load_config();

    let markup = match &invocation.file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => String::new(),
    };

    let report = run(&invocation.action, &markup, config)?;

    for notice in &report.notices {
        eprintln!("{notice}");
    }
    for (start, end) in &report.matches {
        println!("match {start}..{end}");
    }
    if let Some(result) = &report.markup {
        match (&invocation.file, invocation.write) {
            (Some(path), true) => fs::write(path, result)
                .with_context(|| format!("Failed to write {}", path.display()))?,
            _ => println!("{result}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(line: &str) -> Vec<String> {
        std::iter::once("coral-rte")
            .chain(line.split_whitespace())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(
            parse_args(&args("replace-all doc.html cat dog --match-case")),
            Some(Invocation {
                action: Action::ReplaceAll {
                    term: "cat".into(),
                    replacement: "dog".into(),
                    match_case: true,
                },
                file: Some(PathBuf::from("doc.html")),
                write: false,
            })
        );
        assert_eq!(
            parse_args(&args("toolbar")).map(|i| i.action),
            Some(Action::Toolbar {
                toolbar_id: "inline".into()
            })
        );
        assert_eq!(parse_args(&args("link doc.html one 4 /x")), None);
        assert_eq!(parse_args(&args("find doc.html cat --force")), None);
        assert_eq!(parse_args(&args("")), None);
    }

    #[test]
    fn test_find_lists_every_match() {
        let report = run(
            &Action::Find { term: "at".into() },
            "<p>the cat sat on the mat</p>",
            Config::default(),
        )
        .unwrap();

        assert_eq!(report.matches, vec![(5, 7), (9, 11), (20, 22)]);
        assert_eq!(report.notices, vec![Notice::SearchRestarted { term: "at".into() }]);
    }

    #[test]
    fn test_find_reports_missing_text() {
        let report = run(&Action::Find { term: "dog".into() }, "<p>cat</p>", Config::default()).unwrap();

        assert!(report.matches.is_empty());
        assert_eq!(report.notices, vec![Notice::TextNotFound { term: "dog".into() }]);
    }

    #[test]
    fn test_replace_all() {
        let report = run(
            &Action::ReplaceAll {
                term: "cat".into(),
                replacement: "dog".into(),
                match_case: false,
            },
            "<p>Cat and <b>cat</b></p>",
            Config::default(),
        )
        .unwrap();

        assert_eq!(report.notices, vec![Notice::ReplacedCount(2)]);
        assert_eq!(report.markup.as_deref(), Some("<p>dog and <b>dog</b></p>"));
    }

    #[test]
    fn test_link_and_unlink() {
        let linked = run(
            &Action::Link {
                start: 0,
                end: 5,
                href: "/home".into(),
            },
            "<p>hello world</p>",
            Config::default(),
        )
        .unwrap()
        .markup
        .unwrap();
        assert_eq!(linked, r#"<p><a href="/home">hello</a> world</p>"#);

        let unlinked = run(&Action::Unlink { start: 1, end: 2 }, &linked, Config::default())
            .unwrap()
            .markup
            .unwrap();
        assert_eq!(unlinked, "<p>hello world</p>");
    }

    #[test]
    fn test_unlink_before_a_link_keeps_it() {
        let markup = r#"<p>ab<a href="/y">cd</a></p>"#;
        let report = run(&Action::Unlink { start: 0, end: 2 }, markup, Config::default()).unwrap();

        assert_eq!(report.markup.as_deref(), Some(markup));
    }

    #[test]
    fn test_toolbar_follows_ui_settings() {
        let config = Config::from_toml_str(
            r#"
[ui_settings.inline]
toolbar = ["links#modifylink", "-", "findreplace#find", "bogus#item"]
"#,
        )
        .unwrap();

        let markup = run(
            &Action::Toolbar {
                toolbar_id: "inline".into(),
            },
            "",
            config,
        )
        .unwrap()
        .markup
        .unwrap();

        assert!(markup.starts_with(r#"<div class="rte-toolbar" data-toolbar="inline">"#));
        assert!(markup.contains(r#"data-action="links#modifylink""#));
        assert!(markup.contains("rte-toolbar-separator"));
        assert!(!markup.contains("bogus"));
        assert!(!markup.contains("undo#undo"));
    }

    #[test]
    fn test_write_back_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("doc.html");
        fs::write(&path, "<p>cat</p>").unwrap();
        let markup = fs::read_to_string(&path).unwrap();

        let report = run(
            &Action::ReplaceAll {
                term: "cat".into(),
                replacement: "dog".into(),
                match_case: true,
            },
            &markup,
            Config::default(),
        )
        .unwrap();
        fs::write(&path, report.markup.unwrap()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>dog</p>");
    }
}
