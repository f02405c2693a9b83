//! Command-line integration.
//!
//! [`Integration`] adds the tool flags and one `--<Capability>` flag per
//! declared capability to a host's `clap::Command`, then applies what was
//! given on the command line to the two registries:
//!
//! ```text
//! --tunables-show              print the conf representation
//! -t, --tunable NAME=VALUE     set a tunable (repeatable)
//! --tunables-load FILE         load tunables, format from the extension
//! --tunables-save FILE         save tunables, format from the extension
//! -m, --module NAME            load a module unit (repeatable)
//! --<Capability> CHOICE        select an implementation, `Name(k=v,...)`
//! ```
//!
//! Actions run in command-line order, so `--tunables-load a.json -t X=1`
//! overrides the loaded value while `-t X=1 --tunables-load a.json` does not.
//!
//! Capability values are not restricted to a fixed list at parse time.
//! Unknown choices reach [`SelectionRegistry::accept_choice`], which may load
//! a module providing them before rejecting the value.

use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::core::registry::ParameterRegistry;
use crate::core::value::Value;
use crate::select::registry::SelectionRegistry;
use crate::serial::{self, Format};

const SHOW_ID: &str = "tunables-show";
const SET_ID: &str = "tunables-set";
const LOAD_ID: &str = "tunables-load";
const SAVE_ID: &str = "tunables-save";
const MODULE_ID: &str = "tunables-module";
const CAPABILITY_PREFIX: &str = "capability:";

/// Behaviour of the terminal actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliSettings {
    /// Exit with status 1 after showing the configuration
    pub quit_after_show: bool,
    /// Exit with status 1 after saving the configuration
    pub quit_after_save: bool,
    /// Ask before overwriting an existing file
    pub prompt_overwrite: bool,
}

impl Default for CliSettings {
    fn default() -> Self {
        CliSettings {
            quit_after_show: true,
            quit_after_save: true,
            prompt_overwrite: true,
        }
    }
}

/// Short and long spelling of one tool flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub short: Option<char>,
    pub long: String,
}

impl FlagSpec {
    pub fn new(short: Option<char>, long: impl Into<String>) -> Self {
        FlagSpec {
            short,
            long: long.into(),
        }
    }

    fn matches_long(&self, arg: &str) -> bool {
        arg.strip_prefix("--") == Some(self.long.as_str())
    }
}

/// Names of the tool flags, for hosts whose own flags collide with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagNames {
    pub show: FlagSpec,
    pub set: FlagSpec,
    pub load: FlagSpec,
    pub save: FlagSpec,
    pub module: FlagSpec,
}

impl Default for FlagNames {
    fn default() -> Self {
        FlagNames {
            show: FlagSpec::new(None, "tunables-show"),
            set: FlagSpec::new(Some('t'), "tunable"),
            load: FlagSpec::new(None, "tunables-load"),
            save: FlagSpec::new(None, "tunables-save"),
            module: FlagSpec::new(Some('m'), "module"),
        }
    }
}

/// What the host should do after [`Integration::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// A terminal action ran; exit with this status.
    Exit(i32),
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Show,
    Set(String),
    Load(PathBuf),
    Save(PathBuf),
    Module(String),
    Select { capability: String, choice: String },
}

/// Binds the command line to a parameter registry and a selection registry.
pub struct Integration<'r> {
    tunables: &'r mut ParameterRegistry,
    selection: &'r mut SelectionRegistry,
    settings: CliSettings,
    names: FlagNames,
}

impl<'r> Integration<'r> {
    pub fn new(tunables: &'r mut ParameterRegistry, selection: &'r mut SelectionRegistry) -> Self {
        Integration {
            tunables,
            selection,
            settings: CliSettings::default(),
            names: FlagNames::default(),
        }
    }

    pub fn with_settings(mut self, settings: CliSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_names(mut self, names: FlagNames) -> Self {
        self.names = names;
        self
    }

    /// Load every module named with the module flag before the command is
    /// built, so capabilities they declare get flags of their own.
    pub fn preparse<I, T>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        for module in self.scan_modules(args) {
            self.selection
                .load_module(&module)
                .with_context(|| format!("failed to load module `{}`", module))?;
        }
        Ok(())
    }

    fn scan_modules<I, T>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let spec = &self.names.module;
        let short = spec.short.map(|c| format!("-{}", c));
        let long_eq = format!("--{}=", spec.long);

        let mut modules = Vec::new();
        let mut args = args
            .into_iter()
            .map(|a| a.into().to_string_lossy().into_owned())
            .skip(1);

        while let Some(arg) = args.next() {
            if arg == "--" {
                break;
            }
            if spec.matches_long(&arg) || short.as_deref() == Some(arg.as_str()) {
                if let Some(value) = args.next() {
                    modules.push(value);
                }
            } else if let Some(value) = arg.strip_prefix(long_eq.as_str()) {
                modules.push(value.to_string());
            } else if let Some(value) = short
                .as_deref()
                .and_then(|s| arg.strip_prefix(s))
                .filter(|v| !v.is_empty() && !arg.starts_with("--"))
            {
                modules.push(value.to_string());
            }
        }
        modules
    }

    /// Add the tool flags and the capability flags to `cmd`.
    pub fn register(&self, cmd: Command) -> Command {
        let names = &self.names;
        let mut cmd = cmd
            .arg(
                flag(SHOW_ID, &names.show)
                    .action(ArgAction::SetTrue)
                    .help("Show the current tunables and exit"),
            )
            .arg(
                flag(SET_ID, &names.set)
                    .action(ArgAction::Append)
                    .value_name("NAME=VALUE")
                    .help("Set a tunable"),
            )
            .arg(
                flag(LOAD_ID, &names.load)
                    .action(ArgAction::Append)
                    .value_name("FILE")
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("Load tunables from a file (conf, json, yaml, xml, der)"),
            )
            .arg(
                flag(SAVE_ID, &names.save)
                    .action(ArgAction::Append)
                    .value_name("FILE")
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("Save tunables to a file and exit"),
            )
            .arg(
                flag(MODULE_ID, &names.module)
                    .action(ArgAction::Append)
                    .value_name("NAME")
                    .help("Load a module"),
            );

        for info in self.selection.capabilities() {
            let choices = self.selection.choices(&info.name).unwrap_or_default();
            let defaults = self.selection.defaults(&info.name).unwrap_or_default();

            let mut help = format!("Choose a {} implementation", info.name);
            if !choices.is_empty() {
                help.push_str(&format!(" [choices: {}]", choices.join(", ")));
            }
            if !defaults.is_empty() {
                help.push_str(&format!(" [default: {}]", defaults.join(", ")));
            }

            cmd = cmd.arg(
                Arg::new(format!("{}{}", CAPABILITY_PREFIX, info.name))
                    .long(info.name.clone())
                    .action(ArgAction::Append)
                    .value_name("CHOICE")
                    .help(help),
            );
        }
        cmd
    }

    /// Apply the parsed command line, reading answers from stdin.
    pub fn apply(&mut self, matches: &ArgMatches) -> Result<Outcome> {
        let stdout = io::stdout();
        let stdin = io::stdin();
        self.apply_with(matches, &mut stdout.lock(), &mut stdin.lock())
    }

    /// Apply the parsed command line with explicit output and input streams.
    pub fn apply_with(
        &mut self,
        matches: &ArgMatches,
        out: &mut dyn Write,
        input: &mut dyn BufRead,
    ) -> Result<Outcome> {
        for action in self.collect_actions(matches) {
            tracing::debug!("cli action {:?}", action);
            if let Outcome::Exit(code) = self.run(action, out, input)? {
                return Ok(Outcome::Exit(code));
            }
        }
        Ok(Outcome::Continue)
    }

    fn collect_actions(&self, matches: &ArgMatches) -> Vec<Action> {
        let mut indexed: Vec<(usize, Action)> = Vec::new();

        if matches.get_flag(SHOW_ID) {
            if let Some(index) = matches.index_of(SHOW_ID) {
                indexed.push((index, Action::Show));
            }
        }

        let simple = [
            (SET_ID, Action::Set as fn(String) -> Action),
            (MODULE_ID, Action::Module),
        ];
        for (id, make) in simple {
            indexed.extend(positioned::<String>(matches, id).into_iter().map(|(i, v)| (i, make(v))));
        }

        let files = [
            (LOAD_ID, Action::Load as fn(PathBuf) -> Action),
            (SAVE_ID, Action::Save),
        ];
        for (id, make) in files {
            indexed.extend(positioned::<PathBuf>(matches, id).into_iter().map(|(i, p)| (i, make(p))));
        }

        for info in self.selection.capabilities() {
            let id = format!("{}{}", CAPABILITY_PREFIX, info.name);
            indexed.extend(positioned::<String>(matches, &id).into_iter().map(|(i, choice)| {
                (
                    i,
                    Action::Select {
                        capability: info.name.clone(),
                        choice,
                    },
                )
            }));
        }

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, action)| action).collect()
    }

    fn run(&mut self, action: Action, out: &mut dyn Write, input: &mut dyn BufRead) -> Result<Outcome> {
        match action {
            Action::Show => {
                let text = self.tunables.serialization(Format::Conf)?;
                out.write_all(&text)?;
                out.flush()?;
                Ok(self.finish(self.settings.quit_after_show))
            }
            Action::Set(assignment) => {
                let Some((name, value)) = assignment.split_once('=') else {
                    bail!("invalid tunable assignment `{}`, expected NAME=VALUE", assignment);
                };
                self.tunables.set(name, Value::Str(value.to_string()))?;
                Ok(Outcome::Continue)
            }
            Action::Load(path) => {
                self.load_file(&path)?;
                Ok(Outcome::Continue)
            }
            Action::Save(path) => self.save_file(&path, out, input),
            Action::Module(name) => {
                self.selection
                    .load_module(&name)
                    .with_context(|| format!("failed to load module `{}`", name))?;
                Ok(Outcome::Continue)
            }
            Action::Select { capability, choice } => {
                self.selection.accept_choice(&capability, &choice)?;
                Ok(Outcome::Continue)
            }
        }
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        let format = Format::from_path(path)?;
        let data = fs::read(path)
            .with_context(|| format!("failed to read tunables from {}", path.display()))?;
        let mapping = serial::from_bytes(&data, format)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        self.tunables.load(mapping)?;
        tracing::info!("loaded tunables from {}", path.display());
        Ok(())
    }

    fn save_file(
        &mut self,
        path: &Path,
        out: &mut dyn Write,
        input: &mut dyn BufRead,
    ) -> Result<Outcome> {
        let format = Format::from_path(path)?;

        if path.exists() && self.settings.prompt_overwrite && !confirm_overwrite(path, out, input)? {
            tracing::debug!("kept existing {}", path.display());
            return Ok(self.finish(self.settings.quit_after_save));
        }

        writeln!(out, "Saving tunables to \"{}\" ...", path.display())?;
        out.flush()?;

        let data = self.tunables.serialization(format)?;
        fs::write(path, data)
            .with_context(|| format!("failed to write tunables to {}", path.display()))?;

        Ok(self.finish(self.settings.quit_after_save))
    }

    fn finish(&self, quit: bool) -> Outcome {
        if quit {
            Outcome::Exit(1)
        } else {
            Outcome::Continue
        }
    }
}

fn flag(id: &'static str, spec: &FlagSpec) -> Arg {
    let arg = Arg::new(id).long(spec.long.clone());
    match spec.short {
        Some(short) => arg.short(short),
        None => arg,
    }
}

/// Values of an appendable argument paired with their command-line index.
fn positioned<T>(matches: &ArgMatches, id: &str) -> Vec<(usize, T)>
where
    T: Clone + Send + Sync + 'static,
{
    let indices = matches.indices_of(id).into_iter().flatten();
    let values = matches.get_many::<T>(id).into_iter().flatten().cloned();
    indices.zip(values).collect()
}

/// Ask until the answer is yes or no. End of input counts as no.
fn confirm_overwrite(path: &Path, out: &mut dyn Write, input: &mut dyn BufRead) -> Result<bool> {
    loop {
        writeln!(out, "File \"{}\" already exists. Overwrite? [y/n]", path.display())?;
        out.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_selection, sample_tunables};
    use tempfile::TempDir;

    fn matches(integration: &Integration<'_>, args: &[&str]) -> ArgMatches {
        let cmd = integration.register(Command::new("t"));
        let argv = std::iter::once("t").chain(args.iter().copied());
        cmd.try_get_matches_from(argv).unwrap()
    }

    fn apply(integration: &mut Integration<'_>, args: &[&str], stdin: &str) -> (Outcome, String) {
        let m = matches(integration, args);
        let mut out = Vec::new();
        let mut input = io::Cursor::new(stdin.as_bytes().to_vec());
        let outcome = integration.apply_with(&m, &mut out, &mut input).unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_set_applies_in_order() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);

        let (outcome, _) = apply(&mut integration, &["-t", "Otsu=14.0", "--tunable", "Otsu=2"], "");
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(tunables.value("Otsu").unwrap(), &Value::Float(2.0));
    }

    #[test]
    fn test_set_value_may_contain_equals() {
        let mut tunables = ParameterRegistry::new();
        tunables
            .register(crate::core::Parameter::new("app", "Expr").with_default("a"))
            .unwrap();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);

        apply(&mut integration, &["-t", "Expr=x=y"], "");
        assert_eq!(tunables.value("Expr").unwrap(), &Value::Str("x=y".into()));
    }

    #[test]
    fn test_set_without_equals_fails() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);

        let m = matches(&integration, &["-t", "Otsu"]);
        let err = integration
            .apply_with(&m, &mut Vec::new(), &mut io::Cursor::new(Vec::new()))
            .unwrap_err();
        assert!(err.to_string().contains("NAME=VALUE"));
    }

    #[test]
    fn test_show_prints_conf_and_exits() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);

        let (outcome, out) = apply(&mut integration, &["--tunables-show"], "");
        assert_eq!(outcome, Outcome::Exit(1));
        assert!(out.starts_with("### Tunables ###"));
        assert!(out.contains("Otsu=1.0"));
    }

    #[test]
    fn test_show_continues_when_configured() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let settings = CliSettings {
            quit_after_show: false,
            ..CliSettings::default()
        };
        let mut integration = Integration::new(&mut tunables, &mut selection).with_settings(settings);

        let (outcome, _) = apply(&mut integration, &["--tunables-show"], "");
        assert_eq!(outcome, Outcome::Continue);
    }

    #[test]
    fn test_show_sees_earlier_sets_only() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);

        let (_, out) = apply(
            &mut integration,
            &["-t", "Otsu=3", "--tunables-show", "-t", "Otsu=4"],
            "",
        );
        assert!(out.contains("Otsu=3.0"));
        assert_eq!(tunables.value("Otsu").unwrap(), &Value::Float(3.0));
    }

    #[test]
    fn test_capability_flag_selects() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);

        apply(&mut integration, &["--Shape", "Square(size=3)"], "");
        let variant = selection.resolve("Shape").unwrap();
        assert_eq!(variant.name(), "Square");
        assert_eq!(variant.params().get("size"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_multi_select_flag_accumulates() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);

        apply(&mut integration, &["--Layer", "Stroke", "--Layer", "Fill"], "");
        let names: Vec<_> = selection
            .resolve_all("Layer")
            .unwrap()
            .iter()
            .map(|v| v.name().to_string())
            .collect();
        assert_eq!(names, ["Stroke", "Fill"]);
    }

    #[test]
    fn test_invalid_choice_is_reported() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);

        let m = matches(&integration, &["--Shape", "Hexagon"]);
        let err = integration
            .apply_with(&m, &mut Vec::new(), &mut io::Cursor::new(Vec::new()))
            .unwrap_err();
        assert!(err.to_string().contains("Hexagon"));
    }

    #[test]
    fn test_help_lists_choices_and_default() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let integration = Integration::new(&mut tunables, &mut selection);

        let mut cmd = integration.register(Command::new("t"));
        let help = cmd.render_help().to_string();
        assert!(help.contains("--Shape"));
        assert!(help.contains("[default: Circle]"));
        assert!(help.contains("Square"));
        assert!(!help.contains("Polygon,"));
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("saved.json");
        let path_arg = path.to_str().unwrap();

        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        {
            let mut integration = Integration::new(&mut tunables, &mut selection);
            let (outcome, out) =
                apply(&mut integration, &["-t", "Otsu=14", "--tunables-save", path_arg], "");
            assert_eq!(outcome, Outcome::Exit(1));
            assert!(out.contains("Saving tunables to"));
        }
        assert!(path.exists());

        let mut fresh = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut fresh, &mut selection);
        apply(&mut integration, &["--tunables-load", path_arg], "");
        assert_eq!(fresh.value("Otsu").unwrap(), &Value::Float(14.0));
    }

    #[test]
    fn test_load_then_set_overrides() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("in.conf");
        fs::write(&path, "Otsu=17\nThreshold=3\n").unwrap();
        let path_arg = path.to_str().unwrap();

        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);
        apply(&mut integration, &["--tunables-load", path_arg, "-t", "Threshold=4"], "");

        assert_eq!(tunables.value("Otsu").unwrap(), &Value::Float(17.0));
        assert_eq!(tunables.value("Threshold").unwrap(), &Value::Int(4));
    }

    #[test]
    fn test_save_declined_keeps_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("keep.conf");
        fs::write(&path, "original").unwrap();
        let path_arg = path.to_str().unwrap();

        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);
        let (outcome, out) = apply(&mut integration, &["--tunables-save", path_arg], "maybe\nn\n");

        assert_eq!(outcome, Outcome::Exit(1));
        assert_eq!(out.matches("Overwrite? [y/n]").count(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn test_save_confirmed_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("over.conf");
        fs::write(&path, "original").unwrap();
        let path_arg = path.to_str().unwrap();

        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);
        apply(&mut integration, &["--tunables-save", path_arg], "Y\n");

        assert!(fs::read_to_string(&path).unwrap().starts_with("### Tunables ###"));
    }

    #[test]
    fn test_save_without_prompt_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("over.yaml");
        fs::write(&path, "original").unwrap();
        let path_arg = path.to_str().unwrap();

        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let settings = CliSettings {
            prompt_overwrite: false,
            quit_after_save: false,
            ..CliSettings::default()
        };
        let mut integration = Integration::new(&mut tunables, &mut selection).with_settings(settings);
        let (outcome, out) = apply(&mut integration, &["--tunables-save", path_arg], "");

        assert_eq!(outcome, Outcome::Continue);
        assert!(!out.contains("Overwrite?"));
        assert_ne!(fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn test_save_unsupported_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.ini");
        let path_arg = path.to_str().unwrap();

        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);
        let m = matches(&integration, &["--tunables-save", path_arg]);
        let err = integration
            .apply_with(&m, &mut Vec::new(), &mut io::Cursor::new(Vec::new()))
            .unwrap_err();

        assert!(err.to_string().contains("ini"));
        assert!(!path.exists());
    }

    #[test]
    fn test_custom_flag_names() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let names = FlagNames {
            set: FlagSpec::new(Some('T'), "param"),
            ..FlagNames::default()
        };
        let mut integration = Integration::new(&mut tunables, &mut selection).with_names(names);

        apply(&mut integration, &["-T", "Threshold=9", "--param", "Otsu=5"], "");
        assert_eq!(tunables.value("Threshold").unwrap(), &Value::Int(9));
        assert_eq!(tunables.value("Otsu").unwrap(), &Value::Float(5.0));
    }

    #[test]
    fn test_scan_modules() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let integration = Integration::new(&mut tunables, &mut selection);

        let found = integration.scan_modules([
            "prog", "-m", "a", "--module", "b", "--module=c", "-md", "-t", "x=1", "--", "-m", "e",
        ]);
        assert_eq!(found, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_preparse_without_loader_fails() {
        let mut tunables = sample_tunables();
        let (mut selection, _) = sample_selection();
        let mut integration = Integration::new(&mut tunables, &mut selection);

        let err = integration.preparse(["prog", "-m", "missing"]).unwrap_err();
        assert!(format!("{:#}", err).contains("missing"));
    }
}
