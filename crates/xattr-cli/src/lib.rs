// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The `xattr` command-line tool
//!
//! Lists, prints, writes, deletes and clears extended attributes on one or
//! more files. Exit status is 0 when every file was processed and 1 otherwise.

pub mod dump;

use std::ffi::OsString;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, bail, Result};
use clap::ArgGroup;
use tracing::debug;
use xattr_core::{Options, Xattr, XattrMap};
use xattr_logging::CliLoggingArgs;

use crate::dump::{render, Rendered};

pub use clap::Parser;

pub const USAGE: &str = "\
usage: xattr [-slx] file [file ...]
       xattr -p [-slx] attr_name file [file ...]
       xattr -w [-s] attr_name attr_value file [file ...]
       xattr -d [-s] attr_name file [file ...]
       xattr -c [-s] file [file ...]
       xattr [-l] file attr_name [attr_value]

The first form lists the names of all xattrs on the given file(s).
The second form (-p) prints the value of the xattr attr_name.
The third form (-w) sets the value of the xattr attr_name to attr_value.
The fourth form (-d) deletes the xattr attr_name.
The fifth form (-c) deletes (clears) all xattrs.
The last form prints attr_name, or sets it when attr_value is given.

options:
  -h: print this help
  -s: act on symbolic links themselves rather than their targets
  -l: print long format (attr_name: attr_value)
  -x: display xattr values as hex";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "xattr",
    version,
    about = "Display and manipulate extended attributes",
    after_help = USAGE
)]
#[command(group(ArgGroup::new("mode").args(["print", "write", "delete", "clear"])))]
pub struct Cli {
    /// Print the value of the named xattr
    #[arg(short = 'p')]
    pub print: bool,

    /// Write a value to the named xattr
    #[arg(short = 'w')]
    pub write: bool,

    /// Delete the named xattr
    #[arg(short = 'd')]
    pub delete: bool,

    /// Delete all xattrs
    #[arg(short = 'c')]
    pub clear: bool,

    /// Long format (attr_name: attr_value)
    #[arg(short = 'l')]
    pub long: bool,

    /// Act on symbolic links themselves rather than their targets
    #[arg(short = 's')]
    pub symlink: bool,

    /// Display values as hex
    #[arg(short = 'x')]
    pub hex: bool,

    #[command(flatten)]
    pub logging: CliLoggingArgs,

    /// attr_name, attr_value and files, depending on the mode
    #[arg(value_name = "ARG")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    List,
    Print(String),
    Write { name: String, value: String },
    Delete(String),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub action: Action,
    pub files: Vec<String>,
}

/// Namespaced like `user.foo` and not a path.
fn looks_like_attr_name(arg: &str) -> bool {
    arg.contains('.') && !arg.contains('/')
}

impl Cli {
    fn has_mode(&self) -> bool {
        self.print || self.write || self.delete || self.clear
    }

    /// `file attr_name [attr_value]` without a mode flag, recognized when the
    /// second argument looks like an attribute name and does not name an
    /// existing file.
    fn legacy_plan(&self) -> Option<Plan> {
        if self.has_mode() || !(2..=3).contains(&self.args.len()) {
            return None;
        }
        if !looks_like_attr_name(&self.args[1])
            || Path::new(&self.args[1]).symlink_metadata().is_ok()
        {
            return None;
        }
        let name = self.args[1].clone();
        let action = match self.args.get(2) {
            Some(value) => Action::Write {
                name,
                value: value.clone(),
            },
            None => Action::Print(name),
        };
        Some(Plan {
            action,
            files: vec![self.args[0].clone()],
        })
    }

    /// Work out what to do from the flags and positional arguments. Errors are
    /// usage messages.
    pub fn plan(&self) -> std::result::Result<Plan, String> {
        if self.long && (self.write || self.delete) {
            return Err(format!(
                "-l not allowed with -{}",
                if self.write { "w" } else { "d" }
            ));
        }
        if let Some(plan) = self.legacy_plan() {
            return Ok(plan);
        }

        let mut args = self.args.iter().cloned();
        let action = if self.print || self.write || self.delete {
            let name = args.next().ok_or("No attr_name")?;
            if self.print {
                Action::Print(name)
            } else if self.delete {
                Action::Delete(name)
            } else {
                let value = args.next().ok_or("No attr_value")?;
                Action::Write { name, value }
            }
        } else if self.clear {
            Action::Clear
        } else {
            Action::List
        };

        let files: Vec<String> = args.collect();
        if files.is_empty() {
            return Err("No file argument".to_string());
        }
        Ok(Plan { action, files })
    }
}

/// Parse `argv` (program name first) and run it. Returns the exit status.
pub fn run<I, T>(argv: I, out: &mut dyn Write, err: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(argv) {
        Ok(cli) => execute(&cli, out, err),
        Err(e) => report_parse_error(&e, out, err),
    }
}

/// Print a clap error (or help/version output) and pick the exit status.
pub fn report_parse_error(e: &clap::Error, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
    let rendered = e.render().to_string();
    if e.use_stderr() {
        let _ = write!(err, "{}", rendered);
        1
    } else {
        let _ = write!(out, "{}", rendered);
        0
    }
}

pub fn execute(cli: &Cli, out: &mut dyn Write, err: &mut dyn Write) -> i32 {
    let plan = match cli.plan() {
        Ok(plan) => plan,
        Err(message) => {
            let _ = writeln!(err, "{}\n\n{}", message, USAGE);
            return 1;
        }
    };
    debug!("xattr plan: {:?}", plan);

    let multiple_files = plan.files.len() > 1;
    let mut status = 0;
    for file in &plan.files {
        let prefix = if multiple_files {
            format!("{}: ", file)
        } else {
            String::new()
        };
        if let Err(e) = process_file(cli, &plan.action, file, &prefix, out) {
            let _ = writeln!(err, "{:#}", e);
            status = 1;
        }
    }
    status
}

fn fetch<X: XattrMap>(attrs: &X, name: &str, prefix: &str) -> Result<Vec<u8>> {
    match attrs.get(name) {
        Ok(value) => Ok(value),
        Err(e) if e.is_not_found() => Err(anyhow!("{}No such xattr: {}", prefix, name)),
        Err(e) => Err(e.into()),
    }
}

fn write_long(out: &mut dyn Write, prefix: &str, name: &str, value: &[u8], hex: bool) -> Result<()> {
    match render(value, hex) {
        Rendered::Text(text) => writeln!(out, "{}{}: {}", prefix, name, text)?,
        Rendered::Dump(dump) => writeln!(out, "{}{}:\n{}", prefix, name, dump)?,
    }
    Ok(())
}

fn write_value(out: &mut dyn Write, prefix: &str, value: &[u8], hex: bool) -> Result<()> {
    match render(value, hex) {
        Rendered::Text(text) => writeln!(out, "{}{}", prefix, text)?,
        Rendered::Dump(dump) => {
            if !prefix.is_empty() {
                writeln!(out, "{}", prefix.trim_end())?;
            }
            writeln!(out, "{}", dump)?;
        }
    }
    Ok(())
}

fn process_file(
    cli: &Cli,
    action: &Action,
    file: &str,
    prefix: &str,
    out: &mut dyn Write,
) -> Result<()> {
    if Path::new(file).symlink_metadata().is_err() {
        bail!("No such file: {}", file);
    }
    let attrs = Xattr::with_options(file, Options::nofollow_if(cli.symlink))?;

    match action {
        Action::Write { name, value } => attrs.set(name, value.as_bytes())?,
        Action::Delete(name) => match attrs.remove(name) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => bail!("{}No such xattr: {}", prefix, name),
            Err(e) => return Err(e.into()),
        },
        Action::Clear => attrs.clear()?,
        Action::Print(name) => {
            let value = fetch(&attrs, name, prefix)?;
            if cli.long {
                write_long(out, prefix, name, &value, cli.hex)?;
            } else {
                write_value(out, prefix, &value, cli.hex)?;
            }
        }
        Action::List => {
            for name in attrs.list()? {
                if cli.long {
                    let value = fetch(&attrs, &name, prefix)?;
                    write_long(out, prefix, &name, &value, cli.hex)?;
                } else {
                    writeln!(out, "{}{}", prefix, name)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("xattr").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_plan_modes() {
        let plan = parse(&["-p", "user.a", "f1", "f2"]).plan().unwrap();
        assert_eq!(plan.action, Action::Print("user.a".into()));
        assert_eq!(plan.files, vec!["f1", "f2"]);

        let plan = parse(&["-w", "user.a", "v", "f1"]).plan().unwrap();
        assert_eq!(
            plan.action,
            Action::Write {
                name: "user.a".into(),
                value: "v".into()
            }
        );

        assert_eq!(parse(&["-c", "f"]).plan().unwrap().action, Action::Clear);
        assert_eq!(
            parse(&["-d", "user.a", "f"]).plan().unwrap().action,
            Action::Delete("user.a".into())
        );
    }

    #[test]
    fn test_combined_short_flags() {
        let cli = parse(&["-lsx", "f"]);
        assert!(cli.long && cli.symlink && cli.hex);
        assert_eq!(cli.plan().unwrap().action, Action::List);
    }

    #[test]
    fn test_usage_errors() {
        assert_eq!(parse(&[]).plan().unwrap_err(), "No file argument");
        assert_eq!(parse(&["-p"]).plan().unwrap_err(), "No attr_name");
        assert_eq!(parse(&["-w", "user.a"]).plan().unwrap_err(), "No attr_value");
        assert_eq!(parse(&["-p", "user.a"]).plan().unwrap_err(), "No file argument");
        assert_eq!(
            parse(&["-l", "-w", "user.a", "v", "f"]).plan().unwrap_err(),
            "-l not allowed with -w"
        );
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["xattr", "-p", "-d", "user.a", "f"]).is_err());
    }

    #[test]
    fn test_legacy_form() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"").unwrap();
        let file = file.to_str().unwrap();

        let plan = parse(&[file, "user.name"]).plan().unwrap();
        assert_eq!(plan.action, Action::Print("user.name".into()));
        assert_eq!(plan.files, vec![file]);

        let plan = parse(&[file, "user.name", "value"]).plan().unwrap();
        assert_eq!(
            plan.action,
            Action::Write {
                name: "user.name".into(),
                value: "value".into()
            }
        );

        // Two existing files are listed, not read as a legacy name
        let plan = parse(&[file, file]).plan().unwrap();
        assert_eq!(plan.action, Action::List);
        assert_eq!(plan.files.len(), 2);

        // A missing path is a file operand, not an attribute name
        for operand in ["missing-file", "dir/user.name"] {
            let plan = parse(&[file, operand]).plan().unwrap();
            assert_eq!(plan.action, Action::List);
            assert_eq!(plan.files, vec![file, operand]);
        }
    }

    #[test]
    fn test_no_file_exits_with_usage() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        assert_eq!(run(["xattr"], &mut out, &mut err), 1);
        assert!(out.is_empty());
        let err = String::from_utf8(err).unwrap();
        assert!(err.starts_with("No file argument\n\nusage: xattr"));
    }

    #[test]
    fn test_help_goes_to_stdout() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        assert_eq!(run(["xattr", "--help"], &mut out, &mut err), 0);
        assert!(String::from_utf8(out).unwrap().contains("-p"));
    }

    #[test]
    fn test_missing_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let missing = missing.to_str().unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        assert_eq!(run(["xattr", missing], &mut out, &mut err), 1);
        assert_eq!(
            String::from_utf8(err).unwrap(),
            format!("No such file: {}\n", missing)
        );
    }
}
