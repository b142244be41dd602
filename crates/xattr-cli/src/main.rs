// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::io::{self, Write};

use anyhow::Result;
use xattr_cli::{execute, report_parse_error, Cli, Parser};

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = report_parse_error(&e, &mut io::stdout(), &mut io::stderr());
            std::process::exit(code);
        }
    };

    cli.logging.clone().init("xattr-cli")?;

    let mut stdout = io::stdout().lock();
    let code = execute(&cli, &mut stdout, &mut io::stderr());
    stdout.flush()?;
    std::process::exit(code);
}
